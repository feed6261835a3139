use rusqlite::Connection;
use vesblog_core::db::open_db_in_memory;
use vesblog_core::{
    BlogServices, Category, CategoryRepository, ConditionType, EntityKind, Filter, Post,
    SearchCriteria, ServiceError, SortDirection, SqliteCategoryRepository, StaticStoreManager,
};

fn services(conn: &Connection) -> BlogServices<'_, StaticStoreManager> {
    BlogServices::try_new(conn, StaticStoreManager::new(1, "https://shop.test")).unwrap()
}

fn save_post(services: &BlogServices<'_, StaticStoreManager>, key: &str, active: bool) -> i64 {
    let mut post = Post::new(format!("Post {key}"), key);
    post.is_active = active;
    post.image = Some(format!("{key}.jpg"));
    services.posts().save(&post).unwrap().post_id.unwrap()
}

#[test]
fn get_lists_only_active_posts_in_association_order() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let first = save_post(&services, "first", true);
    let second = save_post(&services, "second", false);
    let third = save_post(&services, "third", true);

    let mut category = Category::new("News", "news");
    category.post_ids = vec![third, first, second];
    let saved = services.categories().save(&category).unwrap();
    assert_eq!(saved.post_ids, vec![third, first, second]);

    let detail = services.categories().get(saved.category_id.unwrap()).unwrap();
    assert_eq!(detail.posts.total_count, 2);
    let ids = detail
        .posts
        .items
        .iter()
        .map(|post| post.post_id.unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![third, first]);
    assert_eq!(
        detail.posts.items[0].image.as_deref(),
        Some("https://shop.test/media/third.jpg")
    );
}

#[test]
fn children_skip_inactive_posts() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let active = save_post(&services, "one", true);
    let inactive = save_post(&services, "two", false);
    let mut category = Category::new("Mixed", "mixed");
    category.post_ids = vec![active, inactive];
    let category_id = services
        .categories()
        .save(&category)
        .unwrap()
        .category_id
        .unwrap();

    let detail = services.categories().get(category_id).unwrap();
    assert_eq!(detail.posts.total_count, 1);
    assert_eq!(detail.posts.items[0].post_id, Some(active));
}

#[test]
fn post_side_links_append_to_category() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let existing = save_post(&services, "existing", true);
    let mut category = Category::new("Guides", "guides");
    category.post_ids = vec![existing];
    let category_id = services
        .categories()
        .save(&category)
        .unwrap()
        .category_id
        .unwrap();

    let mut linked = Post::new("Linked", "linked");
    linked.category_ids = vec![category_id];
    let linked_id = services.posts().save(&linked).unwrap().post_id.unwrap();

    let detail = services.categories().get(category_id).unwrap();
    assert_eq!(detail.category.post_ids, vec![existing, linked_id]);
    assert_eq!(detail.posts.total_count, 2);
}

#[test]
fn view_checks_active_flag_and_store() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut scoped = Category::new("Scoped", "scoped");
    scoped.store_ids = vec![2];
    let scoped_id = services
        .categories()
        .save(&scoped)
        .unwrap()
        .category_id
        .unwrap();

    let mut global = Category::new("Global", "global");
    global.store_ids = vec![0];
    let global_id = services
        .categories()
        .save(&global)
        .unwrap()
        .category_id
        .unwrap();

    let mut inactive = Category::new("Off", "off");
    inactive.is_active = false;
    let inactive_id = services
        .categories()
        .save(&inactive)
        .unwrap()
        .category_id
        .unwrap();

    assert!(services.categories().view(scoped_id, Some(2)).is_ok());
    assert!(services.categories().view(scoped_id, None).is_ok());
    assert!(matches!(
        services.categories().view(scoped_id, Some(1)),
        Err(ServiceError::NotFound {
            kind: EntityKind::Category,
            ..
        })
    ));
    assert!(services.categories().view(global_id, Some(5)).is_ok());
    assert!(matches!(
        services.categories().view(inactive_id, None),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn get_missing_category_reports_its_id() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let err = services.categories().get(8).unwrap_err();
    assert_eq!(err.to_string(), "Category with id \"8\" does not exist.");
}

#[test]
fn save_rejects_bad_identifier_and_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let err = services
        .categories()
        .save(&Category::new("Bad", "Not A Key"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::CouldNotSave {
            kind: EntityKind::Category,
            ..
        }
    ));

    services
        .categories()
        .save(&Category::new("One", "same-key"))
        .unwrap();
    assert!(matches!(
        services.categories().save(&Category::new("Two", "same-key")),
        Err(ServiceError::CouldNotSave { .. })
    ));
}

#[test]
fn update_replaces_store_and_post_links() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let first = save_post(&services, "a", true);
    let second = save_post(&services, "b", true);
    let mut category = Category::new("Links", "links");
    category.store_ids = vec![3, 1, 3];
    category.post_ids = vec![first, second, first];
    let mut saved = services.categories().save(&category).unwrap();
    assert_eq!(saved.store_ids, vec![1, 3]);
    assert_eq!(saved.post_ids, vec![first, second]);

    saved.store_ids = vec![4];
    saved.post_ids = vec![second];
    saved.description = Some("updated".to_string());
    let updated = services.categories().save(&saved).unwrap();

    assert_eq!(updated.category_id, saved.category_id);
    assert_eq!(updated.store_ids, vec![4]);
    assert_eq!(updated.post_ids, vec![second]);
    assert_eq!(updated.description.as_deref(), Some("updated"));
    assert!(updated.update_time.is_some());
}

#[test]
fn delete_keeps_posts_and_drops_links() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let post_id = save_post(&services, "kept", true);
    let mut category = Category::new("Temp", "temp");
    category.post_ids = vec![post_id];
    let category_id = services
        .categories()
        .save(&category)
        .unwrap()
        .category_id
        .unwrap();

    assert!(services.categories().delete_by_id(category_id).unwrap());
    assert!(matches!(
        services.categories().get(category_id),
        Err(ServiceError::NotFound { .. })
    ));

    let post = services.posts().get(post_id).unwrap().post;
    assert!(post.category_ids.is_empty());
}

#[test]
fn publish_list_returns_active_categories_only() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    for (name, active, position) in [("Alpha", true, 2), ("Beta", false, 1), ("Gamma", true, 0)] {
        let mut category = Category::new(name, name.to_lowercase());
        category.is_active = active;
        category.position = position;
        services.categories().save(&category).unwrap();
    }

    let criteria = SearchCriteria::new().sorted_by("position", SortDirection::Asc);
    let all = services.categories().get_list(&criteria).unwrap();
    assert_eq!(all.total_count, 3);
    assert_eq!(all.items[0].category.name, "Gamma");

    let public = services.categories().get_publish_list(&criteria).unwrap();
    let names = public
        .items
        .iter()
        .map(|category| category.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Gamma", "Alpha"]);
    assert_eq!(public.total_count, 2);
}

#[test]
fn list_paginates_with_total_before_paging() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();

    for index in 0..5 {
        repo.insert_category(&Category::new(format!("Cat {index}"), format!("cat-{index}")))
            .unwrap();
    }

    let criteria = SearchCriteria::new()
        .with_filter(Filter::new("identifier", ConditionType::Like, "cat-%"))
        .paged(2, 2);
    let page = repo.search_categories(&criteria, &[]).unwrap();
    assert_eq!(page.total_count, 5);
    let names = page
        .rows
        .iter()
        .map(|category| category.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Cat 2", "Cat 3"]);

    let beyond = repo
        .search_categories(&SearchCriteria::new().paged(9, 2), &[])
        .unwrap();
    assert_eq!(beyond.total_count, 5);
    assert!(beyond.rows.is_empty());
}
