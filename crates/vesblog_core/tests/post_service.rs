use rusqlite::Connection;
use serde_json::json;
use vesblog_core::db::open_db_in_memory;
use vesblog_core::{
    Author, BlogServices, Category, EntityKind, Filter, Post, PostRepository, SearchCriteria,
    ServiceError, SortDirection, SqlitePostRepository, StaticStoreManager,
};

const MARCH_2024_MS: i64 = 1_710_460_800_000;
const APRIL_2024_MS: i64 = 1_712_707_200_000;
const DECEMBER_2023_MS: i64 = 1_703_030_400_000;

fn services(conn: &Connection) -> BlogServices<'_, StaticStoreManager> {
    BlogServices::try_new(conn, StaticStoreManager::new(1, "https://shop.test/")).unwrap()
}

fn post_at(key: &str, creation_time: i64) -> Post {
    let mut post = Post::new(format!("Post {key}"), key);
    post.creation_time = Some(creation_time);
    post
}

fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().map(|post| post.post_id.unwrap()).collect()
}

#[test]
fn get_attaches_author_and_rewrites_media() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut author = Author::new(7, "John");
    author.avatar = Some("john.png".to_string());
    services.authors().save(&author).unwrap();

    let mut post = Post::new("Launch", "launch");
    post.user_id = Some(7);
    post.image = Some("posts/launch.jpg".to_string());
    post.thumbnail = Some("https://cdn.test/thumb.jpg".to_string());
    let post_id = services.posts().save(&post).unwrap().post_id.unwrap();

    let detail = services.posts().get(post_id).unwrap();
    assert_eq!(
        detail.post.image.as_deref(),
        Some("https://shop.test/media/posts/launch.jpg")
    );
    assert_eq!(
        detail.post.thumbnail.as_deref(),
        Some("https://cdn.test/thumb.jpg")
    );
    let attached = detail.author.unwrap();
    assert_eq!(attached.nick_name, "John");
    assert_eq!(
        attached.avatar.as_deref(),
        Some("https://shop.test/media/john.png")
    );

    let wire = serde_json::to_value(services.posts().get(post_id).unwrap()).unwrap();
    assert_eq!(wire["identifier"], json!("launch"));
    assert_eq!(wire["author"]["user_id"], json!(7));
}

#[test]
fn get_without_author_leaves_author_empty() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut orphan = Post::new("Orphan", "orphan");
    orphan.user_id = Some(99);
    let orphan_id = services.posts().save(&orphan).unwrap().post_id.unwrap();
    let anonymous_id = services
        .posts()
        .save(&Post::new("Anonymous", "anonymous"))
        .unwrap()
        .post_id
        .unwrap();

    assert!(services.posts().get(orphan_id).unwrap().author.is_none());
    assert!(services.posts().get(anonymous_id).unwrap().author.is_none());
}

#[test]
fn get_missing_post_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let err = services.posts().get(31).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            kind: EntityKind::Post,
            id: 31
        }
    ));
    assert_eq!(err.to_string(), "Post with id \"31\" does not exist.");
}

#[test]
fn view_applies_publish_flag_and_store_rule() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut scoped = Post::new("Scoped", "scoped");
    scoped.store_ids = vec![2, 3];
    let scoped_id = services.posts().save(&scoped).unwrap().post_id.unwrap();
    let mut draft = Post::new("Draft", "draft");
    draft.is_active = false;
    let draft_id = services.posts().save(&draft).unwrap().post_id.unwrap();

    assert!(services.posts().view(scoped_id, Some(3)).is_ok());
    assert!(services.posts().view(scoped_id, None).is_ok());
    assert!(matches!(
        services.posts().view(scoped_id, Some(1)),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        services.posts().view(draft_id, None),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn save_persists_tags_and_relations() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let related_id = services
        .posts()
        .save(&Post::new("Related", "related"))
        .unwrap()
        .post_id
        .unwrap();

    let mut post = Post::new("Rich", "rich");
    post.tags = vec!["Rust".to_string(), " rust ".to_string(), "SQLite".to_string()];
    post.related_post_ids = vec![related_id, related_id];
    post.related_product_ids = vec![30, 10];
    post.extension_attributes
        .insert("seo_title".to_string(), json!("Rich post"));
    let saved = services.posts().save(&post).unwrap();

    assert_eq!(saved.tags, vec!["rust", "sqlite"]);
    assert_eq!(saved.related_post_ids, vec![related_id]);
    assert_eq!(saved.related_product_ids, vec![30, 10]);
    assert_eq!(
        saved.extension_attributes.get("seo_title"),
        Some(&json!("Rich post"))
    );

    services.posts().delete_by_id(related_id).unwrap();
    let reloaded = services.posts().get(saved.post_id.unwrap()).unwrap().post;
    assert!(reloaded.related_post_ids.is_empty());
}

#[test]
fn save_with_dangling_relation_is_could_not_save() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut post = Post::new("Dangling", "dangling");
    post.related_post_ids = vec![404];
    let err = services.posts().save(&post).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::CouldNotSave {
            kind: EntityKind::Post,
            ..
        }
    ));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM posts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn update_fields_merges_patch_over_stored_post() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut post = Post::new("Before", "before");
    post.content = "body".to_string();
    post.tags = vec!["keep".to_string()];
    post.extension_attributes
        .insert("views".to_string(), json!(1));
    let post_id = services.posts().save(&post).unwrap().post_id.unwrap();

    let patch = json!({
        "title": "After",
        "post_id": 999,
        "extension_attributes": { "featured": true }
    });
    let updated = services
        .posts()
        .update_fields(post_id, patch.as_object().unwrap())
        .unwrap();

    assert_eq!(updated.post_id, Some(post_id));
    assert_eq!(updated.title, "After");
    assert_eq!(updated.content, "body");
    assert_eq!(updated.tags, vec!["keep"]);
    assert_eq!(updated.extension_attributes.get("views"), Some(&json!(1)));
    assert_eq!(updated.extension_attributes.get("featured"), Some(&json!(true)));

    let odd_id = json!({ "post_id": "x", "title": "Renamed" });
    let renamed = services
        .posts()
        .update_fields(post_id, odd_id.as_object().unwrap())
        .unwrap();
    assert_eq!(renamed.post_id, Some(post_id));
    assert_eq!(renamed.title, "Renamed");

    let bad = json!({ "title": 5 });
    assert!(matches!(
        services.posts().update_fields(post_id, bad.as_object().unwrap()),
        Err(ServiceError::CouldNotSave { .. })
    ));
    assert!(matches!(
        services.posts().update_fields(12345, patch.as_object().unwrap()),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn delete_removes_post_from_children() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut post = Post::new("Temp", "temp");
    post.user_id = Some(4);
    let post_id = services.posts().save(&post).unwrap().post_id.unwrap();
    let author_id = services
        .authors()
        .save(&Author::new(4, "Owner"))
        .unwrap()
        .author_id
        .unwrap();
    assert_eq!(services.authors().get(author_id).unwrap().posts.total_count, 1);

    assert!(services.posts().delete_by_id(post_id).unwrap());
    assert_eq!(services.authors().get(author_id).unwrap().posts.total_count, 0);
    assert!(matches!(
        services.posts().delete(&post),
        Err(ServiceError::CouldNotDelete { .. })
    ));
}

#[test]
fn publish_list_hides_drafts() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    for (key, active) in [("a", true), ("b", false), ("c", true)] {
        let mut post = Post::new(format!("Post {key}"), key);
        post.is_active = active;
        post.image = Some(format!("{key}.png"));
        services.posts().save(&post).unwrap();
    }

    let criteria = SearchCriteria::new().sorted_by("identifier", SortDirection::Desc);
    let all = services.posts().get_list(&criteria).unwrap();
    assert_eq!(all.total_count, 3);
    assert_eq!(all.items[0].post.identifier, "c");

    let public = services.posts().get_publish_list(&criteria).unwrap();
    assert_eq!(public.total_count, 2);
    let keys = public
        .items
        .iter()
        .map(|post| post.identifier.as_str())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["c", "a"]);
    assert_eq!(
        public.items[1].image.as_deref(),
        Some("https://shop.test/media/a.png")
    );

    let drafts_only = SearchCriteria::new().with_filter(Filter::eq("is_active", "0"));
    assert_eq!(
        services.posts().get_publish_list(&drafts_only).unwrap().total_count,
        0
    );
}

#[test]
fn list_by_archive_selects_month_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let march = services.posts().save(&post_at("march", MARCH_2024_MS)).unwrap();
    let late_march = services
        .posts()
        .save(&post_at("late-march", MARCH_2024_MS + 86_400_000))
        .unwrap();
    services.posts().save(&post_at("april", APRIL_2024_MS)).unwrap();
    services
        .posts()
        .save(&post_at("december", DECEMBER_2023_MS))
        .unwrap();

    let page = services
        .posts()
        .list_by_type("archive", "2024-03", 1, 1, 10)
        .unwrap();
    assert_eq!(page.total_number, 2);
    assert_eq!(
        ids(&page.posts),
        vec![late_march.post_id.unwrap(), march.post_id.unwrap()]
    );
    assert_eq!(page.current_page, 1);
    assert_eq!(page.last_page, 1);

    assert!(matches!(
        services.posts().list_by_type("archive", "2024-13", 1, 1, 10),
        Err(ServiceError::InvalidListRequest(_))
    ));
}

#[test]
fn list_by_author_category_and_tag() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let category_id = services
        .categories()
        .save(&Category::new("Tips", "tips"))
        .unwrap()
        .category_id
        .unwrap();

    let mut by_author = post_at("by-author", MARCH_2024_MS);
    by_author.user_id = Some(5);
    by_author.tags = vec!["Rust".to_string()];
    let by_author = services.posts().save(&by_author).unwrap().post_id.unwrap();

    let mut in_category = post_at("in-category", APRIL_2024_MS);
    in_category.category_ids = vec![category_id];
    let in_category = services.posts().save(&in_category).unwrap().post_id.unwrap();

    let mut hidden = post_at("hidden", APRIL_2024_MS);
    hidden.user_id = Some(5);
    hidden.category_ids = vec![category_id];
    hidden.tags = vec!["rust".to_string()];
    hidden.is_active = false;
    services.posts().save(&hidden).unwrap();

    let posts = services.posts();
    assert_eq!(
        ids(&posts.list_by_type("author", "5", 1, 1, 10).unwrap().posts),
        vec![by_author]
    );
    assert_eq!(
        ids(&posts
            .list_by_type("category", &category_id.to_string(), 1, 1, 10)
            .unwrap()
            .posts),
        vec![in_category]
    );
    assert_eq!(
        ids(&posts.list_by_type("tag", "RUST", 1, 1, 10).unwrap().posts),
        vec![by_author]
    );
    assert!(matches!(
        posts.list_by_type("category", "tips", 1, 1, 10),
        Err(ServiceError::InvalidListRequest(_))
    ));
}

#[test]
fn list_by_search_matches_text_literally() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut sale = post_at("sale", MARCH_2024_MS);
    sale.content = "Everything is 50% off today".to_string();
    let sale = services.posts().save(&sale).unwrap().post_id.unwrap();

    let mut other = post_at("other", APRIL_2024_MS);
    other.short_content = Some("Now 500 items".to_string());
    services.posts().save(&other).unwrap();

    let page = services
        .posts()
        .list_by_type("search", "50%", 1, 1, 10)
        .unwrap();
    assert_eq!(ids(&page.posts), vec![sale]);

    let both = services
        .posts()
        .list_by_type("search", "Post", 1, 1, 10)
        .unwrap();
    assert_eq!(both.total_number, 2);
}

#[test]
fn list_latest_pages_and_respects_store() {
    let conn = open_db_in_memory().unwrap();
    let services = services(&conn);

    let mut created = Vec::new();
    for index in 0..5 {
        let post = post_at(&format!("p{index}"), MARCH_2024_MS + index * 1000);
        created.push(services.posts().save(&post).unwrap().post_id.unwrap());
    }
    let mut elsewhere = post_at("elsewhere", APRIL_2024_MS);
    elsewhere.store_ids = vec![2];
    services.posts().save(&elsewhere).unwrap();

    let posts = services.posts();
    let first = posts.list_by_type("latest", "", 1, 0, 2).unwrap();
    assert_eq!(first.total_number, 5);
    assert_eq!(first.current_page, 1);
    assert_eq!(first.last_page, 3);
    assert_eq!(ids(&first.posts), vec![created[4], created[3]]);

    let last = posts.list_by_type("latest", "desc", 1, 3, 2).unwrap();
    assert_eq!(ids(&last.posts), vec![created[0]]);

    let oldest = posts.list_by_type("latest", "asc", 1, 1, 1).unwrap();
    assert_eq!(ids(&oldest.posts), vec![created[0]]);

    let beyond = posts.list_by_type("latest", "", 1, 9, 2).unwrap();
    assert!(beyond.posts.is_empty());
    assert_eq!(beyond.total_number, 5);

    let other_store = posts.list_by_type("latest", "", 2, 1, 10).unwrap();
    assert_eq!(other_store.total_number, 6);

    assert!(matches!(
        posts.list_by_type("popular", "", 1, 1, 10),
        Err(ServiceError::InvalidListRequest(_))
    ));
}

#[test]
fn repository_reports_active_children() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut active = Post::new("Active", "active");
    active.user_id = Some(2);
    let active_id = repo.insert_post(&active).unwrap();
    let mut inactive = Post::new("Inactive", "inactive");
    inactive.user_id = Some(2);
    inactive.is_active = false;
    repo.insert_post(&inactive).unwrap();

    assert_eq!(repo.active_post_ids_by_user(2).unwrap(), vec![active_id]);
    assert!(repo.active_post_ids_by_user(3).unwrap().is_empty());
}
