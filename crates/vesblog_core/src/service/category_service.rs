//! Category use-case service.
//!
//! # Invariants
//! - `get` attaches the category's published posts in association order.
//! - `view` hides inactive categories and, when a store is given,
//!   categories not enabled for it.

use crate::model::category::Category;
use crate::model::{EntityId, EntityKind};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::post_repo::PostRepository;
use crate::repo::{RepoError, RepoResult};
use crate::search::criteria::{Filter, SearchCriteria, SearchResults};
use crate::service::children::{ChildrenResolver, ChildrenSummary, ParentKind};
use crate::service::{delete_failed, save_failed, ServiceError, ServiceResult};
use crate::store::StoreManager;
use log::{debug, info};
use serde::Serialize;

/// Category with its published posts attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub posts: ChildrenSummary,
}

/// Category facade over category/post repositories and the store context.
pub struct CategoryService<C, P, S> {
    categories: C,
    posts: P,
    store: S,
}

impl<C: CategoryRepository, P: PostRepository, S: StoreManager> CategoryService<C, P, S> {
    pub fn new(categories: C, posts: P, store: S) -> Self {
        Self {
            categories,
            posts,
            store,
        }
    }

    pub fn save(&self, category: &Category) -> ServiceResult<Category> {
        let saved = self
            .persist(category)
            .map_err(|err| save_failed(EntityKind::Category, err))?;
        info!(
            "event=entity_save module=service status=ok kind=category id={}",
            saved.category_id.unwrap_or_default()
        );
        Ok(saved)
    }

    pub fn get(&self, category_id: EntityId) -> ServiceResult<CategoryDetail> {
        let category = self.load(category_id)?;
        let detail = self.enrich(category)?;
        debug!("event=entity_get module=service status=ok kind=category id={category_id}");
        Ok(detail)
    }

    /// Loads a category that is active and, if `store_id` is given, enabled
    /// for that store.
    pub fn view(&self, category_id: EntityId, store_id: Option<i64>) -> ServiceResult<Category> {
        let category = self.load(category_id)?;
        let store_allows = store_id.map_or(true, |store_id| category.is_visible_on_store(store_id));
        if !category.is_active || !store_allows {
            return Err(ServiceError::NotFound {
                kind: EntityKind::Category,
                id: category_id,
            });
        }
        Ok(category)
    }

    pub fn get_list(
        &self,
        criteria: &SearchCriteria,
    ) -> ServiceResult<SearchResults<CategoryDetail>> {
        let page = self.categories.search_categories(criteria, &[])?;
        let items = page
            .rows
            .into_iter()
            .map(|category| self.enrich(category))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(SearchResults {
            items,
            total_count: page.total_count,
            search_criteria: criteria.clone(),
        })
    }

    /// Lists active categories in the `view` shape.
    pub fn get_publish_list(
        &self,
        criteria: &SearchCriteria,
    ) -> ServiceResult<SearchResults<Category>> {
        let page = self
            .categories
            .search_categories(criteria, &[Filter::eq("is_active", "1")])?;
        Ok(SearchResults {
            items: page.rows,
            total_count: page.total_count,
            search_criteria: criteria.clone(),
        })
    }

    pub fn delete(&self, category: &Category) -> ServiceResult<bool> {
        self.remove(category)
            .map_err(|err| delete_failed(EntityKind::Category, err))?;
        info!(
            "event=entity_delete module=service status=ok kind=category id={}",
            category.category_id.unwrap_or_default()
        );
        Ok(true)
    }

    pub fn delete_by_id(&self, category_id: EntityId) -> ServiceResult<bool> {
        let detail = self.get(category_id)?;
        self.delete(&detail.category)
    }

    fn load(&self, category_id: EntityId) -> ServiceResult<Category> {
        self.categories
            .get_category(category_id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::Category,
                id: category_id,
            })
    }

    fn enrich(&self, category: Category) -> ServiceResult<CategoryDetail> {
        let category_id = category.category_id.unwrap_or_default();
        let posts = ChildrenResolver::new(&self.posts, self.store.current_store())
            .resolve_children(category_id, ParentKind::Category)?;
        Ok(CategoryDetail { category, posts })
    }

    fn persist(&self, category: &Category) -> RepoResult<Category> {
        let category_id = match category.category_id {
            Some(category_id) if self.categories.get_category(category_id)?.is_some() => {
                self.categories.update_category(category)?;
                category_id
            }
            _ => self.categories.insert_category(category)?,
        };
        self.categories
            .get_category(category_id)?
            .ok_or_else(|| RepoError::InvalidData("saved category missing on read-back".into()))
    }

    fn remove(&self, category: &Category) -> RepoResult<()> {
        let category_id = category.category_id.ok_or_else(|| {
            RepoError::InvalidData("category delete requires a category_id".to_string())
        })?;
        let stored = self
            .categories
            .get_category(category_id)?
            .ok_or(RepoError::NotFound {
                kind: EntityKind::Category,
                id: category_id,
            })?;
        self.categories
            .delete_category(stored.category_id.unwrap_or(category_id))
    }
}
