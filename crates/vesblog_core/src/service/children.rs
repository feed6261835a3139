//! Related-collection enrichment.
//!
//! Resolves the published posts attached to an author or category. The id
//! query only selects keys; every child is then loaded through a point
//! lookup so the summary always carries full records.

use crate::model::post::Post;
use crate::model::EntityId;
use crate::repo::post_repo::PostRepository;
use crate::repo::RepoResult;
use crate::service::present_post;
use crate::store::StoreInfo;
use log::debug;
use serde::Serialize;

/// Parent side of a child-post relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    /// Key is the author's `user_id`, which posts reference.
    Author,
    /// Key is the `category_id`.
    Category,
}

/// Active child posts of one parent, in query order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChildrenSummary {
    pub total_count: u64,
    pub items: Vec<Post>,
}

/// Read-only resolver over a post repository.
pub struct ChildrenResolver<'a, P> {
    posts: &'a P,
    store: StoreInfo,
}

impl<'a, P: PostRepository> ChildrenResolver<'a, P> {
    pub fn new(posts: &'a P, store: StoreInfo) -> Self {
        Self { posts, store }
    }

    /// Collects the active posts of a parent.
    ///
    /// Inactive posts are left out. A parent without posts yields an empty
    /// summary; storage failures propagate.
    pub fn resolve_children(
        &self,
        parent_key: EntityId,
        parent_kind: ParentKind,
    ) -> RepoResult<ChildrenSummary> {
        let child_ids = match parent_kind {
            ParentKind::Author => self.posts.active_post_ids_by_user(parent_key)?,
            ParentKind::Category => self.posts.active_post_ids_in_category(parent_key)?,
        };

        let mut items = Vec::with_capacity(child_ids.len());
        for post_id in child_ids {
            if let Some(post) = self.posts.get_post(post_id)? {
                items.push(present_post(&self.store, post));
            }
        }

        debug!(
            "event=resolve_children module=service status=ok parent_kind={parent_kind:?} parent_key={parent_key} count={}",
            items.len()
        );
        Ok(ChildrenSummary {
            total_count: items.len() as u64,
            items,
        })
    }
}
