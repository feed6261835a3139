//! Post domain model.
//!
//! # Invariants
//! - `user_id` references the author's backing user, not `author_id`.
//! - `tags` are stored lowercase and deduplicated.
//! - `is_active` is the publish flag; unpublished posts never appear in
//!   child collections or public reads.

use super::{
    require_store_ids, require_text, require_url_key, visible_on_store, EntityId, EntityKind,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub post_id: Option<EntityId>,
    pub title: String,
    /// URL key, unique across posts.
    pub identifier: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub short_content: Option<String>,
    /// Media path relative to the media root.
    #[serde(default)]
    pub image: Option<String>,
    /// Media path relative to the media root.
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub category_ids: Vec<EntityId>,
    #[serde(default)]
    pub store_ids: Vec<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub related_post_ids: Vec<EntityId>,
    #[serde(default)]
    pub related_product_ids: Vec<i64>,
    /// Epoch milliseconds. Callers may backdate it on first save.
    #[serde(default)]
    pub creation_time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension_attributes: BTreeMap<String, Value>,
}

impl Post {
    /// Creates an unsaved, published post visible on all stores.
    pub fn new(title: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            post_id: None,
            title: title.into(),
            identifier: identifier.into(),
            content: String::new(),
            short_content: None,
            image: None,
            thumbnail: None,
            user_id: None,
            category_ids: Vec::new(),
            store_ids: Vec::new(),
            tags: Vec::new(),
            is_active: true,
            related_post_ids: Vec::new(),
            related_product_ids: Vec::new(),
            creation_time: None,
            update_time: None,
            extension_attributes: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Post, "title", &self.title)?;
        require_url_key(EntityKind::Post, &self.identifier)?;
        require_store_ids(EntityKind::Post, &self.store_ids)?;
        if let Some(user_id) = self.user_id {
            if user_id <= 0 {
                return Err(ValidationError::InvalidUserId(user_id));
            }
        }
        Ok(())
    }

    pub fn is_visible_on_store(&self, store_id: i64) -> bool {
        visible_on_store(&self.store_ids, store_id)
    }
}

/// Normalizes tag names: trimmed, lowercase, deduplicated, sorted.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn default_true() -> bool {
    true
}
