//! Category domain model.
//!
//! # Invariants
//! - `post_ids` is the ordered association list the category owns; order is
//!   the display order of its posts.
//! - `store_ids` empty or containing store `0` means "all stores".

use super::{
    require_store_ids, require_text, require_url_key, visible_on_store, EntityId, EntityKind,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Blog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub category_id: Option<EntityId>,
    pub name: String,
    /// URL key, unique across categories.
    pub identifier: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub store_ids: Vec<i64>,
    #[serde(default)]
    pub post_ids: Vec<EntityId>,
    #[serde(default)]
    pub creation_time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension_attributes: BTreeMap<String, Value>,
}

impl Category {
    /// Creates an unsaved, active category visible on all stores.
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            category_id: None,
            name: name.into(),
            identifier: identifier.into(),
            description: None,
            is_active: true,
            position: 0,
            store_ids: Vec::new(),
            post_ids: Vec::new(),
            creation_time: None,
            update_time: None,
            extension_attributes: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Category, "name", &self.name)?;
        require_url_key(EntityKind::Category, &self.identifier)?;
        require_store_ids(EntityKind::Category, &self.store_ids)
    }

    pub fn is_visible_on_store(&self, store_id: i64) -> bool {
        visible_on_store(&self.store_ids, store_id)
    }
}

fn default_true() -> bool {
    true
}
