//! Author domain model.
//!
//! # Invariants
//! - `user_id` identifies the backing user and is unique per author.
//! - Posts belong to an author through their own `user_id`; an author
//!   never stores its post list.
//! - `is_view` gates every public-facing read.

use super::{require_text, EntityId, EntityKind, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Blog author profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Store-assigned id; `None` until first save.
    #[serde(default)]
    pub author_id: Option<EntityId>,
    /// Backing user id, also the key posts use to reference their author.
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
    /// Display name.
    pub nick_name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Media path relative to the media root.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Author bio.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_view: bool,
    /// Epoch milliseconds, assigned by storage.
    #[serde(default)]
    pub creation_time: Option<i64>,
    /// Epoch milliseconds, refreshed on every update.
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension_attributes: BTreeMap<String, Value>,
}

impl Author {
    /// Creates an unsaved, visible author for `user_id`.
    pub fn new(user_id: i64, nick_name: impl Into<String>) -> Self {
        Self {
            author_id: None,
            user_id,
            user_name: String::new(),
            nick_name: nick_name.into(),
            email: None,
            avatar: None,
            description: None,
            is_view: true,
            creation_time: None,
            update_time: None,
            extension_attributes: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id <= 0 {
            return Err(ValidationError::InvalidUserId(self.user_id));
        }
        require_text(EntityKind::Author, "nick_name", &self.nick_name)
    }
}

fn default_true() -> bool {
    true
}
