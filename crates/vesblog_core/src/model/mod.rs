//! Blog domain model: authors, categories and posts.
//!
//! # Responsibility
//! - Define the typed records that repositories persist and services return.
//! - Own per-entity write validation.
//!
//! # Invariants
//! - Every persisted entity is identified by a store-assigned integer id.
//! - Media fields (`avatar`, `image`, `thumbnail`) hold paths relative to the
//!   media root; absolute URLs only appear in outward-facing responses.
//! - Unknown fields survive round trips through `extension_attributes`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod author;
pub mod category;
pub mod post;
pub mod wire;

static URL_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid url key regex"));

/// Store-assigned primary key shared by all blog entities.
pub type EntityId = i64;

/// Store id that makes a store-scoped entity visible everywhere.
pub const ALL_STORES: i64 = 0;

/// The three entity kinds managed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Author,
    Category,
    Post,
}

impl EntityKind {
    /// Capitalized label used in caller-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::Category => "Category",
            Self::Post => "Post",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Author => "author",
            Self::Category => "category",
            Self::Post => "post",
        })
    }
}

/// Write-time validation failure for a blog entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    EmptyField {
        kind: EntityKind,
        field: &'static str,
    },
    /// A URL key contains characters outside `[a-z0-9_-]`.
    InvalidIdentifier { kind: EntityKind, value: String },
    /// `user_id` must reference a real user.
    InvalidUserId(i64),
    /// Store ids are non-negative.
    InvalidStoreId { kind: EntityKind, store_id: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { kind, field } => write!(f, "{kind} field `{field}` cannot be empty"),
            Self::InvalidIdentifier { kind, value } => write!(
                f,
                "{kind} identifier `{value}` must match [a-z0-9][a-z0-9_-]*"
            ),
            Self::InvalidUserId(user_id) => write!(f, "invalid author user_id `{user_id}`"),
            Self::InvalidStoreId { kind, store_id } => {
                write!(f, "invalid {kind} store id `{store_id}`")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    kind: EntityKind,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { kind, field });
    }
    Ok(())
}

pub(crate) fn require_url_key(kind: EntityKind, value: &str) -> Result<(), ValidationError> {
    if !URL_KEY_RE.is_match(value) {
        return Err(ValidationError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_store_ids(kind: EntityKind, store_ids: &[i64]) -> Result<(), ValidationError> {
    match store_ids.iter().find(|store_id| **store_id < 0) {
        Some(store_id) => Err(ValidationError::InvalidStoreId {
            kind,
            store_id: *store_id,
        }),
        None => Ok(()),
    }
}

/// Store visibility rule shared by categories and posts.
///
/// An empty rule, or one containing [`ALL_STORES`], admits every store.
pub fn visible_on_store(store_ids: &[i64], store_id: i64) -> bool {
    store_ids.is_empty() || store_ids.iter().any(|id| *id == ALL_STORES || *id == store_id)
}

#[cfg(test)]
mod tests {
    use super::{require_url_key, visible_on_store, EntityKind, ValidationError};

    #[test]
    fn url_key_accepts_slugs_and_rejects_spaces() {
        assert!(require_url_key(EntityKind::Post, "hello-world_2").is_ok());
        assert!(matches!(
            require_url_key(EntityKind::Post, "Hello World"),
            Err(ValidationError::InvalidIdentifier { .. })
        ));
        assert!(require_url_key(EntityKind::Category, "-leading").is_err());
    }

    #[test]
    fn store_rule_admits_all_stores_marker() {
        assert!(visible_on_store(&[], 3));
        assert!(visible_on_store(&[0], 3));
        assert!(visible_on_store(&[1, 3], 3));
        assert!(!visible_on_store(&[1, 2], 3));
    }
}
