//! Blog use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into get/view/save/delete/list operations
//!   per entity kind.
//! - Apply existence and visibility checks and media URL rewriting before
//!   anything leaves the core.
//!
//! # Invariants
//! - A hidden entity and a missing entity produce the same `NotFound` error.
//! - Storage failures are never reported as `NotFound`.
//! - Nothing is cached between calls; every call re-reads storage.

use crate::model::author::Author;
use crate::model::post::Post;
use crate::model::{EntityId, EntityKind};
use crate::repo::author_repo::SqliteAuthorRepository;
use crate::repo::category_repo::SqliteCategoryRepository;
use crate::repo::post_repo::SqlitePostRepository;
use crate::repo::{RepoError, RepoResult};
use crate::store::{StoreInfo, StoreManager};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod author_service;
pub mod category_service;
pub mod children;
pub mod post_service;

use author_service::AuthorService;
use category_service::CategoryService;
use post_service::PostService;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error for blog operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Entity is absent or not visible to the caller.
    NotFound { kind: EntityKind, id: EntityId },
    CouldNotSave { kind: EntityKind, reason: String },
    CouldNotDelete { kind: EntityKind, reason: String },
    /// Typed post listing received an unknown type or malformed term.
    InvalidListRequest(String),
    /// Unclassified storage failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => {
                write!(f, "{} with id \"{id}\" does not exist.", kind.label())
            }
            Self::CouldNotSave { kind, reason } => write!(f, "Could not save the {kind}: {reason}"),
            Self::CouldNotDelete { kind, reason } => {
                write!(f, "Could not delete the {kind}: {reason}")
            }
            Self::InvalidListRequest(message) => write!(f, "invalid post list request: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Repo(other),
        }
    }
}

/// SQLite-backed service bundle sharing one connection and store context.
pub struct BlogServices<'conn, S> {
    authors: SqliteAuthorRepository<'conn>,
    categories: SqliteCategoryRepository<'conn>,
    posts: SqlitePostRepository<'conn>,
    store: S,
}

impl<'conn, S: StoreManager> BlogServices<'conn, S> {
    /// Binds repositories to a migrated connection.
    pub fn try_new(conn: &'conn Connection, store: S) -> RepoResult<Self> {
        Ok(Self {
            authors: SqliteAuthorRepository::try_new(conn)?,
            categories: SqliteCategoryRepository::try_new(conn)?,
            posts: SqlitePostRepository::try_new(conn)?,
            store,
        })
    }

    pub fn authors(
        &self,
    ) -> AuthorService<SqliteAuthorRepository<'conn>, SqlitePostRepository<'conn>, &S> {
        AuthorService::new(self.authors, self.posts, &self.store)
    }

    pub fn categories(
        &self,
    ) -> CategoryService<SqliteCategoryRepository<'conn>, SqlitePostRepository<'conn>, &S> {
        CategoryService::new(self.categories, self.posts, &self.store)
    }

    pub fn posts(
        &self,
    ) -> PostService<SqlitePostRepository<'conn>, SqliteAuthorRepository<'conn>, &S> {
        PostService::new(self.posts, self.authors, &self.store)
    }
}

pub(crate) fn present_author(store: &StoreInfo, mut author: Author) -> Author {
    author.avatar = store.rewrite_media(author.avatar.take());
    author
}

pub(crate) fn present_post(store: &StoreInfo, mut post: Post) -> Post {
    post.image = store.rewrite_media(post.image.take());
    post.thumbnail = store.rewrite_media(post.thumbnail.take());
    post
}

/// Maps a failed write into the caller-facing save error.
pub(crate) fn save_failed(kind: EntityKind, err: impl Display) -> ServiceError {
    log::error!("event=entity_save module=service status=error kind={kind} error={err}");
    ServiceError::CouldNotSave {
        kind,
        reason: err.to_string(),
    }
}

/// Maps a failed delete into the caller-facing delete error.
pub(crate) fn delete_failed(kind: EntityKind, err: impl Display) -> ServiceError {
    log::error!("event=entity_delete module=service status=error kind={kind} error={err}");
    ServiceError::CouldNotDelete {
        kind,
        reason: err.to_string(),
    }
}
