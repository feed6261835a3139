//! Core data access for the Vesblog content system.
//! This crate owns storage, visibility rules and caller-facing errors for
//! authors, categories and posts.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use config::{BlogConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::author::Author;
pub use model::category::Category;
pub use model::post::Post;
pub use model::{EntityId, EntityKind, ValidationError, ALL_STORES};
pub use repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::post_repo::{PostListFilter, PostListQuery, PostRepository, SqlitePostRepository};
pub use repo::{Page, RepoError, RepoResult};
pub use search::criteria::{
    ConditionType, CriteriaError, Filter, FilterGroup, SearchCriteria, SearchResults,
    SortDirection, SortOrder,
};
pub use service::author_service::{AuthorDetail, AuthorService};
pub use service::category_service::{CategoryDetail, CategoryService};
pub use service::children::{ChildrenResolver, ChildrenSummary, ParentKind};
pub use service::post_service::{PostDetail, PostPage, PostService};
pub use service::{BlogServices, ServiceError, ServiceResult};
pub use store::{StaticStoreManager, StoreInfo, StoreManager};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
