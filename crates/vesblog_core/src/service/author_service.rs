//! Author use-case service.
//!
//! # Invariants
//! - `get` attaches the author's published posts and an absolute avatar URL.
//! - `view` and the publish list only expose authors with `is_view` set.

use crate::model::author::Author;
use crate::model::{EntityId, EntityKind};
use crate::repo::author_repo::AuthorRepository;
use crate::repo::post_repo::PostRepository;
use crate::repo::{RepoError, RepoResult};
use crate::search::criteria::{Filter, SearchCriteria, SearchResults};
use crate::service::children::{ChildrenResolver, ChildrenSummary, ParentKind};
use crate::service::{delete_failed, present_author, save_failed, ServiceError, ServiceResult};
use crate::store::StoreManager;
use log::{debug, info};
use serde::Serialize;

/// Author with its published posts attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub posts: ChildrenSummary,
}

/// Author facade over author/post repositories and the store context.
pub struct AuthorService<A, P, S> {
    authors: A,
    posts: P,
    store: S,
}

impl<A: AuthorRepository, P: PostRepository, S: StoreManager> AuthorService<A, P, S> {
    pub fn new(authors: A, posts: P, store: S) -> Self {
        Self {
            authors,
            posts,
            store,
        }
    }

    /// Inserts or updates an author and returns the stored record.
    ///
    /// # Errors
    /// - `CouldNotSave` for validation or storage failures.
    pub fn save(&self, author: &Author) -> ServiceResult<Author> {
        let saved = self
            .persist(author)
            .map_err(|err| save_failed(EntityKind::Author, err))?;
        info!(
            "event=entity_save module=service status=ok kind=author id={}",
            saved.author_id.unwrap_or_default()
        );
        Ok(saved)
    }

    /// Loads an author with posts and absolute avatar URL.
    pub fn get(&self, author_id: EntityId) -> ServiceResult<AuthorDetail> {
        let author = self.load(author_id)?;
        let detail = self.enrich(author)?;
        debug!("event=entity_get module=service status=ok kind=author id={author_id}");
        Ok(detail)
    }

    /// Loads a publicly visible author.
    pub fn view(&self, author_id: EntityId) -> ServiceResult<Author> {
        let author = self.load(author_id)?;
        if !author.is_view {
            return Err(ServiceError::NotFound {
                kind: EntityKind::Author,
                id: author_id,
            });
        }
        Ok(present_author(&self.store.current_store(), author))
    }

    /// Lists authors matching `criteria`, each enriched like [`Self::get`].
    pub fn get_list(&self, criteria: &SearchCriteria) -> ServiceResult<SearchResults<AuthorDetail>> {
        let page = self.authors.search_authors(criteria, &[])?;
        let items = page
            .rows
            .into_iter()
            .map(|author| self.enrich(author))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(SearchResults {
            items,
            total_count: page.total_count,
            search_criteria: criteria.clone(),
        })
    }

    /// Lists visible authors in the `view` shape.
    pub fn get_publish_list(
        &self,
        criteria: &SearchCriteria,
    ) -> ServiceResult<SearchResults<Author>> {
        let page = self
            .authors
            .search_authors(criteria, &[Filter::eq("is_view", "1")])?;
        let store = self.store.current_store();
        Ok(SearchResults {
            items: page
                .rows
                .into_iter()
                .map(|author| present_author(&store, author))
                .collect(),
            total_count: page.total_count,
            search_criteria: criteria.clone(),
        })
    }

    /// Deletes the stored row behind `author`.
    ///
    /// # Errors
    /// - `CouldNotDelete` when the id is missing, the row is gone, or storage
    ///   fails.
    pub fn delete(&self, author: &Author) -> ServiceResult<bool> {
        self.remove(author)
            .map_err(|err| delete_failed(EntityKind::Author, err))?;
        info!(
            "event=entity_delete module=service status=ok kind=author id={}",
            author.author_id.unwrap_or_default()
        );
        Ok(true)
    }

    pub fn delete_by_id(&self, author_id: EntityId) -> ServiceResult<bool> {
        let detail = self.get(author_id)?;
        self.delete(&detail.author)
    }

    fn load(&self, author_id: EntityId) -> ServiceResult<Author> {
        self.authors
            .get_author(author_id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::Author,
                id: author_id,
            })
    }

    fn enrich(&self, author: Author) -> ServiceResult<AuthorDetail> {
        let store = self.store.current_store();
        let posts = ChildrenResolver::new(&self.posts, store.clone())
            .resolve_children(author.user_id, ParentKind::Author)?;
        Ok(AuthorDetail {
            author: present_author(&store, author),
            posts,
        })
    }

    fn persist(&self, author: &Author) -> RepoResult<Author> {
        let author_id = match author.author_id {
            Some(author_id) if self.authors.get_author(author_id)?.is_some() => {
                self.authors.update_author(author)?;
                author_id
            }
            _ => self.authors.insert_author(author)?,
        };
        self.authors
            .get_author(author_id)?
            .ok_or_else(|| RepoError::InvalidData("saved author missing on read-back".into()))
    }

    fn remove(&self, author: &Author) -> RepoResult<()> {
        let author_id = author.author_id.ok_or_else(|| {
            RepoError::InvalidData("author delete requires an author_id".to_string())
        })?;
        let stored = self
            .authors
            .get_author(author_id)?
            .ok_or(RepoError::NotFound {
                kind: EntityKind::Author,
                id: author_id,
            })?;
        self.authors
            .delete_author(stored.author_id.unwrap_or(author_id))
    }
}
