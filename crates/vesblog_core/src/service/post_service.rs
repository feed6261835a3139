//! Post use-case service.
//!
//! # Responsibility
//! - CRUD and list facade for posts, with author attachment and absolute
//!   media URLs.
//! - Typed public listings (`archive`, `author`, `category`, `search`,
//!   `tag`, `latest`) with page metadata.
//! - Partial updates from wire field patches.
//!
//! # Invariants
//! - Storage failures never collapse into `NotFound`.
//! - Public reads only return published posts enabled for the store.

use crate::model::author::Author;
use crate::model::post::Post;
use crate::model::wire::merge_patch;
use crate::model::{EntityId, EntityKind};
use crate::repo::author_repo::AuthorRepository;
use crate::repo::post_repo::{PostListFilter, PostListQuery, PostRepository};
use crate::repo::{RepoError, RepoResult};
use crate::search::criteria::{Filter, SearchCriteria, SearchResults};
use crate::service::{
    delete_failed, present_author, present_post, save_failed, ServiceError, ServiceResult,
};
use crate::store::{StoreInfo, StoreManager};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

const POSTS_DEFAULT_LIMIT: u32 = 10;
const POSTS_LIMIT_MAX: u32 = 100;
const ARCHIVE_MIN_YEAR: i32 = 1970;

static ARCHIVE_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("valid archive term regex"));

/// Post with its author attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<Author>,
}

/// One page of a typed public listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_number: u64,
    pub current_page: u32,
    pub last_page: u32,
}

/// Post facade over post/author repositories and the store context.
pub struct PostService<P, A, S> {
    posts: P,
    authors: A,
    store: S,
}

impl<P: PostRepository, A: AuthorRepository, S: StoreManager> PostService<P, A, S> {
    pub fn new(posts: P, authors: A, store: S) -> Self {
        Self {
            posts,
            authors,
            store,
        }
    }

    pub fn save(&self, post: &Post) -> ServiceResult<Post> {
        let saved = self
            .persist(post)
            .map_err(|err| save_failed(EntityKind::Post, err))?;
        info!(
            "event=entity_save module=service status=ok kind=post id={}",
            saved.post_id.unwrap_or_default()
        );
        Ok(saved)
    }

    /// Merges `patch` over the stored post and saves the result.
    ///
    /// The post id is fixed by `post_id`; a patched id is ignored.
    pub fn update_fields(
        &self,
        post_id: EntityId,
        patch: &Map<String, Value>,
    ) -> ServiceResult<Post> {
        let existing = self.load(post_id)?;
        let mut patch = patch.clone();
        patch.remove("post_id");
        let merged =
            merge_patch(&existing, &patch).map_err(|err| save_failed(EntityKind::Post, err))?;
        self.save(&merged)
    }

    /// Loads a post with its author and absolute media URLs.
    pub fn get(&self, post_id: EntityId) -> ServiceResult<PostDetail> {
        let post = self.load(post_id)?;
        let detail = self.enrich(&self.store.current_store(), post)?;
        debug!("event=entity_get module=service status=ok kind=post id={post_id}");
        Ok(detail)
    }

    /// Loads a published post, optionally checking store visibility.
    pub fn view(&self, post_id: EntityId, store_id: Option<i64>) -> ServiceResult<Post> {
        let post = self.load(post_id)?;
        let store_allows = store_id.map_or(true, |store_id| post.is_visible_on_store(store_id));
        if !post.is_active || !store_allows {
            return Err(ServiceError::NotFound {
                kind: EntityKind::Post,
                id: post_id,
            });
        }
        Ok(present_post(&self.store.current_store(), post))
    }

    pub fn get_list(&self, criteria: &SearchCriteria) -> ServiceResult<SearchResults<PostDetail>> {
        let page = self.posts.search_posts(criteria, &[])?;
        let store = self.store.current_store();
        let items = page
            .rows
            .into_iter()
            .map(|post| self.enrich(&store, post))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(SearchResults {
            items,
            total_count: page.total_count,
            search_criteria: criteria.clone(),
        })
    }

    /// Lists published posts in the `view` shape.
    pub fn get_publish_list(&self, criteria: &SearchCriteria) -> ServiceResult<SearchResults<Post>> {
        let page = self
            .posts
            .search_posts(criteria, &[Filter::eq("is_active", "1")])?;
        let store = self.store.current_store();
        Ok(SearchResults {
            items: page
                .rows
                .into_iter()
                .map(|post| present_post(&store, post))
                .collect(),
            total_count: page.total_count,
            search_criteria: criteria.clone(),
        })
    }

    /// Lists published posts of `store_id` by listing type.
    ///
    /// # Contract
    /// - `archive`: term `YYYY-MM`, year >= 1970, month 1..=12.
    /// - `author`: term is the author's user id.
    /// - `category`: term is the category id.
    /// - `search`: non-empty text matched in title, short content or content.
    /// - `tag`: tag name, case-insensitive.
    /// - `latest`: term `asc` or `desc`; anything else means `desc`.
    /// - `page` 0 means 1; `limit` 0 means 10 and is capped at 100.
    ///
    /// # Errors
    /// - `InvalidListRequest` for an unknown type or malformed term.
    pub fn list_by_type(
        &self,
        list_type: &str,
        term: &str,
        store_id: i64,
        page: u32,
        limit: u32,
    ) -> ServiceResult<PostPage> {
        let (filter, newest_first) = parse_list_request(list_type, term)?;
        let limit = normalize_limit(limit);
        let current_page = page.max(1);
        let query = PostListQuery {
            filter,
            store_id: Some(store_id),
            newest_first,
            limit,
            offset: (current_page - 1).saturating_mul(limit),
        };

        let result = self.posts.list_posts(&query)?;
        let store = self.store.current_store();
        let last_page = u32::try_from(result.total_count.div_ceil(u64::from(limit)))
            .unwrap_or(u32::MAX)
            .max(1);
        debug!(
            "event=post_list module=service status=ok list_type={list_type} store_id={store_id} total={}",
            result.total_count
        );

        Ok(PostPage {
            posts: result
                .rows
                .into_iter()
                .map(|post| present_post(&store, post))
                .collect(),
            total_number: result.total_count,
            current_page,
            last_page,
        })
    }

    pub fn delete(&self, post: &Post) -> ServiceResult<bool> {
        self.remove(post)
            .map_err(|err| delete_failed(EntityKind::Post, err))?;
        info!(
            "event=entity_delete module=service status=ok kind=post id={}",
            post.post_id.unwrap_or_default()
        );
        Ok(true)
    }

    pub fn delete_by_id(&self, post_id: EntityId) -> ServiceResult<bool> {
        let detail = self.get(post_id)?;
        self.delete(&detail.post)
    }

    fn load(&self, post_id: EntityId) -> ServiceResult<Post> {
        self.posts.get_post(post_id)?.ok_or(ServiceError::NotFound {
            kind: EntityKind::Post,
            id: post_id,
        })
    }

    fn enrich(&self, store: &StoreInfo, post: Post) -> ServiceResult<PostDetail> {
        let author = match post.user_id {
            Some(user_id) => self
                .authors
                .get_author_by_user(user_id)?
                .map(|author| present_author(store, author)),
            None => None,
        };
        Ok(PostDetail {
            post: present_post(store, post),
            author,
        })
    }

    fn persist(&self, post: &Post) -> RepoResult<Post> {
        let post_id = match post.post_id {
            Some(post_id) if self.posts.get_post(post_id)?.is_some() => {
                self.posts.update_post(post)?;
                post_id
            }
            _ => self.posts.insert_post(post)?,
        };
        self.posts
            .get_post(post_id)?
            .ok_or_else(|| RepoError::InvalidData("saved post missing on read-back".into()))
    }

    fn remove(&self, post: &Post) -> RepoResult<()> {
        let post_id = post
            .post_id
            .ok_or_else(|| RepoError::InvalidData("post delete requires a post_id".to_string()))?;
        let stored = self.posts.get_post(post_id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Post,
            id: post_id,
        })?;
        self.posts.delete_post(stored.post_id.unwrap_or(post_id))
    }
}

fn normalize_limit(limit: u32) -> u32 {
    match limit {
        0 => POSTS_DEFAULT_LIMIT,
        value => value.min(POSTS_LIMIT_MAX),
    }
}

fn parse_list_request(list_type: &str, term: &str) -> ServiceResult<(PostListFilter, bool)> {
    let term = term.trim();
    let invalid = |message: String| Err(ServiceError::InvalidListRequest(message));

    let filter = match list_type.trim().to_ascii_lowercase().as_str() {
        "archive" => {
            let Some(caps) = ARCHIVE_TERM_RE.captures(term) else {
                return invalid(format!("archive term `{term}` must look like YYYY-MM"));
            };
            let year = caps[1].parse::<i32>().unwrap_or_default();
            let month = caps[2].parse::<u32>().unwrap_or_default();
            if year < ARCHIVE_MIN_YEAR || !(1..=12).contains(&month) {
                return invalid(format!("archive term `{term}` is out of range"));
            }
            PostListFilter::Archive { year, month }
        }
        "author" => match term.parse::<i64>() {
            Ok(user_id) => PostListFilter::Author(user_id),
            Err(_) => return invalid(format!("author term `{term}` must be a user id")),
        },
        "category" => match term.parse::<EntityId>() {
            Ok(category_id) => PostListFilter::Category(category_id),
            Err(_) => return invalid(format!("category term `{term}` must be a category id")),
        },
        "search" if !term.is_empty() => PostListFilter::Search(term.to_string()),
        "tag" if !term.is_empty() => PostListFilter::Tag(term.to_string()),
        "search" | "tag" => return invalid(format!("{list_type} term cannot be empty")),
        "latest" => {
            let newest_first = !term.eq_ignore_ascii_case("asc");
            return Ok((PostListFilter::Latest, newest_first));
        }
        other => return invalid(format!("unknown list type `{other}`")),
    };

    Ok((filter, true))
}
