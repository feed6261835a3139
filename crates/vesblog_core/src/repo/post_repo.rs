//! Post repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist posts together with their store, category, tag and related
//!   item links.
//! - Answer the child lookups used to enrich authors and categories.
//! - Serve typed public listings (archive, author, category, search, tag,
//!   latest).
//!
//! # Invariants
//! - Child lookups and typed listings only ever return active posts.
//! - Re-saving a post keeps the position of category links it already had.
//! - Tags are stored lowercase and matched case-insensitively.

use super::{
    bool_to_int, dedupe_ordered, ensure_id, ensure_tables, extension_to_db, fetch_page, load_ids,
    parse_extension, parse_flag, Page, RepoError, RepoResult,
};
use crate::model::post::{normalize_tags, Post};
use crate::model::{EntityId, EntityKind, ALL_STORES};
use crate::search::criteria::{Filter, SearchCriteria};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const POST_SELECT_SQL: &str = "SELECT
    post_id,
    title,
    identifier,
    content,
    short_content,
    image,
    thumbnail,
    user_id,
    is_active,
    extension_json,
    creation_time,
    update_time
FROM posts";

/// Narrowing applied by a typed public listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostListFilter {
    /// No narrowing beyond active + store.
    Latest,
    /// Posts created in the given calendar month (UTC).
    Archive { year: i32, month: u32 },
    /// Posts referencing this author user id.
    Author(i64),
    Category(EntityId),
    /// Substring match on title, short content or content.
    Search(String),
    Tag(String),
}

/// Typed public listing request. Results are always active posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListQuery {
    pub filter: PostListFilter,
    /// Restricts to posts visible on this store when set.
    pub store_id: Option<i64>,
    pub newest_first: bool,
    pub limit: u32,
    pub offset: u32,
}

/// Repository interface for post persistence and post lookups.
pub trait PostRepository {
    fn insert_post(&self, post: &Post) -> RepoResult<EntityId>;
    fn update_post(&self, post: &Post) -> RepoResult<()>;
    fn get_post(&self, post_id: EntityId) -> RepoResult<Option<Post>>;
    fn search_posts(&self, criteria: &SearchCriteria, forced: &[Filter])
        -> RepoResult<Page<Post>>;
    fn delete_post(&self, post_id: EntityId) -> RepoResult<()>;
    /// Ids of active posts written by `user_id`, in id order.
    fn active_post_ids_by_user(&self, user_id: i64) -> RepoResult<Vec<EntityId>>;
    /// Ids of active posts linked to `category_id`, in link position order.
    fn active_post_ids_in_category(&self, category_id: EntityId) -> RepoResult<Vec<EntityId>>;
    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Page<Post>>;
}

/// SQLite-backed post repository.
#[derive(Clone, Copy)]
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "posts",
                "post_store",
                "category_post",
                "post_tag",
                "post_related_post",
                "post_related_product",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn insert_post(&self, post: &Post) -> RepoResult<EntityId> {
        post.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO posts (
                post_id,
                title,
                identifier,
                content,
                short_content,
                image,
                thumbnail,
                user_id,
                is_active,
                extension_json,
                creation_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                COALESCE(?11, strftime('%s', 'now') * 1000));",
            params![
                post.post_id,
                post.title.as_str(),
                post.identifier.as_str(),
                post.content.as_str(),
                post.short_content.as_deref(),
                post.image.as_deref(),
                post.thumbnail.as_deref(),
                post.user_id,
                bool_to_int(post.is_active),
                extension_to_db(&post.extension_attributes)?,
                post.creation_time,
            ],
        )?;
        let post_id = tx.last_insert_rowid();
        replace_links(&tx, post_id, post)?;
        tx.commit()?;

        Ok(post_id)
    }

    fn update_post(&self, post: &Post) -> RepoResult<()> {
        post.validate()?;
        let post_id = ensure_id(EntityKind::Post, post.post_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE posts
             SET
                title = ?2,
                identifier = ?3,
                content = ?4,
                short_content = ?5,
                image = ?6,
                thumbnail = ?7,
                user_id = ?8,
                is_active = ?9,
                extension_json = ?10,
                update_time = (strftime('%s', 'now') * 1000)
             WHERE post_id = ?1;",
            params![
                post_id,
                post.title.as_str(),
                post.identifier.as_str(),
                post.content.as_str(),
                post.short_content.as_deref(),
                post.image.as_deref(),
                post.thumbnail.as_deref(),
                post.user_id,
                bool_to_int(post.is_active),
                extension_to_db(&post.extension_attributes)?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Post,
                id: post_id,
            });
        }
        replace_links(&tx, post_id, post)?;
        tx.commit()?;

        Ok(())
    }

    fn get_post(&self, post_id: EntityId) -> RepoResult<Option<Post>> {
        let found = self
            .conn
            .query_row(
                &format!("{POST_SELECT_SQL} WHERE post_id = ?1;"),
                [post_id],
                |row| Ok(parse_post_row(self.conn, row)),
            )
            .optional()?;
        found.transpose()
    }

    fn search_posts(
        &self,
        criteria: &SearchCriteria,
        forced: &[Filter],
    ) -> RepoResult<Page<Post>> {
        fetch_page(
            self.conn,
            "posts",
            POST_SELECT_SQL,
            "post_id",
            criteria,
            forced,
            |row| parse_post_row(self.conn, row),
        )
    }

    fn delete_post(&self, post_id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM posts WHERE post_id = ?1;", [post_id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Post,
                id: post_id,
            });
        }
        Ok(())
    }

    fn active_post_ids_by_user(&self, user_id: i64) -> RepoResult<Vec<EntityId>> {
        load_ids(
            self.conn,
            "SELECT post_id
             FROM posts
             WHERE user_id = ?1
               AND is_active = 1
             ORDER BY post_id ASC;",
            user_id,
        )
    }

    fn active_post_ids_in_category(&self, category_id: EntityId) -> RepoResult<Vec<EntityId>> {
        load_ids(
            self.conn,
            "SELECT cp.post_id
             FROM category_post cp
             INNER JOIN posts p ON p.post_id = cp.post_id
             WHERE cp.category_id = ?1
               AND p.is_active = 1
             ORDER BY cp.position ASC, cp.post_id ASC;",
            category_id,
        )
    }

    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Page<Post>> {
        let mut where_sql = String::from(" WHERE is_active = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(store_id) = query.store_id {
            where_sql.push_str(
                " AND (
                    NOT EXISTS (SELECT 1 FROM post_store ps WHERE ps.post_id = posts.post_id)
                    OR EXISTS (
                        SELECT 1
                        FROM post_store ps
                        WHERE ps.post_id = posts.post_id
                          AND ps.store_id IN (?, ?)
                    )
                )",
            );
            bind_values.push(Value::Integer(ALL_STORES));
            bind_values.push(Value::Integer(store_id));
        }

        match &query.filter {
            PostListFilter::Latest => {}
            PostListFilter::Archive { year, month } => {
                where_sql.push_str(
                    " AND strftime('%Y-%m', creation_time / 1000, 'unixepoch') = ?",
                );
                bind_values.push(Value::Text(format!("{year:04}-{month:02}")));
            }
            PostListFilter::Author(user_id) => {
                where_sql.push_str(" AND user_id = ?");
                bind_values.push(Value::Integer(*user_id));
            }
            PostListFilter::Category(category_id) => {
                where_sql.push_str(
                    " AND EXISTS (
                        SELECT 1
                        FROM category_post cp
                        WHERE cp.post_id = posts.post_id
                          AND cp.category_id = ?
                    )",
                );
                bind_values.push(Value::Integer(*category_id));
            }
            PostListFilter::Search(text) => {
                where_sql.push_str(
                    " AND (title LIKE ? ESCAPE '\\'
                        OR short_content LIKE ? ESCAPE '\\'
                        OR content LIKE ? ESCAPE '\\')",
                );
                let pattern = format!("%{}%", escape_like(text));
                for _ in 0..3 {
                    bind_values.push(Value::Text(pattern.clone()));
                }
            }
            PostListFilter::Tag(name) => {
                where_sql.push_str(
                    " AND EXISTS (
                        SELECT 1
                        FROM post_tag pt
                        WHERE pt.post_id = posts.post_id
                          AND pt.name = ? COLLATE NOCASE
                    )",
                );
                bind_values.push(Value::Text(name.trim().to_string()));
            }
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM posts{where_sql}"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let direction = if query.newest_first { "DESC" } else { "ASC" };
        let sql = format!(
            "{POST_SELECT_SQL}{where_sql}
             ORDER BY creation_time {direction}, post_id {direction}
             LIMIT ? OFFSET ?"
        );
        bind_values.push(Value::Integer(i64::from(query.limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(self.conn, row)?);
        }

        Ok(Page {
            rows: posts,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}

fn replace_links(conn: &Connection, post_id: EntityId, post: &Post) -> RepoResult<()> {
    conn.execute("DELETE FROM post_store WHERE post_id = ?1;", [post_id])?;
    for store_id in post.store_ids.iter().collect::<BTreeSet<_>>() {
        conn.execute(
            "INSERT INTO post_store (post_id, store_id) VALUES (?1, ?2);",
            params![post_id, store_id],
        )?;
    }

    conn.execute("DELETE FROM post_tag WHERE post_id = ?1;", [post_id])?;
    for tag in normalize_tags(&post.tags) {
        conn.execute(
            "INSERT INTO post_tag (post_id, name) VALUES (?1, ?2);",
            params![post_id, tag],
        )?;
    }

    conn.execute(
        "DELETE FROM post_related_post WHERE post_id = ?1;",
        [post_id],
    )?;
    for (position, related_id) in dedupe_ordered(&post.related_post_ids)
        .into_iter()
        .enumerate()
    {
        conn.execute(
            "INSERT INTO post_related_post (post_id, related_post_id, position)
             VALUES (?1, ?2, ?3);",
            params![post_id, related_id, position as i64],
        )?;
    }

    conn.execute(
        "DELETE FROM post_related_product WHERE post_id = ?1;",
        [post_id],
    )?;
    for (position, product_id) in dedupe_ordered(&post.related_product_ids)
        .into_iter()
        .enumerate()
    {
        conn.execute(
            "INSERT INTO post_related_product (post_id, product_id, position)
             VALUES (?1, ?2, ?3);",
            params![post_id, product_id, position as i64],
        )?;
    }

    replace_category_links(conn, post_id, &post.category_ids)
}

/// Syncs category links without disturbing positions of links that stay.
fn replace_category_links(
    conn: &Connection,
    post_id: EntityId,
    category_ids: &[EntityId],
) -> RepoResult<()> {
    let wanted = category_ids.iter().copied().collect::<BTreeSet<_>>();
    let current = load_ids(
        conn,
        "SELECT category_id FROM category_post WHERE post_id = ?1;",
        post_id,
    )?;

    for category_id in current.iter().filter(|id| !wanted.contains(*id)) {
        conn.execute(
            "DELETE FROM category_post WHERE post_id = ?1 AND category_id = ?2;",
            params![post_id, category_id],
        )?;
    }

    for category_id in wanted.iter().filter(|id| !current.contains(*id)) {
        conn.execute(
            "INSERT INTO category_post (category_id, post_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
             FROM category_post
             WHERE category_id = ?1;",
            params![category_id, post_id],
        )?;
    }

    Ok(())
}

fn parse_post_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Post> {
    let post_id: EntityId = row.get("post_id")?;
    Ok(Post {
        post_id: Some(post_id),
        title: row.get("title")?,
        identifier: row.get("identifier")?,
        content: row.get("content")?,
        short_content: row.get("short_content")?,
        image: row.get("image")?,
        thumbnail: row.get("thumbnail")?,
        user_id: row.get("user_id")?,
        category_ids: load_ids(
            conn,
            "SELECT category_id FROM category_post WHERE post_id = ?1 ORDER BY category_id ASC;",
            post_id,
        )?,
        store_ids: load_ids(
            conn,
            "SELECT store_id FROM post_store WHERE post_id = ?1 ORDER BY store_id ASC;",
            post_id,
        )?,
        tags: load_tags(conn, post_id)?,
        is_active: parse_flag(row, "is_active", "posts")?,
        related_post_ids: load_ids(
            conn,
            "SELECT related_post_id
             FROM post_related_post
             WHERE post_id = ?1
             ORDER BY position ASC;",
            post_id,
        )?,
        related_product_ids: load_ids(
            conn,
            "SELECT product_id
             FROM post_related_product
             WHERE post_id = ?1
             ORDER BY position ASC;",
            post_id,
        )?,
        creation_time: row.get("creation_time")?,
        update_time: row.get("update_time")?,
        extension_attributes: parse_extension(row, "posts")?,
    })
}

fn load_tags(conn: &Connection, post_id: EntityId) -> RepoResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM post_tag WHERE post_id = ?1 ORDER BY name ASC;")?;
    let mut rows = stmt.query([post_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        tags.push(name.to_lowercase());
    }
    Ok(tags)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_guards_wildcards() {
        assert_eq!(escape_like(" 50%_off "), "50\\%\\_off");
    }
}
