//! Author repository contract and SQLite implementation.
//!
//! # Invariants
//! - `user_id` is unique; inserting a second author for the same user fails
//!   with a constraint error.
//! - Updates never touch `creation_time`.

use super::{
    bool_to_int, ensure_id, ensure_tables, extension_to_db, fetch_page, parse_extension,
    parse_flag, Page, RepoError, RepoResult,
};
use crate::model::author::Author;
use crate::model::{EntityId, EntityKind};
use crate::search::criteria::{Filter, SearchCriteria};
use rusqlite::{params, Connection, OptionalExtension, Row};

const AUTHOR_SELECT_SQL: &str = "SELECT
    author_id,
    user_id,
    user_name,
    nick_name,
    email,
    avatar,
    description,
    is_view,
    extension_json,
    creation_time,
    update_time
FROM authors";

/// Repository interface for author persistence.
pub trait AuthorRepository {
    /// Inserts a row, honoring `author_id` when the caller supplies one.
    fn insert_author(&self, author: &Author) -> RepoResult<EntityId>;
    /// Overwrites every mutable column of an existing row.
    fn update_author(&self, author: &Author) -> RepoResult<()>;
    fn get_author(&self, author_id: EntityId) -> RepoResult<Option<Author>>;
    /// Finds the author backing `user_id`, the key posts reference.
    fn get_author_by_user(&self, user_id: i64) -> RepoResult<Option<Author>>;
    fn search_authors(
        &self,
        criteria: &SearchCriteria,
        forced: &[Filter],
    ) -> RepoResult<Page<Author>>;
    fn delete_author(&self, author_id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed author repository.
#[derive(Clone, Copy)]
pub struct SqliteAuthorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorRepository<'conn> {
    /// Constructs a repository over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["authors"])?;
        Ok(Self { conn })
    }
}

impl AuthorRepository for SqliteAuthorRepository<'_> {
    fn insert_author(&self, author: &Author) -> RepoResult<EntityId> {
        author.validate()?;

        self.conn.execute(
            "INSERT INTO authors (
                author_id,
                user_id,
                user_name,
                nick_name,
                email,
                avatar,
                description,
                is_view,
                extension_json,
                creation_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                COALESCE(?10, strftime('%s', 'now') * 1000));",
            params![
                author.author_id,
                author.user_id,
                author.user_name.as_str(),
                author.nick_name.as_str(),
                author.email.as_deref(),
                author.avatar.as_deref(),
                author.description.as_deref(),
                bool_to_int(author.is_view),
                extension_to_db(&author.extension_attributes)?,
                author.creation_time,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_author(&self, author: &Author) -> RepoResult<()> {
        author.validate()?;
        let author_id = ensure_id(EntityKind::Author, author.author_id)?;

        let changed = self.conn.execute(
            "UPDATE authors
             SET
                user_id = ?2,
                user_name = ?3,
                nick_name = ?4,
                email = ?5,
                avatar = ?6,
                description = ?7,
                is_view = ?8,
                extension_json = ?9,
                update_time = (strftime('%s', 'now') * 1000)
             WHERE author_id = ?1;",
            params![
                author_id,
                author.user_id,
                author.user_name.as_str(),
                author.nick_name.as_str(),
                author.email.as_deref(),
                author.avatar.as_deref(),
                author.description.as_deref(),
                bool_to_int(author.is_view),
                extension_to_db(&author.extension_attributes)?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Author,
                id: author_id,
            });
        }
        Ok(())
    }

    fn get_author(&self, author_id: EntityId) -> RepoResult<Option<Author>> {
        self.conn
            .query_row(
                &format!("{AUTHOR_SELECT_SQL} WHERE author_id = ?1;"),
                [author_id],
                |row| Ok(parse_author_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn get_author_by_user(&self, user_id: i64) -> RepoResult<Option<Author>> {
        self.conn
            .query_row(
                &format!("{AUTHOR_SELECT_SQL} WHERE user_id = ?1;"),
                [user_id],
                |row| Ok(parse_author_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn search_authors(
        &self,
        criteria: &SearchCriteria,
        forced: &[Filter],
    ) -> RepoResult<Page<Author>> {
        fetch_page(
            self.conn,
            "authors",
            AUTHOR_SELECT_SQL,
            "author_id",
            criteria,
            forced,
            parse_author_row,
        )
    }

    fn delete_author(&self, author_id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM authors WHERE author_id = ?1;", [author_id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Author,
                id: author_id,
            });
        }
        Ok(())
    }
}

fn parse_author_row(row: &Row<'_>) -> RepoResult<Author> {
    Ok(Author {
        author_id: Some(row.get("author_id")?),
        user_id: row.get("user_id")?,
        user_name: row.get("user_name")?,
        nick_name: row.get("nick_name")?,
        email: row.get("email")?,
        avatar: row.get("avatar")?,
        description: row.get("description")?,
        is_view: parse_flag(row, "is_view", "authors")?,
        creation_time: row.get("creation_time")?,
        update_time: row.get("update_time")?,
        extension_attributes: parse_extension(row, "authors")?,
    })
}
