//! Category repository contract and SQLite implementation.
//!
//! # Invariants
//! - `post_ids` is persisted in `category_post` with its list position, and
//!   read back in that order.
//! - A category write replaces its store and post associations atomically.

use super::{
    bool_to_int, dedupe_ordered, ensure_id, ensure_tables, extension_to_db, fetch_page, load_ids,
    parse_extension, parse_flag, Page, RepoError, RepoResult,
};
use crate::model::category::Category;
use crate::model::{EntityId, EntityKind};
use crate::search::criteria::{Filter, SearchCriteria};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const CATEGORY_SELECT_SQL: &str = "SELECT
    category_id,
    name,
    identifier,
    description,
    is_active,
    position,
    extension_json,
    creation_time,
    update_time
FROM categories";

/// Repository interface for category persistence.
pub trait CategoryRepository {
    fn insert_category(&self, category: &Category) -> RepoResult<EntityId>;
    fn update_category(&self, category: &Category) -> RepoResult<()>;
    fn get_category(&self, category_id: EntityId) -> RepoResult<Option<Category>>;
    fn search_categories(
        &self,
        criteria: &SearchCriteria,
        forced: &[Filter],
    ) -> RepoResult<Page<Category>>;
    fn delete_category(&self, category_id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed category repository.
#[derive(Clone, Copy)]
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["categories", "category_store", "category_post"])?;
        Ok(Self { conn })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn insert_category(&self, category: &Category) -> RepoResult<EntityId> {
        category.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO categories (
                category_id,
                name,
                identifier,
                description,
                is_active,
                position,
                extension_json,
                creation_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                COALESCE(?8, strftime('%s', 'now') * 1000));",
            params![
                category.category_id,
                category.name.as_str(),
                category.identifier.as_str(),
                category.description.as_deref(),
                bool_to_int(category.is_active),
                category.position,
                extension_to_db(&category.extension_attributes)?,
                category.creation_time,
            ],
        )?;
        let category_id = tx.last_insert_rowid();
        replace_links(&tx, category_id, category)?;
        tx.commit()?;

        Ok(category_id)
    }

    fn update_category(&self, category: &Category) -> RepoResult<()> {
        category.validate()?;
        let category_id = ensure_id(EntityKind::Category, category.category_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE categories
             SET
                name = ?2,
                identifier = ?3,
                description = ?4,
                is_active = ?5,
                position = ?6,
                extension_json = ?7,
                update_time = (strftime('%s', 'now') * 1000)
             WHERE category_id = ?1;",
            params![
                category_id,
                category.name.as_str(),
                category.identifier.as_str(),
                category.description.as_deref(),
                bool_to_int(category.is_active),
                category.position,
                extension_to_db(&category.extension_attributes)?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Category,
                id: category_id,
            });
        }
        replace_links(&tx, category_id, category)?;
        tx.commit()?;

        Ok(())
    }

    fn get_category(&self, category_id: EntityId) -> RepoResult<Option<Category>> {
        let found = self
            .conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE category_id = ?1;"),
                [category_id],
                |row| Ok(parse_category_row(self.conn, row)),
            )
            .optional()?;
        found.transpose()
    }

    fn search_categories(
        &self,
        criteria: &SearchCriteria,
        forced: &[Filter],
    ) -> RepoResult<Page<Category>> {
        fetch_page(
            self.conn,
            "categories",
            CATEGORY_SELECT_SQL,
            "category_id",
            criteria,
            forced,
            |row| parse_category_row(self.conn, row),
        )
    }

    fn delete_category(&self, category_id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM categories WHERE category_id = ?1;",
            [category_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Category,
                id: category_id,
            });
        }
        Ok(())
    }
}

fn replace_links(conn: &Connection, category_id: EntityId, category: &Category) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM category_store WHERE category_id = ?1;",
        [category_id],
    )?;
    for store_id in category.store_ids.iter().collect::<BTreeSet<_>>() {
        conn.execute(
            "INSERT INTO category_store (category_id, store_id) VALUES (?1, ?2);",
            params![category_id, store_id],
        )?;
    }

    conn.execute(
        "DELETE FROM category_post WHERE category_id = ?1;",
        [category_id],
    )?;
    for (position, post_id) in dedupe_ordered(&category.post_ids).into_iter().enumerate() {
        conn.execute(
            "INSERT INTO category_post (category_id, post_id, position) VALUES (?1, ?2, ?3);",
            params![category_id, post_id, position as i64],
        )?;
    }

    Ok(())
}

fn parse_category_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Category> {
    let category_id: EntityId = row.get("category_id")?;
    Ok(Category {
        category_id: Some(category_id),
        name: row.get("name")?,
        identifier: row.get("identifier")?,
        description: row.get("description")?,
        is_active: parse_flag(row, "is_active", "categories")?,
        position: row.get("position")?,
        store_ids: load_ids(
            conn,
            "SELECT store_id FROM category_store WHERE category_id = ?1 ORDER BY store_id ASC;",
            category_id,
        )?,
        post_ids: load_ids(
            conn,
            "SELECT post_id
             FROM category_post
             WHERE category_id = ?1
             ORDER BY position ASC, post_id ASC;",
            category_id,
        )?,
        creation_time: row.get("creation_time")?,
        update_time: row.get("update_time")?,
        extension_attributes: parse_extension(row, "categories")?,
    })
}
