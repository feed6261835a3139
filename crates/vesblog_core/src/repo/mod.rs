//! Repository contracts and SQLite implementations for blog entities.
//!
//! # Responsibility
//! - Keep SQL details inside the persistence boundary.
//! - Return semantic errors (`NotFound`) alongside transport errors.
//!
//! # Invariants
//! - Write paths call the entity's `validate()` before any SQL mutation.
//! - Multi-table writes run in a single transaction.
//! - Read paths reject malformed persisted state instead of masking it.

use crate::db::DbError;
use crate::model::{EntityId, EntityKind, ValidationError};
use crate::search::criteria::{compile, CriteriaError, Filter, SearchCriteria};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod author_repo;
pub mod category_repo;
pub mod post_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence and query error shared by all blog repositories.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { kind: EntityKind, id: EntityId },
    InvalidData(String),
    Criteria(CriteriaError),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted blog data: {message}"),
            Self::Criteria(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Criteria(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CriteriaError> for RepoError {
    fn from(value: CriteriaError) -> Self {
        Self::Criteria(value)
    }
}

/// One page of rows plus the filtered, unpaginated row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
}

/// Runs a criteria-driven list query against one table.
///
/// `select_sql` must be a bare `SELECT ... FROM <table>` so the compiled
/// `WHERE`/`ORDER BY`/`LIMIT` fragments can be appended.
pub(crate) fn fetch_page<T>(
    conn: &Connection,
    table: &str,
    select_sql: &str,
    primary_key: &str,
    criteria: &SearchCriteria,
    forced: &[Filter],
    mut map_row: impl FnMut(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Page<T>> {
    let compiled = compile(criteria, forced, primary_key)?;

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table}{}", compiled.where_sql),
        params_from_iter(compiled.where_values.iter()),
        |row| row.get(0),
    )?;

    let sql = format!(
        "{select_sql}{}{}{}",
        compiled.where_sql, compiled.order_sql, compiled.limit_sql
    );
    let mut stmt = conn.prepare(&sql)?;
    let bind_values = compiled
        .where_values
        .iter()
        .chain(compiled.limit_values.iter());
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(map_row(row)?);
    }

    Ok(Page {
        rows: items,
        total_count: u64::try_from(total).unwrap_or_default(),
    })
}

/// Fails when any of `tables` is absent, i.e. migrations were skipped.
pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [*table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Reads an integer id list from a single-column query bound to `key`.
pub(crate) fn load_ids(conn: &Connection, sql: &str, key: EntityId) -> RepoResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

pub(crate) fn parse_flag(row: &Row<'_>, column: &str, table: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in {table}.{column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn extension_to_db(
    attributes: &BTreeMap<String, serde_json::Value>,
) -> RepoResult<Option<String>> {
    if attributes.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(attributes)
        .map(Some)
        .map_err(|err| RepoError::InvalidData(format!("unserializable extension attributes: {err}")))
}

pub(crate) fn parse_extension(
    row: &Row<'_>,
    table: &str,
) -> RepoResult<BTreeMap<String, serde_json::Value>> {
    match row.get::<_, Option<String>>("extension_json")? {
        Some(text) => serde_json::from_str(&text).map_err(|err| {
            RepoError::InvalidData(format!("invalid JSON in {table}.extension_json: {err}"))
        }),
        None => Ok(BTreeMap::new()),
    }
}

/// Keeps the first occurrence of every id.
pub(crate) fn dedupe_ordered(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub(crate) fn ensure_id(kind: EntityKind, id: Option<EntityId>) -> RepoResult<EntityId> {
    id.ok_or_else(|| RepoError::InvalidData(format!("{kind} update requires an id")))
}
