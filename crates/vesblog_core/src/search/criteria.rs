//! Filter/sort/pagination criteria and their SQL compilation.
//!
//! Filters inside one [`FilterGroup`] are OR-ed; groups are AND-ed. Field
//! names reach SQL as-is once they pass an identifier check, so unknown
//! columns surface from SQLite rather than from this module.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field regex"));

/// Comparison applied by one [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    #[default]
    Eq,
    Neq,
    Like,
    Nlike,
    /// Comma-separated value list.
    In,
    /// Comma-separated value list.
    Nin,
    Gt,
    Gteq,
    Lt,
    Lteq,
    /// Inclusive lower bound, same as `gteq`.
    From,
    /// Inclusive upper bound, same as `lteq`.
    To,
    Null,
    Notnull,
}

/// One `field <condition> value` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub condition_type: ConditionType,
}

impl Filter {
    pub fn new(
        field: impl Into<String>,
        condition_type: ConditionType,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            condition_type,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, ConditionType::Eq, value)
    }
}

/// Filters combined with OR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Caller-supplied list request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default)]
    pub filter_groups: Vec<FilterGroup>,
    #[serde(default)]
    pub sort_orders: Vec<SortOrder>,
    /// 1-based page number; missing or `0` means the first page.
    #[serde(default)]
    pub current_page: Option<u32>,
    /// Rows per page; missing or `0` disables pagination.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `filter` as its own AND-ed group.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter_groups.push(FilterGroup {
            filters: vec![filter],
        });
        self
    }

    /// Adds one group whose filters are OR-ed together.
    pub fn with_any(mut self, filters: Vec<Filter>) -> Self {
        self.filter_groups.push(FilterGroup { filters });
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_orders.push(SortOrder {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn paged(mut self, current_page: u32, page_size: u32) -> Self {
        self.current_page = Some(current_page);
        self.page_size = Some(page_size);
        self
    }
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults<T> {
    pub items: Vec<T>,
    /// Matching rows before pagination.
    pub total_count: u64,
    pub search_criteria: SearchCriteria,
}

/// Criteria that cannot be compiled into a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    InvalidField(String),
}

impl Display for CriteriaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidField(field) => write!(f, "invalid criteria field `{field}`"),
        }
    }
}

impl Error for CriteriaError {}

/// Parameterized SQL fragments for one list query.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledCriteria {
    /// ` WHERE ...` or empty.
    pub where_sql: String,
    pub where_values: Vec<Value>,
    /// ` ORDER BY ...`, always present.
    pub order_sql: String,
    /// ` LIMIT ? OFFSET ?` or empty.
    pub limit_sql: String,
    pub limit_values: Vec<Value>,
}

/// Compiles caller criteria plus server-forced filters.
///
/// Each forced filter becomes its own AND-ed group, so callers cannot widen
/// it with an OR. Sorting always ends with `primary_key ASC`.
pub(crate) fn compile(
    criteria: &SearchCriteria,
    forced: &[Filter],
    primary_key: &str,
) -> Result<CompiledCriteria, CriteriaError> {
    let mut clauses = Vec::new();
    let mut where_values = Vec::new();

    let forced_groups = forced.iter().map(std::slice::from_ref);
    let groups = criteria
        .filter_groups
        .iter()
        .map(|group| group.filters.as_slice())
        .chain(forced_groups);

    for filters in groups {
        if filters.is_empty() {
            continue;
        }
        let mut alternatives = Vec::with_capacity(filters.len());
        for filter in filters {
            alternatives.push(compile_filter(filter, &mut where_values)?);
        }
        clauses.push(format!("({})", alternatives.join(" OR ")));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let mut order_terms = Vec::with_capacity(criteria.sort_orders.len() + 1);
    for order in &criteria.sort_orders {
        check_field(&order.field)?;
        order_terms.push(format!("{} {}", order.field, order.direction.sql()));
    }
    order_terms.push(format!("{primary_key} ASC"));
    let order_sql = format!(" ORDER BY {}", order_terms.join(", "));

    let (limit_sql, limit_values) = match criteria.page_size.filter(|size| *size > 0) {
        Some(size) => {
            let page = criteria.current_page.filter(|page| *page > 0).unwrap_or(1);
            let offset = i64::from(page - 1).saturating_mul(i64::from(size));
            (
                " LIMIT ? OFFSET ?".to_string(),
                vec![Value::Integer(i64::from(size)), Value::Integer(offset)],
            )
        }
        None => (String::new(), Vec::new()),
    };

    Ok(CompiledCriteria {
        where_sql,
        where_values,
        order_sql,
        limit_sql,
        limit_values,
    })
}

fn compile_filter(filter: &Filter, values: &mut Vec<Value>) -> Result<String, CriteriaError> {
    check_field(&filter.field)?;
    let field = filter.field.as_str();

    let operator = match filter.condition_type {
        ConditionType::Eq => "=",
        ConditionType::Neq => "!=",
        ConditionType::Like => "LIKE",
        ConditionType::Nlike => "NOT LIKE",
        ConditionType::Gt => ">",
        ConditionType::Gteq | ConditionType::From => ">=",
        ConditionType::Lt => "<",
        ConditionType::Lteq | ConditionType::To => "<=",
        ConditionType::Null => return Ok(format!("{field} IS NULL")),
        ConditionType::Notnull => return Ok(format!("{field} IS NOT NULL")),
        ConditionType::In | ConditionType::Nin => {
            return Ok(compile_list(filter, values));
        }
    };

    values.push(Value::Text(filter.value.clone()));
    Ok(format!("{field} {operator} ?"))
}

fn compile_list(filter: &Filter, values: &mut Vec<Value>) -> String {
    let negated = filter.condition_type == ConditionType::Nin;
    let items = filter
        .value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>();

    if items.is_empty() {
        let constant = if negated { "1 = 1" } else { "0 = 1" };
        return constant.to_string();
    }

    let placeholders = vec!["?"; items.len()].join(", ");
    values.extend(items.into_iter().map(|item| Value::Text(item.to_string())));
    let operator = if negated { "NOT IN" } else { "IN" };
    format!("{} {operator} ({placeholders})", filter.field)
}

fn check_field(field: &str) -> Result<(), CriteriaError> {
    if FIELD_RE.is_match(field) {
        Ok(())
    } else {
        Err(CriteriaError::InvalidField(field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{compile, ConditionType, CriteriaError, Filter, SearchCriteria, SortDirection};
    use rusqlite::types::Value;

    #[test]
    fn groups_are_and_ed_and_filters_or_ed() {
        let criteria = SearchCriteria::new()
            .with_any(vec![
                Filter::eq("nick_name", "jane"),
                Filter::new("email", ConditionType::Like, "%@shop.test"),
            ])
            .with_filter(Filter::new("user_id", ConditionType::In, "1, 2,,3"));

        let compiled = compile(&criteria, &[Filter::eq("is_view", "1")], "author_id").unwrap();
        assert_eq!(
            compiled.where_sql,
            " WHERE (nick_name = ? OR email LIKE ?) AND (user_id IN (?, ?, ?)) AND (is_view = ?)"
        );
        assert_eq!(compiled.where_values.len(), 6);
        assert_eq!(compiled.order_sql, " ORDER BY author_id ASC");
        assert!(compiled.limit_sql.is_empty());
    }

    #[test]
    fn pagination_defaults_to_first_page() {
        let mut criteria = SearchCriteria::new().sorted_by("creation_time", SortDirection::Desc);
        criteria.page_size = Some(5);

        let compiled = compile(&criteria, &[], "post_id").unwrap();
        assert_eq!(
            compiled.order_sql,
            " ORDER BY creation_time DESC, post_id ASC"
        );
        assert_eq!(compiled.limit_sql, " LIMIT ? OFFSET ?");
        assert_eq!(
            compiled.limit_values,
            vec![Value::Integer(5), Value::Integer(0)]
        );

        let third = compile(&criteria.clone().paged(3, 5), &[], "post_id").unwrap();
        assert_eq!(
            third.limit_values,
            vec![Value::Integer(5), Value::Integer(10)]
        );
    }

    #[test]
    fn huge_page_offset_saturates() {
        let compiled = compile(
            &SearchCriteria::new().paged(u32::MAX, u32::MAX),
            &[],
            "post_id",
        )
        .unwrap();
        assert_eq!(
            compiled.limit_values,
            vec![Value::Integer(i64::from(u32::MAX)), Value::Integer(i64::MAX)]
        );
    }

    #[test]
    fn empty_in_list_matches_nothing_and_empty_nin_matches_everything() {
        let none = compile(
            &SearchCriteria::new().with_filter(Filter::new("post_id", ConditionType::In, " ")),
            &[],
            "post_id",
        )
        .unwrap();
        assert_eq!(none.where_sql, " WHERE (0 = 1)");

        let all = compile(
            &SearchCriteria::new().with_filter(Filter::new("post_id", ConditionType::Nin, "")),
            &[],
            "post_id",
        )
        .unwrap();
        assert_eq!(all.where_sql, " WHERE (1 = 1)");
    }

    #[test]
    fn field_names_must_be_identifiers() {
        let criteria =
            SearchCriteria::new().with_filter(Filter::eq("is_view = 1 OR 1", "1"));
        assert_eq!(
            compile(&criteria, &[], "author_id").unwrap_err(),
            CriteriaError::InvalidField("is_view = 1 OR 1".to_string())
        );

        let sorted = SearchCriteria::new().sorted_by("name; DROP TABLE posts", SortDirection::Asc);
        assert!(compile(&sorted, &[], "post_id").is_err());
    }
}
