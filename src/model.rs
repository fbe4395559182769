//! The record side of a query: what table a type lives in and how a row
//! becomes a value of that type.

use crate::clause::OrderBy;
use crate::database::Row;
use crate::error::QueryResult;
use crate::value::Value;

/// A record type backed by a table.
///
/// # Example
///
/// ```
/// use qail_queryable::{Model, QueryResult, Row};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Model for User {
///     const TABLE_NAME: &'static str = "users";
///     const COLUMN_NAMES: &'static [&'static str] = &["id", "name"];
///
///     fn from_row(row: &Row) -> QueryResult<Self> {
///         row.decode()
///     }
/// }
///
/// assert_eq!(User::qualified_column("name"), "users.name");
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    const TABLE_NAME: &'static str;
    const PRIMARY_KEY_NAME: &'static str = "id";
    const COLUMN_NAMES: &'static [&'static str];

    /// Materialize one row.
    fn from_row(row: &Row) -> QueryResult<Self>;

    /// Ordering applied by `first`/`last` when the query has none.
    fn default_ordering() -> Vec<OrderBy> {
        vec![OrderBy::asc(Self::qualified_column(Self::PRIMARY_KEY_NAME))]
    }

    /// Name handed to the database for logging and error context.
    fn queryable_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn qualified_column(column: &str) -> String {
        format!("{}.{}", Self::TABLE_NAME, column)
    }

    fn qualified_columns() -> Vec<String> {
        Self::COLUMN_NAMES
            .iter()
            .map(|column| Self::qualified_column(column))
            .collect()
    }
}

/// Column assignments for an UPDATE.
///
/// Each record type's change set decides which columns it writes.
pub trait Assignments {
    fn assignments(&self) -> Vec<(String, Value)>;
}

impl Assignments for [(&str, Value)] {
    fn assignments(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect()
    }
}

impl<const N: usize> Assignments for [(&str, Value); N] {
    fn assignments(&self) -> Vec<(String, Value)> {
        self.as_slice().assignments()
    }
}

impl Assignments for Vec<(String, Value)> {
    fn assignments(&self) -> Vec<(String, Value)> {
        self.clone()
    }
}
