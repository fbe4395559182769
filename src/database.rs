//! The database seam.
//!
//! [`Database`] is everything the query core needs from a driver: run a
//! statement for its affected-row count, fetch rows, fetch one scalar.
//! [`crate::engine::SqlxDatabase`] is the sqlx-backed implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a mutation and return the number of affected rows.
    async fn exec(&self, sql: &str, args: &[Value]) -> QueryResult<u64>;

    /// Fetch every row the statement produces.
    async fn query(&self, sql: &str, args: &[Value], queryable: &str) -> QueryResult<Vec<Row>>;

    /// First column of the first row.
    ///
    /// Fails with [`QueryError::NoResults`] when the statement returns no rows.
    async fn scalar(&self, sql: &str, args: &[Value], queryable: &str) -> QueryResult<Value>;
}

/// One result row: column names with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by column name. Qualified names (`users.id`) match on the last segment too.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let bare = column.rsplit('.').next().unwrap_or(column);
        self.columns
            .iter()
            .position(|c| c == column || c == bare)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column)?.as_i64()
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column)?.as_f64()
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column)?.as_bool()
    }

    pub fn get_string(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            v => Some(v.to_string()),
        }
    }

    /// Column-to-value JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Deserialize the row into any serde type keyed by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> QueryResult<T> {
        serde_json::from_value(self.to_json()).map_err(|e| QueryError::Decode(e.to_string()))
    }
}
