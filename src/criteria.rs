//! Column handles for building predicates.
//!
//! A [`Criteria`] is what a concrete query type hands out per column:
//!
//! ```rust,ignore
//! trait UserColumns {
//!     fn age(&self) -> Criteria<User>;
//! }
//!
//! impl UserColumns for Queryable<User> {
//!     fn age(&self) -> Criteria<User> {
//!         self.column("age")
//!     }
//! }
//!
//! let adults = Queryable::<User>::all(db).age().gte(21);
//! ```

use crate::clause::{Condition, Direction, Operator, OrderBy};
use crate::model::Model;
use crate::queryable::Queryable;
use crate::value::Value;

/// A table-qualified column bound to the query it will extend.
pub struct Criteria<M: Model> {
    query: Queryable<M>,
    column: String,
}

impl<M: Model> Clone for Criteria<M> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            column: self.column.clone(),
        }
    }
}

impl<M: Model> Criteria<M> {
    pub(crate) fn new(query: Queryable<M>, column: String) -> Self {
        Self { query, column }
    }

    /// Fully qualified column name, e.g. `users.age`.
    pub fn column(&self) -> &str {
        &self.column
    }

    fn compare(self, op: Operator, value: impl Into<Value>) -> Queryable<M> {
        let condition = Condition::compare(self.column, op, value);
        self.query.where_clause(condition)
    }

    pub fn eq(self, value: impl Into<Value>) -> Queryable<M> {
        self.compare(Operator::Eq, value)
    }

    pub fn not_eq(self, value: impl Into<Value>) -> Queryable<M> {
        self.compare(Operator::NotEq, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Queryable<M> {
        self.compare(Operator::Gt, value)
    }

    pub fn gte(self, value: impl Into<Value>) -> Queryable<M> {
        self.compare(Operator::Gte, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Queryable<M> {
        self.compare(Operator::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Queryable<M> {
        self.compare(Operator::Lte, value)
    }

    pub fn like(self, pattern: impl Into<String>) -> Queryable<M> {
        self.compare(Operator::Like, pattern.into())
    }

    pub fn ilike(self, pattern: impl Into<String>) -> Queryable<M> {
        self.compare(Operator::ILike, pattern.into())
    }

    pub fn in_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Queryable<M> {
        let condition = Condition::In {
            column: self.column,
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        };
        self.query.where_clause(condition)
    }

    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Queryable<M> {
        let condition = Condition::In {
            column: self.column,
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        };
        self.query.where_clause(condition)
    }

    pub fn is_nil(self) -> Queryable<M> {
        let condition = Condition::Null {
            column: self.column,
            negated: false,
        };
        self.query.where_clause(condition)
    }

    pub fn is_not_nil(self) -> Queryable<M> {
        let condition = Condition::Null {
            column: self.column,
            negated: true,
        };
        self.query.where_clause(condition)
    }

    pub fn asc_order(self) -> Queryable<M> {
        self.query
            .order_by_clause(OrderBy::new(self.column, Direction::Asc))
    }

    pub fn desc_order(self) -> Queryable<M> {
        self.query
            .order_by_clause(OrderBy::new(self.column, Direction::Desc))
    }

    /// Hand back the query untouched.
    pub fn into_query(self) -> Queryable<M> {
        self.query
    }
}
