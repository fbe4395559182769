//! # qail-queryable — chainable queries for QAIL
//!
//! > **Build it, branch it, run it.**
//!
//! A [`Queryable`] accumulates where/or/group, order, limit/offset, distinct
//! and join clauses, renders them into one parameterized statement, runs it
//! and turns the rows into typed records.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qail_queryable::prelude::*;
//!
//! let db: Arc<dyn Database> = Arc::new(SqlxDatabase::connect("postgres://localhost/app").await?);
//!
//! let young_or_old = Queryable::<User>::all(db)
//!     .where_group(|q| q.column("age").lt(21).or(|q| q.column("age").gt(65)))
//!     .order_by("name", "asc")?
//!     .limit(10);
//!
//! // SELECT users.id, users.name, users.age FROM users
//! //   WHERE (users.age < $1 OR users.age > $2) ORDER BY name ASC LIMIT $3
//! let users = young_or_old.results().await?;
//! let total = young_or_old.reset_limit().select_count().await?;
//! ```
//!
//! ## Pieces
//!
//! | Type           | Role                                              |
//! |----------------|---------------------------------------------------|
//! | [`Queryable`]  | Immutable chain API and terminal calls            |
//! | [`QueryBuilder`] | Clause accumulator, renders [`Statement`]s      |
//! | [`Condition`]  | Where predicates and precedence markers           |
//! | [`Model`]      | Table name, columns, row materialization          |
//! | [`Database`]   | Driver seam; [`SqlxDatabase`] implements it       |

pub mod builder;
pub mod clause;
pub mod config;
pub mod criteria;
pub mod database;
pub mod engine;
pub mod error;
pub mod model;
pub mod preload;
pub mod queryable;
pub mod value;

pub use builder::{QueryBuilder, Statement};
pub use clause::{Condition, Conjunction, Direction, Join, JoinKind, Operator, OrderBy, WhereEntry};
pub use config::Config;
pub use criteria::Criteria;
pub use database::{Database, Row};
pub use engine::SqlxDatabase;
pub use error::{Lookup, QueryError, QueryResult};
pub use model::{Assignments, Model};
pub use preload::{Preload, PreloadFuture};
pub use queryable::Queryable;
pub use value::Value;

pub mod prelude {
    pub use crate::builder::{QueryBuilder, Statement};
    pub use crate::clause::*;
    pub use crate::config::Config;
    pub use crate::criteria::Criteria;
    pub use crate::database::{Database, Row};
    pub use crate::engine::SqlxDatabase;
    pub use crate::error::*;
    pub use crate::model::{Assignments, Model};
    pub use crate::preload::PreloadFuture;
    pub use crate::queryable::Queryable;
    pub use crate::value::Value;
    pub use std::sync::Arc;
}
