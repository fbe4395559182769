//! The chainable, immutable query.
//!
//! Every chain method borrows `self`, clones it, changes the clone's
//! [`QueryBuilder`] once and returns the clone. The receiver is never
//! touched, so one base query can be branched from any number of places.
//! Terminal methods (`results`, `first`, `select_count`, `delete`, ...)
//! render the builder and hand the statement to the [`Database`].

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{QueryBuilder, Statement};
use crate::clause::{Condition, Conjunction, Direction, Join, OrderBy};
use crate::criteria::Criteria;
use crate::database::Database;
use crate::error::{Lookup, QueryError, QueryResult};
use crate::model::{Assignments, Model};
use crate::preload::{run_preloads, Preload, PreloadFuture};
use crate::value::Value;

pub struct Queryable<M: Model> {
    query: QueryBuilder,
    database: Arc<dyn Database>,
    preloads: Vec<Preload<M>>,
    _model: PhantomData<M>,
}

impl<M: Model> Clone for Queryable<M> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            database: Arc::clone(&self.database),
            preloads: self.preloads.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for Queryable<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queryable")
            .field("model", &M::queryable_name())
            .field("query", &self.query)
            .field("preloads", &self.preloads.len())
            .finish()
    }
}

impl<M: Model> Queryable<M> {
    /// A fresh query over every row of `M`'s table.
    pub fn all(database: Arc<dyn Database>) -> Self {
        let mut query = QueryBuilder::new(M::TABLE_NAME);
        query.select(M::qualified_columns());
        Self {
            query,
            database,
            preloads: Vec::new(),
            _model: PhantomData,
        }
    }

    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    /// Rendered SELECT for the current state.
    pub fn to_statement(&self) -> Statement {
        self.query.statement()
    }

    /// Clone, let `f` change the clone's builder, return the clone.
    fn derive(&self, f: impl FnOnce(&mut QueryBuilder)) -> Self {
        let mut next = self.clone();
        f(&mut next.query);
        next
    }

    // ------------------------------------------------------------------
    // Chain API
    // ------------------------------------------------------------------

    pub fn distinct(&self) -> Self {
        self.derive(|q| {
            q.distinct();
        })
    }

    pub fn reset_order(&self) -> Self {
        self.derive(|q| {
            q.reset_order();
        })
    }

    pub fn reset_limit(&self) -> Self {
        self.limit(None)
    }

    pub fn reset_offset(&self) -> Self {
        self.offset(None)
    }

    /// Replace the selected columns.
    pub fn select(&self, columns: &[&str]) -> Self {
        self.derive(|q| {
            q.select(columns.iter().copied());
        })
    }

    /// Handle on `table.column` for building predicates and orderings.
    pub fn column(&self, column: &str) -> Criteria<M> {
        Criteria::new(self.clone(), M::qualified_column(column))
    }

    /// `column = value`
    pub fn where_eq(&self, column: &str, value: impl Into<Value>) -> Self {
        self.where_clause(Condition::equal(column, value))
    }

    /// Literal SQL; each `?` is bound to the next entry of `args`.
    pub fn where_raw(&self, sql: &str, args: Vec<Value>) -> Self {
        self.where_clause(Condition::raw(sql, args))
    }

    pub fn where_clause(&self, condition: Condition) -> Self {
        self.derive(|q| {
            q.push_where(condition);
        })
    }

    /// Parenthesize whatever `f` adds.
    ///
    /// A block that adds nothing leaves no trace in the SQL.
    pub fn where_group(&self, f: impl FnOnce(Self) -> Self) -> Self {
        let opened = self.where_clause(Condition::PrecedenceStart);
        let mut result = f(opened);
        let added_nothing = result
            .query
            .wheres()
            .last()
            .is_some_and(|entry| entry.condition == Condition::PrecedenceStart);
        if added_nothing {
            result.query.remove_last_where();
        } else {
            result
                .query
                .set_last_conjunction(Conjunction::None)
                .push_where(Condition::PrecedenceEnd);
        }
        result
    }

    /// Join the latest where clause to whatever `f` adds with OR.
    pub fn or(&self, f: impl FnOnce(Self) -> Self) -> Self {
        let next = self.derive(|q| {
            q.set_last_conjunction(Conjunction::Or);
        });
        f(next)
    }

    pub fn group(&self, f: impl FnOnce(&Self) -> Criteria<M>) -> Self {
        let criteria = f(self);
        self.private_group(criteria.column())
    }

    pub fn distinct_on(&self, f: impl FnOnce(&Self) -> Criteria<M>) -> Self {
        let criteria = f(self);
        self.private_distinct_on(criteria.column())
    }

    /// Drop every where clause on the column `f` names.
    pub fn reset_where(&self, f: impl FnOnce(&Self) -> Criteria<M>) -> Self {
        let criteria = f(self);
        self.private_reset_where(criteria.column())
    }

    fn private_group(&self, column: &str) -> Self {
        self.derive(|q| {
            q.group_by(column);
        })
    }

    fn private_distinct_on(&self, column: &str) -> Self {
        self.derive(|q| {
            q.distinct_on(column);
        })
    }

    fn private_reset_where(&self, column: &str) -> Self {
        self.derive(|q| {
            q.reset_where(column);
        })
    }

    pub fn join(&self, join: Join) -> Self {
        self.derive(|q| {
            q.join(join);
        })
    }

    /// Order by `column` in the direction named by `direction` (`asc`/`desc`).
    pub fn order_by(&self, column: &str, direction: &str) -> QueryResult<Self> {
        let direction = Direction::parse(direction).map_err(|e| {
            let reason = match e {
                QueryError::InvalidArgument { message } => message,
                other => other.to_string(),
            };
            QueryError::invalid(format!(
                "{}. Accepted values are: {}",
                reason,
                Direction::ACCEPTED.join(", ")
            ))
        })?;
        Ok(self.order_by_clause(OrderBy::new(column, direction)))
    }

    pub fn order_by_clause(&self, order: OrderBy) -> Self {
        self.derive(|q| {
            q.order_by(order);
        })
    }

    pub fn limit(&self, limit: impl Into<Option<u64>>) -> Self {
        let limit = limit.into();
        self.derive(|q| {
            q.limit(limit);
        })
    }

    pub fn offset(&self, offset: impl Into<Option<u64>>) -> Self {
        let offset = offset.into();
        self.derive(|q| {
            q.offset(offset);
        })
    }

    /// Match nothing.
    pub fn none(&self) -> Self {
        self.where_raw("1 = 0", Vec::new())
    }

    pub fn merge_query(&self, other: &QueryBuilder) -> Self {
        self.derive(|q| {
            q.merge(other);
        })
    }

    /// Run `preload` over every batch this query (or any query derived from it) fetches.
    pub fn add_preload<F>(&self, preload: F) -> Self
    where
        F: for<'a> Fn(&'a mut Vec<M>) -> PreloadFuture<'a> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.preloads.push(Arc::new(preload));
        next
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    pub async fn results(&self) -> QueryResult<Vec<M>> {
        let statement = self.query.statement();
        let rows = self
            .database
            .query(&statement.sql, &statement.args, M::queryable_name())
            .await?;
        let mut records = rows
            .iter()
            .map(M::from_row)
            .collect::<QueryResult<Vec<M>>>()?;
        run_preloads(&self.preloads, &mut records).await?;
        Ok(records)
    }

    /// Fetch everything, then hand each record to `f` in order.
    pub async fn each(&self, mut f: impl FnMut(M)) -> QueryResult<()> {
        for record in self.results().await? {
            f(record);
        }
        Ok(())
    }

    fn ordered_query(&self) -> Self {
        if self.query.is_ordered() {
            return self.clone();
        }
        self.derive(|q| {
            for order in M::default_ordering() {
                q.order_by(order);
            }
        })
    }

    pub async fn first_opt(&self) -> QueryResult<Option<M>> {
        let records = self.ordered_query().limit(1).results().await?;
        Ok(records.into_iter().next())
    }

    pub async fn last_opt(&self) -> QueryResult<Option<M>> {
        let reversed = self.ordered_query().derive(|q| {
            q.reverse_order();
        });
        let records = reversed.limit(1).results().await?;
        Ok(records.into_iter().next())
    }

    pub async fn first(&self) -> QueryResult<M> {
        self.first_opt()
            .await?
            .ok_or_else(|| QueryError::not_found(M::TABLE_NAME, Lookup::First))
    }

    pub async fn last(&self) -> QueryResult<M> {
        self.last_opt()
            .await?
            .ok_or_else(|| QueryError::not_found(M::TABLE_NAME, Lookup::Last))
    }

    /// The record whose primary key equals `id`.
    pub async fn find(&self, id: impl Into<Value>) -> QueryResult<M> {
        let column = M::qualified_column(M::PRIMARY_KEY_NAME);
        self.where_eq(&column, id)
            .first_opt()
            .await?
            .ok_or_else(|| QueryError::not_found(M::TABLE_NAME, Lookup::Find))
    }

    /// `COUNT(*)` over the current statement. Zero rows counts as zero.
    pub async fn select_count(&self) -> QueryResult<i64> {
        let inner = self.query.statement();
        let count = QueryBuilder::new(format!("({}) AS temp", inner.sql))
            .select_count()
            .statement();
        match self
            .database
            .scalar(&count.sql, &inner.args, M::queryable_name())
            .await
        {
            Ok(value) => value.as_i64().ok_or_else(|| {
                QueryError::Decode(format!("COUNT(*) returned a non-integer value: {}", value))
            }),
            Err(QueryError::NoResults) => {
                tracing::debug!(table = M::TABLE_NAME, "count query returned no rows, treating as 0");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Run whatever scalar statement `f` turns a copy of the builder into.
    pub async fn exec_scalar(&self, f: impl FnOnce(QueryBuilder) -> QueryBuilder) -> QueryResult<Value> {
        let statement = f(self.query.clone()).statement();
        self.database
            .scalar(&statement.sql, &statement.args, M::queryable_name())
            .await
    }

    /// Delete every row the where clauses match. No where clauses: every row.
    pub async fn delete(&self) -> QueryResult<u64> {
        let statement = self.clone().query.statement_for_delete();
        self.database.exec(&statement.sql, &statement.args).await
    }

    /// Apply `changes` to every row the where clauses match.
    pub async fn update<C: Assignments + ?Sized>(&self, changes: &C) -> QueryResult<u64> {
        let assignments = changes.assignments();
        if assignments.is_empty() {
            return Err(QueryError::invalid(format!(
                "update on '{}' needs at least one column assignment",
                M::TABLE_NAME
            )));
        }
        let statement = self.query.statement_for_update(&assignments);
        self.database.exec(&statement.sql, &statement.args).await
    }

    /// Empty the whole table, regardless of any query state.
    pub async fn truncate(database: &Arc<dyn Database>) -> QueryResult<u64> {
        let statement = QueryBuilder::new(M::TABLE_NAME).statement_for_truncate();
        database.exec(&statement.sql, &statement.args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Row;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct User {
        id: i64,
        name: String,
        age: i64,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Model for User {
        const TABLE_NAME: &'static str = "users";
        const COLUMN_NAMES: &'static [&'static str] = &["id", "name", "age"];

        fn from_row(row: &Row) -> QueryResult<Self> {
            row.decode()
        }
    }

    /// Records every statement and answers with canned data.
    #[derive(Default)]
    struct RecordingDb {
        statements: Mutex<Vec<(String, Vec<Value>)>>,
        rows: Vec<Row>,
        scalar: Option<Value>,
        affected: u64,
    }

    impl RecordingDb {
        fn last(&self) -> (String, Vec<Value>) {
            self.statements.lock().unwrap().last().cloned().unwrap()
        }

        fn record(&self, sql: &str, args: &[Value]) {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), args.to_vec()));
        }
    }

    #[async_trait]
    impl Database for RecordingDb {
        async fn exec(&self, sql: &str, args: &[Value]) -> QueryResult<u64> {
            self.record(sql, args);
            Ok(self.affected)
        }

        async fn query(&self, sql: &str, args: &[Value], _queryable: &str) -> QueryResult<Vec<Row>> {
            self.record(sql, args);
            Ok(self.rows.clone())
        }

        async fn scalar(&self, sql: &str, args: &[Value], _queryable: &str) -> QueryResult<Value> {
            self.record(sql, args);
            self.scalar.clone().ok_or(QueryError::NoResults)
        }
    }

    fn user_row(id: i64, name: &str, age: i64) -> Row {
        Row::new().with("id", id).with("name", name).with("age", age)
    }

    fn setup(db: RecordingDb) -> (Arc<RecordingDb>, Queryable<User>) {
        let db = Arc::new(db);
        let handle: Arc<dyn Database> = db.clone();
        (db, Queryable::all(handle))
    }

    fn sql(q: &Queryable<User>) -> String {
        q.to_statement().sql
    }

    const SELECT: &str = "SELECT users.id, users.name, users.age FROM users";

    #[test]
    fn test_chain_calls_leave_receiver_untouched() {
        let (_, base) = setup(RecordingDb::default());
        let before = base.to_statement();

        let a = base.where_eq("a", 1);
        let b = base.where_eq("a", 1);

        assert_eq!(base.to_statement(), before);
        assert_eq!(a.to_statement(), b.to_statement());
        assert_eq!(sql(&a), format!("{SELECT} WHERE a = $1"));
    }

    #[test]
    fn test_branches_do_not_share_state() {
        let (_, base) = setup(RecordingDb::default());
        let base = base.where_eq("a", 1);
        let left = base.where_eq("b", 2);
        let right = base.limit(5);

        assert_eq!(sql(&left), format!("{SELECT} WHERE a = $1 AND b = $2"));
        assert_eq!(sql(&right), format!("{SELECT} WHERE a = $1 LIMIT $2"));
    }

    #[test]
    fn test_wheres_render_in_call_order() {
        let (_, q) = setup(RecordingDb::default());
        let q = q.where_eq("c", 3).where_eq("a", 1).where_eq("b", 2);
        let statement = q.to_statement();
        assert_eq!(statement.sql, format!("{SELECT} WHERE c = $1 AND a = $2 AND b = $3"));
        assert_eq!(statement.args, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_empty_group_renders_like_no_group() {
        let (_, q) = setup(RecordingDb::default());
        assert_eq!(sql(&q.where_group(|g| g)), sql(&q));

        let filtered = q.where_eq("a", 1);
        assert_eq!(sql(&filtered.where_group(|g| g)), sql(&filtered));
    }

    #[test]
    fn test_group_is_parenthesized() {
        let (_, q) = setup(RecordingDb::default());
        let grouped = q.where_group(|g| g.where_eq("a", 1).where_eq("b", 2));
        assert_eq!(sql(&grouped), format!("{SELECT} WHERE (a = $1 AND b = $2)"));

        let surrounded = q
            .where_eq("x", 0)
            .where_group(|g| g.where_eq("a", 1).or(|o| o.where_eq("b", 2)))
            .where_eq("y", 9);
        assert_eq!(
            sql(&surrounded),
            format!("{SELECT} WHERE x = $1 AND (a = $2 OR b = $3) AND y = $4")
        );
    }

    #[test]
    fn test_nested_groups() {
        let (_, q) = setup(RecordingDb::default());
        let q = q.where_group(|g| {
            g.where_eq("a", 1)
                .or(|o| o.where_group(|inner| inner.where_eq("b", 2).where_eq("c", 3)))
        });
        assert_eq!(
            sql(&q),
            format!("{SELECT} WHERE (a = $1 OR (b = $2 AND c = $3))")
        );
    }

    #[test]
    fn test_or_placement() {
        let (_, q) = setup(RecordingDb::default());
        let q = q.where_eq("a", 1).or(|o| o.where_eq("b", 2));
        assert_eq!(sql(&q), format!("{SELECT} WHERE a = $1 OR b = $2"));
    }

    #[test]
    fn test_or_after_group() {
        let (_, q) = setup(RecordingDb::default());
        let q = q
            .where_group(|g| g.where_eq("a", 1).where_eq("b", 2))
            .or(|o| o.where_eq("c", 3));
        assert_eq!(
            sql(&q),
            format!("{SELECT} WHERE (a = $1 AND b = $2) OR c = $3")
        );
    }

    #[test]
    fn test_or_without_where_just_runs_block() {
        let (_, q) = setup(RecordingDb::default());
        let q = q.or(|o| o.where_eq("b", 2));
        assert_eq!(sql(&q), format!("{SELECT} WHERE b = $1"));
    }

    #[test]
    fn test_criteria_and_raw_share_ordinals() {
        let (_, q) = setup(RecordingDb::default());
        let q = q
            .column("age")
            .gt(25)
            .where_raw("name <> ? AND name <> ?", vec!["x".into(), "y".into()])
            .column("id")
            .in_values([1, 2]);
        let statement = q.to_statement();
        assert_eq!(
            statement.sql,
            format!("{SELECT} WHERE users.age > $1 AND name <> $2 AND name <> $3 AND users.id IN ($4, $5)")
        );
        assert_eq!(statement.args.len(), 5);
    }

    #[test]
    fn test_none_matches_nothing() {
        let (_, q) = setup(RecordingDb::default());
        assert_eq!(sql(&q.none()), format!("{SELECT} WHERE 1 = 0"));
    }

    #[test]
    fn test_order_by_accumulates() {
        let (_, q) = setup(RecordingDb::default());
        let q = q
            .order_by("name", "asc")
            .unwrap()
            .order_by("age", ":desc")
            .unwrap();
        assert_eq!(sql(&q), format!("{SELECT} ORDER BY name ASC, age DESC"));
        assert_eq!(sql(&q.reset_order()), SELECT);
    }

    #[test]
    fn test_order_by_rejects_unknown_direction() {
        let (_, q) = setup(RecordingDb::default());
        let err = q.order_by("name", "sideways").unwrap_err();
        match err {
            QueryError::InvalidArgument { message } => {
                assert!(message.contains("sideways"));
                assert!(message.contains(":asc"));
                assert!(message.contains(":desc"));
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_limit_offset_set_and_clear() {
        let (_, q) = setup(RecordingDb::default());
        let paged = q.limit(10).offset(20);
        assert_eq!(sql(&paged), format!("{SELECT} LIMIT $1 OFFSET $2"));
        assert_eq!(sql(&paged.reset_limit().reset_offset()), SELECT);
        assert_eq!(sql(&paged.limit(None)), format!("{SELECT} OFFSET $1"));
    }

    #[test]
    fn test_group_distinct_on_reset_where() {
        let (_, q) = setup(RecordingDb::default());
        let grouped = q.select(&["users.age"]).group(|q| q.column("age"));
        assert_eq!(
            sql(&grouped),
            "SELECT users.age FROM users GROUP BY users.age"
        );

        let distinct = q.distinct_on(|q| q.column("name"));
        assert_eq!(
            sql(&distinct),
            format!(
                "SELECT DISTINCT ON (users.name) {} FROM users",
                "users.id, users.name, users.age"
            )
        );

        let reset = q
            .column("age")
            .gt(1)
            .column("name")
            .eq("Al")
            .reset_where(|q| q.column("age"));
        assert_eq!(sql(&reset), format!("{SELECT} WHERE users.name = $1"));
    }

    #[test]
    fn test_merge_query() {
        let (_, q) = setup(RecordingDb::default());
        let other = q.where_eq("b", 2).order_by("b", "desc").unwrap();
        let merged = q.where_eq("a", 1).merge_query(other.query());
        assert_eq!(
            sql(&merged),
            format!("{SELECT} WHERE a = $1 AND b = $2 ORDER BY b DESC")
        );
    }

    #[tokio::test]
    async fn test_results_materializes_rows() {
        let (db, q) = setup(RecordingDb {
            rows: vec![user_row(1, "Al", 30), user_row(3, "Cy", 40)],
            ..Default::default()
        });
        let users = q.column("age").gt(25).results().await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Al", "Cy"]);
        assert_eq!(db.last().1, vec![Value::Int(25)]);
    }

    #[tokio::test]
    async fn test_each_visits_every_record() {
        let (_, q) = setup(RecordingDb {
            rows: vec![user_row(1, "Al", 30), user_row(2, "Bo", 20)],
            ..Default::default()
        });
        let mut seen = Vec::new();
        q.each(|u| seen.push(u.id)).await.unwrap();
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_first_applies_default_order_and_limit() {
        let (db, q) = setup(RecordingDb {
            rows: vec![user_row(1, "Al", 30)],
            ..Default::default()
        });
        let user = q.first().await.unwrap();
        assert_eq!(user.id, 1);
        let (sql, args) = db.last();
        assert_eq!(sql, format!("{SELECT} ORDER BY users.id ASC LIMIT $1"));
        assert_eq!(args, vec![Value::Int(1)]);
    }

    #[tokio::test]
    async fn test_last_reverses_every_order_column() {
        let (db, q) = setup(RecordingDb {
            rows: vec![user_row(3, "Cy", 40)],
            ..Default::default()
        });
        let q = q
            .order_by("name", "asc")
            .unwrap()
            .order_by("age", "desc")
            .unwrap();
        q.last().await.unwrap();
        assert_eq!(
            db.last().0,
            format!("{SELECT} ORDER BY name DESC, age ASC LIMIT $1")
        );

        q.reset_order().last_opt().await.unwrap();
        assert_eq!(
            db.last().0,
            format!("{SELECT} ORDER BY users.id DESC LIMIT $1")
        );
    }

    #[tokio::test]
    async fn test_first_and_last_not_found() {
        let (_, q) = setup(RecordingDb::default());
        assert!(q.first_opt().await.unwrap().is_none());
        assert!(q.last_opt().await.unwrap().is_none());

        match q.first().await.unwrap_err() {
            QueryError::NotFound { table, lookup } => {
                assert_eq!(table, "users");
                assert_eq!(lookup, Lookup::First);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        match q.last().await.unwrap_err() {
            QueryError::NotFound { lookup, .. } => assert_eq!(lookup, Lookup::Last),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_by_primary_key() {
        let (db, q) = setup(RecordingDb {
            rows: vec![user_row(2, "Bo", 20)],
            ..Default::default()
        });
        let user = q.find(2).await.unwrap();
        assert_eq!(user.name, "Bo");
        assert_eq!(
            db.last().0,
            format!("{SELECT} WHERE users.id = $1 ORDER BY users.id ASC LIMIT $2")
        );
    }

    #[tokio::test]
    async fn test_select_count_wraps_statement() {
        let (db, q) = setup(RecordingDb {
            scalar: Some(Value::Int(2)),
            ..Default::default()
        });
        let count = q.column("age").gt(25).select_count().await.unwrap();
        assert_eq!(count, 2);
        let (sql, args) = db.last();
        assert_eq!(
            sql,
            format!("SELECT COUNT(*) FROM ({SELECT} WHERE users.age > $1) AS temp")
        );
        assert_eq!(args, vec![Value::Int(25)]);
    }

    #[tokio::test]
    async fn test_select_count_no_results_is_zero() {
        let (_, q) = setup(RecordingDb::default());
        assert_eq!(q.none().select_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_exec_scalar_runs_modified_builder() {
        let (db, q) = setup(RecordingDb {
            scalar: Some(Value::Int(3)),
            ..Default::default()
        });
        let value = q
            .where_eq("a", 1)
            .exec_scalar(|b| b.select_count())
            .await
            .unwrap();
        assert_eq!(value, Value::Int(3));
        assert_eq!(db.last().0, "SELECT COUNT(*) FROM users WHERE a = $1");
    }

    #[tokio::test]
    async fn test_delete_without_wheres_deletes_everything() {
        let (db, q) = setup(RecordingDb {
            affected: 3,
            ..Default::default()
        });
        let deleted = q.limit(1).order_by("name", "asc").unwrap().delete().await.unwrap();
        assert_eq!(deleted, 3);
        let (sql, args) = db.last();
        assert_eq!(sql, "DELETE FROM users");
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn test_delete_scoped_by_wheres() {
        let (db, q) = setup(RecordingDb::default());
        q.column("age").lt(21).delete().await.unwrap();
        assert_eq!(db.last().0, "DELETE FROM users WHERE users.age < $1");
    }

    #[tokio::test]
    async fn test_update_uses_where_restriction() {
        let (db, q) = setup(RecordingDb {
            affected: 1,
            ..Default::default()
        });
        let updated = q
            .where_eq("users.id", 2)
            .update(&[("name", Value::from("Bea"))])
            .await
            .unwrap();
        assert_eq!(updated, 1);
        let (sql, args) = db.last();
        assert_eq!(sql, "UPDATE users SET name = $1 WHERE users.id = $2");
        assert_eq!(args, vec![Value::from("Bea"), Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_update_without_assignments_fails() {
        let (db, q) = setup(RecordingDb::default());
        let empty: Vec<(String, Value)> = Vec::new();
        let err = q.update(&empty).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument { .. }));
        assert!(db.statements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truncate_ignores_query_state() {
        let db = Arc::new(RecordingDb::default());
        let handle: Arc<dyn Database> = db.clone();
        Queryable::<User>::truncate(&handle).await.unwrap();
        assert_eq!(db.last().0, "TRUNCATE TABLE users");
    }

    #[tokio::test]
    async fn test_preloads_run_in_registration_order() {
        let (_, q) = setup(RecordingDb {
            rows: vec![user_row(1, "Al", 30), user_row(2, "Bo", 20)],
            ..Default::default()
        });
        let q = q
            .add_preload(|users| {
                Box::pin(async move {
                    for user in users.iter_mut() {
                        user.tags.push("first".to_string());
                    }
                    Ok::<(), QueryError>(())
                })
            })
            .add_preload(|users| {
                Box::pin(async move {
                    for user in users.iter_mut() {
                        user.tags.push("second".to_string());
                    }
                    Ok::<(), QueryError>(())
                })
            });

        // registrations survive further chaining
        let users = q.where_eq("a", 1).results().await.unwrap();
        for user in users {
            assert_eq!(user.tags, vec!["first", "second"]);
        }
    }

    #[tokio::test]
    async fn test_preload_error_propagates() {
        let (_, q) = setup(RecordingDb {
            rows: vec![user_row(1, "Al", 30)],
            ..Default::default()
        });
        let q = q.add_preload(|_users| {
            Box::pin(async move { Err::<(), _>(QueryError::Database("boom".into())) })
        });
        assert!(matches!(q.results().await, Err(QueryError::Database(_))));
    }
}
