//! Statement accumulator.
//!
//! [`QueryBuilder`] collects clauses in call order and renders them into a
//! [`Statement`]: SQL text with `$n` placeholders plus the arguments in
//! placeholder order. It mutates in place; [`crate::Queryable`] only ever
//! touches a fresh clone of it.

use crate::clause::{bind, Condition, Conjunction, Join, OrderBy, WhereEntry};
use crate::value::Value;

/// Rendered SQL text and its bound arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryBuilder {
    table: String,
    selections: Vec<String>,
    distinct: bool,
    distinct_on: Vec<String>,
    count: bool,
    wheres: Vec<WhereEntry>,
    joins: Vec<Join>,
    groups: Vec<String>,
    orders: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn wheres(&self) -> &[WhereEntry] {
        &self.wheres
    }

    pub fn orders(&self) -> &[OrderBy] {
        &self.orders
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn is_ordered(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn has_wheres(&self) -> bool {
        !self.wheres.is_empty()
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Replace the selected columns. Empty selects `*`.
    pub fn select(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.selections = columns.into_iter().map(Into::into).collect();
        self.count = false;
        self
    }

    /// Render `SELECT COUNT(*)` instead of the column list.
    pub fn select_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    pub fn distinct_on(&mut self, column: impl Into<String>) -> &mut Self {
        self.distinct_on.push(column.into());
        self
    }

    pub fn push_where(&mut self, condition: Condition) -> &mut Self {
        self.wheres.push(WhereEntry::new(condition));
        self
    }

    pub fn remove_last_where(&mut self) -> Option<WhereEntry> {
        self.wheres.pop()
    }

    /// Set how the latest where entry connects to whatever comes next.
    pub fn set_last_conjunction(&mut self, conjunction: Conjunction) -> &mut Self {
        if let Some(last) = self.wheres.last_mut() {
            last.conjunction = conjunction;
        }
        self
    }

    /// Drop every predicate on `column`, then any group left empty.
    pub fn reset_where(&mut self, column: &str) -> &mut Self {
        self.wheres
            .retain(|entry| entry.condition.column() != Some(column));
        loop {
            let empty_group = self.wheres.windows(2).position(|pair| {
                pair[0].condition == Condition::PrecedenceStart
                    && pair[1].condition == Condition::PrecedenceEnd
            });
            match empty_group {
                Some(i) => {
                    self.wheres.drain(i..i + 2);
                }
                None => break,
            }
        }
        self
    }

    pub fn join(&mut self, join: Join) -> &mut Self {
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
        self
    }

    pub fn group_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.groups.push(column.into());
        self
    }

    pub fn order_by(&mut self, order: OrderBy) -> &mut Self {
        self.orders.push(order);
        self
    }

    /// Flip the direction of every order-by entry.
    pub fn reverse_order(&mut self) -> &mut Self {
        self.orders = self.orders.iter().map(OrderBy::reversed).collect();
        self
    }

    pub fn reset_order(&mut self) -> &mut Self {
        self.orders.clear();
        self
    }

    pub fn limit(&mut self, limit: Option<u64>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn offset(&mut self, offset: Option<u64>) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Append another builder's where entries, joins and order-bys.
    pub fn merge(&mut self, other: &QueryBuilder) -> &mut Self {
        self.wheres.extend(other.wheres.iter().cloned());
        for join in &other.joins {
            self.join(join.clone());
        }
        self.orders.extend(other.orders.iter().cloned());
        self
    }

    /// Render the SELECT statement.
    pub fn statement(&self) -> Statement {
        let mut args = Vec::new();
        let mut sql = String::from("SELECT ");

        if !self.distinct_on.is_empty() {
            sql.push_str(&format!("DISTINCT ON ({}) ", self.distinct_on.join(", ")));
        } else if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.count {
            sql.push_str("COUNT(*)");
        } else if self.selections.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.selections.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }

        self.push_wheres(&mut sql, &mut args);

        if !self.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.groups.join(", "));
        }

        if !self.orders.is_empty() {
            let orders: Vec<String> = self.orders.iter().map(OrderBy::to_sql).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(n) = self.limit {
            let placeholder = bind(&mut args, Value::Int(clamp_i64(n)));
            sql.push_str(&format!(" LIMIT {}", placeholder));
        }

        if let Some(n) = self.offset {
            let placeholder = bind(&mut args, Value::Int(clamp_i64(n)));
            sql.push_str(&format!(" OFFSET {}", placeholder));
        }

        Statement { sql, args }
    }

    /// Render a DELETE over the current where entries.
    ///
    /// No where entries means every row goes.
    pub fn statement_for_delete(&self) -> Statement {
        let mut args = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.table);
        self.push_wheres(&mut sql, &mut args);
        Statement { sql, args }
    }

    /// Render an UPDATE assigning `assignments`, restricted by the where entries.
    pub fn statement_for_update(&self, assignments: &[(String, Value)]) -> Statement {
        let mut args = Vec::new();
        let sets: Vec<String> = assignments
            .iter()
            .map(|(column, value)| format!("{} = {}", column, bind(&mut args, value.clone())))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        self.push_wheres(&mut sql, &mut args);
        Statement { sql, args }
    }

    pub fn statement_for_truncate(&self) -> Statement {
        Statement {
            sql: format!("TRUNCATE TABLE {}", self.table),
            args: Vec::new(),
        }
    }

    fn push_wheres(&self, sql: &mut String, args: &mut Vec<Value>) {
        if self.wheres.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        for (i, entry) in self.wheres.iter().enumerate() {
            sql.push_str(&entry.condition.render(args));
            let Some(next) = self.wheres.get(i + 1) else {
                break;
            };
            if entry.condition == Condition::PrecedenceStart
                || next.condition == Condition::PrecedenceEnd
            {
                continue;
            }
            sql.push(' ');
            sql.push_str(entry.conjunction.as_sql());
            sql.push(' ');
        }
    }
}

/// Bound integers are signed; anything past `i64::MAX` saturates.
fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
