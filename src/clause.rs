//! Clause value objects.
//!
//! Every clause renders itself into SQL text while pushing its bound
//! arguments onto the statement's argument list. Placeholders are numbered
//! from the length of that list, so a clause can never disagree with the
//! statement about which `$n` its value lands on.

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// Push `value` and return the placeholder that refers to it.
pub(crate) fn bind(args: &mut Vec<Value>, value: Value) -> String {
    args.push(value);
    format!("${}", args.len())
}

/// Comparison operators for column predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
        }
    }
}

/// How a where entry connects to the entry that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
    /// Nothing follows inside the current group.
    None,
}

impl Conjunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Conjunction::Or => "OR",
            Conjunction::And | Conjunction::None => "AND",
        }
    }
}

/// A single where predicate or a structural precedence marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    Null {
        column: String,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// Literal SQL; each `?` outside a quoted literal consumes the next argument.
    ///
    /// Surplus `?`s stay as written; surplus arguments are dropped with a warning.
    Raw { sql: String, args: Vec<Value> },
    PrecedenceStart,
    PrecedenceEnd,
}

impl Condition {
    pub fn equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn raw(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Condition::Raw {
            sql: sql.into(),
            args,
        }
    }

    /// The column a predicate restricts, if it names one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Condition::Compare { column, .. }
            | Condition::Null { column, .. }
            | Condition::In { column, .. } => Some(column),
            _ => None,
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Condition::PrecedenceStart | Condition::PrecedenceEnd)
    }

    /// Render to SQL, appending bound values to `args`.
    pub fn render(&self, args: &mut Vec<Value>) -> String {
        match self {
            Condition::Compare { column, op, value } => {
                let placeholder = bind(args, value.clone());
                format!("{} {} {}", column, op.as_sql(), placeholder)
            }
            Condition::Null { column, negated } => {
                if *negated {
                    format!("{} IS NOT NULL", column)
                } else {
                    format!("{} IS NULL", column)
                }
            }
            Condition::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // IN () is not valid SQL
                    return if *negated { "1 = 1" } else { "1 = 0" }.to_string();
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| bind(args, v.clone())).collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, op, placeholders.join(", "))
            }
            Condition::Raw { sql, args: raw_args } => render_raw(sql, raw_args, args),
            Condition::PrecedenceStart => "(".to_string(),
            Condition::PrecedenceEnd => ")".to_string(),
        }
    }
}

fn render_raw(sql: &str, raw_args: &[Value], args: &mut Vec<Value>) -> String {
    let mut out = String::with_capacity(sql.len() + raw_args.len() * 2);
    let mut pending = raw_args.iter();
    // an escaped '' toggles twice
    let mut in_literal = false;
    for ch in sql.chars() {
        if ch == '\'' {
            in_literal = !in_literal;
        } else if ch == '?' && !in_literal {
            if let Some(value) = pending.next() {
                out.push_str(&bind(args, value.clone()));
                continue;
            }
        }
        out.push(ch);
    }
    let unused = pending.count();
    if unused > 0 {
        tracing::warn!(sql, unused, "raw where clause has more arguments than placeholders");
    }
    out
}

/// A where predicate plus the conjunction linking it to the next entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereEntry {
    pub condition: Condition,
    pub conjunction: Conjunction,
}

impl WhereEntry {
    pub fn new(condition: Condition) -> Self {
        let conjunction = match condition {
            Condition::PrecedenceStart => Conjunction::None,
            _ => Conjunction::And,
        };
        Self {
            condition,
            conjunction,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Tokens accepted by [`Direction::parse`].
    pub const ACCEPTED: &'static [&'static str] = &[":asc", ":desc"];

    /// Parse `asc`/`desc`, case-insensitive, with or without a leading `:`.
    pub fn parse(token: &str) -> QueryResult<Self> {
        let normalized = token.trim().trim_start_matches(':').to_ascii_lowercase();
        match normalized.as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(QueryError::invalid(format!(
                "unknown order direction '{}'",
                token
            ))),
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::parse(s)
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Desc)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.column.clone(), self.direction.reversed())
    }

    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.direction.as_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// A join between two tables, or literal join SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Join {
    Table {
        kind: JoinKind,
        from: String,
        to: String,
        primary_key: String,
        foreign_key: String,
    },
    Raw(String),
}

impl Join {
    /// `INNER JOIN to ON from.primary_key = to.foreign_key`
    pub fn inner(from: &str, to: &str, primary_key: &str, foreign_key: &str) -> Self {
        Self::table(JoinKind::Inner, from, to, primary_key, foreign_key)
    }

    pub fn left(from: &str, to: &str, primary_key: &str, foreign_key: &str) -> Self {
        Self::table(JoinKind::Left, from, to, primary_key, foreign_key)
    }

    pub fn right(from: &str, to: &str, primary_key: &str, foreign_key: &str) -> Self {
        Self::table(JoinKind::Right, from, to, primary_key, foreign_key)
    }

    pub fn full(from: &str, to: &str, primary_key: &str, foreign_key: &str) -> Self {
        Self::table(JoinKind::Full, from, to, primary_key, foreign_key)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Join::Raw(sql.into())
    }

    fn table(kind: JoinKind, from: &str, to: &str, primary_key: &str, foreign_key: &str) -> Self {
        Join::Table {
            kind,
            from: from.to_string(),
            to: to.to_string(),
            primary_key: primary_key.to_string(),
            foreign_key: foreign_key.to_string(),
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Join::Table {
                kind,
                from,
                to,
                primary_key,
                foreign_key,
            } => format!(
                "{} {} ON {}.{} = {}.{}",
                kind.as_sql(),
                to,
                from,
                primary_key,
                to,
                foreign_key
            ),
            Join::Raw(sql) => sql.clone(),
        }
    }
}
