//! Relational query IR handed to the storage collaborator.

use std::fmt;

use relgraph_proto::Value;

/// A column of a row, optionally narrowed to a member of an embedded value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column(pub Vec<String>);

impl Column {
    /// A top-level column.
    pub fn new(name: impl Into<String>) -> Self {
        Column(vec![name.into()])
    }

    /// Narrow to a member of this column's embedded value.
    pub fn member(&self, name: impl Into<String>) -> Self {
        let mut path = self.0.clone();
        path.push(name.into());
        Column(path)
    }

    /// Prefix every segment of `self` with `prefix`.
    pub fn under(&self, prefix: &Column) -> Self {
        let mut path = prefix.0.clone();
        path.extend(self.0.iter().cloned());
        Column(path)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// Case folding applied before a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// Compare as stored.
    None,
    /// Lower-case the column only.
    Column,
    /// Lower-case both sides.
    Both,
}

/// A row predicate with SQL three-valued semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// The column is null.
    IsNull(Column),
    /// `column <op> value`.
    Compare {
        column: Column,
        op: Comparison,
        value: Value,
        fold: Fold,
    },
    /// `column [NOT] IN (values)`.
    InList {
        column: Column,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column [NOT] BETWEEN low AND high`, inclusive.
    Between {
        column: Column,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `column LIKE pattern` with `%`, `_` and `\` escapes.
    Like {
        column: Column,
        pattern: String,
        fold: bool,
    },
    /// A correlated existence check.
    Exists(Box<Subquery>),
}

impl Predicate {
    /// Conjunction, flattening trivially true children.
    pub fn all(children: Vec<Predicate>) -> Predicate {
        let mut children: Vec<Predicate> = children
            .into_iter()
            .filter(|p| *p != Predicate::True)
            .collect();
        match children.len() {
            0 => Predicate::True,
            1 => children.remove(0),
            _ => Predicate::And(children),
        }
    }

    /// Negation.
    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// `column IN (keys)`.
    pub fn key_in(column: Column, keys: Vec<Value>) -> Predicate {
        Predicate::InList {
            column,
            values: keys,
            negated: false,
        }
    }

    /// `column = value`.
    pub fn equals(column: Column, value: Value) -> Predicate {
        Predicate::Compare {
            column,
            op: Comparison::Eq,
            value,
            fold: Fold::None,
        }
    }
}

/// `EXISTS (SELECT 1 FROM entity WHERE entity.inner = outer.outer AND predicate)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    /// Entity scanned by the subquery.
    pub entity: String,
    /// Correlated column of the enclosing row.
    pub outer: Column,
    /// Matching column of the subquery row.
    pub inner: Column,
    /// Filter on the subquery row.
    pub predicate: Predicate,
}

/// A non-fanning to-one join used by order terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    /// Joined entity.
    pub entity: String,
    /// Column of the current row.
    pub local_key: String,
    /// Column of the joined row.
    pub remote_key: String,
}

/// A value reached from a row through zero or more to-one joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValuePath {
    pub joins: Vec<Join>,
    pub column: Column,
}

impl ValuePath {
    /// A column of the row itself.
    pub fn column(column: Column) -> Self {
        Self {
            joins: vec![],
            column,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderTerm {
    pub path: ValuePath,
    pub direction: Direction,
}

/// Offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

/// A single relational statement: one entity, one predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalQuery {
    /// Entity scanned.
    pub entity: String,
    /// Row filter.
    pub predicate: Predicate,
    /// Ordering, first term most significant.
    pub order_by: Vec<OrderTerm>,
    /// Rows returned.
    pub window: Window,
    /// Keep the first row per value of this column.
    pub distinct_on: Option<Column>,
}

impl RelationalQuery {
    /// Select every row of `entity`.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: Predicate::True,
            order_by: vec![],
            window: Window::default(),
            distinct_on: None,
        }
    }

    /// Set the predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Add a conjunct to the predicate.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        let current = std::mem::replace(&mut self.predicate, Predicate::True);
        self.predicate = Predicate::all(vec![current, predicate]);
        self
    }

    /// Set the ordering.
    pub fn with_order(mut self, order_by: Vec<OrderTerm>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Set the window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Deduplicate on a column.
    pub fn with_distinct_on(mut self, column: Option<Column>) -> Self {
        self.distinct_on = column;
        self
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) | Value::Enum(s) => write!(f, "'{s}'"),
        Value::Null => f.write_str("NULL"),
        other => write!(f, "{}", other.to_json()),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    f.write_str("(")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_value(f, value)?;
    }
    f.write_str(")")
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{part}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => f.write_str("TRUE"),
            Predicate::False => f.write_str("FALSE"),
            Predicate::And(parts) => write_joined(f, parts, " AND "),
            Predicate::Or(parts) => write_joined(f, parts, " OR "),
            Predicate::Not(inner) => write!(f, "NOT {inner}"),
            Predicate::IsNull(column) => write!(f, "{column} IS NULL"),
            Predicate::Compare {
                column,
                op,
                value,
                fold,
            } => {
                match fold {
                    Fold::None => write!(f, "{column} {} ", op.symbol())?,
                    _ => write!(f, "lower({column}) {} ", op.symbol())?,
                }
                if *fold == Fold::Both {
                    f.write_str("lower(")?;
                    write_value(f, value)?;
                    f.write_str(")")
                } else {
                    write_value(f, value)
                }
            }
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} {not}IN ")?;
                write_list(f, values)
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} {not}BETWEEN ")?;
                write_value(f, low)?;
                f.write_str(" AND ")?;
                write_value(f, high)
            }
            Predicate::Like {
                column,
                pattern,
                fold,
            } => {
                if *fold {
                    write!(f, "lower({column}) LIKE lower('{pattern}')")
                } else {
                    write!(f, "{column} LIKE '{pattern}'")
                }
            }
            Predicate::Exists(sub) => write!(
                f,
                "EXISTS (SELECT 1 FROM {} WHERE {} = outer.{} AND {})",
                sub.entity, sub.inner, sub.outer, sub.predicate
            ),
        }
    }
}

impl fmt::Display for RelationalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT * FROM {}", self.entity)?;
        if self.predicate != Predicate::True {
            write!(f, " WHERE {}", self.predicate)?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, term) in self.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                for join in &term.path.joins {
                    write!(f, "{}.", join.entity)?;
                }
                let dir = match term.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                write!(f, "{} {dir}", term.path.column)?;
            }
        }
        if let Some(limit) = self.window.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if self.window.offset > 0 {
            write!(f, " OFFSET {}", self.window.offset)?;
        }
        Ok(())
    }
}
