//! Three-valued predicate evaluation over in-memory tables.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use relgraph_proto::Value;

use crate::error::StoreError;

use super::predicate::{Column, Comparison, Fold, Predicate, ValuePath};
use super::store::Row;

/// SQL truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn from_bool(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }

    fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    /// Whether a row with this truth value is selected.
    pub fn is_true(self) -> bool {
        self == Truth::True
    }
}

/// Evaluates predicates against rows of a set of tables.
pub struct Evaluator<'a> {
    tables: &'a HashMap<String, Vec<Row>>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over `tables`.
    pub fn new(tables: &'a HashMap<String, Vec<Row>>) -> Self {
        Self { tables }
    }

    /// Rows of a table.
    pub fn table(&self, entity: &str) -> Result<&'a [Row], StoreError> {
        self.tables
            .get(entity)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::UnknownTable(entity.to_string()))
    }

    /// Evaluate `predicate` against `row`.
    pub fn evaluate(&self, predicate: &Predicate, row: &Row) -> Result<Truth, StoreError> {
        Ok(match predicate {
            Predicate::True => Truth::True,
            Predicate::False => Truth::False,
            Predicate::And(parts) => {
                let mut acc = Truth::True;
                for part in parts {
                    acc = acc.and(self.evaluate(part, row)?);
                    if acc == Truth::False {
                        break;
                    }
                }
                acc
            }
            Predicate::Or(parts) => {
                let mut acc = Truth::False;
                for part in parts {
                    acc = acc.or(self.evaluate(part, row)?);
                    if acc == Truth::True {
                        break;
                    }
                }
                acc
            }
            Predicate::Not(inner) => self.evaluate(inner, row)?.not(),
            Predicate::IsNull(column) => Truth::from_bool(Self::is_null(row.resolve(column))),
            Predicate::Compare {
                column,
                op,
                value,
                fold,
            } => Self::compare(row.resolve(column), *op, value, *fold),
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                let truth = Self::in_list(row.resolve(column), values);
                if *negated {
                    truth.not()
                } else {
                    truth
                }
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
            } => {
                let truth = match row.resolve(column) {
                    Some(v) if !v.is_null() && !low.is_null() && !high.is_null() => {
                        match (compare_values(v, low), compare_values(v, high)) {
                            (Some(lo), Some(hi)) => Truth::from_bool(lo.is_ge() && hi.is_le()),
                            _ => Truth::Unknown,
                        }
                    }
                    _ => Truth::Unknown,
                };
                if *negated {
                    truth.not()
                } else {
                    truth
                }
            }
            Predicate::Like {
                column,
                pattern,
                fold,
            } => match row.resolve(column) {
                None | Some(Value::Null) => Truth::Unknown,
                Some(v) => match v.as_str() {
                    Some(s) => Truth::from_bool(like_match(s, pattern, *fold)),
                    None => Truth::False,
                },
            },
            Predicate::Exists(sub) => {
                let outer = match row.resolve(&sub.outer) {
                    Some(v) if !v.is_null() => v,
                    _ => return Ok(Truth::False),
                };
                let mut found = false;
                for candidate in self.table(&sub.entity)? {
                    let correlated = candidate
                        .resolve(&sub.inner)
                        .is_some_and(|inner| values_equal(inner, outer));
                    if correlated && self.evaluate(&sub.predicate, candidate)?.is_true() {
                        found = true;
                        break;
                    }
                }
                Truth::from_bool(found)
            }
        })
    }

    /// Value at `path`, following to-one joins. A missing joined row reads as null.
    pub fn resolve_path<'r>(&self, row: &'r Row, path: &ValuePath) -> Result<Option<&'r Value>, StoreError>
    where
        'a: 'r,
    {
        let mut current = row;
        for join in &path.joins {
            let key = match current.get(&join.local_key) {
                Some(v) if !v.is_null() => v,
                _ => return Ok(None),
            };
            let next = self
                .table(&join.entity)?
                .iter()
                .find(|r| r.get(&join.remote_key).is_some_and(|v| values_equal(v, key)));
            match next {
                Some(r) => current = r,
                None => return Ok(None),
            }
        }
        Ok(current.resolve(&path.column))
    }

    fn is_null(value: Option<&Value>) -> bool {
        matches!(value, None | Some(Value::Null))
    }

    fn compare(value: Option<&Value>, op: Comparison, operand: &Value, fold: Fold) -> Truth {
        let value = match value {
            Some(v) if !v.is_null() => v,
            _ => return Truth::Unknown,
        };
        if operand.is_null() {
            return Truth::Unknown;
        }

        let folded;
        let (left, right) = match (fold, value.as_str(), operand.as_str()) {
            (Fold::None, _, _) | (_, None, _) | (_, _, None) => (value, operand),
            (Fold::Column, Some(l), Some(_)) => {
                folded = (Value::String(l.to_lowercase()), operand.clone());
                (&folded.0, &folded.1)
            }
            (Fold::Both, Some(l), Some(r)) => {
                folded = (Value::String(l.to_lowercase()), Value::String(r.to_lowercase()));
                (&folded.0, &folded.1)
            }
        };

        let truth = match op {
            Comparison::Eq => Some(values_equal(left, right)),
            Comparison::Ne => Some(!values_equal(left, right)),
            Comparison::Lt => compare_values(left, right).map(Ordering::is_lt),
            Comparison::Le => compare_values(left, right).map(Ordering::is_le),
            Comparison::Gt => compare_values(left, right).map(Ordering::is_gt),
            Comparison::Ge => compare_values(left, right).map(Ordering::is_ge),
        };
        truth.map(Truth::from_bool).unwrap_or(Truth::False)
    }

    /// `value IN (list)`: true on a match, unknown when the value is null or
    /// the list holds a null and nothing matched.
    fn in_list(value: Option<&Value>, list: &[Value]) -> Truth {
        let value = match value {
            Some(v) if !v.is_null() => v,
            _ => return Truth::Unknown,
        };
        if list.iter().any(|item| values_equal(value, item)) {
            Truth::True
        } else if list.iter().any(Value::is_null) {
            Truth::Unknown
        } else {
            Truth::False
        }
    }
}

/// Check if two non-null values are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            a.as_i64() == b.as_i64()
        }
        (Value::Float32(_) | Value::Float64(_), Value::Float32(_) | Value::Float64(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::String(_) | Value::Enum(_), Value::String(_) | Value::Enum(_)) => {
            a.as_str() == b.as_str()
        }
        _ => a == b,
    }
}

/// Compare two values, returning their ordering if comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            Some(a.as_i64()?.cmp(&b.as_i64()?))
        }
        (
            Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_),
            Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_),
        ) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(_) | Value::Enum(_), Value::String(_) | Value::Enum(_)) => {
            Some(a.as_str()?.cmp(b.as_str()?))
        }
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order for sorting: nulls first, incomparable values equal.
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    /// `%`
    Any,
    /// `_`
    One,
    Char(char),
}

/// Compile a LIKE pattern. A trailing `\` stands for itself.
fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Char(chars.next().unwrap_or('\\')),
            c => LikeToken::Char(c),
        });
    }
    tokens
}

/// Match `value` against a LIKE pattern (`%`, `_`, `\` escapes). With
/// `fold`, both sides are lower-cased first; the escape characters have no
/// case, so escaping survives folding.
pub fn like_match(value: &str, pattern: &str, fold: bool) -> bool {
    let (value, pattern): (Cow<'_, str>, Cow<'_, str>) = if fold {
        (value.to_lowercase().into(), pattern.to_lowercase().into())
    } else {
        (value.into(), pattern.into())
    };
    let text: Vec<char> = value.chars().collect();
    let tokens = like_tokens(&pattern);

    let (mut t, mut p) = (0, 0);
    // Token after the last `%` and the text position it currently absorbs up to.
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::Any) => {
                p += 1;
                backtrack = Some((p, t));
            }
            Some(LikeToken::One) => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::Char(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((after, from)) => {
                    p = after;
                    t = from + 1;
                    backtrack = Some((after, t));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|token| *token == LikeToken::Any)
}

/// Escape `%`, `_` and `\` so `text` matches literally inside a LIKE pattern.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::predicate::Subquery;

    fn tables() -> HashMap<String, Vec<Row>> {
        let mut tables = HashMap::new();
        tables.insert(
            "Book".to_string(),
            vec![
                Row::new().with("id", 1i64).with("author_id", 1i64),
                Row::new().with("id", 2i64).with("author_id", 2i64),
            ],
        );
        tables
    }

    fn eval(predicate: &Predicate, row: &Row) -> Truth {
        let tables = tables();
        Evaluator::new(&tables).evaluate(predicate, row).unwrap()
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("hello", "hello", false));
        assert!(like_match("hello", "h%", false));
        assert!(like_match("hello", "%llo", false));
        assert!(like_match("hello", "%ll%", false));
        assert!(like_match("hello", "h_llo", false));
        assert!(!like_match("hello", "h_lo", false));
        assert!(like_match("100%", "100\\%", false));
        assert!(!like_match("1000", "100\\%", false));
        assert!(like_match("a_b", &format!("%{}%", escape_like("_")), false));
        assert!(!like_match("ab", &format!("%{}%", escape_like("_")), false));
    }

    #[test]
    fn test_like_backtracks_across_wildcards() {
        assert!(like_match("abcabd", "%ab_", false));
        assert!(like_match("mississippi", "m%ss%pi", false));
        assert!(!like_match("mississippi", "m%ss%px", false));
        assert!(like_match("", "%%", false));
        assert!(!like_match("", "_", false));
        assert!(like_match("ends in \\", "%\\", false));
    }

    #[test]
    fn test_like_fold() {
        assert!(!like_match("Dune", "dune", false));
        assert!(like_match("Dune", "dUNE", true));
        assert!(like_match("100% PURE", &format!("{}%", escape_like("100%")), true));
        assert!(!like_match("1000 PURE", &format!("{}%", escape_like("100%")), true));
    }

    #[test]
    fn test_null_comparisons_are_unknown() {
        let row = Row::new().with("rating", Value::Null);
        let gt = Predicate::Compare {
            column: Column::new("rating"),
            op: Comparison::Gt,
            value: Value::Int32(3),
            fold: Fold::None,
        };
        assert_eq!(eval(&gt, &row), Truth::Unknown);
        assert_eq!(eval(&gt.clone().negate(), &row), Truth::Unknown);
    }

    #[test]
    fn test_not_in_with_null_member() {
        let nin = Predicate::InList {
            column: Column::new("rating"),
            values: vec![Value::Int32(1), Value::Null],
            negated: true,
        };
        assert_eq!(eval(&nin, &Row::new().with("rating", 5i32)), Truth::Unknown);
        assert_eq!(eval(&nin, &Row::new().with("rating", 1i32)), Truth::False);
        assert_eq!(eval(&nin, &Row::new().with("rating", Value::Null)), Truth::Unknown);

        let nin = Predicate::InList {
            column: Column::new("rating"),
            values: vec![Value::Int32(1)],
            negated: true,
        };
        assert_eq!(eval(&nin, &Row::new().with("rating", 5i32)), Truth::True);
        assert_eq!(eval(&nin, &Row::new().with("rating", Value::Null)), Truth::Unknown);
    }

    #[test]
    fn test_three_valued_connectives() {
        let unknown = Predicate::Compare {
            column: Column::new("missing"),
            op: Comparison::Eq,
            value: Value::Int32(1),
            fold: Fold::None,
        };
        let row = Row::new();
        assert_eq!(
            eval(&Predicate::And(vec![unknown.clone(), Predicate::False]), &row),
            Truth::False
        );
        assert_eq!(
            eval(&Predicate::Or(vec![unknown.clone(), Predicate::True]), &row),
            Truth::True
        );
        assert_eq!(eval(&Predicate::Or(vec![unknown, Predicate::False]), &row), Truth::Unknown);
        assert_eq!(eval(&Predicate::And(vec![]), &row), Truth::True);
        assert_eq!(eval(&Predicate::Or(vec![]), &row), Truth::False);
    }

    #[test]
    fn test_case_folding() {
        let row = Row::new().with("title", "Dune");
        let eq_folded = Predicate::Compare {
            column: Column::new("title"),
            op: Comparison::Eq,
            value: Value::from("DUNE"),
            fold: Fold::Both,
        };
        assert_eq!(eval(&eq_folded, &row), Truth::True);

        let lower = Predicate::Compare {
            column: Column::new("title"),
            op: Comparison::Eq,
            value: Value::from("DUNE"),
            fold: Fold::Column,
        };
        assert_eq!(eval(&lower, &row), Truth::False);
    }

    #[test]
    fn test_between_is_inclusive() {
        let between = Predicate::Between {
            column: Column::new("year"),
            low: Value::Int32(1990),
            high: Value::Int32(2000),
            negated: false,
        };
        assert!(eval(&between, &Row::new().with("year", 1990i32)).is_true());
        assert!(eval(&between, &Row::new().with("year", 2000i32)).is_true());
        assert!(!eval(&between, &Row::new().with("year", 2001i32)).is_true());
    }

    #[test]
    fn test_correlated_exists() {
        let exists = Predicate::Exists(Box::new(Subquery {
            entity: "Book".into(),
            outer: Column::new("id"),
            inner: Column::new("author_id"),
            predicate: Predicate::equals(Column::new("id"), Value::Int64(2)),
        }));
        assert!(eval(&exists, &Row::new().with("id", 2i64)).is_true());
        assert!(!eval(&exists, &Row::new().with("id", 1i64)).is_true());
        assert!(!eval(&exists, &Row::new().with("id", Value::Null)).is_true());
    }

    #[test]
    fn test_sort_order_puts_nulls_first() {
        assert_eq!(sort_order(None, Some(&Value::Int32(1))), Ordering::Less);
        assert_eq!(
            sort_order(Some(&Value::Null), Some(&Value::Int32(1))),
            Ordering::Less
        );
        assert_eq!(
            sort_order(Some(&Value::Int64(3)), Some(&Value::Int32(2))),
            Ordering::Greater
        );
    }
}
