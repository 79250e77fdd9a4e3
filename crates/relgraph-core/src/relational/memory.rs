//! In-process table store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use relgraph_proto::{Value, ValueKey};
use tracing::trace;

use crate::error::StoreError;

use super::eval::{sort_order, Evaluator};
use super::predicate::{Direction, Predicate, RelationalQuery};
use super::store::{RelationalStore, Row};

/// A [`RelationalStore`] holding every table in memory.
///
/// Rows are kept in insertion order, which is also the order of unordered
/// fetches. Every statement is logged so callers can count round trips.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    statements: Mutex<Vec<String>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table. Fetching from an undeclared table fails.
    pub fn create_table(&self, entity: impl Into<String>) {
        self.tables.write().entry(entity.into()).or_default();
    }

    /// Append a row to a table, creating the table if needed.
    pub fn insert(&self, entity: impl Into<String>, row: Row) {
        self.tables.write().entry(entity.into()).or_default().push(row);
    }

    /// Number of rows in a table.
    pub fn row_count(&self, entity: &str) -> usize {
        self.tables.read().get(entity).map_or(0, Vec::len)
    }

    /// Make every statement against `entity` fail.
    pub fn fail_entity(&self, entity: impl Into<String>) {
        self.failing.write().insert(entity.into());
    }

    /// Stop failing statements against `entity`.
    pub fn heal_entity(&self, entity: &str) {
        self.failing.write().remove(entity);
    }

    /// Statements issued so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Number of statements issued so far.
    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    /// Number of statements issued against `entity`.
    pub fn statements_against(&self, entity: &str) -> usize {
        self.statements
            .lock()
            .iter()
            .filter(|s| s.split_whitespace().skip_while(|w| *w != "FROM").nth(1) == Some(entity))
            .count()
    }

    /// Forget logged statements.
    pub fn reset_statements(&self) {
        self.statements.lock().clear();
    }

    fn record(&self, statement: String) {
        trace!(%statement, "memory store statement");
        self.statements.lock().push(statement);
    }

    fn check_available(&self, entity: &str) -> Result<(), StoreError> {
        if self.failing.read().contains(entity) {
            return Err(StoreError::Unavailable(format!("table {entity} is offline")));
        }
        Ok(())
    }

    /// Matching rows, ordered and deduplicated, before the window.
    fn select(&self, query: &RelationalQuery) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read();
        let eval = Evaluator::new(&tables);

        let mut rows = Vec::new();
        for row in eval.table(&query.entity)? {
            if eval.evaluate(&query.predicate, row)?.is_true() {
                rows.push(row);
            }
        }

        if !query.order_by.is_empty() {
            let mut keyed = Vec::with_capacity(rows.len());
            for row in rows {
                let mut keys = Vec::with_capacity(query.order_by.len());
                for term in &query.order_by {
                    keys.push(eval.resolve_path(row, &term.path)?.cloned());
                }
                keyed.push((keys, row));
            }
            keyed.sort_by(|(a, _), (b, _)| {
                for ((term, a), b) in query.order_by.iter().zip(a).zip(b) {
                    let cmp = sort_order(a.as_ref(), b.as_ref());
                    let cmp = match term.direction {
                        Direction::Asc => cmp,
                        Direction::Desc => cmp.reverse(),
                    };
                    if cmp.is_ne() {
                        return cmp;
                    }
                }
                std::cmp::Ordering::Equal
            });
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }

        let rows: Vec<Row> = match &query.distinct_on {
            Some(column) => {
                let mut seen = HashSet::new();
                rows.into_iter()
                    .filter(|row| {
                        let key = row.resolve(column).cloned().unwrap_or(Value::Null);
                        seen.insert(ValueKey(key))
                    })
                    .cloned()
                    .collect()
            }
            None => rows.into_iter().cloned().collect(),
        };
        Ok(rows)
    }
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn fetch(&self, query: &RelationalQuery) -> Result<Vec<Row>, StoreError> {
        self.record(query.to_string());
        self.check_available(&query.entity)?;

        let mut rows = self.select(query)?;
        let offset = query.window.offset.min(rows.len());
        rows.drain(..offset);
        if let Some(limit) = query.window.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, query: &RelationalQuery) -> Result<u64, StoreError> {
        let mut text = format!("SELECT COUNT(*) FROM {}", query.entity);
        if query.predicate != Predicate::True {
            text.push_str(&format!(" WHERE {}", query.predicate));
        }
        self.record(text);
        self.check_available(&query.entity)?;

        Ok(self.select(query)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::predicate::{Column, OrderTerm, ValuePath, Window};

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, title, year) in [(1i64, "Emma", 1815i32), (2, "Dune", 1965), (3, "Ulysses", 1922)] {
            store.insert(
                "Book",
                Row::new().with("id", id).with("title", title).with("year", year),
            );
        }
        store
    }

    #[tokio::test]
    async fn test_fetch_orders_and_windows() {
        let store = store();
        let query = RelationalQuery::new("Book")
            .with_order(vec![OrderTerm {
                path: ValuePath::column(Column::new("year")),
                direction: Direction::Desc,
            }])
            .with_window(Window {
                offset: 1,
                limit: Some(1),
            });

        let rows = store.fetch(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("Ulysses")));
        assert_eq!(store.count(&query).await.unwrap(), 3);
        assert_eq!(store.statement_count(), 2);
        assert_eq!(store.statements_against("Book"), 2);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = store();
        let err = store.fetch(&RelationalQuery::new("Film")).await.unwrap_err();
        assert_eq!(err, StoreError::UnknownTable("Film".into()));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = store();
        store.fail_entity("Book");
        let err = store.fetch(&RelationalQuery::new("Book")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.heal_entity("Book");
        let rows = store
            .fetch(
                &RelationalQuery::new("Book")
                    .with_predicate(Predicate::equals(Column::new("id"), Value::Int64(2))),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_on_keeps_first() {
        let store = MemoryStore::new();
        store.insert("Tag", Row::new().with("id", 1i64).with("name", "a"));
        store.insert("Tag", Row::new().with("id", 1i64).with("name", "b"));
        let rows = store
            .fetch(&RelationalQuery::new("Tag").with_distinct_on(Some(Column::new("id"))))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("a")));
    }
}
