//! Storage collaborator interface.

use async_trait::async_trait;
use relgraph_proto::Value;

use crate::error::StoreError;

use super::predicate::{Column, RelationalQuery};

/// One fetched row: named column values in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an existing value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a column, replacing an existing value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Value of a column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Value at a column path, descending into embedded objects.
    pub fn resolve(&self, column: &Column) -> Option<&Value> {
        let (first, rest) = column.0.split_first()?;
        rest.iter()
            .try_fold(self.get(first)?, |value, member| value.member(member))
    }

    /// All columns.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

impl From<Vec<(String, Value)>> for Row {
    fn from(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }
}

/// The relational storage engine the executor reads through.
///
/// Each call is one statement. Implementations provide transactional reads
/// and evaluate predicates, correlated subqueries and order terms.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Rows matching the query, ordered and windowed.
    async fn fetch(&self, query: &RelationalQuery) -> Result<Vec<Row>, StoreError>;

    /// Number of rows matching the query, ignoring its window.
    async fn count(&self, query: &RelationalQuery) -> Result<u64, StoreError>;
}
