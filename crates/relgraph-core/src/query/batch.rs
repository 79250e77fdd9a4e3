//! Batched association loading.
//!
//! During a wave every parent row that needs an association registers its
//! join key with the [`BatchCoordinator`]. Registrations that share a
//! [`BatchKey`] are flushed as one statement, and the rows are partitioned
//! back to each parent by join key, the same build-and-probe split a hash
//! join does.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::channel::oneshot;
use futures::future::join_all;
use parking_lot::Mutex;
use relgraph_proto::{CriteriaNode, Value, ValueKey};
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::relational::{Column, Predicate, RelationalStore, Row, Window};
use crate::surface::QuerySurface;

use super::bound::OrderRequest;
use super::fingerprint::ArgumentFingerprint;
use super::translator::PredicateTranslator;

/// Requests sharing a key are answered by one statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Entity owning the association.
    pub entity: String,
    /// Association attribute.
    pub association: String,
    /// Effective arguments.
    pub fingerprint: ArgumentFingerprint,
}

/// What a batch fetches.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    /// Target entity.
    pub target: String,
    /// Target column matched against the parent keys.
    pub remote_key: String,
    /// Keep every matching row per parent, or only the first.
    pub to_many: bool,
    /// Criteria on the target.
    pub criteria: Option<CriteriaNode>,
    /// Ordering of the target rows.
    pub order: Vec<OrderRequest>,
}

impl BatchSpec {
    /// Key of this spec for an association of `entity`.
    pub fn key(&self, entity: &str, association: &str) -> BatchKey {
        BatchKey {
            entity: entity.to_string(),
            association: association.to_string(),
            fingerprint: ArgumentFingerprint::new(self.criteria.as_ref(), &self.order),
        }
    }
}

type Reply = Result<Vec<Row>, QueryError>;

struct PendingBatch {
    spec: BatchSpec,
    /// Distinct parent keys in registration order.
    parents: Vec<Value>,
    seen: HashSet<ValueKey>,
    waiters: Vec<(ValueKey, oneshot::Sender<Reply>)>,
}

/// Rows for one parent, available once the batch holding it is flushed.
pub struct Deferred {
    receiver: oneshot::Receiver<Reply>,
}

impl Deferred {
    /// Wait for the flush.
    pub async fn wait(self) -> Reply {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(QueryError::Cancelled("batch was dropped before it ran".into())))
    }
}

/// Collects association requests for a wave and flushes them in batches.
pub struct BatchCoordinator<'a> {
    surface: &'a QuerySurface,
    store: &'a dyn RelationalStore,
    pending: Mutex<HashMap<BatchKey, PendingBatch>>,
    flushed: AtomicUsize,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(surface: &'a QuerySurface, store: &'a dyn RelationalStore) -> Self {
        Self {
            surface,
            store,
            pending: Mutex::new(HashMap::new()),
            flushed: AtomicUsize::new(0),
        }
    }

    /// Register one parent's join key. The same key registered twice in a
    /// batch is fetched once.
    pub fn register(&self, key: BatchKey, spec: &BatchSpec, parent: Value) -> Deferred {
        let (sender, receiver) = oneshot::channel();
        let parent = ValueKey(parent);

        let mut pending = self.pending.lock();
        let batch = pending.entry(key).or_insert_with(|| PendingBatch {
            spec: spec.clone(),
            parents: Vec::new(),
            seen: HashSet::new(),
            waiters: Vec::new(),
        });
        if batch.seen.insert(parent.clone()) {
            batch.parents.push(parent.0.clone());
        }
        batch.waiters.push((parent, sender));

        Deferred { receiver }
    }

    /// Number of batches waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Batches flushed so far; each is one statement.
    pub fn flushed(&self) -> usize {
        self.flushed.load(Ordering::Relaxed)
    }

    /// Flush every pending batch concurrently.
    pub async fn dispatch(&self) {
        let batches: Vec<(BatchKey, PendingBatch)> = self.pending.lock().drain().collect();
        if batches.is_empty() {
            return;
        }
        self.flushed.fetch_add(batches.len(), Ordering::Relaxed);
        join_all(batches.into_iter().map(|(key, batch)| self.flush(key, batch))).await;
    }

    async fn flush(&self, key: BatchKey, batch: PendingBatch) {
        let PendingBatch {
            spec,
            parents,
            waiters,
            ..
        } = batch;
        let parent_count = parents.len();

        match self.fetch(&spec, parents).await {
            Ok(rows) => {
                debug!(
                    entity = %key.entity,
                    association = %key.association,
                    parents = parent_count,
                    rows = rows.len(),
                    "flushed association batch"
                );
                let mut partitions: HashMap<ValueKey, Vec<Row>> = HashMap::new();
                for row in rows {
                    let join = row.get(&spec.remote_key).cloned().unwrap_or(Value::Null);
                    partitions.entry(ValueKey(join)).or_default().push(row);
                }
                for (parent, sender) in waiters {
                    let mut rows = partitions.get(&parent).cloned().unwrap_or_default();
                    if !spec.to_many {
                        rows.truncate(1);
                    }
                    // The receiver is gone when the execution was abandoned.
                    let _ = sender.send(Ok(rows));
                }
            }
            Err(err) => {
                warn!(
                    entity = %key.entity,
                    association = %key.association,
                    parents = parent_count,
                    error = %err,
                    "association batch failed"
                );
                for (_, sender) in waiters {
                    let _ = sender.send(Err(err.clone()));
                }
            }
        }
    }

    async fn fetch(&self, spec: &BatchSpec, parents: Vec<Value>) -> Reply {
        let query = PredicateTranslator::new(self.surface)
            .translate(
                &spec.target,
                spec.criteria.as_ref(),
                &spec.order,
                Window::default(),
                false,
            )?
            .and_where(Predicate::key_in(Column::new(&spec.remote_key), parents));
        Ok(self.store.fetch(&query).await?)
    }
}
