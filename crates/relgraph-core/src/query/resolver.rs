//! Per-row association resolution.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use relgraph_proto::Value;

use crate::error::QueryError;
use crate::relational::{Column, Predicate, RelationalQuery, RelationalStore, Row, Window};
use crate::surface::QuerySurface;

use super::batch::{BatchCoordinator, BatchKey, BatchSpec, Deferred};
use super::bound::AssociationField;
use super::translator::PredicateTranslator;

/// How the rows of one association field are fetched, decided once per
/// field and applied to every parent row.
#[derive(Debug, Clone)]
pub enum AssociationPlan {
    /// Register with the batch coordinator.
    Batched { key: BatchKey, spec: BatchSpec },
    /// Fetch per parent with the parent key added to `query`.
    Direct {
        query: RelationalQuery,
        remote_key: String,
        to_many: bool,
    },
}

/// Rows of one association for one parent row.
pub enum Resolution<'a> {
    /// Known without a statement.
    Ready(Result<Vec<Row>, QueryError>),
    /// Answered when the coordinator flushes.
    Deferred(Deferred),
    /// A per-parent fetch to run in the current wave.
    Direct(BoxFuture<'a, Result<Vec<Row>, QueryError>>),
}

/// Decides per parent row whether an association is answered from a batch
/// or from its own statement.
pub struct AssociationResolver<'a> {
    surface: &'a QuerySurface,
    store: &'a dyn RelationalStore,
    coordinator: &'a BatchCoordinator<'a>,
    direct: AtomicUsize,
}

impl<'a> AssociationResolver<'a> {
    pub fn new(
        surface: &'a QuerySurface,
        store: &'a dyn RelationalStore,
        coordinator: &'a BatchCoordinator<'a>,
    ) -> Self {
        Self {
            surface,
            store,
            coordinator,
            direct: AtomicUsize::new(0),
        }
    }

    /// Plan an association field.
    ///
    /// A field with an explicit `where` or ordering that is also optional is
    /// fetched per parent; everything else is batched. To-many fields carry their
    /// selection's ordering, to-one fields take the first matching row.
    pub fn plan(&self, field: &AssociationField) -> Result<AssociationPlan, QueryError> {
        let criteria = field.fetch_criteria();
        let order = if field.to_many {
            field.selection.order.clone()
        } else {
            Vec::new()
        };

        let explicit = field.criteria.is_some() || !order.is_empty();
        if explicit && field.optional {
            let query = PredicateTranslator::new(self.surface).translate(
                &field.target,
                criteria.as_ref(),
                &order,
                Window::default(),
                false,
            )?;
            return Ok(AssociationPlan::Direct {
                query,
                remote_key: field.remote_key.clone(),
                to_many: field.to_many,
            });
        }

        let spec = BatchSpec {
            target: field.target.clone(),
            remote_key: field.remote_key.clone(),
            to_many: field.to_many,
            criteria,
            order,
        };
        Ok(AssociationPlan::Batched {
            key: spec.key(&field.owner, &field.attribute),
            spec,
        })
    }

    /// Resolve a planned field for one parent row.
    pub fn resolve(&self, plan: &AssociationPlan, local_key: &str, parent: &Row) -> Resolution<'a> {
        let join = match parent.get(local_key) {
            None | Some(Value::Null) => return Resolution::Ready(Ok(Vec::new())),
            Some(value) => value.clone(),
        };

        match plan {
            AssociationPlan::Batched { key, spec } => {
                Resolution::Deferred(self.coordinator.register(key.clone(), spec, join))
            }
            AssociationPlan::Direct {
                query,
                remote_key,
                to_many,
            } => {
                self.direct.fetch_add(1, Ordering::Relaxed);
                let query = query
                    .clone()
                    .and_where(Predicate::equals(Column::new(remote_key), join));
                let to_many = *to_many;
                let store = self.store;
                Resolution::Direct(
                    async move {
                        let mut rows = store.fetch(&query).await?;
                        if !to_many {
                            rows.truncate(1);
                        }
                        Ok::<_, QueryError>(rows)
                    }
                    .boxed(),
                )
            }
        }
    }

    /// Per-parent fetches started so far.
    pub fn direct_fetches(&self) -> usize {
        self.direct.load(Ordering::Relaxed)
    }
}
