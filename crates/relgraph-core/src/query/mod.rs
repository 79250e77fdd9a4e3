//! Query execution.
//!
//! A [`QueryDocument`](relgraph_proto::QueryDocument) is bound against the
//! surface by the [`Binder`], translated into relational statements by the
//! [`PredicateTranslator`] and run by the [`QueryExecutor`], which resolves
//! associations in waves through the [`BatchCoordinator`].

mod batch;
mod binder;
mod bound;
mod executor;
mod fingerprint;
mod output;
mod resolver;
mod translator;

pub use batch::{BatchCoordinator, BatchKey, BatchSpec, Deferred};
pub use binder::Binder;
pub use bound::{
    decode_cursor, encode_cursor, AssociationField, BoundField, BoundRoot, EntitySelection,
    FieldKind, OrderRequest, Paging, RootKind,
};
pub use executor::{Cancellation, ExecutionStats, QueryExecutor};
pub use fingerprint::ArgumentFingerprint;
pub use resolver::{AssociationPlan, AssociationResolver, Resolution};
pub use translator::PredicateTranslator;
