//! relgraph core - schema compiler, predicate translator and batched
//! query executor.
//!
//! A [`MetamodelView`](metamodel::MetamodelView) describing entities and
//! embeddables is compiled once into an immutable
//! [`QuerySurface`](surface::QuerySurface). Query documents are then bound
//! against that surface, translated into relational statements and executed
//! against a [`RelationalStore`](relational::RelationalStore), with
//! associations loaded in batches so a query runs in a number of statements
//! bounded by its depth.

pub mod config;
pub mod error;
pub mod metamodel;
pub mod query;
pub mod relational;
pub mod security;
pub mod surface;

pub use config::SurfaceConfig;
pub use error::{AuthorizationError, CompileError, QueryError, StoreError, ValidationError};
pub use metamodel::{
    AttributeDescriptor, AttributeKind, AttributeType, EmbeddableDescriptor, EntityDescriptor,
    MetamodelView, ScalarType, StaticMetamodel,
};
pub use query::{Cancellation, ExecutionStats, QueryExecutor};
pub use relational::{MemoryStore, RelationalStore, Row};
pub use security::{AccessPolicy, AllowAll, DenyList};
pub use surface::{compile, QuerySurface};

/// Re-export protocol types.
pub use relgraph_proto as proto;
