//! Core error types.

use std::sync::Arc;

use relgraph_proto::{ErrorKind, GraphError, PathSegment};
use thiserror::Error;

/// Fatal schema compilation errors. Compilation aborts on the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An attribute type has no surface mapping.
    #[error("cannot map {entity}.{attribute} of type `{type_name}` to a surface type")]
    Unmappable {
        entity: String,
        attribute: String,
        type_name: String,
    },

    /// An association or embedded attribute names a type the metamodel does not have.
    #[error("{entity}.{attribute} references unknown type `{target}`")]
    UnknownTarget {
        entity: String,
        attribute: String,
        target: String,
    },

    /// The identity attribute is missing or unusable.
    #[error("entity {entity} has no usable identity: {reason}")]
    InvalidIdentity { entity: String, reason: String },

    /// Two attributes of one type share a name.
    #[error("{owner} declares attribute `{attribute}` more than once")]
    DuplicateAttribute { owner: String, attribute: String },

    /// Two sources derive the same surface name.
    #[error("name `{name}` is derived by both {first} and {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    /// One enum name is declared with different variants.
    #[error("enum `{name}` is declared with conflicting variants")]
    EnumConflict { name: String },

    /// A type was referenced but never built.
    #[error("type `{name}` was referenced but never defined")]
    Unresolved { name: String },

    /// A type slot was filled twice.
    #[error("type `{name}` was defined twice")]
    Redefined { name: String },
}

/// Errors raised by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store has no table for the entity.
    #[error("unknown table `{0}`")]
    UnknownTable(String),

    /// The store could not serve the statement.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The statement was rejected.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
}

/// The document does not fit the surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The access policy denied an entity or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// Reading the entity is not allowed.
    #[error("access to {entity} denied")]
    EntityDenied { entity: String },

    /// Reading the attribute is not allowed.
    #[error("access to {entity}.{attribute} denied")]
    FieldDenied { entity: String, attribute: String },
}

/// Per-field query errors. They are localized to the path of the field that
/// raised them and never abort sibling fields.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Unknown field, bad argument or malformed operand.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed; every request of a failed batch shares one error.
    #[error("resolution failed: {0}")]
    Resolution(Arc<StoreError>),

    /// The access policy denied the field.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// The execution was cancelled or ran past its deadline.
    #[error("execution cancelled: {0}")]
    Cancelled(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::Resolution(Arc::new(err))
    }
}

impl QueryError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        QueryError::Validation(ValidationError::new(message))
    }

    /// Error kind reported in the response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Validation(_) => ErrorKind::Validation,
            QueryError::Resolution(_) => ErrorKind::Resolution,
            QueryError::Authorization(_) => ErrorKind::Authorization,
            QueryError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Convert into a response error at `path`.
    pub fn at(&self, path: Vec<PathSegment>) -> GraphError {
        GraphError::new(self.kind(), self.to_string(), path)
    }
}
