//! relgraph protocol types.
//!
//! This crate defines the types exchanged between a transport and the relgraph
//! core: runtime values, criteria trees, parsed query documents and the
//! response envelope.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for operands, rows and results
//! - [`criteria`] - Criteria tree built from filter arguments
//! - [`document`] - Parsed query documents
//! - [`response`] - Response data and path-localized errors
//! - [`error`] - Protocol error types
//!
//! # Serialization
//!
//! All types derive `serde::Serialize` and `serde::Deserialize`. Documents are
//! decoded from JSON:
//!
//! ```
//! use relgraph_proto::QueryDocument;
//!
//! let doc = QueryDocument::from_json(r#"{"selection": [{"name": "Books"}]}"#).unwrap();
//! assert_eq!(doc.selection[0].name, "Books");
//! ```

pub mod criteria;
pub mod document;
pub mod error;
pub mod response;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use criteria::{CriteriaNode, LogicalOp, Operator};
pub use document::{Argument, OperationKind, QueryDocument, Selection};
pub use response::{ErrorKind, GraphError, PathSegment, Response};
pub use value::{format_uuid, parse_uuid, Value, ValueKey};
