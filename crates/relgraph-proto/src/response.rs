//! Response envelope: a data tree plus path-localized errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A query response.
///
/// A field that failed is answered as `null` in `data` and has an entry in
/// `errors` whose path points at it; its siblings are answered normally.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    /// Result tree.
    pub data: serde_json::Value,
    /// Errors, in the order they were raised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
}

impl Response {
    /// Create a response.
    pub fn new(data: serde_json::Value, errors: Vec<GraphError>) -> Self {
        Self { data, errors }
    }

    /// Create a response carrying only errors.
    pub fn failed(errors: Vec<GraphError>) -> Self {
        Self {
            data: serde_json::Value::Null,
            errors,
        }
    }

    /// Whether the response has no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors of one kind.
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &GraphError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Find the first error reported at `path` (dot-separated).
    pub fn error_at(&self, path: &str) -> Option<&GraphError> {
        self.errors.iter().find(|e| e.path_string() == path)
    }

    /// Navigate `data` with a dot-separated path; numeric segments index lists.
    pub fn pointer(&self, path: &str) -> Option<&serde_json::Value> {
        path.split('.')
            .filter(|seg| !seg.is_empty())
            .try_fold(&self.data, |node, seg| match seg.parse::<usize>() {
                Ok(index) => node.get(index),
                Err(_) => node.get(seg),
            })
    }
}

/// Kind of a field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The document does not fit the surface (unknown field, bad argument).
    Validation,
    /// The storage collaborator failed while resolving the field.
    Resolution,
    /// The access policy denied the field.
    Authorization,
    /// The request was cancelled or ran past its deadline.
    Cancelled,
}

/// One element of an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A response key.
    Field(String),
    /// A list position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        PathSegment::Field(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        PathSegment::Field(name)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A field error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphError {
    /// Human-readable message.
    pub message: String,
    /// Path of the failed field from the root.
    pub path: Vec<PathSegment>,
    /// Error kind.
    pub kind: ErrorKind,
}

impl GraphError {
    /// Create an error.
    pub fn new(kind: ErrorKind, message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            path,
            kind,
        }
    }

    /// Render the path dot-separated, e.g. `Books.select.0.author`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.path_string())
    }
}
