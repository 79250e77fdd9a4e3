//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The document is not valid JSON or does not match the document shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The document decoded but is structurally invalid.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
