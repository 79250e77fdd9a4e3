//! Access control for query execution.
//!
//! The core does not authenticate anyone. It consults an [`AccessPolicy`]
//! supplied by the embedding application for every entity and attribute a
//! document selects, and localizes each denial to the denied field.
//!
//! # Example
//!
//! ```
//! use relgraph_core::security::{AccessPolicy, DenyList};
//!
//! let policy = DenyList::new().deny_field("Author", "email");
//! assert!(policy.check_field("Author", "name").is_ok());
//! assert!(policy.check_field("Author", "email").is_err());
//! ```

mod policy;

pub use policy::{AccessPolicy, AllowAll, DenyList};
