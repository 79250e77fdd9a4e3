//! Relational query IR, the storage collaborator trait and an in-memory
//! reference store.

mod eval;
mod memory;
mod predicate;
mod store;

pub use eval::{compare_values, escape_like, like_match, sort_order, values_equal, Evaluator, Truth};
pub use memory::MemoryStore;
pub use predicate::{
    Column, Comparison, Direction, Fold, Join, OrderTerm, Predicate, RelationalQuery, Subquery,
    ValuePath, Window,
};
pub use store::{RelationalStore, Row};
