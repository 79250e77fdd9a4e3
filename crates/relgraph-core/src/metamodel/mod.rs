//! Metamodel: the externally supplied description of entities, embeddables
//! and their attributes.

mod attribute;
mod entity;
mod types;
mod view;

pub use attribute::{Association, AttributeDescriptor, AttributeKind};
pub use entity::{EmbeddableDescriptor, EntityDescriptor};
pub use types::{AttributeType, ScalarType};
pub use view::{MetamodelView, StaticMetamodel};
