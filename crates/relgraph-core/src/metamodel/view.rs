//! Read-only metamodel access.

use super::entity::{EmbeddableDescriptor, EntityDescriptor};

/// Read-only view of a metamodel, consumed once by the schema compiler.
///
/// Adapters for a concrete ORM or catalog implement this outside the core.
/// Iteration order is declaration order and determines the order of root
/// fields on the compiled surface.
pub trait MetamodelView: Send + Sync {
    /// All entity types.
    fn entities(&self) -> Vec<&EntityDescriptor>;

    /// All embeddable types.
    fn embeddables(&self) -> Vec<&EmbeddableDescriptor>;

    /// Look up an entity by name.
    fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities().into_iter().find(|e| e.name == name)
    }

    /// Look up an embeddable by name.
    fn embeddable(&self, name: &str) -> Option<&EmbeddableDescriptor> {
        self.embeddables().into_iter().find(|e| e.name == name)
    }
}

/// A metamodel held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticMetamodel {
    entities: Vec<EntityDescriptor>,
    embeddables: Vec<EmbeddableDescriptor>,
}

impl StaticMetamodel {
    /// Create an empty metamodel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity.
    pub fn with_entity(mut self, entity: EntityDescriptor) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add an embeddable.
    pub fn with_embeddable(mut self, embeddable: EmbeddableDescriptor) -> Self {
        self.embeddables.push(embeddable);
        self
    }
}

impl MetamodelView for StaticMetamodel {
    fn entities(&self) -> Vec<&EntityDescriptor> {
        self.entities.iter().collect()
    }

    fn embeddables(&self) -> Vec<&EmbeddableDescriptor> {
        self.embeddables.iter().collect()
    }

    fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|e| e.name == name)
    }

    fn embeddable(&self, name: &str) -> Option<&EmbeddableDescriptor> {
        self.embeddables.iter().find(|e| e.name == name)
    }
}
