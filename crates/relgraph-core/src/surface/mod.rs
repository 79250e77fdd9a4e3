//! Typed query surface derived from a metamodel.
//!
//! [`compile`] walks a [`MetamodelView`] once and produces an immutable
//! [`QuerySurface`]: object, collection and criteria types per entity, shared
//! filter types per scalar and enum, and the root operation types.

mod cache;
mod compiler;
mod naming;
mod operators;
mod sdl;
mod types;

use std::collections::HashMap;

pub use cache::{TypeCache, TypeKey};
pub use compiler::SchemaCompiler;
pub use naming::{plural_name, type_name};
pub use operators::{enum_operators, scalar_operators};
pub use types::{
    ArgumentDef, FieldBinding, GeneratedType, MetaField, SurfaceField, TypeId, TypeKind, TypeRef,
    TypeRole, TypeSource,
};

use crate::config::SurfaceConfig;
use crate::error::CompileError;
use crate::metamodel::{EmbeddableDescriptor, EntityDescriptor, MetamodelView};

/// Compile a metamodel into a query surface.
pub fn compile(view: &dyn MetamodelView, config: SurfaceConfig) -> Result<QuerySurface, CompileError> {
    SchemaCompiler::new(view, config).compile()
}

/// A compiled, immutable query surface.
///
/// Shared across concurrent executions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QuerySurface {
    types: Vec<GeneratedType>,
    by_name: HashMap<String, TypeId>,
    query: TypeId,
    subscription: Option<TypeId>,
    entities: HashMap<String, EntityDescriptor>,
    embeddables: HashMap<String, EmbeddableDescriptor>,
    config: SurfaceConfig,
}

impl QuerySurface {
    pub(crate) fn new(
        types: Vec<GeneratedType>,
        query: TypeId,
        subscription: Option<TypeId>,
        entities: HashMap<String, EntityDescriptor>,
        embeddables: HashMap<String, EmbeddableDescriptor>,
        config: SurfaceConfig,
    ) -> Self {
        let by_name = types
            .iter()
            .enumerate()
            .map(|(index, ty)| (ty.name.clone(), TypeId(index)))
            .collect();
        Self {
            types,
            by_name,
            query,
            subscription,
            entities,
            embeddables,
            config,
        }
    }

    /// All generated types in generation order.
    pub fn types(&self) -> &[GeneratedType] {
        &self.types
    }

    /// Number of generated types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Resolve a type id produced by this surface.
    pub fn get(&self, id: TypeId) -> &GeneratedType {
        &self.types[id.0]
    }

    /// Look up a type by surface name.
    pub fn type_named(&self, name: &str) -> Option<&GeneratedType> {
        self.by_name.get(name).map(|id| self.get(*id))
    }

    /// Id of a type by surface name.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// The query root.
    pub fn query_type(&self) -> &GeneratedType {
        self.get(self.query)
    }

    /// The subscription root, when enabled.
    pub fn subscription_type(&self) -> Option<&GeneratedType> {
        self.subscription.map(|id| self.get(id))
    }

    /// Field `field` of type `type_name`.
    pub fn field(&self, type_name: &str, field: &str) -> Option<&SurfaceField> {
        self.type_named(type_name)?.field(field)
    }

    /// Entity descriptor by metamodel name.
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// Embeddable descriptor by metamodel name.
    pub fn embeddable(&self, name: &str) -> Option<&EmbeddableDescriptor> {
        self.embeddables.get(name)
    }

    /// The configuration the surface was compiled with.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Render a type reference in SDL notation, e.g. `[Book!]!`.
    pub fn render_type(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Scalar(scalar) => scalar.surface_name().to_string(),
            TypeRef::Named(id) => self.get(*id).name.clone(),
            TypeRef::List(inner) => format!("[{}]", self.render_type(inner)),
            TypeRef::NonNull(inner) => format!("{}!", self.render_type(inner)),
        }
    }

    /// Print the surface as SDL.
    pub fn to_sdl(&self) -> String {
        sdl::print(self)
    }
}
