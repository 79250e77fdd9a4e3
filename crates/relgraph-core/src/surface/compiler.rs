//! Schema compiler: metamodel in, query surface out.

use std::collections::{HashMap, HashSet};

use relgraph_proto::LogicalOp;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::config::SurfaceConfig;
use crate::error::CompileError;
use crate::metamodel::{
    AttributeDescriptor, AttributeKind, AttributeType, EmbeddableDescriptor, EntityDescriptor,
    MetamodelView, ScalarType,
};

use super::cache::{TypeCache, TypeKey};
use super::naming::{plural_name, type_name};
use super::operators::{enum_operators, scalar_operators};
use super::types::{
    ArgumentDef, FieldBinding, GeneratedType, MetaField, SurfaceField, TypeId, TypeKind, TypeRef,
    TypeRole, TypeSource,
};
use super::QuerySurface;

const QUERY: &str = "Query";
const SUBSCRIPTION: &str = "Subscription";
const PAGE: &str = "Page";
const PAGE_INFO: &str = "PageInfo";
const ORDER_BY: &str = "OrderBy";

/// Compiles a metamodel into a [`QuerySurface`].
///
/// Every type is reserved in the [`TypeCache`] before its fields are built,
/// so cyclic associations compile to forward references.
pub struct SchemaCompiler<'a> {
    view: &'a dyn MetamodelView,
    config: SurfaceConfig,
    cache: TypeCache,
    /// Variants of every enum seen so far, by enum name.
    enums: HashMap<String, Vec<String>>,
    order_by: Option<TypeId>,
}

impl<'a> SchemaCompiler<'a> {
    /// Create a compiler over a metamodel.
    pub fn new(view: &'a dyn MetamodelView, config: SurfaceConfig) -> Self {
        Self {
            view,
            config,
            cache: TypeCache::new(),
            enums: HashMap::new(),
            order_by: None,
        }
    }

    /// Compile the surface. Aborts on the first error.
    #[instrument(skip_all)]
    pub fn compile(mut self) -> Result<QuerySurface, CompileError> {
        let view = self.view;

        for scalar in ScalarType::ALL {
            self.cache
                .claim_name(scalar.surface_name(), format!("scalar {}", scalar.surface_name()))?;
        }

        let query = self
            .cache
            .reserve(Self::builtin(QUERY, TypeRole::Root), QUERY.to_string())?;
        let subscription = if self.config.enable_subscription {
            Some(
                self.cache
                    .reserve(Self::builtin(SUBSCRIPTION, TypeRole::Root), SUBSCRIPTION.to_string())?,
            )
        } else {
            self.cache.claim_name(SUBSCRIPTION, "builtin Subscription")?;
            None
        };
        let order_by = self.order_by_enum()?;
        self.order_by = Some(order_by);
        let page = self.page_input()?;
        if !self.config.enable_relay {
            self.cache.claim_name(PAGE_INFO, "builtin PageInfo")?;
        }

        let entities: Vec<&EntityDescriptor> =
            view.entities().into_iter().filter(|e| !e.ignored).collect();
        for entity in &entities {
            self.validate_entity(entity)?;
        }

        let mut root_names: HashMap<String, String> = HashMap::new();
        let mut query_fields = Vec::new();
        let mut stream_fields = Vec::new();

        for entity in &entities {
            let object = self.object_type(entity)?;
            let collection = self.collection_type(entity)?;
            let criteria = self.criteria_type(entity, TypeRole::Criteria)?;
            let identity = self.identity_ref(entity)?;

            let by_id = type_name(&entity.name);
            Self::claim_root(&mut root_names, &by_id, entity, "by-identity field")?;
            query_fields.push(
                SurfaceField::new(&by_id, TypeRef::Named(object), FieldBinding::ById(entity.name.clone()))
                    .with_argument(ArgumentDef::new(&entity.identity, TypeRef::non_null(identity)))
                    .with_description(entity.description.clone()),
            );

            let plural = plural_name(&entity.name);
            Self::claim_root(&mut root_names, &plural, entity, "collection field")?;
            query_fields.push(
                SurfaceField::new(
                    &plural,
                    TypeRef::Named(collection),
                    FieldBinding::Collection(entity.name.clone()),
                )
                .with_argument(ArgumentDef::new("where", TypeRef::Named(criteria)))
                .with_argument(ArgumentDef::new("page", TypeRef::Named(page)))
                .with_argument(
                    ArgumentDef::new("distinct", TypeRef::Scalar(ScalarType::Bool))
                        .with_default(json!(self.config.use_distinct)),
                )
                .with_description(Some(format!(
                    "Query {plural} with filtering, ordering and paging"
                ))),
            );

            if self.config.enable_relay {
                let connection = self.connection_type(entity, object)?;
                let name = format!("{plural}Connection");
                Self::claim_root(&mut root_names, &name, entity, "connection field")?;
                query_fields.push(
                    SurfaceField::new(
                        &name,
                        TypeRef::Named(connection),
                        FieldBinding::Connection(entity.name.clone()),
                    )
                    .with_argument(ArgumentDef::new("where", TypeRef::Named(criteria)))
                    .with_argument(ArgumentDef::new("first", TypeRef::Scalar(ScalarType::Int32)))
                    .with_argument(ArgumentDef::new("after", TypeRef::Scalar(ScalarType::String))),
                );
            }

            if subscription.is_some() {
                stream_fields.push(
                    SurfaceField::new(
                        &plural,
                        TypeRef::non_null(TypeRef::Named(object)),
                        FieldBinding::Stream(entity.name.clone()),
                    )
                    .with_argument(ArgumentDef::new("where", TypeRef::Named(criteria))),
                );
            }
        }

        self.cache.fill(
            query,
            Self::support_type(QUERY, TypeRole::Root, TypeKind::Object, query_fields),
        )?;
        if let Some(id) = subscription {
            self.cache.fill(
                id,
                Self::support_type(SUBSCRIPTION, TypeRole::Root, TypeKind::Object, stream_fields),
            )?;
        }

        let type_count = self.cache.len();
        let types = self.cache.finish()?;
        info!(entities = entities.len(), types = type_count, "compiled query surface");

        let entity_map = entities
            .iter()
            .map(|e| (e.name.clone(), (*e).clone()))
            .collect();
        let embeddable_map = view
            .embeddables()
            .into_iter()
            .map(|e| (e.name.clone(), e.clone()))
            .collect();

        Ok(QuerySurface::new(
            types,
            query,
            subscription,
            entity_map,
            embeddable_map,
            self.config,
        ))
    }

    fn builtin(name: &'static str, role: TypeRole) -> TypeKey {
        TypeKey::new(TypeSource::Builtin(name), role)
    }

    fn support_type(
        name: &'static str,
        role: TypeRole,
        kind: TypeKind,
        fields: Vec<SurfaceField>,
    ) -> GeneratedType {
        GeneratedType {
            name: name.to_string(),
            source: TypeSource::Builtin(name),
            role,
            kind,
            fields,
            description: None,
        }
    }

    fn claim_root(
        names: &mut HashMap<String, String>,
        name: &str,
        entity: &EntityDescriptor,
        what: &str,
    ) -> Result<(), CompileError> {
        let owner = format!("{what} of entity {}", entity.name);
        if let Some(first) = names.get(name) {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                first: first.clone(),
                second: owner,
            });
        }
        names.insert(name.to_string(), owner);
        Ok(())
    }

    /// Check attribute uniqueness, the identity and association targets.
    fn validate_entity(&self, entity: &EntityDescriptor) -> Result<(), CompileError> {
        Self::check_unique(&entity.name, &entity.attributes)?;

        let identity = entity
            .identity_attribute()
            .ok_or_else(|| CompileError::InvalidIdentity {
                entity: entity.name.clone(),
                reason: format!("identity attribute `{}` is not declared", entity.identity),
            })?;
        match (identity.kind, &identity.attribute_type) {
            (AttributeKind::Basic, AttributeType::Scalar(_))
            | (AttributeKind::Embedded, AttributeType::Embedded(_)) => {}
            _ => {
                return Err(CompileError::InvalidIdentity {
                    entity: entity.name.clone(),
                    reason: format!(
                        "identity attribute `{}` must be a scalar or embedded attribute",
                        identity.name
                    ),
                })
            }
        }
        if identity.ignored {
            return Err(CompileError::InvalidIdentity {
                entity: entity.name.clone(),
                reason: format!("identity attribute `{}` is ignored", identity.name),
            });
        }

        for attr in entity.associations().filter(|a| !a.ignored) {
            let target = attr
                .association
                .as_ref()
                .map(|a| a.target.as_str())
                .ok_or_else(|| CompileError::Unmappable {
                    entity: entity.name.clone(),
                    attribute: attr.name.clone(),
                    type_name: attr.attribute_type.type_name(),
                })?;
            if self.view.entity(target).is_none() {
                return Err(CompileError::UnknownTarget {
                    entity: entity.name.clone(),
                    attribute: attr.name.clone(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_unique(owner: &str, attributes: &[AttributeDescriptor]) -> Result<(), CompileError> {
        let mut seen = HashSet::new();
        for attr in attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(CompileError::DuplicateAttribute {
                    owner: owner.to_string(),
                    attribute: attr.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn identity_ref(&mut self, entity: &EntityDescriptor) -> Result<TypeRef, CompileError> {
        let view = self.view;
        let identity = entity
            .identity_attribute()
            .ok_or_else(|| CompileError::InvalidIdentity {
                entity: entity.name.clone(),
                reason: format!("identity attribute `{}` is not declared", entity.identity),
            })?;
        match &identity.attribute_type {
            AttributeType::Scalar(scalar) => Ok(TypeRef::Scalar(*scalar)),
            AttributeType::Embedded(name) => {
                let embeddable = view.embeddable(name).ok_or_else(|| CompileError::UnknownTarget {
                    entity: entity.name.clone(),
                    attribute: identity.name.clone(),
                    target: name.clone(),
                })?;
                Ok(TypeRef::Named(self.embedded_input_type(embeddable)?))
            }
            other => Err(CompileError::Unmappable {
                entity: entity.name.clone(),
                attribute: identity.name.clone(),
                type_name: other.type_name(),
            }),
        }
    }

    /// Whether an association is exposed: visible and pointing at a visible
    /// entity.
    fn exposed_target(&self, attr: &AttributeDescriptor) -> Option<&'a EntityDescriptor> {
        let view = self.view;
        let target = view.entity(&attr.association.as_ref()?.target)?;
        if target.ignored {
            debug!(attribute = %attr.name, target = %target.name, "association targets an ignored entity");
            return None;
        }
        Some(target)
    }

    fn object_type(&mut self, entity: &EntityDescriptor) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Entity(entity.name.clone()), TypeRole::Object);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let id = self.cache.reserve(key, type_name(&entity.name))?;

        let mut fields = Vec::new();
        for attr in entity.visible_attributes() {
            let field = match attr.kind {
                AttributeKind::ToOne | AttributeKind::ToMany => {
                    let Some(target) = self.exposed_target(attr) else {
                        continue;
                    };
                    self.association_field(attr, target)?
                }
                _ => self.value_field(&entity.name, attr)?,
            };
            fields.push(field);
        }

        self.cache.fill(
            id,
            GeneratedType {
                name: type_name(&entity.name),
                source: TypeSource::Entity(entity.name.clone()),
                role: TypeRole::Object,
                kind: TypeKind::Object,
                fields,
                description: entity.description.clone(),
            },
        )?;
        Ok(id)
    }

    fn association_field(
        &mut self,
        attr: &AttributeDescriptor,
        target: &EntityDescriptor,
    ) -> Result<SurfaceField, CompileError> {
        let object = self.object_type(target)?;
        let criteria = self.criteria_type(target, TypeRole::Criteria)?;
        let to_many = attr.kind == AttributeKind::ToMany;

        let (ty, optional) = if to_many {
            (
                TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::Named(object)))),
                self.config.default_collection_optional,
            )
        } else {
            let nullable = attr.association.as_ref().is_some_and(|a| a.nullable);
            (TypeRef::Named(object), nullable)
        };

        Ok(SurfaceField::new(
            &attr.name,
            ty,
            FieldBinding::Association {
                attribute: attr.name.clone(),
                to_many,
            },
        )
        .with_argument(ArgumentDef::new("where", TypeRef::Named(criteria)))
        .with_argument(
            ArgumentDef::new("optional", TypeRef::Scalar(ScalarType::Bool)).with_default(json!(optional)),
        )
        .with_description(attr.description.clone()))
    }

    /// Leaf, embedded and element-collection fields of entities and embeddables.
    fn value_field(&mut self, owner: &str, attr: &AttributeDescriptor) -> Result<SurfaceField, CompileError> {
        let field = match attr.kind {
            AttributeKind::Basic => {
                let ty = self.leaf_ref(owner, attr, &attr.attribute_type)?;
                let ty = if attr.nullable { ty } else { TypeRef::non_null(ty) };
                let mut field = SurfaceField::new(&attr.name, ty, FieldBinding::Attribute(attr.name.clone()));
                if attr.orderable {
                    let order_by = self.order_by_enum()?;
                    field = field.with_argument(ArgumentDef::new("orderBy", TypeRef::Named(order_by)));
                }
                field
            }
            AttributeKind::Embedded => {
                let embeddable = self.embeddable_of(owner, attr)?;
                let object = self.embedded_object_type(embeddable)?;
                SurfaceField::new(
                    &attr.name,
                    TypeRef::Named(object),
                    FieldBinding::Embedded(attr.name.clone()),
                )
            }
            AttributeKind::ElementCollection => {
                let element = match &attr.attribute_type {
                    AttributeType::Embedded(_) => {
                        let embeddable = self.embeddable_of(owner, attr)?;
                        TypeRef::Named(self.embedded_object_type(embeddable)?)
                    }
                    other => self.leaf_ref(owner, attr, other)?,
                };
                SurfaceField::new(
                    &attr.name,
                    TypeRef::non_null(TypeRef::list(element)),
                    FieldBinding::ElementCollection(attr.name.clone()),
                )
            }
            AttributeKind::ToOne | AttributeKind::ToMany => {
                return Err(CompileError::Unmappable {
                    entity: owner.to_string(),
                    attribute: attr.name.clone(),
                    type_name: attr.attribute_type.type_name(),
                })
            }
        };
        Ok(field.with_description(attr.description.clone()))
    }

    /// Scalar or enum reference for a leaf value.
    fn leaf_ref(
        &mut self,
        owner: &str,
        attr: &AttributeDescriptor,
        ty: &AttributeType,
    ) -> Result<TypeRef, CompileError> {
        match ty {
            AttributeType::Scalar(scalar) => Ok(TypeRef::Scalar(*scalar)),
            AttributeType::Enum { name, variants } => {
                Ok(TypeRef::Named(self.enum_type(name, variants)?))
            }
            other => Err(CompileError::Unmappable {
                entity: owner.to_string(),
                attribute: attr.name.clone(),
                type_name: other.type_name(),
            }),
        }
    }

    fn embeddable_of(
        &self,
        owner: &str,
        attr: &AttributeDescriptor,
    ) -> Result<&'a EmbeddableDescriptor, CompileError> {
        let view = self.view;
        match &attr.attribute_type {
            AttributeType::Embedded(name) => {
                view.embeddable(name).ok_or_else(|| CompileError::UnknownTarget {
                    entity: owner.to_string(),
                    attribute: attr.name.clone(),
                    target: name.clone(),
                })
            }
            other => Err(CompileError::Unmappable {
                entity: owner.to_string(),
                attribute: attr.name.clone(),
                type_name: other.type_name(),
            }),
        }
    }

    fn embedded_object_type(&mut self, embeddable: &EmbeddableDescriptor) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Embeddable(embeddable.name.clone()), TypeRole::Object);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let id = self.cache.reserve(key, type_name(&embeddable.name))?;
        Self::check_unique(&embeddable.name, &embeddable.attributes)?;

        let mut fields = Vec::new();
        for attr in embeddable.attributes.iter().filter(|a| !a.ignored) {
            fields.push(self.value_field(&embeddable.name, attr)?);
        }

        self.cache.fill(
            id,
            GeneratedType {
                name: type_name(&embeddable.name),
                source: TypeSource::Embeddable(embeddable.name.clone()),
                role: TypeRole::Object,
                kind: TypeKind::Object,
                fields,
                description: embeddable.description.clone(),
            },
        )?;
        Ok(id)
    }

    /// Input mirror of an embeddable, used for composite identity arguments.
    fn embedded_input_type(&mut self, embeddable: &EmbeddableDescriptor) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Embeddable(embeddable.name.clone()), TypeRole::Support);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let name = format!("{}Input", type_name(&embeddable.name));
        let id = self.cache.reserve(key, name.clone())?;

        let mut fields = Vec::new();
        for attr in embeddable.visible_attributes() {
            let ty = match attr.kind {
                AttributeKind::Basic => self.leaf_ref(&embeddable.name, attr, &attr.attribute_type)?,
                AttributeKind::Embedded => {
                    let nested = self.embeddable_of(&embeddable.name, attr)?;
                    TypeRef::Named(self.embedded_input_type(nested)?)
                }
                _ => continue,
            };
            let ty = if attr.nullable { ty } else { TypeRef::non_null(ty) };
            fields.push(SurfaceField::new(
                &attr.name,
                ty,
                FieldBinding::Attribute(attr.name.clone()),
            ));
        }

        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Embeddable(embeddable.name.clone()),
                role: TypeRole::Support,
                kind: TypeKind::Input,
                fields,
                description: None,
            },
        )?;
        Ok(id)
    }

    fn collection_type(&mut self, entity: &EntityDescriptor) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Entity(entity.name.clone()), TypeRole::Collection);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let name = plural_name(&entity.name);
        let id = self.cache.reserve(key, name.clone())?;
        let object = self.object_type(entity)?;

        let mut fields = vec![
            SurfaceField::new(
                "select",
                TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::Named(object)))),
                FieldBinding::Meta(MetaField::Select),
            ),
            SurfaceField::new("total", TypeRef::Scalar(ScalarType::Int64), FieldBinding::Meta(MetaField::Total))
                .with_description(Some("Number of matching rows, ignoring paging".to_string())),
            SurfaceField::new("pages", TypeRef::Scalar(ScalarType::Int64), FieldBinding::Meta(MetaField::Pages)),
        ];

        if self.config.enable_aggregate {
            let aggregate = self.aggregate_type(entity)?;
            fields.push(SurfaceField::new(
                "aggregate",
                TypeRef::Named(aggregate),
                FieldBinding::Meta(MetaField::Aggregate),
            ));
        }

        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Entity(entity.name.clone()),
                role: TypeRole::Collection,
                kind: TypeKind::Object,
                fields,
                description: None,
            },
        )?;
        Ok(id)
    }

    fn aggregate_type(&mut self, entity: &EntityDescriptor) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Entity(entity.name.clone()), TypeRole::Aggregate);
        let name = format!("{}Aggregate", plural_name(&entity.name));
        let id = self.cache.reserve(key, name.clone())?;
        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Entity(entity.name.clone()),
                role: TypeRole::Aggregate,
                kind: TypeKind::Object,
                fields: vec![SurfaceField::new(
                    "count",
                    TypeRef::non_null(TypeRef::Scalar(ScalarType::Int64)),
                    FieldBinding::Meta(MetaField::Count),
                )],
                description: None,
            },
        )?;
        Ok(id)
    }

    fn connection_type(&mut self, entity: &EntityDescriptor, object: TypeId) -> Result<TypeId, CompileError> {
        let plural = plural_name(&entity.name);
        let page_info = self.page_info_type()?;

        let edge_name = format!("{plural}Edge");
        let edge = self.cache.reserve(
            TypeKey::new(TypeSource::Entity(entity.name.clone()), TypeRole::Edge),
            edge_name.clone(),
        )?;
        self.cache.fill(
            edge,
            GeneratedType {
                name: edge_name,
                source: TypeSource::Entity(entity.name.clone()),
                role: TypeRole::Edge,
                kind: TypeKind::Object,
                fields: vec![
                    SurfaceField::new(
                        "cursor",
                        TypeRef::non_null(TypeRef::Scalar(ScalarType::String)),
                        FieldBinding::Meta(MetaField::Cursor),
                    ),
                    SurfaceField::new(
                        "node",
                        TypeRef::non_null(TypeRef::Named(object)),
                        FieldBinding::Meta(MetaField::Node),
                    ),
                ],
                description: None,
            },
        )?;

        let name = format!("{plural}Connection");
        let id = self.cache.reserve(
            TypeKey::new(TypeSource::Entity(entity.name.clone()), TypeRole::Connection),
            name.clone(),
        )?;
        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Entity(entity.name.clone()),
                role: TypeRole::Connection,
                kind: TypeKind::Object,
                fields: vec![
                    SurfaceField::new(
                        "edges",
                        TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::Named(edge)))),
                        FieldBinding::Meta(MetaField::Edges),
                    ),
                    SurfaceField::new(
                        "pageInfo",
                        TypeRef::non_null(TypeRef::Named(page_info)),
                        FieldBinding::Meta(MetaField::PageInfo),
                    ),
                    SurfaceField::new(
                        "totalCount",
                        TypeRef::Scalar(ScalarType::Int64),
                        FieldBinding::Meta(MetaField::Total),
                    ),
                ],
                description: None,
            },
        )?;
        Ok(id)
    }

    fn page_info_type(&mut self) -> Result<TypeId, CompileError> {
        let key = Self::builtin(PAGE_INFO, TypeRole::Support);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let id = self.cache.reserve(key, PAGE_INFO.to_string())?;
        let flag = || TypeRef::non_null(TypeRef::Scalar(ScalarType::Bool));
        let cursor = || TypeRef::Scalar(ScalarType::String);
        self.cache.fill(
            id,
            Self::support_type(
                PAGE_INFO,
                TypeRole::Support,
                TypeKind::Object,
                vec![
                    SurfaceField::new("hasNextPage", flag(), FieldBinding::Meta(MetaField::HasNextPage)),
                    SurfaceField::new(
                        "hasPreviousPage",
                        flag(),
                        FieldBinding::Meta(MetaField::HasPreviousPage),
                    ),
                    SurfaceField::new("startCursor", cursor(), FieldBinding::Meta(MetaField::StartCursor)),
                    SurfaceField::new("endCursor", cursor(), FieldBinding::Meta(MetaField::EndCursor)),
                ],
            ),
        )?;
        Ok(id)
    }

    fn page_input(&mut self) -> Result<TypeId, CompileError> {
        let id = self
            .cache
            .reserve(Self::builtin(PAGE, TypeRole::Support), PAGE.to_string())?;
        self.cache.fill(
            id,
            Self::support_type(
                PAGE,
                TypeRole::Support,
                TypeKind::Input,
                vec![
                    SurfaceField::new(
                        "start",
                        TypeRef::non_null(TypeRef::Scalar(ScalarType::Int32)),
                        FieldBinding::Meta(MetaField::PageStart),
                    ),
                    SurfaceField::new(
                        "limit",
                        TypeRef::non_null(TypeRef::Scalar(ScalarType::Int32)),
                        FieldBinding::Meta(MetaField::PageLimit),
                    ),
                ],
            ),
        )?;
        Ok(id)
    }

    fn order_by_enum(&mut self) -> Result<TypeId, CompileError> {
        if let Some(id) = self.order_by {
            return Ok(id);
        }
        let id = self
            .cache
            .reserve(Self::builtin(ORDER_BY, TypeRole::Enum), ORDER_BY.to_string())?;
        self.cache.fill(
            id,
            Self::support_type(
                ORDER_BY,
                TypeRole::Enum,
                TypeKind::Enum(vec!["ASC".to_string(), "DESC".to_string()]),
                vec![],
            ),
        )?;
        self.order_by = Some(id);
        Ok(id)
    }

    /// One enum type per enum name, shared by every entity that uses it.
    fn enum_type(&mut self, name: &str, variants: &[String]) -> Result<TypeId, CompileError> {
        match self.enums.get(name) {
            Some(known) if known.as_slice() != variants => {
                return Err(CompileError::EnumConflict {
                    name: name.to_string(),
                })
            }
            Some(_) => {}
            None => {
                self.enums.insert(name.to_string(), variants.to_vec());
            }
        }

        let key = TypeKey::new(TypeSource::Enum(name.to_string()), TypeRole::Enum);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let surface_name = type_name(name);
        let id = self.cache.reserve(key, surface_name.clone())?;
        self.cache.fill(
            id,
            GeneratedType {
                name: surface_name,
                source: TypeSource::Enum(name.to_string()),
                role: TypeRole::Enum,
                kind: TypeKind::Enum(variants.to_vec()),
                fields: vec![],
                description: None,
            },
        )?;
        Ok(id)
    }

    fn scalar_filter_type(&mut self, scalar: ScalarType) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Scalar(scalar), TypeRole::Filter);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let name = format!("{}Criteria", scalar.surface_name());
        let id = self.cache.reserve(key, name.clone())?;
        let fields = Self::operator_fields(scalar_operators(scalar), TypeRef::Scalar(scalar));
        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Scalar(scalar),
                role: TypeRole::Filter,
                kind: TypeKind::Input,
                fields,
                description: None,
            },
        )?;
        Ok(id)
    }

    fn enum_filter_type(&mut self, name: &str, variants: &[String]) -> Result<TypeId, CompileError> {
        let enum_id = self.enum_type(name, variants)?;
        let key = TypeKey::new(TypeSource::Enum(name.to_string()), TypeRole::Filter);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let filter_name = format!("{}Criteria", type_name(name));
        let id = self.cache.reserve(key, filter_name.clone())?;
        let fields = Self::operator_fields(enum_operators(), TypeRef::Named(enum_id));
        self.cache.fill(
            id,
            GeneratedType {
                name: filter_name,
                source: TypeSource::Enum(name.to_string()),
                role: TypeRole::Filter,
                kind: TypeKind::Input,
                fields,
                description: None,
            },
        )?;
        Ok(id)
    }

    fn operator_fields(operators: &[relgraph_proto::Operator], operand: TypeRef) -> Vec<SurfaceField> {
        operators
            .iter()
            .map(|op| {
                let ty = if op.takes_switch() {
                    TypeRef::Scalar(ScalarType::Bool)
                } else if op.takes_list() {
                    TypeRef::list(operand.clone())
                } else {
                    operand.clone()
                };
                SurfaceField::new(op.name(), ty, FieldBinding::Operator(*op))
            })
            .collect()
    }

    /// Filter type of a filterable leaf attribute.
    fn filter_ref(&mut self, owner: &str, attr: &AttributeDescriptor) -> Result<TypeId, CompileError> {
        match &attr.attribute_type {
            AttributeType::Scalar(scalar) => self.scalar_filter_type(*scalar),
            AttributeType::Enum { name, variants } => self.enum_filter_type(name, variants),
            other => Err(CompileError::Unmappable {
                entity: owner.to_string(),
                attribute: attr.name.clone(),
                type_name: other.type_name(),
            }),
        }
    }

    fn criteria_name(entity: &EntityDescriptor, role: TypeRole) -> String {
        let plural = plural_name(&entity.name);
        match role {
            TypeRole::SubqueryCriteria => format!("{plural}SubqueryCriteriaExpression"),
            TypeRole::RelationCriteria => format!("{plural}RelationCriteriaExpression"),
            _ => format!("{plural}CriteriaExpression"),
        }
    }

    /// Criteria input of an entity for one of the three criteria roles.
    ///
    /// `Criteria` reaches associations as `Criteria` and carries EXISTS;
    /// `SubqueryCriteria` reaches associations as `RelationCriteria`, which has
    /// no associations at all.
    fn criteria_type(&mut self, entity: &EntityDescriptor, role: TypeRole) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Entity(entity.name.clone()), role);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let name = Self::criteria_name(entity, role);
        let id = self.cache.reserve(key, name.clone())?;

        let mut fields = Vec::new();
        for attr in entity.visible_attributes().filter(|a| a.filterable) {
            match attr.kind {
                AttributeKind::Basic => {
                    let filter = self.filter_ref(&entity.name, attr)?;
                    fields.push(SurfaceField::new(
                        &attr.name,
                        TypeRef::Named(filter),
                        FieldBinding::FilterAttribute(attr.name.clone()),
                    ));
                }
                AttributeKind::Embedded => {
                    let embeddable = self.embeddable_of(&entity.name, attr)?;
                    let criteria = self.embedded_criteria_type(embeddable)?;
                    fields.push(SurfaceField::new(
                        &attr.name,
                        TypeRef::Named(criteria),
                        FieldBinding::EmbeddedCriteria(attr.name.clone()),
                    ));
                }
                AttributeKind::ToOne | AttributeKind::ToMany => {
                    let target_role = match role {
                        TypeRole::Criteria => TypeRole::Criteria,
                        TypeRole::SubqueryCriteria => TypeRole::RelationCriteria,
                        _ => continue,
                    };
                    let Some(target) = self.exposed_target(attr) else {
                        continue;
                    };
                    let criteria = self.criteria_type(target, target_role)?;
                    fields.push(SurfaceField::new(
                        &attr.name,
                        TypeRef::Named(criteria),
                        FieldBinding::AssociationCriteria(attr.name.clone()),
                    ));
                }
                AttributeKind::ElementCollection => {}
            }
        }

        fields.extend(Self::logical_fields(id));
        if role == TypeRole::Criteria {
            let subquery = self.criteria_type(entity, TypeRole::SubqueryCriteria)?;
            for op in [LogicalOp::Exists, LogicalOp::NotExists] {
                fields.push(SurfaceField::new(
                    op.name(),
                    TypeRef::list(TypeRef::Named(subquery)),
                    FieldBinding::Logical(op),
                ));
            }
        }

        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Entity(entity.name.clone()),
                role,
                kind: TypeKind::Input,
                fields,
                description: None,
            },
        )?;
        Ok(id)
    }

    fn embedded_criteria_type(&mut self, embeddable: &EmbeddableDescriptor) -> Result<TypeId, CompileError> {
        let key = TypeKey::new(TypeSource::Embeddable(embeddable.name.clone()), TypeRole::Criteria);
        if let Some(id) = self.cache.lookup(&key) {
            return Ok(id);
        }
        let name = format!("{}CriteriaExpression", type_name(&embeddable.name));
        let id = self.cache.reserve(key, name.clone())?;

        let mut fields = Vec::new();
        for attr in embeddable.visible_attributes().filter(|a| a.filterable) {
            match attr.kind {
                AttributeKind::Basic => {
                    let filter = self.filter_ref(&embeddable.name, attr)?;
                    fields.push(SurfaceField::new(
                        &attr.name,
                        TypeRef::Named(filter),
                        FieldBinding::FilterAttribute(attr.name.clone()),
                    ));
                }
                AttributeKind::Embedded => {
                    let nested = self.embeddable_of(&embeddable.name, attr)?;
                    let criteria = self.embedded_criteria_type(nested)?;
                    fields.push(SurfaceField::new(
                        &attr.name,
                        TypeRef::Named(criteria),
                        FieldBinding::EmbeddedCriteria(attr.name.clone()),
                    ));
                }
                _ => {}
            }
        }
        fields.extend(Self::logical_fields(id));

        self.cache.fill(
            id,
            GeneratedType {
                name,
                source: TypeSource::Embeddable(embeddable.name.clone()),
                role: TypeRole::Criteria,
                kind: TypeKind::Input,
                fields,
                description: None,
            },
        )?;
        Ok(id)
    }

    /// AND, OR and NOT over the criteria type itself.
    fn logical_fields(own: TypeId) -> Vec<SurfaceField> {
        vec![
            SurfaceField::new(
                LogicalOp::And.name(),
                TypeRef::list(TypeRef::Named(own)),
                FieldBinding::Logical(LogicalOp::And),
            ),
            SurfaceField::new(
                LogicalOp::Or.name(),
                TypeRef::list(TypeRef::Named(own)),
                FieldBinding::Logical(LogicalOp::Or),
            ),
            SurfaceField::new(
                LogicalOp::Not.name(),
                TypeRef::Named(own),
                FieldBinding::Logical(LogicalOp::Not),
            ),
        ]
    }
}
