//! Binding of query documents against a compiled surface.
//!
//! The binder walks a [`QueryDocument`] alongside the surface types, coerces
//! JSON arguments into typed values and criteria trees, and applies the
//! access policy. A field that fails to bind is reported once at its document
//! path and answered as null; its siblings bind normally.

use relgraph_proto::{
    parse_uuid, CriteriaNode, GraphError, OperationKind, PathSegment, QueryDocument,
    Selection, Value,
};
use serde_json::Value as Json;
use tracing::debug;

use crate::error::QueryError;
use crate::metamodel::{EntityDescriptor, ScalarType};
use crate::relational::{Column, Direction, Window};
use crate::security::AccessPolicy;
use crate::surface::{
    FieldBinding, GeneratedType, MetaField, QuerySurface, SurfaceField, TypeId, TypeKind, TypeRef,
};

use super::bound::{
    decode_cursor, AssociationField, BoundField, BoundRoot, EntitySelection, FieldKind,
    OrderRequest, Paging, RootKind,
};
use super::output::child;
use super::translator::PredicateTranslator;

const TYPENAME: &str = "__typename";

/// Binds documents for one surface and policy.
pub struct Binder<'s> {
    surface: &'s QuerySurface,
    policy: &'s dyn AccessPolicy,
    translator: PredicateTranslator<'s>,
    errors: Vec<GraphError>,
}

impl<'s> Binder<'s> {
    pub fn new(surface: &'s QuerySurface, policy: &'s dyn AccessPolicy) -> Self {
        Self {
            surface,
            policy,
            translator: PredicateTranslator::new(surface),
            errors: Vec::new(),
        }
    }

    /// Bind every root field of `doc`. Fields that fail to bind come back
    /// as [`RootKind::Failed`] or [`FieldKind::Failed`] with their errors.
    pub fn bind(mut self, doc: &QueryDocument) -> (Vec<BoundRoot>, Vec<GraphError>) {
        let root_type = match doc.operation {
            OperationKind::Query => Some(self.surface.query_type()),
            OperationKind::Subscription => self.surface.subscription_type(),
        };

        let mut roots = Vec::with_capacity(doc.selection.len());
        for selection in &doc.selection {
            let key = selection.response_key().to_string();
            let path = vec![PathSegment::from(key.as_str())];
            let kind = match root_type {
                Some(ty) => self.bind_root(ty, selection, &path),
                None => Err(QueryError::validation("subscriptions are not enabled")),
            };
            let kind = kind.unwrap_or_else(|err| {
                self.errors.push(err.at(path));
                RootKind::Failed
            });
            roots.push(BoundRoot { key, kind });
        }

        debug!(roots = roots.len(), errors = self.errors.len(), "bound document");
        (roots, self.errors)
    }

    fn bind_root(
        &mut self,
        root: &'s GeneratedType,
        selection: &Selection,
        path: &[PathSegment],
    ) -> Result<RootKind, QueryError> {
        if selection.name == TYPENAME {
            return Ok(RootKind::Typename(root.name.clone()));
        }
        let field = Self::lookup(root, selection)?;

        match &field.binding {
            FieldBinding::ById(entity) => {
                self.policy.check_entity(entity)?;
                let descriptor = self.descriptor(entity)?;
                let argument = field.argument(&descriptor.identity).ok_or_else(|| {
                    QueryError::validation(format!("{entity} has no identity argument"))
                })?;
                let raw = selection.argument(&argument.name).ok_or_else(|| {
                    QueryError::validation(format!(
                        "missing argument `{}` on field `{}`",
                        argument.name, field.name
                    ))
                })?;
                let identity = self.coerce(&argument.ty, raw)?;
                let object = self.object_of(field)?;
                let selection = self.bind_entity(entity, object, &selection.selection, path)?;
                Ok(RootKind::ById {
                    entity: entity.clone(),
                    identity,
                    selection,
                })
            }
            FieldBinding::Collection(entity) => {
                self.policy.check_entity(entity)?;
                let criteria = self.where_argument(entity, field, selection)?;
                let paging = self.paging(selection)?;
                let distinct = self.switch(field, selection, "distinct")?;
                let wrapper = self.object_of(field)?;
                let fields = self.bind_wrapper(entity, wrapper, &selection.selection, path)?;
                Ok(RootKind::Collection {
                    entity: entity.clone(),
                    criteria,
                    paging,
                    distinct,
                    fields,
                })
            }
            FieldBinding::Connection(entity) => {
                self.policy.check_entity(entity)?;
                let criteria = self.where_argument(entity, field, selection)?;
                let window = self.connection_window(selection)?;
                let wrapper = self.object_of(field)?;
                let fields = self.bind_wrapper(entity, wrapper, &selection.selection, path)?;
                Ok(RootKind::Connection {
                    entity: entity.clone(),
                    criteria,
                    window,
                    fields,
                })
            }
            FieldBinding::Stream(entity) => {
                self.policy.check_entity(entity)?;
                let criteria = self.where_argument(entity, field, selection)?;
                let object = self.object_of(field)?;
                let selection = self.bind_entity(entity, object, &selection.selection, path)?;
                Ok(RootKind::Stream {
                    entity: entity.clone(),
                    criteria,
                    selection,
                })
            }
            other => Err(QueryError::validation(format!(
                "field `{}` cannot be selected at the root ({other:?})",
                field.name
            ))),
        }
    }

    /// Bind the fields of an entity object type.
    fn bind_entity(
        &mut self,
        entity: &str,
        ty: &'s GeneratedType,
        selections: &[Selection],
        path: &[PathSegment],
    ) -> Result<EntitySelection, QueryError> {
        Self::require_selection(ty, selections)?;
        let mut bound = EntitySelection {
            entity: entity.to_string(),
            fields: Vec::with_capacity(selections.len()),
            order: Vec::new(),
            requirements: Vec::new(),
        };

        for selection in selections {
            let key = selection.response_key().to_string();
            let path = child(path, &key);
            let kind = self
                .bind_entity_field(entity, ty, selection, &path, &mut bound)
                .unwrap_or_else(|err| {
                    self.errors.push(err.at(path));
                    FieldKind::Failed
                });
            bound.fields.push(BoundField::new(key, kind));
        }
        Ok(bound)
    }

    fn bind_entity_field(
        &mut self,
        entity: &str,
        ty: &'s GeneratedType,
        selection: &Selection,
        path: &[PathSegment],
        parent: &mut EntitySelection,
    ) -> Result<FieldKind, QueryError> {
        if selection.name == TYPENAME {
            return Ok(FieldKind::Typename(ty.name.clone()));
        }
        let field = Self::lookup(ty, selection)?;

        match &field.binding {
            FieldBinding::Association { attribute, to_many } => {
                self.policy.check_field(entity, attribute)?;
                let assoc = self.bind_association(entity, attribute, *to_many, field, selection, path)?;
                if !assoc.to_many {
                    for request in &assoc.selection.order {
                        let mut hoisted = request.clone();
                        hoisted.associations.insert(0, attribute.clone());
                        if !parent.order.contains(&hoisted) {
                            parent.order.push(hoisted);
                        }
                    }
                }
                if let Some(requirement) = self.requirement(entity, &assoc)? {
                    parent.requirements.push(requirement);
                }
                Ok(FieldKind::Association(Box::new(assoc)))
            }
            FieldBinding::Attribute(attribute)
            | FieldBinding::Embedded(attribute)
            | FieldBinding::ElementCollection(attribute) => {
                self.policy.check_field(entity, attribute)?;
                self.bind_value(
                    field,
                    selection,
                    &Column(vec![]),
                    path,
                    Some(&mut parent.order),
                )
            }
            other => Err(QueryError::validation(format!(
                "field `{}` on {} has unexpected binding {other:?}",
                field.name, ty.name
            ))),
        }
    }

    /// Bind a leaf, embedded or element collection field. `prefix` is the
    /// embedded path of the enclosing object; `order` collects `orderBy`
    /// requests when ordering is possible at this level.
    fn bind_value(
        &mut self,
        field: &'s SurfaceField,
        selection: &Selection,
        prefix: &Column,
        path: &[PathSegment],
        order: Option<&mut Vec<OrderRequest>>,
    ) -> Result<FieldKind, QueryError> {
        match &field.binding {
            FieldBinding::Attribute(name) => {
                if !selection.is_leaf() {
                    return Err(QueryError::validation(format!(
                        "field `{}` is a leaf and takes no selection",
                        field.name
                    )));
                }
                if let (Some(raw), Some(order)) = (selection.argument("orderBy"), order) {
                    let direction = match raw.as_str() {
                        Some("ASC") => Direction::Asc,
                        Some("DESC") => Direction::Desc,
                        _ => {
                            return Err(QueryError::validation(format!(
                                "orderBy expects ASC or DESC, found {raw}"
                            )))
                        }
                    };
                    order.push(OrderRequest {
                        associations: vec![],
                        column: Column::new(name).under(prefix),
                        direction,
                    });
                }
                Ok(FieldKind::Column(name.clone()))
            }
            FieldBinding::Embedded(name) => {
                let object = self.object_of(field)?;
                let fields = self.bind_embedded(
                    object,
                    &selection.selection,
                    &Column::new(name).under(prefix),
                    path,
                    order,
                )?;
                Ok(FieldKind::Embedded {
                    column: name.clone(),
                    fields,
                })
            }
            FieldBinding::ElementCollection(name) => match field.ty.named() {
                Some(id) if matches!(self.surface.get(id).kind, TypeKind::Object) => {
                    let object = self.surface.get(id);
                    let fields = self.bind_embedded(object, &selection.selection, prefix, path, None)?;
                    Ok(FieldKind::Embedded {
                        column: name.clone(),
                        fields,
                    })
                }
                _ if !selection.is_leaf() => Err(QueryError::validation(format!(
                    "field `{}` is a leaf and takes no selection",
                    field.name
                ))),
                _ => Ok(FieldKind::Column(name.clone())),
            },
            other => Err(QueryError::validation(format!(
                "field `{}` has unexpected binding {other:?}",
                field.name
            ))),
        }
    }

    fn bind_embedded(
        &mut self,
        ty: &'s GeneratedType,
        selections: &[Selection],
        prefix: &Column,
        path: &[PathSegment],
        mut order: Option<&mut Vec<OrderRequest>>,
    ) -> Result<Vec<BoundField>, QueryError> {
        Self::require_selection(ty, selections)?;
        let mut fields = Vec::with_capacity(selections.len());
        for selection in selections {
            let key = selection.response_key().to_string();
            let path = child(path, &key);
            let kind = if selection.name == TYPENAME {
                Ok(FieldKind::Typename(ty.name.clone()))
            } else {
                Self::lookup(ty, selection).and_then(|field| {
                    self.bind_value(field, selection, prefix, &path, order.as_deref_mut())
                })
            };
            let kind = kind.unwrap_or_else(|err| {
                self.errors.push(err.at(path));
                FieldKind::Failed
            });
            fields.push(BoundField::new(key, kind));
        }
        Ok(fields)
    }

    fn bind_association(
        &mut self,
        owner: &str,
        attribute: &str,
        to_many: bool,
        field: &'s SurfaceField,
        selection: &Selection,
        path: &[PathSegment],
    ) -> Result<AssociationField, QueryError> {
        let descriptor = self.descriptor(owner)?;
        let association = descriptor
            .attribute(attribute)
            .and_then(|a| a.association.as_ref())
            .ok_or_else(|| {
                QueryError::validation(format!("`{attribute}` on {owner} is not an association"))
            })?;
        let target = association.target.clone();
        self.policy.check_entity(&target)?;

        let criteria = self.where_argument(&target, field, selection)?;
        let optional = self.switch(field, selection, "optional")?;
        let object = self.object_of(field)?;
        let child_selection = self.bind_entity(&target, object, &selection.selection, path)?;

        Ok(AssociationField {
            attribute: attribute.to_string(),
            owner: owner.to_string(),
            target,
            to_many,
            local_key: association.local_key.clone(),
            remote_key: association.remote_key.clone(),
            criteria,
            optional,
            selection: child_selection,
        })
    }

    /// The existence requirement an association with `optional: false`
    /// places on its parent rows.
    fn requirement(&self, owner: &str, assoc: &AssociationField) -> Result<Option<CriteriaNode>, QueryError> {
        if assoc.optional {
            return Ok(None);
        }
        let nullable = assoc.to_many
            || self
                .descriptor(owner)?
                .attribute(&assoc.attribute)
                .and_then(|a| a.association.as_ref())
                .map_or(true, |a| a.nullable);
        if !nullable && assoc.criteria.is_none() {
            return Ok(None);
        }
        let inner = assoc
            .criteria
            .clone()
            .unwrap_or_else(|| CriteriaNode::and(vec![]));
        Ok(Some(CriteriaNode::association(assoc.attribute.clone(), inner)))
    }

    /// Bind the fields of a wrapper type (collection, connection, edge,
    /// page info or aggregate).
    fn bind_wrapper(
        &mut self,
        entity: &str,
        ty: &'s GeneratedType,
        selections: &[Selection],
        path: &[PathSegment],
    ) -> Result<Vec<BoundField>, QueryError> {
        Self::require_selection(ty, selections)?;
        let mut fields = Vec::with_capacity(selections.len());
        for selection in selections {
            let key = selection.response_key().to_string();
            let path = child(path, &key);
            let kind = self
                .bind_wrapper_field(entity, ty, selection, &path)
                .unwrap_or_else(|err| {
                    self.errors.push(err.at(path));
                    FieldKind::Failed
                });
            fields.push(BoundField::new(key, kind));
        }
        Ok(fields)
    }

    fn bind_wrapper_field(
        &mut self,
        entity: &str,
        ty: &'s GeneratedType,
        selection: &Selection,
        path: &[PathSegment],
    ) -> Result<FieldKind, QueryError> {
        if selection.name == TYPENAME {
            return Ok(FieldKind::Typename(ty.name.clone()));
        }
        let field = Self::lookup(ty, selection)?;
        let FieldBinding::Meta(meta) = field.binding else {
            return Err(QueryError::validation(format!(
                "field `{}` on {} has unexpected binding",
                field.name, ty.name
            )));
        };

        match meta {
            MetaField::Select | MetaField::Node => {
                let object = self.object_of(field)?;
                let rows = self.bind_entity(entity, object, &selection.selection, path)?;
                Ok(FieldKind::Rows(rows))
            }
            MetaField::Aggregate | MetaField::Edges | MetaField::PageInfo => {
                let object = self.object_of(field)?;
                let fields = self.bind_wrapper(entity, object, &selection.selection, path)?;
                Ok(FieldKind::Group { meta, fields })
            }
            _ if !selection.is_leaf() => Err(QueryError::validation(format!(
                "field `{}` is a leaf and takes no selection",
                field.name
            ))),
            _ => Ok(FieldKind::Meta(meta)),
        }
    }

    /// Look up a selected field and check its arguments are declared.
    fn lookup(ty: &'s GeneratedType, selection: &Selection) -> Result<&'s SurfaceField, QueryError> {
        let field = ty.field(&selection.name).ok_or_else(|| {
            QueryError::validation(format!("unknown field `{}` on {}", selection.name, ty.name))
        })?;
        if let Some(unknown) = selection
            .arguments
            .iter()
            .find(|arg| field.argument(&arg.name).is_none())
        {
            return Err(QueryError::validation(format!(
                "unknown argument `{}` on field `{}.{}`",
                unknown.name, ty.name, field.name
            )));
        }
        Ok(field)
    }

    fn require_selection(ty: &GeneratedType, selections: &[Selection]) -> Result<(), QueryError> {
        if selections.is_empty() {
            return Err(QueryError::validation(format!(
                "a selection is required on {}",
                ty.name
            )));
        }
        Ok(())
    }

    fn descriptor(&self, entity: &str) -> Result<&'s EntityDescriptor, QueryError> {
        self.surface
            .entity(entity)
            .ok_or_else(|| QueryError::validation(format!("unknown entity `{entity}`")))
    }

    /// Object type a field returns.
    fn object_of(&self, field: &SurfaceField) -> Result<&'s GeneratedType, QueryError> {
        field
            .ty
            .named()
            .map(|id| self.surface.get(id))
            .ok_or_else(|| QueryError::validation(format!("field `{}` has no object type", field.name)))
    }

    /// Boolean argument, falling back to its declared default.
    fn switch(&self, field: &SurfaceField, selection: &Selection, name: &str) -> Result<bool, QueryError> {
        let declared = field.argument(name).and_then(|a| a.default.as_ref());
        let explicit = selection.argument(name).filter(|v| !v.is_null());
        match explicit.or(declared) {
            None | Some(Json::Null) => Ok(false),
            Some(Json::Bool(flag)) => Ok(*flag),
            Some(other) => Err(QueryError::validation(format!(
                "argument `{name}` expects a Boolean, found {other}"
            ))),
        }
    }

    fn paging(&self, selection: &Selection) -> Result<Paging, QueryError> {
        let config = self.surface.config();
        let Some(page) = selection.argument("page").filter(|p| !p.is_null()) else {
            return Ok(Paging {
                window: Window {
                    offset: 0,
                    limit: config.default_max_results,
                },
                page_size: config.default_max_results,
            });
        };

        let member = |name: &str| {
            page.get(name)
                .and_then(Json::as_i64)
                .ok_or_else(|| QueryError::validation(format!("page.{name} must be an integer")))
        };
        let start = member("start")?;
        let limit = member("limit")?;
        if start < 1 {
            return Err(QueryError::validation(format!(
                "page.start must be at least 1, found {start}"
            )));
        }
        if limit < 0 || limit as u64 > config.page_limit_ceiling as u64 {
            return Err(QueryError::validation(format!(
                "page.limit must be between 0 and {}, found {limit}",
                config.page_limit_ceiling
            )));
        }
        let limit = limit as usize;
        let offset = (start as usize - 1)
            .checked_mul(limit)
            .ok_or_else(|| QueryError::validation("page.start is out of range"))?;
        Ok(Paging {
            window: Window {
                offset,
                limit: Some(limit),
            },
            page_size: Some(limit),
        })
    }

    fn connection_window(&self, selection: &Selection) -> Result<Window, QueryError> {
        let config = self.surface.config();
        let limit = match selection.argument("first").filter(|v| !v.is_null()) {
            None => config.default_max_results,
            Some(raw) => {
                let first = raw
                    .as_i64()
                    .filter(|n| *n >= 0 && *n as u64 <= config.page_limit_ceiling as u64)
                    .ok_or_else(|| {
                        QueryError::validation(format!(
                            "first must be between 0 and {}, found {raw}",
                            config.page_limit_ceiling
                        ))
                    })?;
                Some(first as usize)
            }
        };
        let offset = match selection.argument("after").filter(|v| !v.is_null()) {
            None => 0,
            Some(raw) => raw
                .as_str()
                .and_then(decode_cursor)
                .and_then(|n| n.checked_add(1))
                .ok_or_else(|| QueryError::validation(format!("invalid cursor {raw}")))?,
        };
        Ok(Window { offset, limit })
    }

    /// Coerce a `where` argument into a criteria tree and check it lowers.
    fn where_argument(
        &self,
        entity: &str,
        field: &SurfaceField,
        selection: &Selection,
    ) -> Result<Option<CriteriaNode>, QueryError> {
        let Some(raw) = selection.argument("where").filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let criteria_type = field
            .argument("where")
            .and_then(|a| a.ty.named())
            .ok_or_else(|| QueryError::validation(format!("field `{}` takes no where", field.name)))?;
        let node = self.criteria(criteria_type, raw)?;
        self.translator.predicate(entity, &node)?;
        Ok(Some(node))
    }

    fn criteria(&self, id: TypeId, raw: &Json) -> Result<CriteriaNode, QueryError> {
        let ty = self.surface.get(id);
        let Json::Object(entries) = raw else {
            return Err(QueryError::validation(format!(
                "{} expects an object, found {raw}",
                ty.name
            )));
        };

        let mut nodes = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let field = ty.field(key).ok_or_else(|| {
                QueryError::validation(format!("unknown field `{key}` on {}", ty.name))
            })?;
            if let (Some(entity), Some(attribute)) = (ty.entity(), criteria_attribute(&field.binding)) {
                self.policy.check_field(entity, attribute)?;
            }

            match &field.binding {
                FieldBinding::FilterAttribute(attribute) => {
                    let filter = self.surface.get(field.ty.named().ok_or_else(|| {
                        QueryError::validation(format!("`{key}` has no filter type"))
                    })?);
                    let Json::Object(operators) = value else {
                        return Err(QueryError::validation(format!(
                            "{} expects an object, found {value}",
                            filter.name
                        )));
                    };
                    for (name, operand) in operators {
                        let op_field = filter.field(name).ok_or_else(|| {
                            QueryError::validation(format!("unknown operator `{name}` on {}", filter.name))
                        })?;
                        let FieldBinding::Operator(op) = op_field.binding else {
                            return Err(QueryError::validation(format!("`{name}` is not an operator")));
                        };
                        let operand = self.coerce(&op_field.ty, operand)?;
                        nodes.push(CriteriaNode::field(attribute.clone(), op, operand));
                    }
                }
                FieldBinding::EmbeddedCriteria(attribute) => {
                    let inner = self.nested_criteria(field, value)?;
                    nodes.push(CriteriaNode::embedded(attribute.clone(), inner));
                }
                FieldBinding::AssociationCriteria(attribute) => {
                    let target = field.ty.named().map(|id| self.surface.get(id));
                    if let Some(entity) = target.and_then(GeneratedType::entity) {
                        self.policy.check_entity(entity)?;
                    }
                    let inner = self.nested_criteria(field, value)?;
                    nodes.push(CriteriaNode::association(attribute.clone(), inner));
                }
                FieldBinding::Logical(op) => {
                    let inner = field.ty.named().ok_or_else(|| {
                        QueryError::validation(format!("`{key}` has no criteria type"))
                    })?;
                    let children = match value {
                        Json::Array(items) => items
                            .iter()
                            .map(|item| self.criteria(inner, item))
                            .collect::<Result<Vec<_>, _>>()?,
                        other => vec![self.criteria(inner, other)?],
                    };
                    nodes.push(CriteriaNode::Logical { op: *op, children });
                }
                other => {
                    return Err(QueryError::validation(format!(
                        "`{key}` on {} has unexpected binding {other:?}",
                        ty.name
                    )))
                }
            }
        }
        Ok(CriteriaNode::all_of(nodes))
    }

    fn nested_criteria(&self, field: &SurfaceField, value: &Json) -> Result<CriteriaNode, QueryError> {
        let id = field.ty.named().ok_or_else(|| {
            QueryError::validation(format!("`{}` has no criteria type", field.name))
        })?;
        self.criteria(id, value)
    }

    /// Type-directed coercion of a JSON value.
    fn coerce(&self, ty: &TypeRef, raw: &Json) -> Result<Value, QueryError> {
        match ty {
            TypeRef::NonNull(inner) => {
                if raw.is_null() {
                    return Err(QueryError::validation(format!(
                        "expected a non-null {}",
                        self.surface.render_type(inner)
                    )));
                }
                self.coerce(inner, raw)
            }
            _ if raw.is_null() => Ok(Value::Null),
            TypeRef::List(inner) => match raw {
                Json::Array(items) => items
                    .iter()
                    .map(|item| self.coerce(inner, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List),
                scalar => self.coerce(inner, scalar),
            },
            TypeRef::Scalar(scalar) => coerce_scalar(*scalar, raw),
            TypeRef::Named(id) => {
                let named = self.surface.get(*id);
                match &named.kind {
                    TypeKind::Enum(variants) => match raw.as_str() {
                        Some(variant) if variants.iter().any(|v| v == variant) => {
                            Ok(Value::Enum(variant.to_string()))
                        }
                        _ => Err(QueryError::validation(format!(
                            "{raw} is not a variant of {}",
                            named.name
                        ))),
                    },
                    TypeKind::Input => self.coerce_input(named, raw),
                    TypeKind::Object => Err(QueryError::validation(format!(
                        "{} cannot be used as an input",
                        named.name
                    ))),
                }
            }
        }
    }

    /// An embeddable input object, members in declaration order.
    fn coerce_input(&self, ty: &GeneratedType, raw: &Json) -> Result<Value, QueryError> {
        let Json::Object(entries) = raw else {
            return Err(QueryError::validation(format!(
                "{} expects an object, found {raw}",
                ty.name
            )));
        };
        if let Some(unknown) = entries.keys().find(|k| ty.field(k).is_none()) {
            return Err(QueryError::validation(format!(
                "unknown field `{unknown}` on {}",
                ty.name
            )));
        }
        let mut members = Vec::with_capacity(ty.fields.len());
        for field in &ty.fields {
            let value = self.coerce(&field.ty, entries.get(&field.name).unwrap_or(&Json::Null))?;
            members.push((field.name.clone(), value));
        }
        Ok(Value::Object(members))
    }
}

/// Attribute a criteria entry reads, for policy checks.
fn criteria_attribute(binding: &FieldBinding) -> Option<&str> {
    match binding {
        FieldBinding::FilterAttribute(attribute)
        | FieldBinding::EmbeddedCriteria(attribute)
        | FieldBinding::AssociationCriteria(attribute) => Some(attribute),
        _ => None,
    }
}

fn coerce_scalar(scalar: ScalarType, raw: &Json) -> Result<Value, QueryError> {
    let mismatch = || {
        QueryError::validation(format!(
            "expected {} but found {raw}",
            scalar.surface_name()
        ))
    };
    let value = match scalar {
        ScalarType::Bool => Value::Bool(raw.as_bool().ok_or_else(mismatch)?),
        ScalarType::Int32 => {
            let n = raw.as_i64().ok_or_else(mismatch)?;
            Value::Int32(i32::try_from(n).map_err(|_| mismatch())?)
        }
        ScalarType::Int64 => Value::Int64(raw.as_i64().ok_or_else(mismatch)?),
        ScalarType::Float32 => Value::Float32(raw.as_f64().ok_or_else(mismatch)? as f32),
        ScalarType::Float64 => Value::Float64(raw.as_f64().ok_or_else(mismatch)?),
        ScalarType::String => Value::String(raw.as_str().ok_or_else(mismatch)?.to_string()),
        ScalarType::Bytes => {
            let text = raw.as_str().ok_or_else(mismatch)?;
            Value::Bytes(hex::decode(text).map_err(|_| mismatch())?)
        }
        ScalarType::Timestamp => Value::Timestamp(raw.as_i64().ok_or_else(mismatch)?),
        ScalarType::Uuid => {
            let text = raw.as_str().ok_or_else(mismatch)?;
            Value::Uuid(parse_uuid(text).ok_or_else(mismatch)?)
        }
    };
    Ok(value)
}
