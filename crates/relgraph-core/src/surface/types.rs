//! Generated surface types.

use std::fmt;

use relgraph_proto::{LogicalOp, Operator};

use crate::metamodel::ScalarType;

/// Index of a generated type within one compiled surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Position of the type in the surface's type list.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a generated type was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSource {
    /// An entity, by name.
    Entity(String),
    /// An embeddable, by name.
    Embeddable(String),
    /// A scalar type.
    Scalar(ScalarType),
    /// An enumeration, by name.
    Enum(String),
    /// A fixed surface type (`Query`, `Page`, `OrderBy`, ...).
    Builtin(&'static str),
}

impl fmt::Display for TypeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSource::Entity(name) => write!(f, "entity {name}"),
            TypeSource::Embeddable(name) => write!(f, "embeddable {name}"),
            TypeSource::Scalar(scalar) => write!(f, "scalar {}", scalar.surface_name()),
            TypeSource::Enum(name) => write!(f, "enum {name}"),
            TypeSource::Builtin(name) => write!(f, "builtin {name}"),
        }
    }
}

/// The role a generated type plays for its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRole {
    /// Readable shape of one row.
    Object,
    /// Paged collection wrapper (`select`, `total`, `pages`).
    Collection,
    /// Relay connection wrapper.
    Connection,
    /// Relay edge.
    Edge,
    /// Aggregate results.
    Aggregate,
    /// Filter input with logical combinators and EXISTS.
    Criteria,
    /// Filter input for a correlated subquery.
    SubqueryCriteria,
    /// Filter input for an association inside a subquery; no further hops.
    RelationCriteria,
    /// Operator input for one scalar or enum.
    Filter,
    /// Enumeration.
    Enum,
    /// Root operation type.
    Root,
    /// Fixed input or output type.
    Support,
}

impl fmt::Display for TypeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeRole::Object => "object",
            TypeRole::Collection => "collection",
            TypeRole::Connection => "connection",
            TypeRole::Edge => "edge",
            TypeRole::Aggregate => "aggregate",
            TypeRole::Criteria => "criteria",
            TypeRole::SubqueryCriteria => "subquery criteria",
            TypeRole::RelationCriteria => "relation criteria",
            TypeRole::Filter => "filter",
            TypeRole::Enum => "enum",
            TypeRole::Root => "root",
            TypeRole::Support => "support",
        };
        f.write_str(name)
    }
}

/// Whether a type is read, written or enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Output object.
    Object,
    /// Input object.
    Input,
    /// Enumeration with its values.
    Enum(Vec<String>),
}

/// Reference to a type from a field or argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A built-in scalar.
    Scalar(ScalarType),
    /// A generated type.
    Named(TypeId),
    /// A list of the inner type.
    List(Box<TypeRef>),
    /// A non-null wrapper.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Wrap in a list.
    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Wrap in a non-null marker.
    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    /// The innermost named type, if any.
    pub fn named(&self) -> Option<TypeId> {
        match self {
            TypeRef::Named(id) => Some(*id),
            TypeRef::Scalar(_) => None,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named(),
        }
    }

    /// The innermost scalar, if any.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            TypeRef::Scalar(scalar) => Some(*scalar),
            TypeRef::Named(_) => None,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.scalar(),
        }
    }

    /// Whether a list wraps the type at any level.
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
            _ => false,
        }
    }
}

/// Fixed fields of wrapper types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Select,
    Total,
    Pages,
    Aggregate,
    Count,
    Edges,
    Node,
    Cursor,
    PageInfo,
    HasNextPage,
    HasPreviousPage,
    StartCursor,
    EndCursor,
    PageStart,
    PageLimit,
}

/// What a surface field means to the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBinding {
    /// Scalar or enum column.
    Attribute(String),
    /// Embedded object stored with the row.
    Embedded(String),
    /// List stored with the row.
    ElementCollection(String),
    /// Association to another entity.
    Association { attribute: String, to_many: bool },
    /// A fixed field of a wrapper or support type.
    Meta(MetaField),
    /// Root lookup by identity.
    ById(String),
    /// Root paged collection.
    Collection(String),
    /// Root relay connection.
    Connection(String),
    /// Root subscription stream.
    Stream(String),
    /// Criteria entry for an attribute; its type is the attribute's filter.
    FilterAttribute(String),
    /// Criteria entry scoped to an embedded attribute.
    EmbeddedCriteria(String),
    /// Criteria entry scoped to an association.
    AssociationCriteria(String),
    /// Logical combinator.
    Logical(LogicalOp),
    /// Operator of a filter type.
    Operator(Operator),
}

/// A declared argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDef {
    /// Argument name.
    pub name: String,
    /// Argument type.
    pub ty: TypeRef,
    /// Value used when the argument is omitted.
    pub default: Option<serde_json::Value>,
}

impl ArgumentDef {
    /// Create an argument.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A field of a generated type.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeRef,
    /// Arguments in declaration order.
    pub arguments: Vec<ArgumentDef>,
    /// Executor meaning.
    pub binding: FieldBinding,
    /// Surface description.
    pub description: Option<String>,
}

impl SurfaceField {
    /// Create a field.
    pub fn new(name: impl Into<String>, ty: TypeRef, binding: FieldBinding) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: vec![],
            binding,
            description: None,
        }
    }

    /// Add an argument.
    pub fn with_argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Look up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&ArgumentDef> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// A compiled surface type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedType {
    /// Type name, unique within the surface.
    pub name: String,
    /// What the type was derived from.
    pub source: TypeSource,
    /// Role of the type for its source.
    pub role: TypeRole,
    /// Object, input or enum.
    pub kind: TypeKind,
    /// Fields in declaration order; empty for enums.
    pub fields: Vec<SurfaceField>,
    /// Surface description.
    pub description: Option<String>,
}

impl GeneratedType {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&SurfaceField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Entity name when the type was derived from an entity.
    pub fn entity(&self) -> Option<&str> {
        match &self.source {
            TypeSource::Entity(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this is an input type.
    pub fn is_input(&self) -> bool {
        matches!(self.kind, TypeKind::Input)
    }
}
