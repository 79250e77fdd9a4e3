//! Attribute descriptors.

use super::types::{AttributeType, ScalarType};

/// What an attribute maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// A scalar or enum column.
    Basic,
    /// A nested embeddable stored with the owning row.
    Embedded,
    /// A reference to at most one row of another entity.
    ToOne,
    /// A reference to any number of rows of another entity.
    ToMany,
    /// A list of scalars or embeddables stored with the owning row.
    ElementCollection,
}

/// Join keys of an association.
///
/// The owning row's `local_key` column equals the target row's `remote_key`
/// column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Association {
    /// Target entity name.
    pub target: String,
    /// Column on the owning entity.
    pub local_key: String,
    /// Column on the target entity.
    pub remote_key: String,
    /// Whether the owning row may have no related row.
    pub nullable: bool,
}

/// An attribute of an entity or embeddable.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    /// Attribute name (unique within its owner).
    pub name: String,
    /// Attribute kind.
    pub kind: AttributeKind,
    /// Target type. For element collections this is the element type.
    pub attribute_type: AttributeType,
    /// Whether the value may be null.
    pub nullable: bool,
    /// Join keys, for associations.
    pub association: Option<Association>,
    /// Hidden from the surface entirely.
    pub ignored: bool,
    /// Present in criteria types.
    pub filterable: bool,
    /// Carries an `orderBy` argument.
    pub orderable: bool,
    /// Surface description.
    pub description: Option<String>,
}

impl AttributeDescriptor {
    fn with_kind(name: impl Into<String>, kind: AttributeKind, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
            attribute_type,
            nullable: false,
            association: None,
            ignored: false,
            filterable: true,
            orderable: true,
            description: None,
        }
    }

    /// Create a required scalar attribute.
    pub fn basic(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::with_kind(name, AttributeKind::Basic, AttributeType::Scalar(scalar))
    }

    /// Create a nullable scalar attribute.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::basic(name, scalar).nullable()
    }

    /// Create an enum attribute.
    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>, variants: &[&str]) -> Self {
        Self::with_kind(
            name,
            AttributeKind::Basic,
            AttributeType::enumeration(enum_name, variants),
        )
    }

    /// Create an attribute of a type with no surface mapping.
    pub fn custom(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::with_kind(name, AttributeKind::Basic, AttributeType::Custom(type_name.into()))
    }

    /// Create an embedded attribute.
    pub fn embedded(name: impl Into<String>, embeddable: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            AttributeKind::Embedded,
            AttributeType::Embedded(embeddable.into()),
        )
        .nullable()
    }

    /// Create an element collection of `element` values.
    pub fn element_collection(name: impl Into<String>, element: AttributeType) -> Self {
        let mut attr = Self::with_kind(name, AttributeKind::ElementCollection, element);
        attr.filterable = false;
        attr.orderable = false;
        attr
    }

    /// Create a nullable to-one association joined on `<name>_id` = target `id`.
    pub fn to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let target = target.into();
        let local_key = format!("{name}_id");
        let mut attr = Self::with_kind(
            name,
            AttributeKind::ToOne,
            AttributeType::Entity(target.clone()),
        );
        attr.nullable = true;
        attr.orderable = false;
        attr.association = Some(Association {
            target,
            local_key,
            remote_key: "id".to_string(),
            nullable: true,
        });
        attr
    }

    /// Create a to-many association whose target rows point back through
    /// `mapped_by` to the owner's `id`.
    pub fn to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        mapped_by: impl Into<String>,
    ) -> Self {
        let target = target.into();
        let mut attr = Self::with_kind(
            name,
            AttributeKind::ToMany,
            AttributeType::Entity(target.clone()),
        );
        attr.orderable = false;
        attr.association = Some(Association {
            target,
            local_key: "id".to_string(),
            remote_key: mapped_by.into(),
            nullable: true,
        });
        attr
    }

    /// Override the join keys of an association.
    pub fn with_keys(mut self, local_key: impl Into<String>, remote_key: impl Into<String>) -> Self {
        if let Some(assoc) = self.association.as_mut() {
            assoc.local_key = local_key.into();
            assoc.remote_key = remote_key.into();
        }
        self
    }

    /// Mark the value as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the value (or the association) as always present.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        if let Some(assoc) = self.association.as_mut() {
            assoc.nullable = false;
        }
        self
    }

    /// Hide the attribute from the surface.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Leave the attribute out of criteria types.
    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    /// Drop the `orderBy` argument.
    pub fn not_orderable(mut self) -> Self {
        self.orderable = false;
        self
    }

    /// Set the surface description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check if this attribute is an association.
    pub fn is_association(&self) -> bool {
        matches!(self.kind, AttributeKind::ToOne | AttributeKind::ToMany)
    }
}
