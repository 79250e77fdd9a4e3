//! Entity and embeddable descriptors.

use super::attribute::{AttributeDescriptor, AttributeKind};

/// A persistent entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Entity name (unique within the metamodel).
    pub name: String,
    /// Name of the identity attribute.
    pub identity: String,
    /// Attributes in declaration order.
    pub attributes: Vec<AttributeDescriptor>,
    /// Hidden from the surface.
    pub ignored: bool,
    /// Surface description.
    pub description: Option<String>,
}

impl EntityDescriptor {
    /// Create a new entity descriptor.
    pub fn new(name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: identity.into(),
            attributes: Vec::new(),
            ignored: false,
            description: None,
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add multiple attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeDescriptor>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Hide the entity from the surface.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Set the surface description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get the identity attribute.
    pub fn identity_attribute(&self) -> Option<&AttributeDescriptor> {
        self.attribute(&self.identity)
    }

    /// Visible attributes in declaration order.
    pub fn visible_attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| !a.ignored)
    }

    /// Association attributes.
    pub fn associations(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| a.is_association())
    }
}

/// An embeddable type: a group of attributes stored with the owning row.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddableDescriptor {
    /// Embeddable name (unique within the metamodel).
    pub name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<AttributeDescriptor>,
    /// Surface description.
    pub description: Option<String>,
}

impl EmbeddableDescriptor {
    /// Create a new embeddable descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            description: None,
        }
    }

    /// Add an attribute. Embeddables hold basic, embedded and element
    /// collection attributes only.
    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set the surface description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Visible attributes in declaration order.
    pub fn visible_attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes
            .iter()
            .filter(|a| !a.ignored && !matches!(a.kind, AttributeKind::ToOne | AttributeKind::ToMany))
    }
}
