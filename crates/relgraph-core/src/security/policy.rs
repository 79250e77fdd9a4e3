//! Access policies consulted while binding a query.

use std::collections::HashSet;

use crate::error::AuthorizationError;

/// Decides whether the caller may read an entity or one of its attributes.
///
/// Checked once per selected field while the document is bound; a denial
/// nulls that field and reports an authorization error at its path.
pub trait AccessPolicy: Send + Sync {
    /// Check read access to an entity.
    fn check_entity(&self, entity: &str) -> Result<(), AuthorizationError>;

    /// Check read access to one attribute of an entity.
    fn check_field(&self, entity: &str, attribute: &str) -> Result<(), AuthorizationError>;
}

/// Policy that allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check_entity(&self, _entity: &str) -> Result<(), AuthorizationError> {
        Ok(())
    }

    fn check_field(&self, _entity: &str, _attribute: &str) -> Result<(), AuthorizationError> {
        Ok(())
    }
}

/// Policy that denies a fixed set of entities and attributes.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    entities: HashSet<String>,
    fields: HashSet<(String, String)>,
}

impl DenyList {
    /// Create a policy that denies nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny every read of `entity`.
    pub fn deny_entity(mut self, entity: impl Into<String>) -> Self {
        self.entities.insert(entity.into());
        self
    }

    /// Deny reads of `entity.attribute`.
    pub fn deny_field(mut self, entity: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.fields.insert((entity.into(), attribute.into()));
        self
    }
}

impl AccessPolicy for DenyList {
    fn check_entity(&self, entity: &str) -> Result<(), AuthorizationError> {
        if self.entities.contains(entity) {
            return Err(AuthorizationError::EntityDenied {
                entity: entity.to_string(),
            });
        }
        Ok(())
    }

    fn check_field(&self, entity: &str, attribute: &str) -> Result<(), AuthorizationError> {
        self.check_entity(entity)?;
        if self
            .fields
            .contains(&(entity.to_string(), attribute.to_string()))
        {
            return Err(AuthorizationError::FieldDenied {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            });
        }
        Ok(())
    }
}
