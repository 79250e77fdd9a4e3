//! Write-once type registry used during compilation.
//!
//! A type is reserved under its `(source, role)` key before its fields are
//! built. Any lookup of that key from then on returns the reserved id, so an
//! association cycle (Author -> Book -> Author) resolves to a forward
//! reference instead of recursing. Each slot is filled exactly once.

use std::collections::HashMap;

use crate::error::CompileError;

use super::types::{GeneratedType, TypeId, TypeRole, TypeSource};

/// Key of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub source: TypeSource,
    pub role: TypeRole,
}

impl TypeKey {
    /// Create a key.
    pub fn new(source: TypeSource, role: TypeRole) -> Self {
        Self { source, role }
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.source, self.role)
    }
}

#[derive(Debug)]
struct Slot {
    name: String,
    ty: Option<GeneratedType>,
}

/// Memoizing registry of generated types.
#[derive(Debug, Default)]
pub struct TypeCache {
    slots: Vec<Slot>,
    index: HashMap<TypeKey, TypeId>,
    /// Every claimed name and who claimed it.
    names: HashMap<String, String>,
}

impl TypeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a name that is not backed by a generated type (scalar names,
    /// root field names).
    pub fn claim_name(&mut self, name: &str, owner: impl Into<String>) -> Result<(), CompileError> {
        let owner = owner.into();
        if let Some(first) = self.names.get(name) {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                first: first.clone(),
                second: owner,
            });
        }
        self.names.insert(name.to_string(), owner);
        Ok(())
    }

    /// Id of a reserved type.
    pub fn lookup(&self, key: &TypeKey) -> Option<TypeId> {
        self.index.get(key).copied()
    }

    /// Reserve a slot for `key` under `name`. Returns the existing id when the
    /// key is already reserved.
    pub fn reserve(&mut self, key: TypeKey, name: String) -> Result<TypeId, CompileError> {
        if let Some(id) = self.lookup(&key) {
            return Ok(id);
        }
        self.claim_name(&name, key.describe())?;

        let id = TypeId(self.slots.len());
        self.slots.push(Slot { name, ty: None });
        self.index.insert(key, id);
        Ok(id)
    }

    /// Fill a reserved slot.
    pub fn fill(&mut self, id: TypeId, ty: GeneratedType) -> Result<(), CompileError> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or_else(|| CompileError::Unresolved {
                name: ty.name.clone(),
            })?;
        if slot.ty.is_some() {
            return Err(CompileError::Redefined {
                name: slot.name.clone(),
            });
        }
        slot.ty = Some(ty);
        Ok(())
    }

    /// Name reserved for `id`.
    pub fn name_of(&self, id: TypeId) -> &str {
        self.slots.get(id.0).map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Whether the slot for `id` has been filled.
    pub fn is_filled(&self, id: TypeId) -> bool {
        self.slots.get(id.0).is_some_and(|s| s.ty.is_some())
    }

    /// Number of reserved types.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no type has been reserved.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consume the cache, returning types in reservation order. Fails if a
    /// reserved slot was never filled.
    pub fn finish(self) -> Result<Vec<GeneratedType>, CompileError> {
        self.slots
            .into_iter()
            .map(|slot| {
                slot.ty
                    .ok_or(CompileError::Unresolved { name: slot.name })
            })
            .collect()
    }
}
