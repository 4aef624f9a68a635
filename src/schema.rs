//! Resource schema: resource types and their declared relationships.
//!
//! A [`Schema`] is assembled once with [`SchemaBuilder`] and is read-only
//! afterwards. Relationship targets are resolved to [`TypeHandle`]s at build
//! time, so every later lookup is an index into a table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ConfigError;
use crate::types::{Cardinality, TypeHandle};

// Zero is left for `Schema::default()`.
static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// A relationship declared on a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
    pub target: TypeHandle,
    /// Position in the owning type's declaration order.
    pub slot: usize,
}

/// A resource type and its relationships in declaration order.
#[derive(Debug, Clone)]
pub struct ResourceType {
    name: String,
    handle: TypeHandle,
    relationships: Vec<RelationshipDescriptor>,
}

impl ResourceType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    /// Relationships in declaration order.
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Look up a relationship, failing with a configuration error.
    pub fn require_relationship(&self, name: &str) -> Result<&RelationshipDescriptor, ConfigError> {
        self.relationship(name)
            .ok_or_else(|| ConfigError::UnknownRelationship {
                type_name: self.name.clone(),
                relationship: name.to_string(),
            })
    }
}

/// Immutable registry of resource types.
///
/// Every built schema gets a process-unique id that its handles carry, so a
/// handle issued by one schema never resolves in another.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    id: u64,
    types: Vec<ResourceType>,
    by_name: HashMap<String, TypeHandle>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolve a handle to its type. Handles from other schemas resolve to `None`.
    pub fn get(&self, handle: TypeHandle) -> Option<&ResourceType> {
        if handle.schema != self.id {
            return None;
        }
        self.types.get(handle.index)
    }

    /// Resolve a handle, failing with a configuration error.
    pub fn resource_type(&self, handle: TypeHandle) -> Result<&ResourceType, ConfigError> {
        self.get(handle)
            .ok_or(ConfigError::UnknownTypeHandle {
                index: handle.index,
            })
    }

    pub fn handle(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).copied()
    }

    /// Look up a type by name, failing with a configuration error.
    pub fn require(&self, name: &str) -> Result<&ResourceType, ConfigError> {
        self.handle(name)
            .and_then(|h| self.get(h))
            .ok_or_else(|| ConfigError::UnknownType {
                type_name: name.to_string(),
            })
    }

    /// Relationships of a type in declaration order.
    pub fn relationships_of(
        &self,
        handle: TypeHandle,
    ) -> Result<&[RelationshipDescriptor], ConfigError> {
        Ok(self.resource_type(handle)?.relationships())
    }

    pub fn types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone)]
struct PendingRelationship {
    name: String,
    cardinality: Cardinality,
    target: String,
}

#[derive(Debug, Clone)]
struct PendingType {
    name: String,
    relationships: Vec<PendingRelationship>,
}

/// Collects type declarations; targets may be declared in any order.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    types: Vec<PendingType>,
}

impl SchemaBuilder {
    /// Declare a resource type. Subsequent relationship calls attach to it.
    pub fn resource(mut self, name: impl Into<String>) -> Self {
        self.types.push(PendingType {
            name: name.into(),
            relationships: Vec::new(),
        });
        self
    }

    /// Declare a to-one relationship on the most recently declared type.
    pub fn to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::One, target)
    }

    /// Declare a to-many relationship on the most recently declared type.
    pub fn to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::Many, target)
    }

    pub fn relationship(
        mut self,
        name: impl Into<String>,
        cardinality: Cardinality,
        target: impl Into<String>,
    ) -> Self {
        let rel = PendingRelationship {
            name: name.into(),
            cardinality,
            target: target.into(),
        };
        match self.types.last_mut() {
            Some(ty) => ty.relationships.push(rel),
            // Relationship before any type: keep it on an unnamed type so
            // build() reports it instead of dropping it.
            None => self.types.push(PendingType {
                name: String::new(),
                relationships: vec![rel],
            }),
        }
        self
    }

    /// Validate the declarations and produce the schema.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for duplicate types or relationships, and for
    /// relationships targeting undeclared types.
    pub fn build(self) -> Result<Schema, ConfigError> {
        let id = NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed);
        let mut by_name = HashMap::new();
        for (index, ty) in self.types.iter().enumerate() {
            if ty.name.is_empty() {
                return Err(ConfigError::UnknownType {
                    type_name: String::new(),
                });
            }
            if by_name.insert(ty.name.clone(), TypeHandle::new(id, index)).is_some() {
                return Err(ConfigError::DuplicateType {
                    type_name: ty.name.clone(),
                });
            }
        }

        let mut types = Vec::with_capacity(self.types.len());
        for (index, pending) in self.types.into_iter().enumerate() {
            let mut relationships: Vec<RelationshipDescriptor> = Vec::new();
            for (slot, rel) in pending.relationships.into_iter().enumerate() {
                if relationships.iter().any(|r| r.name == rel.name) {
                    return Err(ConfigError::DuplicateRelationship {
                        type_name: pending.name,
                        relationship: rel.name,
                    });
                }
                let target = *by_name
                    .get(&rel.target)
                    .ok_or_else(|| ConfigError::UnknownTarget {
                        type_name: pending.name.clone(),
                        relationship: rel.name.clone(),
                        target: rel.target.clone(),
                    })?;
                relationships.push(RelationshipDescriptor {
                    name: rel.name,
                    cardinality: rel.cardinality,
                    target,
                    slot,
                });
            }
            types.push(ResourceType {
                name: pending.name,
                handle: TypeHandle::new(id, index),
                relationships,
            });
        }

        Ok(Schema { id, types, by_name })
    }
}
