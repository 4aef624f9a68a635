//! In-memory resource graph.
//!
//! Resources live in an arena and refer to each other through [`NodeRef`]
//! indices, so cycles (an article whose author reviews it) and shared
//! subgraphs need no reference counting. Relationship values are stored per
//! declaration slot of the resource's type; the schema is consulted when
//! links are set, never when they are read.

use serde_json::{Map, Value};

use crate::error::GraphError;
use crate::schema::{RelationshipDescriptor, Schema};
use crate::types::{Cardinality, Identity, ResourceKey, TypeHandle};

/// Index of a resource in a [`ResourceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Materialized state of one relationship on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Related {
    /// Never fetched. Distinct from a loaded relationship that is empty.
    #[default]
    Unloaded,
    One(Option<NodeRef>),
    Many(Vec<NodeRef>),
}

impl Related {
    /// Related nodes in the order the relationship exposes them.
    pub fn targets(&self) -> &[NodeRef] {
        match self {
            Related::Unloaded | Related::One(None) => &[],
            Related::One(Some(node)) => std::slice::from_ref(node),
            Related::Many(nodes) => nodes,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Related::Unloaded)
    }
}

/// One resource instance.
#[derive(Debug, Clone)]
pub struct Resource {
    type_handle: TypeHandle,
    identity: Identity,
    attributes: Map<String, Value>,
    relationships: Vec<Related>,
}

impl Resource {
    pub fn type_handle(&self) -> TypeHandle {
        self.type_handle
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.type_handle, self.identity.clone())
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Relationship state for a declaration slot.
    pub fn related(&self, slot: usize) -> &Related {
        static UNLOADED: Related = Related::Unloaded;
        self.relationships.get(slot).unwrap_or(&UNLOADED)
    }
}

/// Arena of resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: Vec<Resource>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource of the named type. All relationships start unloaded.
    ///
    /// Adding the same type and identity twice creates two nodes; both are
    /// treated as one logical resource when a document is built.
    pub fn add(
        &mut self,
        schema: &Schema,
        type_name: &str,
        identity: Identity,
    ) -> Result<NodeRef, GraphError> {
        let ty = schema.require(type_name)?;
        let node = NodeRef(self.nodes.len());
        self.nodes.push(Resource {
            type_handle: ty.handle(),
            identity,
            attributes: Map::new(),
            relationships: vec![Related::Unloaded; ty.relationships().len()],
        });
        Ok(node)
    }

    pub fn set_attribute(
        &mut self,
        node: NodeRef,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), GraphError> {
        self.resource_mut(node)?
            .attributes
            .insert(name.into(), value);
        Ok(())
    }

    /// Replace all attributes of a resource.
    pub fn set_attributes(
        &mut self,
        node: NodeRef,
        attributes: Map<String, Value>,
    ) -> Result<(), GraphError> {
        self.resource_mut(node)?.attributes = attributes;
        Ok(())
    }

    /// Set a loaded to-one relationship. `None` means loaded and empty.
    pub fn link_one(
        &mut self,
        schema: &Schema,
        from: NodeRef,
        relationship: &str,
        target: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        let targets: Vec<NodeRef> = target.into_iter().collect();
        let slot = self.checked_slot(schema, from, relationship, Cardinality::One, &targets)?;
        self.set_slot(from, slot, Related::One(target))
    }

    /// Set a loaded to-many relationship; target order is preserved.
    pub fn link_many(
        &mut self,
        schema: &Schema,
        from: NodeRef,
        relationship: &str,
        targets: Vec<NodeRef>,
    ) -> Result<(), GraphError> {
        let slot = self.checked_slot(schema, from, relationship, Cardinality::Many, &targets)?;
        self.set_slot(from, slot, Related::Many(targets))
    }

    /// Mark a relationship as not loaded.
    pub fn unload(
        &mut self,
        schema: &Schema,
        from: NodeRef,
        relationship: &str,
    ) -> Result<(), GraphError> {
        let descriptor = self.descriptor(schema, from, relationship)?;
        let slot = descriptor.slot;
        self.set_slot(from, slot, Related::Unloaded)
    }

    pub fn get(&self, node: NodeRef) -> Option<&Resource> {
        self.nodes.get(node.0)
    }

    /// Look up a node, failing if it is not part of this graph.
    pub fn resource(&self, node: NodeRef) -> Result<&Resource, GraphError> {
        self.get(node)
            .ok_or(GraphError::DanglingNode { index: node.0 })
    }

    pub fn key(&self, node: NodeRef) -> Result<ResourceKey, GraphError> {
        Ok(self.resource(node)?.key())
    }

    /// Find the first node with the given type and identity.
    pub fn find(&self, type_handle: TypeHandle, identity: &Identity) -> Option<NodeRef> {
        self.nodes
            .iter()
            .position(|r| r.type_handle == type_handle && &r.identity == identity)
            .map(NodeRef)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> {
        (0..self.nodes.len()).map(NodeRef)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // --- Internal implementation ---

    fn resource_mut(&mut self, node: NodeRef) -> Result<&mut Resource, GraphError> {
        self.nodes
            .get_mut(node.0)
            .ok_or(GraphError::DanglingNode { index: node.0 })
    }

    fn set_slot(&mut self, node: NodeRef, slot: usize, value: Related) -> Result<(), GraphError> {
        let resource = self.resource_mut(node)?;
        if resource.relationships.len() <= slot {
            resource.relationships.resize(slot + 1, Related::Unloaded);
        }
        resource.relationships[slot] = value;
        Ok(())
    }

    fn descriptor<'s>(
        &self,
        schema: &'s Schema,
        from: NodeRef,
        relationship: &str,
    ) -> Result<&'s RelationshipDescriptor, GraphError> {
        let handle = self.resource(from)?.type_handle;
        Ok(schema
            .resource_type(handle)?
            .require_relationship(relationship)?)
    }

    /// Validate cardinality and target types, returning the slot to write.
    fn checked_slot(
        &self,
        schema: &Schema,
        from: NodeRef,
        relationship: &str,
        cardinality: Cardinality,
        targets: &[NodeRef],
    ) -> Result<usize, GraphError> {
        let descriptor = self.descriptor(schema, from, relationship)?;
        let owner = schema.resource_type(self.resource(from)?.type_handle)?;
        if descriptor.cardinality != cardinality {
            return Err(GraphError::cardinality(
                owner.name(),
                relationship,
                descriptor.cardinality,
            ));
        }
        for &target in targets {
            let actual = self.resource(target)?.type_handle;
            if actual != descriptor.target {
                return Err(GraphError::TargetTypeMismatch {
                    type_name: owner.name().to_string(),
                    relationship: relationship.to_string(),
                    expected: schema.resource_type(descriptor.target)?.name().to_string(),
                    actual: schema.resource_type(actual)?.name().to_string(),
                });
            }
        }
        Ok(descriptor.slot)
    }
}
