//! Document model and assembly.
//!
//! [`DocumentBuilder::build`] turns primary resources plus an include tree
//! into a [`Document`]: primary `data`, an `included` list in
//! first-discovery order, and relationship linkage on every resource body.
//! The model serializes to the JSON:API wire shape with `serde`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DocumentError;
use crate::fieldset::{AllFields, FieldsetProvider};
use crate::graph::{NodeRef, Related, ResourceGraph};
use crate::include::{IncludePlan, IncludeTree};
use crate::links::{BuildContext, LinkBuilder, Links, Meta, MetaBuilder, NoLinks, NoMeta};
use crate::schema::{RelationshipDescriptor, Schema};
use crate::traversal::traverse;
use crate::types::{Cardinality, Identity, TypeHandle, UnloadedPolicy, JSONAPI_VERSION};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Type plus `id` (persisted) or `lid` (local) reference to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
}

impl ResourceIdentifier {
    pub fn new(type_name: impl Into<String>, identity: &Identity) -> Self {
        let (id, lid) = match identity {
            Identity::Id(id) => (Some(id.clone()), None),
            Identity::Local(lid) => (None, Some(lid.clone())),
        };
        Self {
            type_name: type_name.into(),
            id,
            lid,
        }
    }
}

/// Relationship `data`: `null`, one identifier, or a list of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    Null,
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

impl Linkage {
    /// Identifiers in linkage order.
    pub fn identifiers(&self) -> &[ResourceIdentifier] {
        match self {
            Linkage::Null => &[],
            Linkage::One(identifier) => std::slice::from_ref(identifier),
            Linkage::Many(identifiers) => identifiers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelationshipObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Relationship members in the owning type's declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relationships(Vec<(String, RelationshipObject)>);

impl Relationships {
    pub fn get(&self, name: &str) -> Option<&RelationshipObject> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: String, relationship: RelationshipObject) {
        self.0.push((name, relationship));
    }
}

impl Serialize for Relationships {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, relationship) in &self.0 {
            map.serialize_entry(name, relationship)?;
        }
        map.end()
    }
}

/// A full resource body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceObject {
    #[serde(flatten)]
    pub identifier: ResourceIdentifier,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Relationships::is_empty")]
    pub relationships: Relationships,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Null,
    One(Box<ResourceObject>),
    Many(Vec<ResourceObject>),
}

impl PrimaryData {
    pub fn resources(&self) -> &[ResourceObject] {
        match self {
            PrimaryData::Null => &[],
            PrimaryData::One(resource) => std::slice::from_ref(resource.as_ref()),
            PrimaryData::Many(resources) => resources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonApiObject {
    pub version: String,
}

/// A compound document ready for encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
}

impl Document {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Identifiers of the included resources, in order.
    pub fn included_identifiers(&self) -> Vec<&ResourceIdentifier> {
        self.included.iter().map(|r| &r.identifier).collect()
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Which resources form the primary data, and in what shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primary {
    /// `data: null`.
    None,
    /// `data` is a single resource object.
    One(NodeRef),
    /// `data` is a list, even with zero or one element.
    Collection(Vec<NodeRef>),
}

impl Primary {
    /// Shape by count: none is `null`, one is a single object, more is a list.
    pub fn from_roots(roots: &[NodeRef]) -> Self {
        match roots {
            [] => Primary::None,
            [one] => Primary::One(*one),
            many => Primary::Collection(many.to_vec()),
        }
    }

    pub fn nodes(&self) -> &[NodeRef] {
        match self {
            Primary::None => &[],
            Primary::One(node) => std::slice::from_ref(node),
            Primary::Collection(nodes) => nodes,
        }
    }
}

/// Options for document assembly.
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// How unloaded relationships are written.
    pub unloaded: UnloadedPolicy,
    /// Passed through to link and meta builders.
    pub context: BuildContext,
    /// Top-level `meta` member.
    pub meta: Option<Meta>,
    /// Whether to write the top-level `jsonapi` member.
    pub jsonapi: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            unloaded: UnloadedPolicy::default(),
            context: BuildContext::default(),
            meta: None,
            jsonapi: true,
        }
    }
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unloaded(mut self, unloaded: UnloadedPolicy) -> Self {
        self.unloaded = unloaded;
        self
    }

    pub fn context(mut self, context: BuildContext) -> Self {
        self.context = context;
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn jsonapi(mut self, jsonapi: bool) -> Self {
        self.jsonapi = jsonapi;
        self
    }
}

/// Assembles documents against one schema.
///
/// Holds no per-document state; one builder may serve any number of
/// documents, concurrently if the collaborators allow it.
pub struct DocumentBuilder<'a> {
    schema: &'a Schema,
    fields: &'a dyn FieldsetProvider,
    links: &'a dyn LinkBuilder,
    meta: &'a dyn MetaBuilder,
    options: DocumentOptions,
}

impl<'a> DocumentBuilder<'a> {
    /// Builder with all fields, no links and no meta.
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            fields: &AllFields,
            links: &NoLinks,
            meta: &NoMeta,
            options: DocumentOptions::default(),
        }
    }

    pub fn fields(mut self, fields: &'a dyn FieldsetProvider) -> Self {
        self.fields = fields;
        self
    }

    pub fn links(mut self, links: &'a dyn LinkBuilder) -> Self {
        self.links = links;
        self
    }

    pub fn meta(mut self, meta: &'a dyn MetaBuilder) -> Self {
        self.meta = meta;
        self
    }

    pub fn options(mut self, options: DocumentOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the document for `primary`, following `include`.
    ///
    /// The include tree is checked against the schema for every primary type
    /// before anything is walked.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if a primary resource's type is not in the
    /// schema, if an include path names an undeclared relationship, or if a
    /// node does not belong to `graph`. No partial document is produced.
    pub fn build(
        &self,
        graph: &ResourceGraph,
        primary: &Primary,
        include: &IncludeTree,
    ) -> Result<Document, DocumentError> {
        let roots = primary.nodes();
        debug!(roots = roots.len(), include = %include, "building document");

        let plans = self.plans_for(graph, roots, include)?;
        let traversal = traverse(graph, roots, &plans)?;

        let data = match primary {
            Primary::None => PrimaryData::Null,
            Primary::One(node) => PrimaryData::One(Box::new(self.resource_object(graph, *node)?)),
            Primary::Collection(nodes) => PrimaryData::Many(
                nodes
                    .iter()
                    .map(|&node| self.resource_object(graph, node))
                    .collect::<Result<_, _>>()?,
            ),
        };

        let included = traversal
            .included
            .iter()
            .map(|discovery| self.resource_object(graph, discovery.node))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            included = included.len(),
            expanded = traversal.expanded,
            skipped = traversal.skipped,
            "document built"
        );

        Ok(Document {
            data,
            included,
            meta: self.options.meta.clone(),
            jsonapi: self.options.jsonapi.then(|| JsonApiObject {
                version: JSONAPI_VERSION.to_string(),
            }),
        })
    }

    /// One include plan per distinct primary type, in first-seen order.
    fn plans_for(
        &self,
        graph: &ResourceGraph,
        roots: &[NodeRef],
        include: &IncludeTree,
    ) -> Result<Vec<IncludePlan>, DocumentError> {
        let mut seen: Vec<TypeHandle> = Vec::new();
        let mut plans = Vec::new();
        for &root in roots {
            let handle = graph.resource(root)?.type_handle();
            if seen.contains(&handle) {
                continue;
            }
            seen.push(handle);
            plans.push(IncludePlan::resolve(self.schema, handle, include)?);
        }
        Ok(plans)
    }

    fn identifier(
        &self,
        graph: &ResourceGraph,
        node: NodeRef,
    ) -> Result<ResourceIdentifier, DocumentError> {
        let resource = graph.resource(node)?;
        let resource_type = self.schema.resource_type(resource.type_handle())?;
        Ok(ResourceIdentifier::new(
            resource_type.name(),
            resource.identity(),
        ))
    }

    fn linkage(
        &self,
        graph: &ResourceGraph,
        descriptor: &RelationshipDescriptor,
        related: &Related,
    ) -> Result<Option<Linkage>, DocumentError> {
        let linkage = match related {
            Related::Unloaded => match self.options.unloaded {
                UnloadedPolicy::Omit => None,
                UnloadedPolicy::Null => Some(match descriptor.cardinality {
                    Cardinality::One => Linkage::Null,
                    Cardinality::Many => Linkage::Many(Vec::new()),
                }),
            },
            Related::One(None) => Some(Linkage::Null),
            Related::One(Some(node)) => Some(Linkage::One(self.identifier(graph, *node)?)),
            Related::Many(nodes) => Some(Linkage::Many(
                nodes
                    .iter()
                    .map(|&node| self.identifier(graph, node))
                    .collect::<Result<_, _>>()?,
            )),
        };
        Ok(linkage)
    }

    /// Shape one resource body. Builders are called here and nowhere else.
    fn resource_object(
        &self,
        graph: &ResourceGraph,
        node: NodeRef,
    ) -> Result<ResourceObject, DocumentError> {
        let resource = graph.resource(node)?;
        let resource_type = self.schema.resource_type(resource.type_handle())?;
        let fields = self.fields.fields_for(resource_type);
        let context = &self.options.context;

        let attributes = resource
            .attributes()
            .iter()
            .filter(|(name, _)| fields.allows(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut relationships = Relationships::default();
        for descriptor in resource_type.relationships() {
            if !fields.allows(&descriptor.name) {
                continue;
            }
            let data = self.linkage(graph, descriptor, resource.related(descriptor.slot))?;
            let links = self
                .links
                .relationship_links(resource_type, resource, descriptor, context);
            let meta = self
                .meta
                .relationship_meta(resource_type, resource, descriptor, context);
            if data.is_none() && links.is_none() && meta.is_none() {
                continue;
            }
            relationships.push(
                descriptor.name.clone(),
                RelationshipObject { data, links, meta },
            );
        }

        Ok(ResourceObject {
            identifier: ResourceIdentifier::new(resource_type.name(), resource.identity()),
            attributes,
            relationships,
            links: self.links.resource_links(resource_type, resource, context),
            meta: self.meta.resource_meta(resource_type, resource, context),
        })
    }
}

/// Build a document with all fields, no links or meta, and default options.
pub fn build_document(
    schema: &Schema,
    graph: &ResourceGraph,
    primary: &Primary,
    include: &IncludeTree,
) -> Result<Document, DocumentError> {
    DocumentBuilder::new(schema).build(graph, primary, include)
}
