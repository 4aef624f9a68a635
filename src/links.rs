//! Link and meta builders.
//!
//! The document builder calls these once for each resource body it writes
//! and once for each relationship member on that body. Link shapes are
//! entirely up to the implementation.

use serde_json::{Map, Value};

use crate::graph::Resource;
use crate::schema::{RelationshipDescriptor, ResourceType};
use crate::types::Operation;

/// A JSON:API links object. Values are URL strings or link objects.
pub type Links = Map<String, Value>;

/// A JSON:API meta object.
pub type Meta = Map<String, Value>;

/// Request-level information passed to every builder call.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub operation: Operation,
    /// Base URL for generated links, without trailing slash.
    pub base_url: Option<String>,
}

impl BuildContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            base_url: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }
}

pub trait LinkBuilder {
    fn resource_links(
        &self,
        resource_type: &ResourceType,
        resource: &Resource,
        context: &BuildContext,
    ) -> Option<Links>;

    fn relationship_links(
        &self,
        _resource_type: &ResourceType,
        _resource: &Resource,
        _relationship: &RelationshipDescriptor,
        _context: &BuildContext,
    ) -> Option<Links> {
        None
    }
}

pub trait MetaBuilder {
    fn resource_meta(
        &self,
        resource_type: &ResourceType,
        resource: &Resource,
        context: &BuildContext,
    ) -> Option<Meta>;

    fn relationship_meta(
        &self,
        _resource_type: &ResourceType,
        _resource: &Resource,
        _relationship: &RelationshipDescriptor,
        _context: &BuildContext,
    ) -> Option<Meta> {
        None
    }
}

impl<F> LinkBuilder for F
where
    F: Fn(&ResourceType, &Resource, &BuildContext) -> Option<Links>,
{
    fn resource_links(
        &self,
        resource_type: &ResourceType,
        resource: &Resource,
        context: &BuildContext,
    ) -> Option<Links> {
        self(resource_type, resource, context)
    }
}

impl<F> MetaBuilder for F
where
    F: Fn(&ResourceType, &Resource, &BuildContext) -> Option<Meta>,
{
    fn resource_meta(
        &self,
        resource_type: &ResourceType,
        resource: &Resource,
        context: &BuildContext,
    ) -> Option<Meta> {
        self(resource_type, resource, context)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkBuilder for NoLinks {
    fn resource_links(&self, _: &ResourceType, _: &Resource, _: &BuildContext) -> Option<Links> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeta;

impl MetaBuilder for NoMeta {
    fn resource_meta(&self, _: &ResourceType, _: &Resource, _: &BuildContext) -> Option<Meta> {
        None
    }
}

/// Conventional URLs under `context.base_url`:
///
/// - resource `self`: `{base}/{type}/{id}`
/// - relationship `self`: `{base}/{type}/{id}/relationships/{name}`
/// - relationship `related`: `{base}/{type}/{id}/{name}`
///
/// Produces nothing without a base URL or for resources with local identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseUrlLinks;

impl BaseUrlLinks {
    fn resource_url(
        resource_type: &ResourceType,
        resource: &Resource,
        context: &BuildContext,
    ) -> Option<String> {
        let base = context.base_url.as_deref()?;
        if resource.identity().is_local() {
            return None;
        }
        Some(format!(
            "{}/{}/{}",
            base,
            resource_type.name(),
            resource.identity().as_str()
        ))
    }
}

impl LinkBuilder for BaseUrlLinks {
    fn resource_links(
        &self,
        resource_type: &ResourceType,
        resource: &Resource,
        context: &BuildContext,
    ) -> Option<Links> {
        let url = Self::resource_url(resource_type, resource, context)?;
        let mut links = Links::new();
        links.insert("self".to_string(), Value::String(url));
        Some(links)
    }

    fn relationship_links(
        &self,
        resource_type: &ResourceType,
        resource: &Resource,
        relationship: &RelationshipDescriptor,
        context: &BuildContext,
    ) -> Option<Links> {
        let url = Self::resource_url(resource_type, resource, context)?;
        let mut links = Links::new();
        links.insert(
            "self".to_string(),
            Value::String(format!("{}/relationships/{}", url, relationship.name)),
        );
        links.insert(
            "related".to_string(),
            Value::String(format!("{}/{}", url, relationship.name)),
        );
        Some(links)
    }
}

/// The same meta object on every resource, e.g. a copyright notice.
#[derive(Debug, Clone, Default)]
pub struct StaticMeta {
    meta: Meta,
    writes_only: bool,
}

impl StaticMeta {
    pub fn new(meta: Meta) -> Self {
        Self {
            meta,
            writes_only: false,
        }
    }

    /// Only attach the meta when the operation writes data.
    pub fn writes_only(mut self, writes_only: bool) -> Self {
        self.writes_only = writes_only;
        self
    }
}

impl MetaBuilder for StaticMeta {
    fn resource_meta(&self, _: &ResourceType, _: &Resource, context: &BuildContext) -> Option<Meta> {
        if self.meta.is_empty() || (self.writes_only && !context.operation.is_write()) {
            return None;
        }
        Some(self.meta.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceGraph;
    use crate::schema::Schema;
    use crate::types::Identity;
    use serde_json::json;

    fn fixture() -> (Schema, ResourceGraph) {
        let schema = Schema::builder()
            .resource("articles")
            .to_one("author", "people")
            .resource("people")
            .build()
            .unwrap();
        let mut graph = ResourceGraph::new();
        graph.add(&schema, "articles", Identity::id("1")).unwrap();
        graph.add(&schema, "articles", Identity::local("tmp")).unwrap();
        (schema, graph)
    }

    #[test]
    fn base_url_links_for_resource_and_relationship() {
        let (schema, graph) = fixture();
        let articles = schema.require("articles").unwrap();
        let article = graph.get(graph.nodes().next().unwrap()).unwrap();
        let context = BuildContext::new(Operation::Read).base_url("https://example.com/api/");

        let links = BaseUrlLinks
            .resource_links(articles, article, &context)
            .unwrap();
        assert_eq!(links["self"], json!("https://example.com/api/articles/1"));

        let author = articles.relationship("author").unwrap();
        let links = BaseUrlLinks
            .relationship_links(articles, article, author, &context)
            .unwrap();
        assert_eq!(
            links["self"],
            json!("https://example.com/api/articles/1/relationships/author")
        );
        assert_eq!(
            links["related"],
            json!("https://example.com/api/articles/1/author")
        );
    }

    #[test]
    fn base_url_links_need_base_and_persisted_identity() {
        let (schema, graph) = fixture();
        let articles = schema.require("articles").unwrap();
        let mut nodes = graph.nodes();
        let persisted = graph.get(nodes.next().unwrap()).unwrap();
        let local = graph.get(nodes.next().unwrap()).unwrap();

        let bare = BuildContext::default();
        assert!(BaseUrlLinks.resource_links(articles, persisted, &bare).is_none());

        let context = BuildContext::default().base_url("https://example.com");
        assert!(BaseUrlLinks.resource_links(articles, local, &context).is_none());
    }

    #[test]
    fn static_meta_respects_writes_only() {
        let (schema, graph) = fixture();
        let articles = schema.require("articles").unwrap();
        let article = graph.get(graph.nodes().next().unwrap()).unwrap();
        let mut meta = Meta::new();
        meta.insert("copyright".into(), json!("Copyright 2015 Example Corp."));
        let builder = StaticMeta::new(meta).writes_only(true);

        let read = BuildContext::new(Operation::Read);
        assert!(builder.resource_meta(articles, article, &read).is_none());

        let create = BuildContext::new(Operation::Create);
        let meta = builder.resource_meta(articles, article, &create).unwrap();
        assert_eq!(meta["copyright"], json!("Copyright 2015 Example Corp."));
    }

    #[test]
    fn closures_are_builders() {
        let (schema, graph) = fixture();
        let articles = schema.require("articles").unwrap();
        let article = graph.get(graph.nodes().next().unwrap()).unwrap();
        let builder = |_: &ResourceType, r: &Resource, _: &BuildContext| {
            let mut meta = Meta::new();
            meta.insert("id".into(), json!(r.identity().as_str()));
            Some(meta)
        };
        let meta = builder
            .resource_meta(articles, article, &BuildContext::default())
            .unwrap();
        assert_eq!(meta["id"], json!("1"));
        assert!(NoMeta
            .resource_meta(articles, article, &BuildContext::default())
            .is_none());
        assert!(NoLinks
            .resource_links(articles, article, &BuildContext::default())
            .is_none());
    }
}
