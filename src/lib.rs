//! JSON:API compound document builder
//!
//! Turns an in-memory resource graph into a JSON:API document: primary
//! `data`, an `included` list of related resources reached through include
//! paths, and relationship linkage on every resource.
//!
//! # Example
//!
//! ```
//! use jsonapi_document::{build_document, IncludeTree, Identity, Primary, ResourceGraph, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .resource("articles")
//!     .to_one("author", "people")
//!     .resource("people")
//!     .to_many("articles", "articles")
//!     .build()
//!     .unwrap();
//!
//! let mut graph = ResourceGraph::new();
//! let article = graph.add(&schema, "articles", Identity::id("1")).unwrap();
//! let author = graph.add(&schema, "people", Identity::id("9")).unwrap();
//! graph.link_one(&schema, article, "author", Some(author)).unwrap();
//! graph.link_many(&schema, author, "articles", vec![article]).unwrap();
//!
//! let include = IncludeTree::parse("author.articles").unwrap();
//! let document = build_document(&schema, &graph, &Primary::One(article), &include).unwrap();
//! let value = document.to_value().unwrap();
//!
//! // The author is included once; the article itself never is.
//! assert_eq!(value["included"].as_array().unwrap().len(), 1);
//! assert_eq!(value["included"][0]["id"], json!("9"));
//! ```
//!
//! # Ordering
//!
//! | Output | Order |
//! |--------|-------|
//! | `data` list | primary input order |
//! | `included` | first discovery, depth-first in include order |
//! | `relationships` members | declaration order on the resource type |
//! | to-many linkage | order the relationship holds |
//!
//! # Unloaded relationships
//!
//! A relationship never set on the graph is *unloaded*. With the default
//! [`UnloadedPolicy::Omit`] it gets no `data` member; with
//! [`UnloadedPolicy::Null`] it renders as `null` or `[]`.

mod document;
mod error;
mod fieldset;
mod graph;
mod include;
mod links;
mod loader;
mod schema;
mod traversal;
mod types;
mod validator;

pub use document::{
    build_document, Document, DocumentBuilder, DocumentOptions, JsonApiObject, Linkage, Primary,
    PrimaryData, RelationshipObject, Relationships, ResourceIdentifier, ResourceObject,
};
pub use error::{ConfigError, DocumentError, DocumentViolation, GraphError, LoadError, ValidateError};
pub use fieldset::{AllFields, FieldSet, FieldsetProvider, SparseFieldsets};
pub use graph::{NodeRef, Related, Resource, ResourceGraph};
pub use include::{IncludeNode, IncludePlan, IncludeTree, PlanNode, PlanNodeId};
pub use links::{
    BaseUrlLinks, BuildContext, LinkBuilder, Links, Meta, MetaBuilder, NoLinks, NoMeta, StaticMeta,
};
pub use loader::{is_url, load_dataset, load_dataset_auto, load_dataset_str, load_dataset_value, Dataset};
pub use schema::{RelationshipDescriptor, ResourceType, Schema, SchemaBuilder};
pub use traversal::{traverse, Discovery, Traversal};
pub use types::{
    json_type_name, Cardinality, Identity, Operation, ResourceKey, TypeHandle, UnloadedPolicy,
    JSONAPI_VERSION,
};
pub use validator::{document_schema, validate_document};

#[cfg(feature = "remote")]
pub use loader::load_dataset_url;
