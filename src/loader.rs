//! Dataset loading from various sources.
//!
//! A dataset is a JSON file holding a schema, a set of resources with
//! already-loaded relationships, and optionally the primary selection.
//! Handles loading from files, strings, and HTTP URLs.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::document::Primary;
use crate::error::LoadError;
use crate::graph::{NodeRef, ResourceGraph};
use crate::schema::Schema;
use crate::types::{json_type_name, Cardinality, Identity, TypeHandle};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A schema, the resource graph built against it, and the primary selection.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    pub graph: ResourceGraph,
    pub primary: Primary,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    types: Vec<RawType>,
    #[serde(default)]
    resources: Vec<RawResource>,
    #[serde(default)]
    primary: Option<RawPrimary>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    name: String,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    name: String,
    #[serde(rename = "type")]
    target: String,
    cardinality: Cardinality,
}

#[derive(Debug, Deserialize)]
struct RawResource {
    #[serde(rename = "type")]
    type_name: String,
    id: Option<String>,
    lid: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    relationships: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrimary {
    One(RawIdentifier),
    Many(Vec<RawIdentifier>),
}

#[derive(Debug, Deserialize)]
struct RawIdentifier {
    #[serde(rename = "type")]
    type_name: String,
    id: Option<String>,
    lid: Option<String>,
}

/// Load a dataset from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if the file isn't valid JSON, or a dataset,
/// graph or configuration error if the content is inconsistent.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_dataset_str(&content)
}

/// Load a dataset from a JSON string.
pub fn load_dataset_str(content: &str) -> Result<Dataset, LoadError> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    load_dataset_value(value)
}

/// Load a dataset from an already-parsed JSON value.
pub fn load_dataset_value(value: Value) -> Result<Dataset, LoadError> {
    let raw: RawDataset =
        serde_json::from_value(value).map_err(|source| LoadError::InvalidJson { source })?;
    build_dataset(raw)
}

/// Load a dataset from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't JSON, and dataset errors as for [`load_dataset_str`].
#[cfg(feature = "remote")]
pub fn load_dataset_url(url: &str) -> Result<Dataset, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let value: Value = response.json().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;
    load_dataset_value(value)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a dataset from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
pub fn load_dataset_auto(source: &str) -> Result<Dataset, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_dataset_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::InvalidDataset {
                path: source.to_string(),
                message: "URL loading requires the 'remote' feature".to_string(),
            })
        }
    } else {
        load_dataset(Path::new(source))
    }
}

// --- Internal implementation ---

fn build_dataset(raw: RawDataset) -> Result<Dataset, LoadError> {
    let mut builder = Schema::builder();
    for ty in &raw.types {
        builder = builder.resource(&ty.name);
        for rel in &ty.relationships {
            builder = builder.relationship(&rel.name, rel.cardinality, &rel.target);
        }
    }
    let schema = builder.build()?;

    let mut graph = ResourceGraph::new();
    let mut index: HashMap<(TypeHandle, Identity), NodeRef> = HashMap::new();
    let mut nodes = Vec::with_capacity(raw.resources.len());

    for (i, resource) in raw.resources.iter().enumerate() {
        let path = format!("/resources/{}", i);
        let identity = identity_of(resource.id.as_deref(), resource.lid.as_deref(), &path)?;
        let node = graph.add(&schema, &resource.type_name, identity.clone())?;
        graph.set_attributes(node, resource.attributes.clone())?;
        let handle = graph.resource(node)?.type_handle();
        index.entry((handle, identity)).or_insert(node);
        nodes.push(node);
    }

    for (i, (resource, &node)) in raw.resources.iter().zip(&nodes).enumerate() {
        for (name, value) in &resource.relationships {
            let path = format!("/resources/{}/relationships/{}", i, name);
            let cardinality = schema
                .require(&resource.type_name)?
                .require_relationship(name)?
                .cardinality;
            match (cardinality, value) {
                (Cardinality::One, Value::Null) => graph.link_one(&schema, node, name, None)?,
                (Cardinality::One, Value::Object(_)) => {
                    let target = lookup(&schema, &index, value, &path)?;
                    graph.link_one(&schema, node, name, Some(target))?;
                }
                (Cardinality::Many, Value::Array(items)) => {
                    let targets = items
                        .iter()
                        .enumerate()
                        .map(|(j, item)| lookup(&schema, &index, item, &format!("{}/{}", path, j)))
                        .collect::<Result<Vec<_>, _>>()?;
                    graph.link_many(&schema, node, name, targets)?;
                }
                (cardinality, other) => {
                    return Err(LoadError::InvalidDataset {
                        path,
                        message: format!(
                            "{} relationship cannot hold {}",
                            cardinality.as_str(),
                            json_type_name(other)
                        ),
                    });
                }
            }
        }
    }

    let primary = match raw.primary {
        None => Primary::None,
        Some(RawPrimary::One(identifier)) => {
            Primary::One(resolve_identifier(&schema, &index, &identifier, "/primary")?)
        }
        Some(RawPrimary::Many(identifiers)) => Primary::Collection(
            identifiers
                .iter()
                .enumerate()
                .map(|(i, identifier)| {
                    resolve_identifier(&schema, &index, identifier, &format!("/primary/{}", i))
                })
                .collect::<Result<_, _>>()?,
        ),
    };

    Ok(Dataset {
        schema,
        graph,
        primary,
    })
}

fn identity_of(id: Option<&str>, lid: Option<&str>, path: &str) -> Result<Identity, LoadError> {
    match (id, lid) {
        (Some(id), _) => Ok(Identity::id(id)),
        (None, Some(lid)) => Ok(Identity::local(lid)),
        (None, None) => Err(LoadError::InvalidDataset {
            path: path.to_string(),
            message: "resource needs an \"id\" or \"lid\"".to_string(),
        }),
    }
}

fn lookup(
    schema: &Schema,
    index: &HashMap<(TypeHandle, Identity), NodeRef>,
    value: &Value,
    path: &str,
) -> Result<NodeRef, LoadError> {
    let identifier: RawIdentifier =
        serde_json::from_value(value.clone()).map_err(|e| LoadError::InvalidDataset {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    resolve_identifier(schema, index, &identifier, path)
}

fn resolve_identifier(
    schema: &Schema,
    index: &HashMap<(TypeHandle, Identity), NodeRef>,
    identifier: &RawIdentifier,
    path: &str,
) -> Result<NodeRef, LoadError> {
    let handle = schema.require(&identifier.type_name)?.handle();
    let identity = identity_of(identifier.id.as_deref(), identifier.lid.as_deref(), path)?;
    index
        .get(&(handle, identity.clone()))
        .copied()
        .ok_or_else(|| LoadError::InvalidDataset {
            path: path.to_string(),
            message: format!(
                "no resource {}/{} in dataset",
                identifier.type_name, identity
            ),
        })
}
