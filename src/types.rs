//! Core types shared by the schema, graph and document layers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON:API version advertised in the top-level `jsonapi` member.
pub const JSONAPI_VERSION: &str = "1.1";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cardinality of a declared relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[serde(alias = "to-one", alias = "to_one")]
    One,
    #[serde(alias = "to-many", alias = "to_many")]
    Many,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::One => "to-one",
            Cardinality::Many => "to-many",
        }
    }
}

/// Handle to a resource type registered in a [`Schema`](crate::Schema).
///
/// Handles carry the id of the schema that issued them; any other schema
/// rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle {
    pub(crate) schema: u64,
    pub(crate) index: usize,
}

impl TypeHandle {
    pub(crate) fn new(schema: u64, index: usize) -> Self {
        Self { schema, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Id of the issuing schema.
    pub fn schema_id(&self) -> u64 {
        self.schema
    }
}

/// Identity of a resource within its type.
///
/// `Local` identities belong to resources that have not been persisted yet
/// and are emitted as `lid` in resource identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Id(String),
    Local(String),
}

impl Identity {
    pub fn id(id: impl Into<String>) -> Self {
        Identity::Id(id.into())
    }

    pub fn local(lid: impl Into<String>) -> Self {
        Identity::Local(lid.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identity::Id(s) | Identity::Local(s) => s,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Identity::Local(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Id(id) => write!(f, "{}", id),
            Identity::Local(lid) => write!(f, "lid:{}", lid),
        }
    }
}

/// Key identifying one logical resource: its type plus its identity.
///
/// Two instances with equal keys are the same resource for deduplication,
/// whether or not they are the same node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub type_handle: TypeHandle,
    pub identity: Identity,
}

impl ResourceKey {
    pub fn new(type_handle: TypeHandle, identity: Identity) -> Self {
        Self {
            type_handle,
            identity,
        }
    }
}

/// How relationships that were never loaded are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnloadedPolicy {
    /// No `data` member; the relationship is dropped unless links or meta exist.
    #[default]
    Omit,
    /// Render as if loaded and empty: `null` for to-one, `[]` for to-many.
    Null,
}

impl UnloadedPolicy {
    /// Parse a policy name. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "omit" => Some(UnloadedPolicy::Omit),
            "null" | "empty" => Some(UnloadedPolicy::Null),
            _ => None,
        }
    }
}

/// Operation the document is being built for.
///
/// Passed to link and meta builders through [`BuildContext`](crate::BuildContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Read,
    Create,
    Update,
}

impl Operation {
    /// Parse an operation name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" => Some(Operation::Read),
            "create" => Some(Operation::Create),
            "update" => Some(Operation::Update),
            _ => None,
        }
    }

    /// True for operations that write data.
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}
