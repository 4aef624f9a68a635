//! Error types for schema construction, graph building, document assembly,
//! dataset loading and document validation.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Cardinality;

/// Configuration errors. These are fatal for the call that hit them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown resource type '{type_name}'")]
    UnknownType { type_name: String },

    #[error("type handle #{index} is not registered in this schema")]
    UnknownTypeHandle { index: usize },

    #[error("resource type '{type_name}' has no relationship '{relationship}'")]
    UnknownRelationship {
        type_name: String,
        relationship: String,
    },

    #[error("resource type '{type_name}' declared more than once")]
    DuplicateType { type_name: String },

    #[error("relationship '{relationship}' declared more than once on '{type_name}'")]
    DuplicateRelationship {
        type_name: String,
        relationship: String,
    },

    #[error("relationship '{type_name}.{relationship}' targets undeclared type '{target}'")]
    UnknownTarget {
        type_name: String,
        relationship: String,
        target: String,
    },

    #[error("no include plan for resource type '{type_name}'")]
    MissingIncludePlan { type_name: String },

    #[error("empty relationship name in include \"{include}\"")]
    EmptyIncludeSegment { include: String },

    #[error("invalid fieldset \"{entry}\": expected TYPE=field,field")]
    InvalidFieldset { entry: String },
}

/// Errors while building or reading a resource graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("node #{index} does not exist in this graph")]
    DanglingNode { index: usize },

    #[error("relationship '{type_name}.{relationship}' is {expected}")]
    CardinalityMismatch {
        type_name: String,
        relationship: String,
        expected: &'static str,
    },

    #[error(
        "relationship '{type_name}.{relationship}' expects '{expected}' resources, got '{actual}'"
    )]
    TargetTypeMismatch {
        type_name: String,
        relationship: String,
        expected: String,
        actual: String,
    },
}

impl GraphError {
    pub(crate) fn cardinality(
        type_name: &str,
        relationship: &str,
        expected: Cardinality,
    ) -> Self {
        GraphError::CardinalityMismatch {
            type_name: type_name.to_string(),
            relationship: relationship.to_string(),
            expected: expected.as_str(),
        }
    }
}

/// Errors while assembling a document.
///
/// Assembly either returns a complete document or one of these; there is no
/// partial result.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors while loading a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid dataset at {path}: {message}")]
    InvalidDataset { path: String, message: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<ConfigError> for LoadError {
    fn from(err: ConfigError) -> Self {
        LoadError::Graph(GraphError::Config(err))
    }
}

/// Errors during document validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid document schema: {message}")]
    InvalidSchema { message: String },

    #[error("document invalid with {} violation(s)", errors.len())]
    Invalid { errors: Vec<DocumentViolation> },
}

/// Single structural violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentViolation {
    /// JSON Pointer (RFC 6901) to the offending member.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for DocumentViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl DocumentError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("dataset.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidDataset {
            path: "/resources/0".into(),
            message: "missing type".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err: LoadError = ConfigError::UnknownType {
            type_name: "widgets".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![DocumentViolation {
                path: "/data".into(),
                message: "missing type".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn config_error_messages_name_the_culprit() {
        let err = ConfigError::UnknownRelationship {
            type_name: "articles".into(),
            relationship: "editor".into(),
        };
        assert_eq!(
            err.to_string(),
            "resource type 'articles' has no relationship 'editor'"
        );
    }

    #[test]
    fn cardinality_mismatch_display() {
        let err = GraphError::cardinality("articles", "author", Cardinality::One);
        assert_eq!(
            err.to_string(),
            "relationship 'articles.author' is to-one"
        );
    }

    #[test]
    fn violation_display() {
        let err = DocumentViolation {
            path: "/included/0".into(),
            message: "\"id\" is a required property".into(),
        };
        assert_eq!(err.to_string(), "/included/0: \"id\" is a required property");
    }
}
