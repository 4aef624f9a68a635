//! Structural validation of encoded documents.
//!
//! Checks a JSON value against a JSON:API document schema, then checks the
//! compound-document rules a schema cannot express: every included resource
//! appears once, and no primary resource is repeated in `included`.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::error::{DocumentViolation, ValidateError};

/// JSON Schema for the documents this crate produces.
pub fn document_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["data"],
        "additionalProperties": false,
        "properties": {
            "data": {
                "oneOf": [
                    { "type": "null" },
                    { "$ref": "#/definitions/resource" },
                    { "type": "array", "items": { "$ref": "#/definitions/resource" } }
                ]
            },
            "included": {
                "type": "array",
                "items": { "$ref": "#/definitions/resource" }
            },
            "meta": { "type": "object" },
            "links": { "$ref": "#/definitions/links" },
            "jsonapi": {
                "type": "object",
                "properties": { "version": { "type": "string" } }
            }
        },
        "definitions": {
            "resource": {
                "type": "object",
                "required": ["type"],
                "anyOf": [{ "required": ["id"] }, { "required": ["lid"] }],
                "additionalProperties": false,
                "properties": {
                    "type": { "type": "string" },
                    "id": { "type": "string" },
                    "lid": { "type": "string" },
                    "attributes": {
                        "type": "object",
                        "not": {
                            "anyOf": [
                                { "required": ["relationships"] },
                                { "required": ["links"] }
                            ]
                        }
                    },
                    "relationships": {
                        "type": "object",
                        "additionalProperties": { "$ref": "#/definitions/relationship" }
                    },
                    "links": { "$ref": "#/definitions/links" },
                    "meta": { "type": "object" }
                }
            },
            "relationship": {
                "type": "object",
                "anyOf": [
                    { "required": ["data"] },
                    { "required": ["links"] },
                    { "required": ["meta"] }
                ],
                "additionalProperties": false,
                "properties": {
                    "data": { "$ref": "#/definitions/linkage" },
                    "links": { "$ref": "#/definitions/links" },
                    "meta": { "type": "object" }
                }
            },
            "linkage": {
                "oneOf": [
                    { "type": "null" },
                    { "$ref": "#/definitions/identifier" },
                    { "type": "array", "items": { "$ref": "#/definitions/identifier" } }
                ]
            },
            "identifier": {
                "type": "object",
                "required": ["type"],
                "anyOf": [{ "required": ["id"] }, { "required": ["lid"] }],
                "additionalProperties": false,
                "properties": {
                    "type": { "type": "string" },
                    "id": { "type": "string" },
                    "lid": { "type": "string" },
                    "meta": { "type": "object" }
                }
            },
            "links": {
                "type": "object",
                "additionalProperties": {
                    "oneOf": [
                        { "type": "string" },
                        { "type": "null" },
                        { "type": "object", "required": ["href"] }
                    ]
                }
            }
        }
    })
}

/// Validate an encoded document.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` with every violation found, or
/// `ValidateError::InvalidSchema` if the embedded schema fails to compile.
pub fn validate_document(document: &Value) -> Result<(), ValidateError> {
    let schema = document_schema();
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let mut errors: Vec<DocumentViolation> = validator
        .iter_errors(document)
        .map(|e| DocumentViolation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    // Only meaningful once the shape is right.
    if errors.is_empty() {
        check_compound_rules(document, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

fn identity_of(resource: &Value) -> Option<(String, String)> {
    let type_name = resource.get("type")?.as_str()?;
    let id = resource
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| {
            resource
                .get("lid")
                .and_then(Value::as_str)
                .map(|lid| format!("lid:{}", lid))
        })?;
    Some((type_name.to_string(), id))
}

fn check_compound_rules(document: &Value, errors: &mut Vec<DocumentViolation>) {
    let primary: HashSet<(String, String)> = match document.get("data") {
        Some(Value::Array(items)) => items.iter().filter_map(identity_of).collect(),
        Some(item @ Value::Object(_)) => identity_of(item).into_iter().collect(),
        _ => HashSet::new(),
    };

    let Some(included) = document.get("included").and_then(Value::as_array) else {
        return;
    };

    let mut seen = HashSet::new();
    for (i, resource) in included.iter().enumerate() {
        let Some(key) = identity_of(resource) else {
            continue;
        };
        let path = format!("/included/{}", i);
        if primary.contains(&key) {
            errors.push(DocumentViolation {
                path,
                message: format!("{} {} is primary data", key.0, key.1),
            });
        } else if !seen.insert(key.clone()) {
            errors.push(DocumentViolation {
                path,
                message: format!("{} {} is included more than once", key.0, key.1),
            });
        }
    }
}
