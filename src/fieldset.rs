//! Sparse fieldsets.

use std::collections::{HashMap, HashSet};

use crate::error::ConfigError;
use crate::schema::ResourceType;

/// Fields of one resource type eligible for output.
///
/// Applies to attribute and relationship names alike.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSet {
    #[default]
    All,
    Only(HashSet<String>),
}

impl FieldSet {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSet::Only(fields.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, field: &str) -> bool {
        match self {
            FieldSet::All => true,
            FieldSet::Only(fields) => fields.contains(field),
        }
    }
}

/// Decides which fields of a type are written.
pub trait FieldsetProvider {
    fn fields_for(&self, resource_type: &ResourceType) -> FieldSet;
}

impl<F> FieldsetProvider for F
where
    F: Fn(&ResourceType) -> FieldSet,
{
    fn fields_for(&self, resource_type: &ResourceType) -> FieldSet {
        self(resource_type)
    }
}

/// Every field of every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllFields;

impl FieldsetProvider for AllFields {
    fn fields_for(&self, _resource_type: &ResourceType) -> FieldSet {
        FieldSet::All
    }
}

/// Per-type field lists, as given by `fields[TYPE]=a,b` request parameters.
///
/// Types without an entry get all fields.
#[derive(Debug, Clone, Default)]
pub struct SparseFieldsets {
    by_type: HashMap<String, HashSet<String>>,
}

impl SparseFieldsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `type_name` to `fields`. Repeated calls for one type merge.
    pub fn restrict<I, S>(mut self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_type
            .entry(type_name.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Parse one `TYPE=a,b,c` entry and add it.
    ///
    /// An empty field list (`TYPE=`) restricts the type to no fields.
    pub fn parse_entry(self, entry: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidFieldset {
            entry: entry.to_string(),
        };
        let (type_name, fields) = entry.split_once('=').ok_or_else(invalid)?;
        let type_name = type_name.trim();
        if type_name.is_empty() {
            return Err(invalid());
        }
        let fields: Vec<&str> = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        Ok(self.restrict(type_name, fields))
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl FieldsetProvider for SparseFieldsets {
    fn fields_for(&self, resource_type: &ResourceType) -> FieldSet {
        match self.by_type.get(resource_type.name()) {
            Some(fields) => FieldSet::Only(fields.clone()),
            None => FieldSet::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::builder()
            .resource("articles")
            .resource("people")
            .build()
            .unwrap()
    }

    #[test]
    fn all_fields_allows_everything() {
        let schema = schema();
        let articles = schema.require("articles").unwrap();
        assert!(AllFields.fields_for(articles).allows("anything"));
    }

    #[test]
    fn sparse_fieldsets_restrict_listed_types_only() {
        let schema = schema();
        let fields = SparseFieldsets::new().restrict("articles", ["title"]);

        let articles = fields.fields_for(schema.require("articles").unwrap());
        assert!(articles.allows("title"));
        assert!(!articles.allows("body"));

        let people = fields.fields_for(schema.require("people").unwrap());
        assert_eq!(people, FieldSet::All);
    }

    #[test]
    fn parse_entry() {
        let schema = schema();
        let fields = SparseFieldsets::new()
            .parse_entry("articles=title, body")
            .unwrap();
        let set = fields.fields_for(schema.require("articles").unwrap());
        assert_eq!(set, FieldSet::only(["title", "body"]));
    }

    #[test]
    fn parse_entry_empty_list_hides_everything() {
        let schema = schema();
        let fields = SparseFieldsets::new().parse_entry("people=").unwrap();
        let set = fields.fields_for(schema.require("people").unwrap());
        assert!(!set.allows("name"));
    }

    #[test]
    fn parse_entry_requires_type() {
        for entry in ["title,body", "=title", " =title"] {
            match SparseFieldsets::new().parse_entry(entry) {
                Err(ConfigError::InvalidFieldset { entry: reported }) => {
                    assert_eq!(reported, entry)
                }
                other => panic!("expected InvalidFieldset for {:?}, got {:?}", entry, other),
            }
        }
    }

    #[test]
    fn closures_are_providers() {
        let schema = schema();
        let provider = |ty: &ResourceType| {
            if ty.name() == "people" {
                FieldSet::only(["name"])
            } else {
                FieldSet::All
            }
        };
        assert!(!provider
            .fields_for(schema.require("people").unwrap())
            .allows("email"));
    }
}
