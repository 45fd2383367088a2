//! Per-model index catalog
//!
//! A [`ModelSchema`] is built once per model at registration time and is
//! immutable afterwards. The query engine only ever reads it through the
//! lookup methods below; index kinds are a static property of the schema and
//! are never inferred from filter values.

use crate::error::ValidationError;
use crate::types::{FieldType, IndexKind};

use std::collections::{HashMap, HashSet};

/// Name of the reserved identifier field
pub const ID_FIELD: &str = "Id";

/// Field declaration supplied at registration
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name as used in filter and order expressions
    pub name: String,
    /// Declared value type
    pub field_type: FieldType,
    /// Key used for the field in the store; defaults to the field name
    pub store_key: Option<String>,
    /// Whether a secondary index is maintained for this field
    pub indexed: bool,
}

impl FieldSpec {
    /// Declare an unindexed field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            store_key: None,
            indexed: false,
        }
    }

    /// Mark the field as indexed
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Override the key used in the store
    pub fn store_key(mut self, key: impl Into<String>) -> Self {
        self.store_key = Some(key.into());
        self
    }
}

/// Catalog entry for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Field name
    pub field_name: String,
    /// Key name in the store (`<model>:<store_key>` holds the index)
    pub store_key: String,
    /// Declared value type
    pub field_type: FieldType,
    /// Index encoding
    pub index_kind: IndexKind,
}

/// Immutable index catalog for one registered model
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    entries: Vec<IndexEntry>,
    by_name: HashMap<String, usize>,
}

impl ModelSchema {
    /// Build and validate a schema
    ///
    /// Fails if the model name is empty or contains `:`, if two fields share a
    /// name or store key, or if a field uses the reserved name `Id`.
    pub fn new(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = FieldSpec>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() || name.contains(':') {
            return Err(ValidationError::InvalidSchema(format!(
                "model name {:?} must be non-empty and must not contain ':'",
                name
            )));
        }

        let mut entries = Vec::new();
        let mut by_name = HashMap::new();
        let mut store_keys = HashSet::new();

        for spec in fields {
            if spec.name == ID_FIELD {
                return Err(ValidationError::InvalidSchema(format!(
                    "field name {} is reserved for the identifier",
                    ID_FIELD
                )));
            }
            let store_key = spec.store_key.unwrap_or_else(|| spec.name.clone());
            // "all" is the live-id set for the model
            if store_key == "all" || store_key.is_empty() {
                return Err(ValidationError::InvalidSchema(format!(
                    "field {} cannot use store key {:?}",
                    spec.name, store_key
                )));
            }
            if by_name.contains_key(&spec.name) || store_keys.contains(&store_key) {
                return Err(ValidationError::DuplicateField {
                    model: name.clone(),
                    field: spec.name,
                });
            }

            let index_kind = if spec.indexed {
                spec.field_type.index_kind()
            } else {
                IndexKind::None
            };
            if spec.indexed && !index_kind.is_indexed() {
                return Err(ValidationError::InvalidSchema(format!(
                    "field {} of type {} cannot be indexed",
                    spec.name, spec.field_type
                )));
            }

            by_name.insert(spec.name.clone(), entries.len());
            store_keys.insert(store_key.clone());
            entries.push(IndexEntry {
                field_name: spec.name,
                store_key,
                field_type: spec.field_type,
                index_kind,
            });
        }

        Ok(Self {
            name,
            entries,
            by_name,
        })
    }

    /// Registered model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog entry for a field
    pub fn entry(&self, field: &str) -> Option<&IndexEntry> {
        self.by_name.get(field).map(|&i| &self.entries[i])
    }

    /// Index kind of a field, `None` if the field does not exist
    pub fn index_kind_of(&self, field: &str) -> Option<IndexKind> {
        self.entry(field).map(|e| e.index_kind)
    }

    /// Store key of a field, `None` if the field does not exist
    pub fn store_key_for(&self, field: &str) -> Option<&str> {
        self.entry(field).map(|e| e.store_key.as_str())
    }

    /// Whether the model declares the field
    pub fn field_exists(&self, field: &str) -> bool {
        self.by_name.contains_key(field)
    }

    /// All entries in declaration order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// All field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.field_name.as_str())
    }

    /// Check that an identifier can be stored in an alpha index member
    pub fn validate_id(id: &str) -> Result<(), ValidationError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError::InvalidSchema(format!(
                "identifier {:?} must be non-empty printable ASCII without spaces",
                id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> ModelSchema {
        ModelSchema::new(
            "Person",
            vec![
                FieldSpec::new("Name", FieldType::String).indexed(),
                FieldSpec::new("Age", FieldType::I32).indexed().store_key("age"),
                FieldSpec::new("Active", FieldType::Bool).indexed(),
                FieldSpec::new("Bio", FieldType::String),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let schema = person();
        assert_eq!(schema.index_kind_of("Name"), Some(IndexKind::Alpha));
        assert_eq!(schema.index_kind_of("Age"), Some(IndexKind::Numeric));
        assert_eq!(schema.index_kind_of("Active"), Some(IndexKind::Boolean));
        assert_eq!(schema.index_kind_of("Bio"), Some(IndexKind::None));
        assert_eq!(schema.index_kind_of("Missing"), None);
        assert_eq!(schema.store_key_for("Age"), Some("age"));
        assert_eq!(schema.store_key_for("Name"), Some("Name"));
        assert!(schema.field_exists("Bio"));
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["Name", "Age", "Active", "Bio"]
        );
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = ModelSchema::new(
            "Dup",
            vec![
                FieldSpec::new("A", FieldType::I32),
                FieldSpec::new("A", FieldType::I64),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateField { .. }));

        let err = ModelSchema::new(
            "Dup",
            vec![
                FieldSpec::new("A", FieldType::I32).store_key("k"),
                FieldSpec::new("B", FieldType::I64).store_key("k"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateField { .. }));
    }

    #[test]
    fn test_rejects_reserved_names() {
        assert!(ModelSchema::new("M", vec![FieldSpec::new("Id", FieldType::String)]).is_err());
        assert!(ModelSchema::new("M", vec![FieldSpec::new("all", FieldType::String)]).is_err());
        assert!(ModelSchema::new("a:b", Vec::new()).is_err());
        assert!(ModelSchema::new(
            "M",
            vec![FieldSpec::new("Tags", FieldType::Opaque).indexed()]
        )
        .is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(ModelSchema::validate_id("abc123").is_ok());
        assert!(ModelSchema::validate_id("has space").is_err());
        assert!(ModelSchema::validate_id("").is_err());
        assert!(ModelSchema::validate_id("del\u{7f}").is_err());
    }
}
