//! Registry of model schemas
//!
//! Maps model names to their immutable [`ModelSchema`]. A registry is an
//! explicit object owned by the caller and shared with query engines through
//! an `Arc`; there is no process-wide registry.

use super::catalog::ModelSchema;
use crate::error::ValidationError;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Thread-safe model registry
#[derive(Debug, Default)]
pub struct Registry {
    schemas: RwLock<HashMap<String, Arc<ModelSchema>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model schema
    ///
    /// Fails if a model with the same name is already registered.
    pub fn register(&self, schema: ModelSchema) -> Result<Arc<ModelSchema>, ValidationError> {
        let mut schemas = self.schemas.write();
        if schemas.contains_key(schema.name()) {
            return Err(ValidationError::NameAlreadyRegistered(
                schema.name().to_string(),
            ));
        }

        let name = schema.name().to_string();
        let schema = Arc::new(schema);
        schemas.insert(name.clone(), Arc::clone(&schema));

        info!(
            model = %name,
            fields = schema.entries().len(),
            "Registered model"
        );
        Ok(schema)
    }

    /// Remove a model from the registry
    pub fn unregister(&self, name: &str) -> Result<Arc<ModelSchema>, ValidationError> {
        let removed = self
            .schemas
            .write()
            .remove(name)
            .ok_or_else(|| ValidationError::UnknownModel(name.to_string()))?;
        info!(model = %name, "Unregistered model");
        Ok(removed)
    }

    /// Look up a model schema
    pub fn get(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.schemas.read().get(name).cloned()
    }

    /// Whether a model name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.read().contains_key(name)
    }

    /// Registered model names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered models
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    /// Whether no models are registered
    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use crate::types::FieldType;

    fn schema(name: &str) -> ModelSchema {
        ModelSchema::new(name, vec![FieldSpec::new("Age", FieldType::I32).indexed()]).unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = Registry::new();
        registry.register(schema("Person")).unwrap();

        assert!(registry.contains("Person"));
        assert_eq!(registry.get("Person").unwrap().name(), "Person");
        assert!(registry.get("Other").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = Registry::new();
        registry.register(schema("Person")).unwrap();
        let err = registry.register(schema("Person")).unwrap_err();
        assert_eq!(err, ValidationError::NameAlreadyRegistered("Person".into()));
    }

    #[test]
    fn test_unregister() {
        let registry = Registry::new();
        registry.register(schema("A")).unwrap();
        registry.register(schema("B")).unwrap();
        assert_eq!(registry.names(), vec!["A".to_string(), "B".to_string()]);

        registry.unregister("A").unwrap();
        assert!(!registry.contains("A"));
        assert!(registry.unregister("A").is_err());
        assert!(!registry.is_empty());
    }
}
