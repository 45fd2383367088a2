//! Query engine entry point
//!
//! A [`QueryEngine`] ties an explicit model [`Registry`] to an
//! [`IndexStore`] and hands out [`Query`] builders and a record hydrator
//! that share them.

use crate::config::{Config, QuerySection};
use crate::error::{Error, Result};
use crate::hydrate::{HashHydrator, Hydrator, Record};
use crate::query::Query;
use crate::redis::{RedisConfig, RedisStore};
use crate::schema::{ModelSchema, Registry};
use crate::store::IndexStore;

use std::sync::Arc;
use tracing::info;

/// Registry, store and hydrator bundled for issuing queries
pub struct QueryEngine<S: ?Sized> {
    registry: Arc<Registry>,
    store: Arc<S>,
    hydrator: HashHydrator<S>,
    config: QuerySection,
}

impl<S: IndexStore + ?Sized> QueryEngine<S> {
    /// Start a query on a model
    pub fn query(&self, model: &str) -> Query<S> {
        Query::new(Arc::clone(&self.store), &self.registry, model).log_plans(self.config.log_plans)
    }

    /// Load one record by id
    ///
    /// Unlike query finishers, a missing record is an error here.
    pub async fn find(&self, model: &str, id: &str) -> Result<Record> {
        let schema = self.schema(model)?;
        ModelSchema::validate_id(id)?;
        let mut loaded = self
            .hydrator
            .hydrate(&schema, &[id.to_string()], None)
            .await?;
        loaded
            .pop()
            .flatten()
            .ok_or_else(|| Error::RecordNotFound {
                model: model.to_string(),
                id: id.to_string(),
            })
    }

    /// Registered schema of a model
    pub fn schema(&self, model: &str) -> Result<Arc<ModelSchema>> {
        self.registry
            .get(model)
            .ok_or_else(|| crate::error::ValidationError::UnknownModel(model.to_string()).into())
    }

    /// Hydrator for `run` and `scan`
    pub fn hydrator(&self) -> &HashHydrator<S> {
        &self.hydrator
    }

    /// Model registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl QueryEngine<RedisStore> {
    /// Connect to Redis as described by `config`
    pub async fn connect(config: &Config, registry: Arc<Registry>) -> Result<Self> {
        config.validate()?;
        let store = RedisStore::connect(RedisConfig::from(&config.redis)).await?;
        QueryEngineBuilder::new()
            .with_store(store)
            .with_registry(registry)
            .with_config(config.query.clone())
            .build()
    }
}

/// Builder for [`QueryEngine`]
pub struct QueryEngineBuilder<S: ?Sized> {
    store: Option<Arc<S>>,
    registry: Option<Arc<Registry>>,
    config: QuerySection,
}

impl<S: IndexStore + ?Sized> Default for QueryEngineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: IndexStore + ?Sized> QueryEngineBuilder<S> {
    /// Create a new engine builder
    pub fn new() -> Self {
        Self {
            store: None,
            registry: None,
            config: QuerySection::default(),
        }
    }

    /// Set the store
    pub fn with_store(mut self, store: S) -> Self
    where
        S: Sized,
    {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the store from an existing Arc
    ///
    /// Use this to keep a handle for seeding or inspecting the store.
    pub fn with_store_arc(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the registry; a fresh empty one is used otherwise
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set query settings
    pub fn with_config(mut self, config: QuerySection) -> Self {
        self.config = config;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<QueryEngine<S>> {
        let store = self
            .store
            .ok_or_else(|| Error::Configuration("No store configured".to_string()))?;
        if self.config.hydrate_batch_size == 0 {
            return Err(Error::Configuration(
                "Hydrate batch size must be > 0".to_string(),
            ));
        }
        let registry = self.registry.unwrap_or_default();

        info!(
            models = registry.len(),
            hydrate_batch_size = self.config.hydrate_batch_size,
            "Query engine ready"
        );
        Ok(QueryEngine {
            hydrator: HashHydrator::new(Arc::clone(&store))
                .with_batch_size(self.config.hydrate_batch_size),
            registry,
            store,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use crate::store::MemoryStore;
    use crate::types::{FieldType, Value};

    fn engine() -> QueryEngine<MemoryStore> {
        let registry = Arc::new(Registry::new());
        let schema = registry
            .register(
                ModelSchema::new(
                    "Person",
                    vec![
                        FieldSpec::new("Name", FieldType::String).indexed(),
                        FieldSpec::new("Age", FieldType::I32).indexed(),
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .index_record(&schema, "p1", &[("Name", Value::from("Ann")), ("Age", Value::I32(30))])
            .unwrap();
        QueryEngineBuilder::new()
            .with_store_arc(store)
            .with_registry(registry)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_store() {
        let result = QueryEngineBuilder::<MemoryStore>::new().build();
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = QueryEngineBuilder::new()
            .with_store(MemoryStore::new())
            .with_config(QuerySection {
                hydrate_batch_size: 0,
                log_plans: false,
            })
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_find() {
        let engine = engine();
        let record = engine.find("Person", "p1").await.unwrap();
        assert_eq!(record.get("Name"), Some("Ann"));

        assert!(matches!(
            engine.find("Person", "p9").await,
            Err(Error::RecordNotFound { .. })
        ));
        assert!(matches!(
            engine.find("Robot", "p1").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_query_through_engine() {
        let engine = engine();
        let records = engine
            .query("Person")
            .filter("Age =", 30i32)
            .run(engine.hydrator())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "p1");
    }
}
