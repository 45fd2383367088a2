//! Record hydration
//!
//! Finishers that return records hand the evaluated id list to a
//! [`Hydrator`]. An id whose record no longer exists comes back as `None`
//! and is skipped by the caller; any other failure aborts.
//!
//! [`HashHydrator`] reads the `<model>:<id>` hashes written alongside the
//! indexes, one atomic batch per `batch_size` ids.

use crate::error::{Error, StoreError};
use crate::schema::ModelSchema;
use crate::store::{record_key, Batch, Command, IndexStore};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;

/// Default number of ids read per batch
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// A stored record, keyed by field name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record identifier
    pub id: String,
    /// Field values in their stored text form
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// Raw value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Parse a field into a typed value
    pub fn parse<T>(&self, field: &str) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.get(field).ok_or_else(|| {
            Error::Hydration(format!("record {} has no field {}", self.id, field))
        })?;
        raw.parse().map_err(|e: T::Err| {
            Error::Hydration(format!(
                "field {} of record {}: cannot parse {:?}: {}",
                field, self.id, raw, e
            ))
        })
    }
}

/// Loads records for an ordered id list
#[async_trait]
pub trait Hydrator: Send + Sync {
    /// One entry per id, in order; `None` where the record is absent
    ///
    /// `fields` restricts the loaded fields; `None` loads all of them.
    async fn hydrate(
        &self,
        schema: &ModelSchema,
        ids: &[String],
        fields: Option<&[String]>,
    ) -> Result<Vec<Option<Record>>, Error>;
}

/// Hydrator over record hashes in an [`IndexStore`]
pub struct HashHydrator<S: ?Sized> {
    store: Arc<S>,
    batch_size: usize,
}

impl<S: IndexStore + ?Sized> HashHydrator<S> {
    /// Create a hydrator with the default batch size
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set how many ids are read per batch (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Configured batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Commands reading one record
    ///
    /// A field selection is answered by EXISTS followed by HMGET, so a record
    /// holding none of the selected fields is still found.
    fn read_commands(model: &str, id: &str, store_keys: Option<&[String]>) -> Vec<Command> {
        let key = record_key(model, id);
        match store_keys {
            Some(keys) if keys.is_empty() => vec![Command::KeyExists { key }],
            Some(keys) => vec![
                Command::KeyExists { key: key.clone() },
                Command::HashGet {
                    key,
                    fields: keys.to_vec(),
                },
            ],
            None => vec![Command::HashGetAll { key }],
        }
    }
}

#[async_trait]
impl<S: IndexStore + ?Sized> Hydrator for HashHydrator<S> {
    async fn hydrate(
        &self,
        schema: &ModelSchema,
        ids: &[String],
        fields: Option<&[String]>,
    ) -> Result<Vec<Option<Record>>, Error> {
        let model = schema.name();

        // field name <-> store key
        let mut by_store_key: HashMap<&str, &str> = HashMap::new();
        for entry in schema.entries() {
            by_store_key.insert(&entry.store_key, &entry.field_name);
        }
        let requested: Option<Vec<(String, String)>> = fields.map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    schema
                        .store_key_for(name)
                        .map(|key| (name.clone(), key.to_string()))
                })
                .collect()
        });
        let store_keys: Option<Vec<String>> = requested
            .as_ref()
            .map(|pairs| pairs.iter().map(|(_, key)| key.clone()).collect());

        let reads_per_id = match store_keys.as_deref() {
            Some(keys) if !keys.is_empty() => 2,
            _ => 1,
        };

        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.batch_size) {
            let mut batch = Batch::new();
            for id in chunk {
                for command in Self::read_commands(model, id, store_keys.as_deref()) {
                    batch.push(command);
                }
            }
            trace!(model, ids = chunk.len(), "hydrating batch");
            let replies = self.store.execute_batch(batch).await?;
            if replies.len() != chunk.len() * reads_per_id {
                return Err(StoreError::UnexpectedReply {
                    command: "EXEC".to_string(),
                    reply: format!(
                        "{} replies for {} reads",
                        replies.len(),
                        chunk.len() * reads_per_id
                    ),
                }
                .into());
            }

            let mut replies = replies.into_iter();
            for id in chunk {
                let record = match &requested {
                    Some(pairs) => {
                        let exists = replies
                            .next()
                            .map(|r| r.into_integer("EXISTS"))
                            .transpose()?
                            .unwrap_or(0)
                            > 0;
                        let values = if pairs.is_empty() {
                            Vec::new()
                        } else {
                            replies
                                .next()
                                .map(|r| r.into_values("HMGET"))
                                .transpose()?
                                .unwrap_or_default()
                        };
                        exists.then(|| Record {
                            id: id.clone(),
                            fields: pairs
                                .iter()
                                .zip(values)
                                .filter_map(|((name, _), v)| v.map(|v| (name.clone(), v)))
                                .collect(),
                        })
                    },
                    None => {
                        let hash = replies
                            .next()
                            .map(|r| r.into_hash("HGETALL"))
                            .transpose()?
                            .unwrap_or_default();
                        (!hash.is_empty()).then(|| Record {
                            id: id.clone(),
                            fields: hash
                                .into_iter()
                                .map(|(key, v)| {
                                    let name = by_store_key
                                        .get(key.as_str())
                                        .map(|n| n.to_string())
                                        .unwrap_or(key);
                                    (name, v)
                                })
                                .collect(),
                        })
                    },
                };
                records.push(record);
            }
        }
        Ok(records)
    }
}
