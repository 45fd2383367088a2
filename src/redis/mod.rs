//! Redis backend
//!
//! Provides a connection pool and an [`IndexStore`](crate::store::IndexStore)
//! implementation that maps the engine's command vocabulary onto Redis sets,
//! sorted sets and hashes.
//!
//! # Key Schema
//!
//! ```text
//! <model>:all                → SET of all live ids
//! <model>:<field>            → ZSET index (numeric/boolean score, or "<value> <id>" at score 0)
//! <model>:<id>               → HASH of record fields
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use kuba_query::redis::{RedisConfig, RedisStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::connect(RedisConfig::default()).await?;
//! store.pool().ping().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod store;
pub mod util;

pub use connection::{PoolMetricsSnapshot, RedisConfig, RedisPool, RetryPolicy};
pub use store::RedisStore;
