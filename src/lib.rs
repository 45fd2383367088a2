//! kuba-query - chainable queries over Redis sorted-set secondary indexes
//!
//! This library provides:
//! - Explicit model registration into an immutable index catalog
//! - Numeric, boolean and lexicographic (alpha) secondary indexes
//! - A fluent query builder with a sticky first error
//! - Filters, a single order, limit/offset and field selection
//! - Order-preserving intersection of filter results
//! - Record hydration from per-record hashes
//!
//! Stores are pluggable through [`store::IndexStore`]; a Redis backend and an
//! in-process backend are included.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Index catalog and model registry
pub mod schema;

/// Store command vocabulary and backends
pub mod store;

/// Redis connection pool and store backend
pub mod redis;

/// Query builder, planner and finishers
pub mod query;

/// Record hydration
pub mod hydrate;

/// Engine entry point
pub mod engine;

// Re-export main types
pub use engine::{QueryEngine, QueryEngineBuilder};
pub use error::{Error, Result};
pub use query::Query;
pub use types::{FieldType, IndexKind, Value};
