//! Model schemas and the index catalog
//!
//! Models are registered explicitly with their fields, declared types and
//! which fields carry a secondary index. The result is an immutable catalog
//! per model that the query engine consults for validation and planning.
//!
//! # Example
//!
//! ```rust
//! use kuba_query::schema::{FieldSpec, ModelSchema, Registry};
//! use kuba_query::types::{FieldType, IndexKind};
//!
//! let registry = Registry::new();
//! registry
//!     .register(
//!         ModelSchema::new(
//!             "Person",
//!             vec![
//!                 FieldSpec::new("Name", FieldType::String).indexed(),
//!                 FieldSpec::new("Age", FieldType::I32).indexed(),
//!             ],
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let person = registry.get("Person").unwrap();
//! assert_eq!(person.index_kind_of("Name"), Some(IndexKind::Alpha));
//! ```

pub mod catalog;
pub mod registry;

pub use catalog::{FieldSpec, IndexEntry, ModelSchema, ID_FIELD};
pub use registry::Registry;
