//! Query engine over secondary indexes
//!
//! A [`Query`] selects ids of one model through its sorted-set indexes and
//! optionally hydrates the matching records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Query builder  │  validates against the catalog, keeps the first error
//! └────────┬────────┘
//!          │ plan()
//! ┌────────▼────────┐
//! │   QueryPlan     │  AllIds / RandomSample / OrderedRange / Filtered
//! └────────┬────────┘
//!          │ ids() / count() / run() / scan()
//! ┌────────▼────────┐
//! │ Filter planner  │  score ranges, alpha sentinel ranks, id lookups
//! │ Order resolver  │  rank windows over the order index
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Combinator    │  order-preserving intersection, then offset/limit
//! └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kuba_query::query::Query;
//! use kuba_query::schema::{FieldSpec, ModelSchema, Registry};
//! use kuba_query::store::MemoryStore;
//! use kuba_query::types::{FieldType, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> kuba_query::Result<()> {
//! let registry = Registry::new();
//! let schema = registry.register(ModelSchema::new(
//!     "Person",
//!     vec![FieldSpec::new("Age", FieldType::I32).indexed()],
//! )?)?;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.index_record(&schema, "p1", &[("Age", Value::I32(40))])?;
//! store.index_record(&schema, "p2", &[("Age", Value::I32(20))])?;
//!
//! let ids = Query::new(store, &registry, "Person")
//!     .filter("Age >", 30i32)
//!     .ids()
//!     .await?;
//! assert_eq!(ids, vec!["p1"]);
//! # Ok(())
//! # }
//! ```

pub mod alpha;
pub mod builder;
pub mod combinator;
pub mod filter;
pub mod finish;
pub mod order;
pub mod plan;
pub mod planner;

pub use alpha::{AlphaRanks, AlphaScan, RankRange};
pub use builder::Query;
pub use combinator::ordered_intersect;
pub use filter::{Filter, Operator};
pub use finish::clamp_count;
pub use order::{Direction, Order};
pub use plan::{Anchor, QueryPlan, Strategy};
