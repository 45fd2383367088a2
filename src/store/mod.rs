//! Store abstraction
//!
//! The query engine issues [`Command`]s against an [`IndexStore`]. Commands
//! that must observe a consistent view (the alpha sentinel dance, the two
//! halves of a not-equal split, hydration reads) are grouped into a
//! [`Batch`], which backends execute atomically and in submission order.
//!
//! Two backends are provided: [`MemoryStore`] (in-process) and
//! [`crate::redis::RedisStore`].

pub mod command;
pub mod keys;
pub mod memory;

pub use command::{Batch, Command, Reply, ScoreBound};
pub use keys::{
    all_ids_key, alpha_member_value, decode_alpha_member, encode_alpha_member, index_key, record_key,
};
pub use memory::MemoryStore;

use crate::error::StoreError;

use async_trait::async_trait;
use std::sync::Arc;

/// A store that understands the engine's command vocabulary
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Execute a single command
    async fn execute(&self, command: Command) -> Result<Reply, StoreError>;

    /// Execute a batch atomically, returning one reply per command in order
    async fn execute_batch(&self, batch: Batch) -> Result<Vec<Reply>, StoreError>;
}

#[async_trait]
impl<S: IndexStore + ?Sized> IndexStore for Arc<S> {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        (**self).execute(command).await
    }

    async fn execute_batch(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        (**self).execute_batch(batch).await
    }
}
