//! [`IndexStore`] backed by Redis
//!
//! Single commands are sent as-is; batches are sent as a `MULTI`/`EXEC`
//! pipeline so that the server applies them atomically and in order.

use super::connection::{PoolMetricsSnapshot, RedisConfig, RedisPool};
use crate::error::StoreError;
use crate::store::{Batch, Command, IndexStore, Reply};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Redis-backed index store
#[derive(Clone)]
pub struct RedisStore {
    pool: Arc<RedisPool>,
}

impl RedisStore {
    /// Connect with the given configuration
    pub async fn connect(config: RedisConfig) -> Result<Self, StoreError> {
        Ok(Self::from_pool(Arc::new(RedisPool::new(config).await?)))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &Arc<RedisPool> {
        &self.pool
    }

    /// Pool metrics
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.pool.metrics()
    }
}

/// Translate a command into its Redis form
fn to_redis_cmd(command: &Command) -> redis::Cmd {
    let mut cmd = redis::cmd(command.name());
    match command {
        Command::SetMembers { key }
        | Command::SetCardinality { key }
        | Command::SortedCardinality { key }
        | Command::KeyExists { key }
        | Command::HashGetAll { key } => {
            cmd.arg(key);
        },
        Command::SetRandomMembers { key, count } => {
            cmd.arg(key).arg(*count);
        },
        Command::SortedRangeByRank {
            key, start, stop, ..
        } => {
            cmd.arg(key).arg(*start).arg(*stop);
        },
        Command::SortedRangeByScore {
            key,
            min,
            max,
            reverse,
        } => {
            // ZREVRANGEBYSCORE takes max before min
            let (first, second) = if *reverse { (max, min) } else { (min, max) };
            cmd.arg(key).arg(first.to_string()).arg(second.to_string());
        },
        Command::SortedAdd { key, score, member } => {
            cmd.arg(key).arg(*score).arg(member);
        },
        Command::SortedRank { key, member } => {
            cmd.arg(key).arg(member);
        },
        Command::SortedRemove { key, members } => {
            cmd.arg(key).arg(members);
        },
        Command::HashGet { key, fields } => {
            cmd.arg(key).arg(fields);
        },
    }
    cmd
}

/// Decode a raw Redis reply according to the command that produced it
fn decode_reply(command: &Command, value: &redis::Value) -> Result<Reply, StoreError> {
    let malformed = |e: redis::RedisError| StoreError::UnexpectedReply {
        command: command.name().to_string(),
        reply: e.to_string(),
    };

    let reply = match command {
        Command::SetMembers { .. }
        | Command::SetRandomMembers { .. }
        | Command::SortedRangeByRank { .. }
        | Command::SortedRangeByScore { .. } => {
            Reply::Members(redis::from_redis_value(value).map_err(malformed)?)
        },
        Command::SetCardinality { .. }
        | Command::SortedCardinality { .. }
        | Command::SortedAdd { .. }
        | Command::SortedRemove { .. }
        | Command::KeyExists { .. } => {
            Reply::Integer(redis::from_redis_value(value).map_err(malformed)?)
        },
        Command::SortedRank { .. } => Reply::Rank(redis::from_redis_value(value).map_err(malformed)?),
        Command::HashGetAll { .. } => {
            let map: BTreeMap<String, String> =
                redis::from_redis_value(value).map_err(malformed)?;
            Reply::Hash(map.into_iter().collect())
        },
        Command::HashGet { .. } => Reply::Values(redis::from_redis_value(value).map_err(malformed)?),
    };
    Ok(reply)
}

#[async_trait]
impl IndexStore for RedisStore {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        trace!(command = command.name(), key = command.key(), "redis command");
        let cmd = to_redis_cmd(&command);
        let value = self
            .pool
            .execute(|mut conn| {
                let cmd = cmd.clone();
                async move { cmd.query_async::<redis::Value>(&mut conn).await }
            })
            .await?;
        decode_reply(&command, &value)
    }

    async fn execute_batch(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in batch.commands() {
            pipe.add_command(to_redis_cmd(command));
        }
        debug!(commands = batch.len(), "redis atomic batch");

        let values = self
            .pool
            .execute(|mut conn| {
                let pipe = pipe.clone();
                async move { pipe.query_async::<Vec<redis::Value>>(&mut conn).await }
            })
            .await?;

        if values.len() != batch.len() {
            return Err(StoreError::UnexpectedReply {
                command: "EXEC".to_string(),
                reply: format!("{} replies for {} commands", values.len(), batch.len()),
            });
        }

        batch
            .commands()
            .iter()
            .zip(values.iter())
            .map(|(command, value)| decode_reply(command, value))
            .collect()
    }
}
