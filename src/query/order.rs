//! Order resolution
//!
//! Fetches id lists straight from an index when no filter narrows the
//! query: the model's live-id set when unordered, or a rank range of the
//! order field's sorted set otherwise.

use crate::error::{StoreError, ValidationError};
use crate::schema::ModelSchema;
use crate::store::{all_ids_key, decode_alpha_member, index_key, Command, IndexStore};
use crate::types::IndexKind;

use std::fmt;
use tracing::trace;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Lowest first
    Ascending,
    /// Highest first
    Descending,
}

impl Direction {
    /// Whether scans run from the high end of the index
    pub fn is_reverse(&self) -> bool {
        matches!(self, Direction::Descending)
    }
}

/// A validated order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field name
    pub field_name: String,
    /// Store key of the field's index
    pub store_key: String,
    /// Index encoding of the field
    pub index_kind: IndexKind,
    /// Sort direction
    pub direction: Direction,
}

impl Order {
    /// Parse an order spec; a leading `-` selects descending
    pub fn parse(schema: &ModelSchema, spec: &str) -> Result<Self, ValidationError> {
        let (field, direction) = match spec.strip_prefix('-') {
            Some(field) => (field, Direction::Descending),
            None => (spec, Direction::Ascending),
        };

        let entry = schema
            .entry(field)
            .ok_or_else(|| ValidationError::UnknownField {
                model: schema.name().to_string(),
                field: field.to_string(),
            })?;
        if !entry.index_kind.is_indexed() {
            return Err(ValidationError::UnindexedField {
                model: schema.name().to_string(),
                field: field.to_string(),
            });
        }

        Ok(Self {
            field_name: entry.field_name.clone(),
            store_key: entry.store_key.clone(),
            index_kind: entry.index_kind,
            direction,
        })
    }

    /// Whether scans on this order's index run in reverse
    pub fn is_reverse(&self) -> bool {
        self.direction.is_reverse()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_reverse() { "-" } else { "" };
        write!(f, "(order {}{})", sign, self.field_name)
    }
}

/// Rank window for `offset`/`limit`; `limit == 0` means "to the end"
pub fn rank_window(offset: usize, limit: usize) -> (i64, i64) {
    let start = offset as i64;
    let stop = if limit == 0 {
        -1
    } else {
        start + limit as i64 - 1
    };
    (start, stop)
}

/// Ids of every live record, or a random sample of `limit` of them
pub async fn all_ids<S>(store: &S, model: &str, limit: usize) -> Result<Vec<String>, StoreError>
where
    S: IndexStore + ?Sized,
{
    let key = all_ids_key(model);
    let command = if limit == 0 {
        Command::SetMembers { key }
    } else {
        Command::SetRandomMembers { key, count: limit }
    };
    let name = command.name();
    store.execute(command).await?.into_members(name)
}

/// Ids in index order within the `offset`/`limit` window
pub async fn ordered_ids<S>(
    store: &S,
    model: &str,
    order: &Order,
    offset: usize,
    limit: usize,
) -> Result<Vec<String>, StoreError>
where
    S: IndexStore + ?Sized,
{
    let (start, stop) = rank_window(offset, limit);
    trace!(field = %order.field_name, start, stop, "ordered range");
    let command = Command::SortedRangeByRank {
        key: index_key(model, &order.store_key),
        start,
        stop,
        reverse: order.is_reverse(),
    };
    let name = command.name();
    let members = store.execute(command).await?.into_members(name)?;
    Ok(decode_members(order.index_kind, members))
}

/// Turn raw sorted-set members into ids
pub(crate) fn decode_members(kind: IndexKind, members: Vec<String>) -> Vec<String> {
    match kind {
        IndexKind::Alpha => members
            .iter()
            .map(|m| decode_alpha_member(m).to_string())
            .collect(),
        _ => members,
    }
}
