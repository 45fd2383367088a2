//! In-process store backend
//!
//! Implements the command vocabulary with the same ordering rules as Redis:
//! sorted-set members are ordered by score, then byte-wise by member. All
//! state sits behind one mutex, so a batch is applied atomically with
//! respect to every other caller.

use super::command::{Batch, Command, Reply, ScoreBound};
use super::keys::{all_ids_key, encode_alpha_member, index_key, record_key};
use super::IndexStore;
use crate::error::StoreError;
use crate::schema::ModelSchema;
use crate::types::{IndexKind, Value};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::trace;

/// Score with a total order
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    fn add(&mut self, score: f64, member: String) -> bool {
        let added = match self.scores.insert(member.clone(), score) {
            Some(old) => {
                self.ordered.remove(&(Score(old), member.clone()));
                false
            },
            None => true,
        };
        self.ordered.insert((Score(score), member));
        added
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(Score(score), member.to_string()));
                true
            },
            None => false,
        }
    }

    fn rank(&self, member: &str) -> Option<i64> {
        let score = *self.scores.get(member)?;
        let target = (Score(score), member.to_string());
        Some(self.ordered.range(..target).count() as i64)
    }

    fn range_by_rank(&self, start: i64, stop: i64, reverse: bool) -> Vec<String> {
        let len = self.ordered.len() as i64;
        let start = if start < 0 { (start + len).max(0) } else { start };
        let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
        if len == 0 || start > stop || start >= len {
            return Vec::new();
        }
        let take = (stop - start + 1) as usize;
        let members = self.ordered.iter().map(|(_, m)| m.clone());
        if reverse {
            members.rev().skip(start as usize).take(take).collect()
        } else {
            members.skip(start as usize).take(take).collect()
        }
    }

    fn range_by_score(&self, min: ScoreBound, max: ScoreBound, reverse: bool) -> Vec<String> {
        let matching = self
            .ordered
            .iter()
            .filter(|(s, _)| min.admits_from_below(s.0) && max.admits_from_above(s.0))
            .map(|(_, m)| m.clone());
        if reverse {
            let mut out: Vec<String> = matching.collect();
            out.reverse();
            out
        } else {
            matching.collect()
        }
    }
}

#[derive(Debug)]
enum Entry {
    Set(BTreeSet<String>),
    Sorted(SortedSet),
    Hash(BTreeMap<String, String>),
}

impl Entry {
    fn type_name(&self) -> &'static str {
        match self {
            Entry::Set(_) => "set",
            Entry::Sorted(_) => "zset",
            Entry::Hash(_) => "hash",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    keys: HashMap<String, Entry>,
}

fn wrong_type(key: &str, found: &Entry, command: &str) -> StoreError {
    StoreError::Command(format!(
        "WRONGTYPE {} against key {} holding a {}",
        command,
        key,
        found.type_name()
    ))
}

impl State {
    fn set(&self, key: &str, command: &str) -> Result<Option<&BTreeSet<String>>, StoreError> {
        match self.keys.get(key) {
            None => Ok(None),
            Some(Entry::Set(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, other, command)),
        }
    }

    fn sorted(&self, key: &str, command: &str) -> Result<Option<&SortedSet>, StoreError> {
        match self.keys.get(key) {
            None => Ok(None),
            Some(Entry::Sorted(z)) => Ok(Some(z)),
            Some(other) => Err(wrong_type(key, other, command)),
        }
    }

    fn sorted_mut(&mut self, key: &str, command: &str) -> Result<&mut SortedSet, StoreError> {
        let entry = self
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Entry::Sorted(SortedSet::default()));
        match entry {
            Entry::Sorted(z) => Ok(z),
            other => Err(wrong_type(key, other, command)),
        }
    }

    fn hash(&self, key: &str, command: &str) -> Result<Option<&BTreeMap<String, String>>, StoreError> {
        match self.keys.get(key) {
            None => Ok(None),
            Some(Entry::Hash(h)) => Ok(Some(h)),
            Some(other) => Err(wrong_type(key, other, command)),
        }
    }

    fn apply(&mut self, command: &Command) -> Result<Reply, StoreError> {
        let name = command.name();
        match command {
            Command::SetMembers { key } => Ok(Reply::Members(
                self.set(key, name)?
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default(),
            )),
            Command::SetRandomMembers { key, count } => {
                let members = match self.set(key, name)? {
                    Some(s) => s.iter().cloned().choose_multiple(&mut rand::rng(), *count),
                    None => Vec::new(),
                };
                Ok(Reply::Members(members))
            },
            Command::SetCardinality { key } => Ok(Reply::Integer(
                self.set(key, name)?.map(|s| s.len() as i64).unwrap_or(0),
            )),
            Command::SortedRangeByRank {
                key,
                start,
                stop,
                reverse,
            } => Ok(Reply::Members(
                self.sorted(key, name)?
                    .map(|z| z.range_by_rank(*start, *stop, *reverse))
                    .unwrap_or_default(),
            )),
            Command::SortedRangeByScore {
                key,
                min,
                max,
                reverse,
            } => Ok(Reply::Members(
                self.sorted(key, name)?
                    .map(|z| z.range_by_score(*min, *max, *reverse))
                    .unwrap_or_default(),
            )),
            Command::SortedCardinality { key } => Ok(Reply::Integer(
                self.sorted(key, name)?
                    .map(|z| z.ordered.len() as i64)
                    .unwrap_or(0),
            )),
            Command::SortedAdd { key, score, member } => {
                let added = self.sorted_mut(key, name)?.add(*score, member.clone());
                Ok(Reply::Integer(added as i64))
            },
            Command::SortedRank { key, member } => Ok(Reply::Rank(
                self.sorted(key, name)?.and_then(|z| z.rank(member)),
            )),
            Command::SortedRemove { key, members } => {
                let removed = match self.keys.get_mut(key) {
                    None => 0,
                    Some(Entry::Sorted(z)) => members.iter().filter(|m| z.remove(m)).count(),
                    Some(other) => return Err(wrong_type(key, other, name)),
                };
                if matches!(self.keys.get(key), Some(Entry::Sorted(z)) if z.ordered.is_empty()) {
                    self.keys.remove(key);
                }
                Ok(Reply::Integer(removed as i64))
            },
            Command::KeyExists { key } => Ok(Reply::Integer(self.keys.contains_key(key) as i64)),
            Command::HashGetAll { key } => Ok(Reply::Hash(
                self.hash(key, name)?
                    .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default(),
            )),
            Command::HashGet { key, fields } => {
                let hash = self.hash(key, name)?;
                Ok(Reply::Values(
                    fields
                        .iter()
                        .map(|f| hash.and_then(|h| h.get(f).cloned()))
                        .collect(),
                ))
            },
        }
    }
}

/// In-memory [`IndexStore`]
///
/// Also records the name of every command it executes, which lets callers
/// assert how many round trips and range reads a query needed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    log: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member to an unordered set
    pub fn add_to_set(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let entry = state
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        match entry {
            Entry::Set(s) => Ok(s.insert(member.to_string())),
            other => Err(wrong_type(key, other, "SADD")),
        }
    }

    /// Add or update a sorted-set member
    pub fn sorted_add(&self, key: &str, score: f64, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(state.sorted_mut(key, "ZADD")?.add(score, member.to_string()))
    }

    /// Set a hash field
    pub fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let entry = state
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(BTreeMap::new()));
        match entry {
            Entry::Hash(h) => {
                h.insert(field.to_string(), value.to_string());
                Ok(())
            },
            other => Err(wrong_type(key, other, "HSET")),
        }
    }

    /// Delete a key of any type
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().keys.remove(key).is_some()
    }

    /// Write a record and maintain every index declared by its schema
    ///
    /// Fields absent from `fields` are left out of both the hash and the
    /// indexes. Values are written to the hash in their display form.
    pub fn index_record(
        &self,
        schema: &ModelSchema,
        id: &str,
        fields: &[(&str, Value)],
    ) -> Result<(), StoreError> {
        ModelSchema::validate_id(id).map_err(|e| StoreError::Command(e.to_string()))?;

        let model = schema.name();
        self.add_to_set(&all_ids_key(model), id)?;

        for (field, value) in fields {
            let entry = schema.entry(field).ok_or_else(|| {
                StoreError::Command(format!("model {} has no field {}", model, field))
            })?;
            self.hash_set(&record_key(model, id), &entry.store_key, &value.to_string())?;

            let key = index_key(model, &entry.store_key);
            match entry.index_kind {
                IndexKind::Numeric | IndexKind::Boolean => {
                    let score = value.score().ok_or_else(|| {
                        StoreError::Command(format!("field {} needs a numeric value", field))
                    })?;
                    self.sorted_add(&key, score, id)?;
                },
                IndexKind::Alpha => {
                    let text = value.as_str().ok_or_else(|| {
                        StoreError::Command(format!("field {} needs a string value", field))
                    })?;
                    self.sorted_add(&key, 0.0, &encode_alpha_member(text, id))?;
                },
                IndexKind::None => {},
            }
        }
        Ok(())
    }

    /// Names of the commands executed so far, in order
    pub fn executed_commands(&self) -> Vec<&'static str> {
        self.log.lock().clone()
    }

    /// Clear the command log
    pub fn reset_command_log(&self) {
        self.log.lock().clear();
    }

    fn record(&self, command: &Command) {
        trace!(command = command.name(), key = command.key(), "memory store command");
        self.log.lock().push(command.name());
    }
}

#[async_trait]
impl IndexStore for MemoryStore {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        self.record(&command);
        self.state.lock().apply(&command)
    }

    async fn execute_batch(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        let mut state = self.state.lock();
        let mut replies = Vec::with_capacity(batch.len());
        for command in batch.commands() {
            self.record(command);
            replies.push(state.apply(command)?);
        }
        Ok(replies)
    }
}
