//! Store command vocabulary
//!
//! The engine speaks a small, store-agnostic set of set and sorted-set
//! commands. Backends translate each [`Command`] into their native protocol
//! and answer with a [`Reply`].

use crate::error::StoreError;

use std::fmt;

/// One end of a score range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    /// Unbounded below
    NegInf,
    /// Unbounded above
    PosInf,
    /// Bound that includes the score
    Inclusive(f64),
    /// Bound that excludes the score
    Exclusive(f64),
}

impl ScoreBound {
    /// Whether a score lies above (or at, if inclusive) this lower bound
    pub fn admits_from_below(&self, score: f64) -> bool {
        match *self {
            ScoreBound::NegInf => true,
            ScoreBound::PosInf => false,
            ScoreBound::Inclusive(min) => score >= min,
            ScoreBound::Exclusive(min) => score > min,
        }
    }

    /// Whether a score lies below (or at, if inclusive) this upper bound
    pub fn admits_from_above(&self, score: f64) -> bool {
        match *self {
            ScoreBound::NegInf => false,
            ScoreBound::PosInf => true,
            ScoreBound::Inclusive(max) => score <= max,
            ScoreBound::Exclusive(max) => score < max,
        }
    }
}

/// Renders in Redis range syntax: `-inf`, `+inf`, `5`, `(5`
impl fmt::Display for ScoreBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBound::NegInf => f.write_str("-inf"),
            ScoreBound::PosInf => f.write_str("+inf"),
            ScoreBound::Inclusive(v) => write!(f, "{}", v),
            ScoreBound::Exclusive(v) => write!(f, "({}", v),
        }
    }
}

/// A single store command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// All members of an unordered set
    SetMembers {
        /// Set key
        key: String,
    },
    /// Up to `count` distinct random members of an unordered set
    SetRandomMembers {
        /// Set key
        key: String,
        /// Sample size
        count: usize,
    },
    /// Number of members of an unordered set
    SetCardinality {
        /// Set key
        key: String,
    },
    /// Members of a sorted set between two ranks (inclusive, negative counts from the end)
    SortedRangeByRank {
        /// Sorted set key
        key: String,
        /// First rank
        start: i64,
        /// Last rank
        stop: i64,
        /// Count ranks from the highest member
        reverse: bool,
    },
    /// Members of a sorted set whose score lies within the bounds
    SortedRangeByScore {
        /// Sorted set key
        key: String,
        /// Lower bound
        min: ScoreBound,
        /// Upper bound
        max: ScoreBound,
        /// Return members from highest to lowest
        reverse: bool,
    },
    /// Number of members of a sorted set
    SortedCardinality {
        /// Sorted set key
        key: String,
    },
    /// Add a member to a sorted set
    SortedAdd {
        /// Sorted set key
        key: String,
        /// Member score
        score: f64,
        /// Member
        member: String,
    },
    /// Zero-based rank of a member in ascending order
    SortedRank {
        /// Sorted set key
        key: String,
        /// Member
        member: String,
    },
    /// Remove members from a sorted set
    SortedRemove {
        /// Sorted set key
        key: String,
        /// Members to remove
        members: Vec<String>,
    },
    /// Whether a key exists
    KeyExists {
        /// Key
        key: String,
    },
    /// Every field of a hash
    HashGetAll {
        /// Hash key
        key: String,
    },
    /// Selected fields of a hash
    HashGet {
        /// Hash key
        key: String,
        /// Field names
        fields: Vec<String>,
    },
}

impl Command {
    /// Redis command name, also used in logs and test assertions
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetMembers { .. } => "SMEMBERS",
            Command::SetRandomMembers { .. } => "SRANDMEMBER",
            Command::SetCardinality { .. } => "SCARD",
            Command::SortedRangeByRank { reverse: false, .. } => "ZRANGE",
            Command::SortedRangeByRank { reverse: true, .. } => "ZREVRANGE",
            Command::SortedRangeByScore { reverse: false, .. } => "ZRANGEBYSCORE",
            Command::SortedRangeByScore { reverse: true, .. } => "ZREVRANGEBYSCORE",
            Command::SortedCardinality { .. } => "ZCARD",
            Command::SortedAdd { .. } => "ZADD",
            Command::SortedRank { .. } => "ZRANK",
            Command::SortedRemove { .. } => "ZREM",
            Command::KeyExists { .. } => "EXISTS",
            Command::HashGetAll { .. } => "HGETALL",
            Command::HashGet { .. } => "HMGET",
        }
    }

    /// Key the command operates on
    pub fn key(&self) -> &str {
        match self {
            Command::SetMembers { key }
            | Command::SetRandomMembers { key, .. }
            | Command::SetCardinality { key }
            | Command::SortedRangeByRank { key, .. }
            | Command::SortedRangeByScore { key, .. }
            | Command::SortedCardinality { key }
            | Command::SortedAdd { key, .. }
            | Command::SortedRank { key, .. }
            | Command::SortedRemove { key, .. }
            | Command::KeyExists { key }
            | Command::HashGetAll { key }
            | Command::HashGet { key, .. } => key,
        }
    }

    /// Whether the command is a range read over a sorted set
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Command::SortedRangeByRank { .. } | Command::SortedRangeByScore { .. }
        )
    }
}

/// Reply to a single command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Ordered list of members
    Members(Vec<String>),
    /// Integer result (cardinalities, add/remove counts)
    Integer(i64),
    /// Rank of a member, `None` if absent
    Rank(Option<i64>),
    /// Field/value pairs of a hash
    Hash(Vec<(String, String)>),
    /// Values for requested hash fields, `None` where a field is absent
    Values(Vec<Option<String>>),
}

impl Reply {
    fn shape(&self) -> &'static str {
        match self {
            Reply::Members(_) => "members",
            Reply::Integer(_) => "integer",
            Reply::Rank(_) => "rank",
            Reply::Hash(_) => "hash",
            Reply::Values(_) => "values",
        }
    }

    fn unexpected(&self, command: &str) -> StoreError {
        StoreError::UnexpectedReply {
            command: command.to_string(),
            reply: self.shape().to_string(),
        }
    }

    /// Expect a member list
    pub fn into_members(self, command: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Reply::Members(m) => Ok(m),
            other => Err(other.unexpected(command)),
        }
    }

    /// Expect an integer
    pub fn into_integer(self, command: &str) -> Result<i64, StoreError> {
        match self {
            Reply::Integer(n) => Ok(n),
            other => Err(other.unexpected(command)),
        }
    }

    /// Expect a rank
    pub fn into_rank(self, command: &str) -> Result<Option<i64>, StoreError> {
        match self {
            Reply::Rank(r) => Ok(r),
            other => Err(other.unexpected(command)),
        }
    }

    /// Expect hash field/value pairs
    pub fn into_hash(self, command: &str) -> Result<Vec<(String, String)>, StoreError> {
        match self {
            Reply::Hash(h) => Ok(h),
            other => Err(other.unexpected(command)),
        }
    }

    /// Expect per-field hash values
    pub fn into_values(self, command: &str) -> Result<Vec<Option<String>>, StoreError> {
        match self {
            Reply::Values(v) => Ok(v),
            other => Err(other.unexpected(command)),
        }
    }
}

/// A group of commands executed atomically, in submission order
///
/// Replies come back positionally; [`Batch::push`] returns the slot each
/// command's reply will occupy.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command, returning the index of its reply
    pub fn push(&mut self, command: Command) -> usize {
        self.commands.push(command);
        self.commands.len() - 1
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are queued
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queued commands
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consume the batch
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bound_syntax() {
        assert_eq!(ScoreBound::NegInf.to_string(), "-inf");
        assert_eq!(ScoreBound::PosInf.to_string(), "+inf");
        assert_eq!(ScoreBound::Inclusive(5.0).to_string(), "5");
        assert_eq!(ScoreBound::Exclusive(2.5).to_string(), "(2.5");
    }

    #[test]
    fn test_score_bound_admits() {
        assert!(ScoreBound::Exclusive(5.0).admits_from_below(6.0));
        assert!(!ScoreBound::Exclusive(5.0).admits_from_below(5.0));
        assert!(ScoreBound::Inclusive(5.0).admits_from_above(5.0));
        assert!(!ScoreBound::Exclusive(5.0).admits_from_above(5.0));
        assert!(ScoreBound::NegInf.admits_from_below(f64::MIN));
        assert!(ScoreBound::PosInf.admits_from_above(f64::MAX));
    }

    #[test]
    fn test_command_names() {
        let cmd = Command::SortedRangeByScore {
            key: "k".into(),
            min: ScoreBound::NegInf,
            max: ScoreBound::PosInf,
            reverse: true,
        };
        assert_eq!(cmd.name(), "ZREVRANGEBYSCORE");
        assert_eq!(cmd.key(), "k");
        assert!(cmd.is_range());
        assert!(!Command::SetCardinality { key: "k".into() }.is_range());
    }

    #[test]
    fn test_reply_shape_mismatch() {
        let err = Reply::Integer(3).into_members("ZRANGE").unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedReply { .. }));
        assert_eq!(Reply::Rank(Some(2)).into_rank("ZRANK").unwrap(), Some(2));
    }

    #[test]
    fn test_batch_slots() {
        let mut batch = Batch::new();
        assert!(batch.is_empty());
        let a = batch.push(Command::SetCardinality { key: "a".into() });
        let b = batch.push(Command::SortedCardinality { key: "b".into() });
        assert_eq!((a, b), (0, 1));
        assert_eq!(batch.len(), 2);
    }
}
