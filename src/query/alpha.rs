//! Alpha rank resolution
//!
//! Alpha indexes hold `"<value> <id>"` members at score 0, so the store
//! orders them byte-lexicographically. To find where a value's members sit,
//! two sentinels are inserted around them, their ranks are read, and both
//! are removed again, all in one atomic batch:
//!
//! ```text
//! lower = "<value> "          sorts before every "<value> <id>"
//! upper = "<value> \x7f"      sorts after every "<value> <id>"
//! ```
//!
//! Ids are printable ASCII without spaces, so no stored member can equal a
//! sentinel, and a value that merely starts with the target (`"apples"` for
//! `"apple"`) sorts outside the pair.
//!
//! A stored value the target extends with a space (`"New"` for `"New York"`)
//! can sort on either side of the pair depending on its ids. For `<`, `<=`
//! and `!=` each such prefix gets its own sentinel pair and scan.

use super::filter::Operator;
use crate::error::StoreError;
use crate::store::{alpha_member_value, Batch, Command, IndexStore};

use tracing::trace;

const SENTINEL_TAIL: char = '\u{7f}';

/// Ranks of the two sentinels while both are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaRanks {
    /// Rank of the lower sentinel
    pub before: i64,
    /// Rank of the upper sentinel
    pub after: i64,
}

impl AlphaRanks {
    /// Number of stored members holding the target value
    pub fn matches(&self) -> i64 {
        self.after - self.before - 1
    }
}

/// Inclusive rank range over the index without sentinels (`-1` = last)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankRange {
    /// First rank
    pub start: i64,
    /// Last rank
    pub stop: i64,
}

impl RankRange {
    fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    /// The same members addressed from the high end of the index
    ///
    /// Rank `i` from the bottom is rank `-(i + 1)` from the top, so the
    /// range can be reversed without knowing the index size.
    pub fn reversed(&self) -> Self {
        let start = if self.stop < 0 { 0 } else { -(self.stop + 1) };
        Self::new(start, -(self.start + 1))
    }
}

/// Measure the sentinel ranks for `value` in the index at `key`
pub async fn resolve_ranks<S>(store: &S, key: &str, value: &str) -> Result<AlphaRanks, StoreError>
where
    S: IndexStore + ?Sized,
{
    let lower = format!("{} ", value);
    let upper = format!("{} {}", value, SENTINEL_TAIL);

    let mut batch = Batch::new();
    batch.push(Command::SortedAdd {
        key: key.to_string(),
        score: 0.0,
        member: lower.clone(),
    });
    batch.push(Command::SortedAdd {
        key: key.to_string(),
        score: 0.0,
        member: upper.clone(),
    });
    let before_slot = batch.push(Command::SortedRank {
        key: key.to_string(),
        member: lower.clone(),
    });
    let after_slot = batch.push(Command::SortedRank {
        key: key.to_string(),
        member: upper.clone(),
    });
    batch.push(Command::SortedRemove {
        key: key.to_string(),
        members: vec![lower, upper],
    });

    let mut replies = store.execute_batch(batch).await?;
    if replies.len() != 5 {
        return Err(StoreError::UnexpectedReply {
            command: "EXEC".to_string(),
            reply: format!("{} replies for 5 commands", replies.len()),
        });
    }
    let after = replies.swap_remove(after_slot).into_rank("ZRANK")?;
    let before = replies.swap_remove(before_slot).into_rank("ZRANK")?;

    match (before, after) {
        (Some(before), Some(after)) => {
            trace!(key, before, after, "alpha sentinel ranks");
            Ok(AlphaRanks { before, after })
        },
        _ => Err(StoreError::UnexpectedReply {
            command: "ZRANK".to_string(),
            reply: "sentinel missing from index".to_string(),
        }),
    }
}

/// One rank scan and the comparison its members must pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaScan {
    /// Ranks to read
    pub range: RankRange,
    /// Comparison applied to each member's value
    pub keep: Operator,
    /// Compare against `target[..end]` instead of the whole target
    pub prefix: Option<usize>,
}

impl AlphaScan {
    /// Whether a raw member's value satisfies the scan's comparison
    ///
    /// Values the target extends with a space are only admitted by the
    /// prefix scan resolved for them.
    pub fn admits(&self, member: &str, target: &str) -> bool {
        let value = alpha_member_value(member);
        let target = match self.prefix {
            Some(end) => &target[..end],
            None if is_space_prefix(value, target) => return false,
            None => target,
        };
        match self.keep {
            Operator::Equal => value == target,
            Operator::NotEqual => value != target,
            Operator::Less => value < target,
            Operator::Greater => value > target,
            Operator::LessOrEqual => value <= target,
            Operator::GreaterOrEqual => value >= target,
        }
    }
}

/// Scans selected by `op`; an empty list means no member matches
///
/// Every window includes the sentinel pair's interior. A stored value that
/// extends the target with a space (`"New Haven"` for `"New"`) sorts inside
/// it, so members are checked against their decoded value. `!=` yields the
/// less-than scan followed by the greater-than scan.
pub fn alpha_scans(op: Operator, ranks: AlphaRanks) -> Vec<AlphaScan> {
    let AlphaRanks { before, after } = ranks;
    let scan = |start, stop, keep| AlphaScan {
        range: RankRange::new(start, stop),
        keep,
        prefix: None,
    };
    let low = |keep| (after >= 2).then(|| scan(0, after - 2, keep));
    let high = |keep| scan(before, -1, keep);

    match op {
        Operator::Equal => (ranks.matches() > 0)
            .then(|| scan(before, after - 2, Operator::Equal))
            .into_iter()
            .collect(),
        Operator::Less => low(Operator::Less).into_iter().collect(),
        Operator::LessOrEqual => low(Operator::LessOrEqual).into_iter().collect(),
        Operator::Greater => vec![high(Operator::Greater)],
        Operator::GreaterOrEqual => vec![high(Operator::GreaterOrEqual)],
        Operator::NotEqual => low(Operator::Less)
            .into_iter()
            .chain(Some(high(Operator::Greater)))
            .collect(),
    }
}

/// Scans for `op` against `target`, including one per space-delimited prefix
///
/// Each sentinel pair is measured in its own atomic batch.
pub async fn resolve_scans<S>(
    store: &S,
    key: &str,
    op: Operator,
    target: &str,
) -> Result<Vec<AlphaScan>, StoreError>
where
    S: IndexStore + ?Sized,
{
    let mut scans = alpha_scans(op, resolve_ranks(store, key, target).await?);
    if matches!(
        op,
        Operator::Less | Operator::LessOrEqual | Operator::NotEqual
    ) {
        for (end, _) in target.match_indices(' ') {
            let ranks = resolve_ranks(store, key, &target[..end]).await?;
            scans.extend(
                alpha_scans(Operator::Equal, ranks)
                    .into_iter()
                    .map(|scan| AlphaScan {
                        prefix: Some(end),
                        ..scan
                    }),
            );
        }
    }
    Ok(scans)
}

/// Whether `target` is `value` followed by a space and more text
fn is_space_prefix(value: &str, target: &str) -> bool {
    target.len() > value.len()
        && target.as_bytes()[value.len()] == b' '
        && target.starts_with(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{decode_alpha_member, encode_alpha_member, MemoryStore, Reply};

    async fn fruit_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (value, id) in [("apple", "1"), ("banana", "2"), ("banana", "3"), ("cherry", "4")] {
            store
                .sorted_add("Fruit:Name", 0.0, &encode_alpha_member(value, id))
                .unwrap();
        }
        store
    }

    async fn select(store: &MemoryStore, op: Operator, value: &str) -> Vec<String> {
        let mut members = Vec::new();
        for scan in resolve_scans(store, "Fruit:Name", op, value).await.unwrap() {
            let found = store
                .execute(Command::SortedRangeByRank {
                    key: "Fruit:Name".into(),
                    start: scan.range.start,
                    stop: scan.range.stop,
                    reverse: false,
                })
                .await
                .unwrap()
                .into_members("ZRANGE")
                .unwrap();
            members.extend(found.into_iter().filter(|m| scan.admits(m, value)));
        }
        members.sort();
        members.iter().map(|m| decode_alpha_member(m).to_string()).collect()
    }

    #[tokio::test]
    async fn test_sentinels_are_removed() {
        let store = fruit_store().await;
        let ranks = resolve_ranks(&store, "Fruit:Name", "banana").await.unwrap();
        assert_eq!(ranks, AlphaRanks { before: 1, after: 4 });
        assert_eq!(ranks.matches(), 2);

        let card = store
            .execute(Command::SortedCardinality {
                key: "Fruit:Name".into(),
            })
            .await
            .unwrap();
        assert_eq!(card, Reply::Integer(4));
    }

    #[tokio::test]
    async fn test_operator_ranges() {
        let store = fruit_store().await;
        assert_eq!(select(&store, Operator::Equal, "banana").await, vec!["2", "3"]);
        assert_eq!(select(&store, Operator::Less, "banana").await, vec!["1"]);
        assert_eq!(select(&store, Operator::Greater, "banana").await, vec!["4"]);
        assert_eq!(select(&store, Operator::LessOrEqual, "banana").await, vec!["1", "2", "3"]);
        assert_eq!(select(&store, Operator::GreaterOrEqual, "banana").await, vec!["2", "3", "4"]);
        assert_eq!(select(&store, Operator::NotEqual, "banana").await, vec!["1", "4"]);
    }

    #[tokio::test]
    async fn test_absent_and_edge_values() {
        let store = fruit_store().await;
        assert!(select(&store, Operator::Equal, "blueberry").await.is_empty());
        assert!(select(&store, Operator::Less, "apple").await.is_empty());
        assert!(select(&store, Operator::LessOrEqual, "aardvark").await.is_empty());
        assert!(select(&store, Operator::Greater, "cherry").await.is_empty());
        assert_eq!(select(&store, Operator::Greater, "blueberry").await, vec!["4"]);
        // a prefix of a stored value is not equal to it
        assert!(select(&store, Operator::Equal, "app").await.is_empty());
    }

    #[tokio::test]
    async fn test_values_extended_by_a_space() {
        let store = MemoryStore::new();
        for (value, id) in [("Boston", "b1"), ("New", "n1"), ("New Haven", "h1"), ("Oslo", "o1")] {
            store
                .sorted_add("Fruit:Name", 0.0, &encode_alpha_member(value, id))
                .unwrap();
        }
        assert_eq!(select(&store, Operator::Equal, "New").await, vec!["n1"]);
        assert_eq!(select(&store, Operator::Greater, "New").await, vec!["h1", "o1"]);
        assert_eq!(select(&store, Operator::NotEqual, "New").await, vec!["b1", "h1", "o1"]);
        assert_eq!(select(&store, Operator::LessOrEqual, "New").await, vec!["b1", "n1"]);
    }

    #[tokio::test]
    async fn test_values_the_target_extends() {
        let store = MemoryStore::new();
        for (value, id) in [
            ("New", "A1"),
            ("New", "z9"),
            ("New York", "y1"),
            ("New York City", "c1"),
            ("Newark", "k1"),
        ] {
            store
                .sorted_add("Fruit:Name", 0.0, &encode_alpha_member(value, id))
                .unwrap();
        }
        // "New z9" sorts after every "New York ..." member
        assert_eq!(select(&store, Operator::Less, "New York").await, vec!["A1", "z9"]);
        assert_eq!(
            select(&store, Operator::LessOrEqual, "New York").await,
            vec!["A1", "y1", "z9"]
        );
        assert_eq!(
            select(&store, Operator::NotEqual, "New York").await,
            vec!["A1", "c1", "z9", "k1"]
        );
        assert_eq!(
            select(&store, Operator::Greater, "New York").await,
            vec!["c1", "k1"]
        );
        assert_eq!(
            select(&store, Operator::Less, "New York City").await,
            vec!["A1", "y1", "z9"]
        );
    }

    #[test]
    fn test_space_prefix() {
        assert!(is_space_prefix("New", "New York"));
        assert!(!is_space_prefix("New", "Newark"));
        assert!(!is_space_prefix("New York", "New"));
        assert!(!is_space_prefix("Old", "New York"));
    }

    #[test]
    fn test_reversed_ranges() {
        assert_eq!(RankRange::new(0, 2).reversed(), RankRange::new(-3, -1));
        assert_eq!(RankRange::new(3, -1).reversed(), RankRange::new(0, -4));
        assert_eq!(RankRange::new(0, -1).reversed(), RankRange::new(0, -1));
    }
}
