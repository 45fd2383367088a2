//! Evaluation plan description
//!
//! A [`QueryPlan`] says what a finisher will do without touching the
//! store. Finishers build the plan and then follow it, so the description
//! cannot drift from the behavior.

use std::fmt;

/// Which list the intersection preserves the order of
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// A filter on the order field (index into the query's filters)
    OrderFilter(usize),
    /// A full scan of the order field's index
    OrderIndex(String),
    /// Whichever filter matches the fewest ids; ties go to the earliest
    SmallestFilter,
}

/// How the id list is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Every member of the live-id set
    AllIds,
    /// A random sample of the live-id set
    RandomSample {
        /// Sample size
        limit: usize,
    },
    /// A rank range of the order field's index
    OrderedRange {
        /// Order field
        field: String,
        /// First rank
        start: i64,
        /// Last rank, `-1` for the end
        stop: i64,
        /// Scan from the high end
        reverse: bool,
    },
    /// Evaluate every filter and intersect
    Filtered {
        /// Order-defining list
        anchor: Anchor,
    },
}

/// Description of a query's evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Model name
    pub model: String,
    /// Id list strategy
    pub strategy: Strategy,
    /// Rendered filters, in declaration order
    pub filters: Vec<String>,
    /// Offset applied in memory after intersection
    pub offset: usize,
    /// Limit applied in memory after intersection, `0` for none
    pub limit: usize,
    /// Fields handed to hydration, `None` for all
    pub hydrate_fields: Option<Vec<String>>,
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.model)?;
        match &self.strategy {
            Strategy::AllIds => write!(f, "all ids")?,
            Strategy::RandomSample { limit } => write!(f, "random sample of {}", limit)?,
            Strategy::OrderedRange {
                field,
                start,
                stop,
                reverse,
            } => {
                let dir = if *reverse { "desc" } else { "asc" };
                write!(f, "{} range [{}, {}] on {}", dir, start, stop, field)?
            },
            Strategy::Filtered { anchor } => {
                write!(f, "intersect {} filters anchored on ", self.filters.len())?;
                match anchor {
                    Anchor::OrderFilter(i) => write!(f, "filter #{}", i)?,
                    Anchor::OrderIndex(field) => write!(f, "index of {}", field)?,
                    Anchor::SmallestFilter => write!(f, "smallest filter")?,
                }
                if self.offset > 0 || self.limit > 0 {
                    write!(f, ", then window offset {} limit {}", self.offset, self.limit)?;
                }
            },
        }
        Ok(())
    }
}
