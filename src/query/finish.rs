//! Finishers - evaluate a query
//!
//! ```text
//! plan ──► AllIds / RandomSample ─────► SMEMBERS / SRANDMEMBER
//!      ──► OrderedRange ──────────────► ZRANGE / ZREVRANGE window
//!      ──► Filtered ──► every filter ─┐
//!                       anchor list ──┴► ordered intersect ─► offset/limit
//! ```

use super::builder::Query;
use super::combinator::ordered_intersect;
use super::order::{all_ids, ordered_ids};
use super::plan::{Anchor, Strategy};
use super::planner::filter_ids;
use crate::error::{Error, Result};
use crate::hydrate::{Hydrator, Record};
use crate::store::{all_ids_key, index_key, Command, IndexStore};

use futures::future::try_join_all;
use std::fmt::Display;
use tracing::{debug, instrument, warn};

/// Clamp a cardinality by an offset/limit window
///
/// ```rust
/// use kuba_query::query::clamp_count;
///
/// assert_eq!(clamp_count(100, 95, 10), 5);
/// assert_eq!(clamp_count(100, 150, 10), 0);
/// assert_eq!(clamp_count(100, 20, 0), 80);
/// ```
pub fn clamp_count(count: usize, offset: usize, limit: usize) -> usize {
    if offset > count {
        return 0;
    }
    let remaining = count - offset;
    if limit == 0 {
        remaining
    } else {
        remaining.min(limit)
    }
}

impl<S: IndexStore + ?Sized> Query<S> {
    /// Evaluate to the matching ids, in order
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn ids(&self) -> Result<Vec<String>> {
        let plan = self.plan()?;
        if self.log_plans {
            debug!(plan = %plan, "query plan");
        }
        let store = self.store.as_ref();

        let ids = match (&plan.strategy, &self.order) {
            (Strategy::AllIds, _) | (Strategy::RandomSample { .. }, _) => {
                all_ids(store, &self.model, self.limit).await?
            },
            (Strategy::OrderedRange { .. }, Some(order)) => {
                ordered_ids(store, &self.model, order, self.offset, self.limit).await?
            },
            (Strategy::Filtered { anchor }, _) => self.filtered_ids(anchor).await?,
            (Strategy::OrderedRange { .. }, None) => Vec::new(),
        };
        debug!(ids = ids.len(), "query evaluated");
        Ok(ids)
    }

    async fn filtered_ids(&self, anchor: &Anchor) -> Result<Vec<String>> {
        let store = self.store.as_ref();
        let order = self.order.as_ref();
        let mut lists = try_join_all(
            self.filters
                .iter()
                .map(|filter| filter_ids(store, &self.model, filter, order)),
        )
        .await?;
        if lists.iter().any(Vec::is_empty) {
            debug!("a filter matched nothing");
            return Ok(Vec::new());
        }

        let anchor_ids = match (anchor, order) {
            (Anchor::OrderFilter(i), _) => lists.remove(*i),
            (Anchor::OrderIndex(_), Some(order)) => {
                ordered_ids(store, &self.model, order, 0, 0).await?
            },
            (Anchor::SmallestFilter, _) | (Anchor::OrderIndex(_), None) => {
                let smallest = lists
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, ids)| ids.len())
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                if lists.is_empty() {
                    Vec::new()
                } else {
                    lists.remove(smallest)
                }
            },
        };

        let limit = if self.limit == 0 {
            usize::MAX
        } else {
            self.limit
        };
        Ok(ordered_intersect(anchor_ids, &lists)
            .into_iter()
            .skip(self.offset)
            .take(limit)
            .collect())
    }

    /// Number of ids the query would return
    ///
    /// Unfiltered queries read a cardinality and clamp it by the window.
    /// Filtered queries evaluate the ids and count them.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn count(&self) -> Result<usize> {
        self.checked_schema()?;
        if !self.filters.is_empty() {
            return Ok(self.ids().await?.len());
        }

        let store = self.store.as_ref();
        match &self.order {
            None => {
                if self.offset > 0 {
                    return Err(Error::OffsetWithoutOrder);
                }
                let command = Command::SetCardinality {
                    key: all_ids_key(&self.model),
                };
                let name = command.name();
                let count = store.execute(command).await?.into_integer(name)?.max(0) as usize;
                Ok(clamp_count(count, 0, self.limit))
            },
            Some(order) => {
                let command = Command::SortedCardinality {
                    key: index_key(&self.model, &order.store_key),
                };
                let name = command.name();
                let count = store.execute(command).await?.into_integer(name)?.max(0) as usize;
                Ok(clamp_count(count, self.offset, self.limit))
            },
        }
    }

    /// Evaluate and hydrate the matching records, skipping any that vanished
    #[instrument(skip(self, hydrator), fields(model = %self.model))]
    pub async fn run<H>(&self, hydrator: &H) -> Result<Vec<Record>>
    where
        H: Hydrator + ?Sized,
    {
        let schema = self.checked_schema()?.clone();
        let ids = self.ids().await?;
        let fields = self.hydrate_fields();
        let loaded = hydrator.hydrate(&schema, &ids, fields.as_deref()).await?;

        let mut records = Vec::with_capacity(loaded.len());
        for (id, record) in ids.iter().zip(loaded) {
            match record {
                Some(record) => records.push(record),
                None => warn!(id = %id, "record listed in index is missing, skipped"),
            }
        }
        Ok(records)
    }

    /// Evaluate, hydrate and convert into `target`, replacing its contents
    #[instrument(skip(self, hydrator, target), fields(model = %self.model))]
    pub async fn scan<H, M>(&self, hydrator: &H, target: &mut Vec<M>) -> Result<()>
    where
        H: Hydrator + ?Sized,
        M: TryFrom<Record>,
        M::Error: Display,
    {
        target.clear();
        for record in self.run(hydrator).await? {
            let id = record.id.clone();
            let model = M::try_from(record)
                .map_err(|e| Error::Hydration(format!("record {}: {}", id, e)))?;
            target.push(model);
        }
        Ok(())
    }
}
