//! Filter planner - turns one filter into the ids it selects
//!
//! Each index kind has its own evaluation path:
//!
//! ```text
//!            Filter
//!               │
//!   ┌───────────┼──────────────┐
//!   ▼           ▼              ▼
//! Numeric/    Alpha           Id
//! Boolean       │              │
//!   │      sentinel ranks   [value]
//!   │           │          (no store access)
//!   ▼           ▼
//! score       rank
//! range       range(s)
//! ```
//!
//! `!=` always becomes two scans issued in one atomic batch: the less-than
//! side and the greater-than side. An alpha target containing spaces adds
//! one scan per space-delimited prefix for `<`, `<=` and `!=`. Scans run in reverse only when the
//! filtered field is the query's descending order field; otherwise the
//! result order is irrelevant because the order anchor re-sorts it.

use super::alpha::{resolve_scans, RankRange};
use super::filter::{Filter, Operator};
use super::order::Order;
use crate::error::StoreError;
use crate::store::{decode_alpha_member, index_key, Batch, Command, IndexStore, ScoreBound};
use crate::types::IndexKind;

use tracing::debug;

/// Evaluate a single filter
pub async fn filter_ids<S>(
    store: &S,
    model: &str,
    filter: &Filter,
    order: Option<&Order>,
) -> Result<Vec<String>, StoreError>
where
    S: IndexStore + ?Sized,
{
    if filter.by_id {
        return Ok(filter.value.as_str().map(str::to_string).into_iter().collect());
    }

    let reverse = order
        .map(|o| o.is_reverse() && o.field_name == filter.field_name)
        .unwrap_or(false);
    let key = index_key(model, &filter.store_key);

    let ids: Vec<String> = match filter.index_kind {
        IndexKind::Numeric | IndexKind::Boolean => {
            let score = filter.value.score().ok_or_else(|| {
                StoreError::Command(format!(
                    "value {} of field {} has no score",
                    filter.value, filter.field_name
                ))
            })?;
            let commands = score_ranges(filter.op, score)
                .into_iter()
                .map(|(min, max)| Command::SortedRangeByScore {
                    key: key.clone(),
                    min,
                    max,
                    reverse,
                })
                .collect();
            run_scans(store, commands, reverse).await?.concat()
        },
        IndexKind::Alpha => {
            let value = filter.value.as_str().ok_or_else(|| {
                StoreError::Command(format!(
                    "value {} of field {} is not a string",
                    filter.value, filter.field_name
                ))
            })?;
            let mut scans = resolve_scans(store, &key, filter.op, value).await?;
            // prefix scans overlap the others in index order
            let merge = scans.iter().any(|scan| scan.prefix.is_some());
            let commands = scans
                .iter()
                .map(|scan| {
                    let RankRange { start, stop } = if reverse {
                        scan.range.reversed()
                    } else {
                        scan.range
                    };
                    Command::SortedRangeByRank {
                        key: key.clone(),
                        start,
                        stop,
                        reverse,
                    }
                })
                .collect();
            if reverse {
                scans.reverse();
            }
            let mut members: Vec<String> = run_scans(store, commands, reverse)
                .await?
                .into_iter()
                .zip(scans.iter())
                .flat_map(|(members, scan)| {
                    members.into_iter().filter(move |m| scan.admits(m, value))
                })
                .collect();
            if merge {
                members.sort_unstable();
                if reverse {
                    members.reverse();
                }
            }
            members
                .iter()
                .map(|m| decode_alpha_member(m).to_string())
                .collect()
        },
        IndexKind::None => {
            return Err(StoreError::Command(format!(
                "field {} has no index",
                filter.field_name
            )))
        },
    };

    debug!(filter = %filter, reverse, matches = ids.len(), "filter evaluated");
    Ok(ids)
}

/// Score bounds selected by `op`; `!=` yields the less-than side first
pub fn score_ranges(op: Operator, v: f64) -> Vec<(ScoreBound, ScoreBound)> {
    use ScoreBound::*;

    match op {
        Operator::Equal => vec![(Inclusive(v), Inclusive(v))],
        Operator::Less => vec![(NegInf, Exclusive(v))],
        Operator::Greater => vec![(Exclusive(v), PosInf)],
        Operator::LessOrEqual => vec![(NegInf, Inclusive(v))],
        Operator::GreaterOrEqual => vec![(Inclusive(v), PosInf)],
        Operator::NotEqual => vec![(NegInf, Exclusive(v)), (Exclusive(v), PosInf)],
    }
}

/// Issue the scans for one filter, returning each scan's members
///
/// Scans are listed low side first. Several scans go out as one batch;
/// in reverse the high side is returned first.
async fn run_scans<S>(
    store: &S,
    mut commands: Vec<Command>,
    reverse: bool,
) -> Result<Vec<Vec<String>>, StoreError>
where
    S: IndexStore + ?Sized,
{
    if reverse {
        commands.reverse();
    }

    match commands.len() {
        0 => Ok(Vec::new()),
        1 => {
            let command = commands.remove(0);
            let name = command.name();
            Ok(vec![store.execute(command).await?.into_members(name)?])
        },
        _ => {
            let mut batch = Batch::new();
            let names: Vec<&'static str> = commands.iter().map(Command::name).collect();
            for command in commands {
                batch.push(command);
            }
            store
                .execute_batch(batch)
                .await?
                .into_iter()
                .zip(names)
                .map(|(reply, name)| reply.into_members(name))
                .collect()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, ModelSchema};
    use crate::store::MemoryStore;
    use crate::types::{FieldType, Value};

    fn schema() -> ModelSchema {
        ModelSchema::new(
            "Person",
            vec![
                FieldSpec::new("Age", FieldType::I32).indexed(),
                FieldSpec::new("Name", FieldType::String).indexed(),
                FieldSpec::new("Active", FieldType::Bool).indexed(),
            ],
        )
        .unwrap()
    }

    fn seeded(schema: &ModelSchema) -> MemoryStore {
        let store = MemoryStore::new();
        let rows = [
            ("p1", 20, "Alice", true),
            ("p2", 30, "Bob", false),
            ("p3", 30, "Carol", true),
            ("p4", 40, "Dave", false),
            ("p5", 50, "Eve", true),
        ];
        for (id, age, name, active) in rows {
            store
                .index_record(
                    schema,
                    id,
                    &[
                        ("Age", Value::I32(age)),
                        ("Name", Value::from(name)),
                        ("Active", Value::Bool(active)),
                    ],
                )
                .unwrap();
        }
        store
    }

    async fn eval(store: &MemoryStore, schema: &ModelSchema, expr: &str, v: Value) -> Vec<String> {
        let filter = Filter::parse(schema, expr, v).unwrap();
        filter_ids(store, "Person", &filter, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_numeric_operators() {
        let s = schema();
        let store = seeded(&s);
        assert_eq!(eval(&store, &s, "Age =", Value::I32(30)).await, vec!["p2", "p3"]);
        assert_eq!(eval(&store, &s, "Age <", Value::I32(30)).await, vec!["p1"]);
        assert_eq!(eval(&store, &s, "Age >", Value::I32(30)).await, vec!["p4", "p5"]);
        assert_eq!(eval(&store, &s, "Age <=", Value::I32(30)).await, vec!["p1", "p2", "p3"]);
        assert_eq!(eval(&store, &s, "Age >=", Value::I32(40)).await, vec!["p4", "p5"]);
        assert_eq!(eval(&store, &s, "Age !=", Value::I32(30)).await, vec!["p1", "p4", "p5"]);
    }

    #[tokio::test]
    async fn test_boolean_filter() {
        let s = schema();
        let store = seeded(&s);
        assert_eq!(eval(&store, &s, "Active =", Value::Bool(true)).await, vec!["p1", "p3", "p5"]);
        assert_eq!(eval(&store, &s, "Active !=", Value::Bool(true)).await, vec!["p2", "p4"]);
    }

    #[tokio::test]
    async fn test_not_equal_is_one_batch() {
        let s = schema();
        let store = seeded(&s);
        store.reset_command_log();
        eval(&store, &s, "Age !=", Value::I32(30)).await;
        assert_eq!(
            store.executed_commands(),
            vec!["ZRANGEBYSCORE", "ZRANGEBYSCORE"]
        );
    }

    #[tokio::test]
    async fn test_reverse_only_on_order_field() {
        let s = schema();
        let store = seeded(&s);
        let ne = Filter::parse(&s, "Age !=", Value::I32(30)).unwrap();

        let by_age_desc = Order::parse(&s, "-Age").unwrap();
        let ids = filter_ids(&store, "Person", &ne, Some(&by_age_desc)).await.unwrap();
        assert_eq!(ids, vec!["p5", "p4", "p1"]);

        let by_name_desc = Order::parse(&s, "-Name").unwrap();
        let ids = filter_ids(&store, "Person", &ne, Some(&by_name_desc)).await.unwrap();
        assert_eq!(ids, vec!["p1", "p4", "p5"]);
    }

    #[tokio::test]
    async fn test_alpha_filter_directions() {
        let s = schema();
        let store = seeded(&s);
        let ne = Filter::parse(&s, "Name !=", Value::from("Carol")).unwrap();
        assert_eq!(
            filter_ids(&store, "Person", &ne, None).await.unwrap(),
            vec!["p1", "p2", "p4", "p5"]
        );

        let desc = Order::parse(&s, "-Name").unwrap();
        assert_eq!(
            filter_ids(&store, "Person", &ne, Some(&desc)).await.unwrap(),
            vec!["p5", "p4", "p2", "p1"]
        );

        let ge = Filter::parse(&s, "Name >=", Value::from("Bob")).unwrap();
        assert_eq!(
            filter_ids(&store, "Person", &ge, Some(&desc)).await.unwrap(),
            vec!["p5", "p4", "p3", "p2"]
        );
    }

    #[tokio::test]
    async fn test_id_filter_touches_nothing() {
        let s = schema();
        let store = seeded(&s);
        store.reset_command_log();
        assert_eq!(eval(&store, &s, "Id =", Value::from("abc123")).await, vec!["abc123"]);
        assert!(store.executed_commands().is_empty());
    }
}
