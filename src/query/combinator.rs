//! Order-preserving intersection of id lists

use std::collections::HashSet;

/// Keep the anchor's ids that appear in every secondary list, in anchor order
///
/// Duplicates in the anchor are kept once.
pub fn ordered_intersect<A>(anchor: Vec<String>, secondaries: &[A]) -> Vec<String>
where
    A: AsRef<[String]>,
{
    let lookups: Vec<HashSet<&str>> = secondaries
        .iter()
        .map(|ids| ids.as_ref().iter().map(String::as_str).collect())
        .collect();

    let mut seen = HashSet::new();
    anchor
        .into_iter()
        .filter(|id| lookups.iter().all(|set| set.contains(id.as_str())))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_anchor_order_preserved() {
        let out = ordered_intersect(ids(&["5", "3", "1", "4"]), &[ids(&["4", "1", "9"])]);
        assert_eq!(out, ids(&["1", "4"]));
    }

    #[test]
    fn test_every_secondary_must_match() {
        let out = ordered_intersect(
            ids(&["a", "b", "c", "d"]),
            &[ids(&["d", "c", "b"]), ids(&["b", "d"])],
        );
        assert_eq!(out, ids(&["b", "d"]));
    }

    #[test]
    fn test_no_secondaries_keeps_anchor() {
        let out = ordered_intersect::<Vec<String>>(ids(&["x", "y", "x"]), &[]);
        assert_eq!(out, ids(&["x", "y"]));
    }

    #[test]
    fn test_empty_secondary_empties_result() {
        let out = ordered_intersect(ids(&["x", "y"]), &[Vec::<String>::new()]);
        assert!(out.is_empty());
    }
}
