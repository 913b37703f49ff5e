//! Multiset equality that stays correct under hash collisions.
//!
//! The left side is bucketed by hash. Each right element scans only its own
//! bucket, and only the candidates nothing has consumed yet; a candidate is
//! accepted after a full structural comparison, never on hash equality alone.
//! Worst case is quadratic in bucket size.

use std::collections::HashMap;

/// Whether `left` and `right` hold the same elements with the same
/// multiplicities, given each element's hash.
///
/// `equals(right_element, candidate)` decides structural equality. The first
/// error it returns aborts the match.
pub fn multiset_equals<T, E>(
    left: Vec<(u64, T)>,
    right: Vec<(u64, T)>,
    mut equals: impl FnMut(&T, &T) -> Result<bool, E>,
) -> Result<bool, E> {
    if left.len() != right.len() {
        return Ok(false);
    }

    let mut buckets: HashMap<u64, Vec<Option<T>>> = HashMap::with_capacity(left.len());
    for (hash, item) in left {
        buckets.entry(hash).or_default().push(Some(item));
    }

    for (hash, item) in &right {
        let Some(bucket) = buckets.get_mut(hash) else {
            return Ok(false);
        };

        let mut matched = None;
        for (index, candidate) in bucket.iter().enumerate() {
            if let Some(candidate) = candidate {
                if equals(item, candidate)? {
                    matched = Some(index);
                    break;
                }
            }
        }

        match matched {
            Some(index) => bucket[index] = None,
            None => return Ok(false),
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn eq(a: &&str, b: &&str) -> Result<bool, Infallible> {
        Ok(a == b)
    }

    fn same_hash(items: &[&'static str]) -> Vec<(u64, &'static str)> {
        items.iter().map(|s| (1, *s)).collect()
    }

    #[test]
    fn permutations_match() {
        let left = vec![(1, "a"), (2, "b"), (3, "c")];
        let right = vec![(3, "c"), (1, "a"), (2, "b")];
        assert_eq!(multiset_equals(left, right, eq), Ok(true));
    }

    #[test]
    fn size_mismatch_fails_fast() {
        let calls = std::cell::Cell::new(0);
        let result = multiset_equals(same_hash(&["a"]), same_hash(&["a", "a"]), |a, b| {
            calls.set(calls.get() + 1);
            eq(a, b)
        });
        assert_eq!(result, Ok(false));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn colliding_hashes_are_matched_structurally() {
        let left = same_hash(&["alpha", "bravo", "charlie"]);
        let right = same_hash(&["bravo", "alpha", "charlie"]);
        assert_eq!(multiset_equals(left, right, eq), Ok(true));

        let left = same_hash(&["alpha", "bravo", "charlie"]);
        let right = same_hash(&["bravo", "alpha", "delta"]);
        assert_eq!(multiset_equals(left, right, eq), Ok(false));
    }

    #[test]
    fn each_candidate_is_consumed_once() {
        let left = same_hash(&["alpha", "alpha", "alpha", "alpha"]);
        let right = same_hash(&["alpha", "bravo", "charlie", "delta"]);
        assert_eq!(multiset_equals(left, right, eq), Ok(false));

        let left = same_hash(&["alpha", "bravo"]);
        let right = same_hash(&["alpha", "alpha"]);
        assert_eq!(multiset_equals(left, right, eq), Ok(false));
    }

    #[test]
    fn missing_bucket_fails() {
        let left = vec![(1, "a")];
        let right = vec![(2, "a")];
        assert_eq!(multiset_equals(left, right, eq), Ok(false));
    }

    #[test]
    fn comparison_errors_propagate() {
        let left = same_hash(&["a"]);
        let right = same_hash(&["a"]);
        let result: Result<bool, &str> = multiset_equals(left, right, |_, _| Err("unreadable"));
        assert_eq!(result, Err("unreadable"));
    }
}
