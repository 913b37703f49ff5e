//! Deep equality engine.
//!
//! [`DeepEquals`] holds only configuration. Every top-level call builds a fresh
//! [`Traversal`] that owns the in-progress identity pairs, so one comparator
//! can be shared across threads without any locking.
//!
//! ## Algorithm (per pair)
//!
//! 1. Same identity: equal.
//! 2. Pair already in progress: equal (cycle break); otherwise record it.
//! 3. Follow transparent forwards (`Some`, pointers, cells, locks).
//! 4. `Null` only equals `Null`.
//! 5. Categories must match. Collections compare across container types of
//!    one category (`Vec` vs `VecDeque`); everything else requires the exact
//!    same type.
//! 6. Dispatch on the category.
//! 7. Forget the pair.

use std::collections::HashSet;

use crate::error::DeepResult;
use crate::hash::DeepHasher;
use crate::matcher::multiset_equals;
use crate::options::DeepEqualsOptions;
use crate::record::Composite;
use crate::shape::{Category, DeepValue, Elements, Entries, Identity, Shape, with_shape};

/// Compare `a` and `b` with default options.
pub fn is_deep_equals(a: &dyn DeepValue, b: &dyn DeepValue) -> DeepResult<bool> {
    DeepEquals::default().is_deep_equals(a, b)
}

/// Deep structural comparator.
#[derive(Debug, Clone, Default)]
pub struct DeepEquals {
    options: DeepEqualsOptions,
}

impl DeepEquals {
    pub fn new(options: DeepEqualsOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeepEqualsOptions {
        &self.options
    }

    pub fn set_ignore_custom_equals(&mut self, ignore: bool) {
        self.options.ignore_custom_equals = ignore;
    }

    /// Whether `a` and `b` are structurally equal.
    ///
    /// Total over readable values (including `None`, cycles, empty and
    /// mismatched containers). Fails only with an
    /// [`IntrospectionError`](crate::IntrospectionError) when some part of
    /// either graph cannot be read.
    pub fn is_deep_equals(&self, a: &dyn DeepValue, b: &dyn DeepValue) -> DeepResult<bool> {
        let mut traversal = Traversal::new(&self.options);
        let result = traversal.compare(a, b);
        if let Err(err) = &result {
            tracing::warn!(
                left = a.type_name(),
                right = b.type_name(),
                unreadable = err.type_name(),
                error = %err,
                "deep comparison aborted"
            );
        }
        result
    }

    /// Deep hash consistent with [`DeepEquals::is_deep_equals`] under these
    /// options.
    pub fn deep_hash(&self, value: &dyn DeepValue) -> DeepResult<u64> {
        DeepHasher::new(&self.options).hash(value)
    }
}

/// State of one top-level comparison.
///
/// Holds the identity pairs currently being compared. Lives for one call and
/// is never shared.
#[derive(Debug)]
pub struct Traversal<'o> {
    options: &'o DeepEqualsOptions,
    in_progress: HashSet<(Identity, Identity)>,
}

impl<'o> Traversal<'o> {
    pub fn new(options: &'o DeepEqualsOptions) -> Self {
        Self {
            options,
            in_progress: HashSet::new(),
        }
    }

    /// Number of `(left, right)` identity pairs whose comparison has started
    /// and not finished yet. Zero between top-level comparisons.
    pub fn in_progress_len(&self) -> usize {
        self.in_progress.len()
    }

    pub fn compare(&mut self, a: &dyn DeepValue, b: &dyn DeepValue) -> DeepResult<bool> {
        let pair = (Identity::of(a), Identity::of(b));
        if pair.0 == pair.1 {
            return Ok(true);
        }
        if !self.in_progress.insert(pair) {
            tracing::trace!(left = a.type_name(), "cycle detected, assuming equal");
            return Ok(true);
        }

        let result = with_shape(a, |left| match left {
            Shape::Indirect(inner) => self.compare(inner, b),
            left => with_shape(b, |right| match right {
                Shape::Indirect(inner) => self.compare(a, inner),
                right => self.compare_shapes(a, left, b, right),
            })?,
        })
        .and_then(|inner| inner);

        self.in_progress.remove(&pair);
        result
    }

    fn compare_shapes(
        &mut self,
        a: &dyn DeepValue,
        left: Shape<'_>,
        b: &dyn DeepValue,
        right: Shape<'_>,
    ) -> DeepResult<bool> {
        let (Some(left_category), Some(right_category)) = (left.category(), right.category())
        else {
            return Ok(false);
        };
        if left_category != right_category {
            tracing::trace!(?left_category, ?right_category, "category mismatch");
            return Ok(false);
        }
        if left_category == Category::Null {
            return Ok(true);
        }
        if !left_category.is_collection() && a.type_key() != b.type_key() {
            tracing::trace!(
                left = a.type_name(),
                right = b.type_name(),
                "type mismatch"
            );
            return Ok(false);
        }

        match (left, right) {
            (Shape::Scalar(x), Shape::Scalar(y)) | (Shape::Atomic(x), Shape::Atomic(y)) => {
                Ok(x.deep_equals(&y))
            }
            (Shape::Array(x), Shape::Array(y)) | (Shape::Unordered(x), Shape::Unordered(y)) => {
                self.compare_unordered(x, y)
            }
            (Shape::Ordered(x), Shape::Ordered(y)) | (Shape::Sorted(x), Shape::Sorted(y)) => {
                self.compare_ordered(x, y)
            }
            (Shape::SortedMap(x), Shape::SortedMap(y)) => self.compare_sorted_maps(x, y),
            (Shape::UnorderedMap(x), Shape::UnorderedMap(y)) => self.compare_unordered_maps(x, y),
            (Shape::Composite(x), Shape::Composite(y)) => self.compare_records(x, y),
            _ => Ok(false),
        }
    }

    fn compare_ordered(&mut self, left: Elements<'_>, right: Elements<'_>) -> DeepResult<bool> {
        if left.len() != right.len() {
            return Ok(false);
        }
        for (l, r) in left.into_iter().zip(right) {
            if !self.compare(l, r)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn compare_unordered(&mut self, left: Elements<'_>, right: Elements<'_>) -> DeepResult<bool> {
        if left.len() != right.len() {
            return Ok(false);
        }
        let mut hasher = DeepHasher::new(self.options);
        let left = hash_elements(&mut hasher, left)?;
        let right = hash_elements(&mut hasher, right)?;

        multiset_equals(left, right, |r, candidate| self.compare(*r, *candidate))
    }

    fn compare_sorted_maps(&mut self, left: Entries<'_>, right: Entries<'_>) -> DeepResult<bool> {
        if left.len() != right.len() {
            return Ok(false);
        }
        for ((lk, lv), (rk, rv)) in left.into_iter().zip(right) {
            if !self.compare(lk, rk)? || !self.compare(lv, rv)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn compare_unordered_maps(
        &mut self,
        left: Entries<'_>,
        right: Entries<'_>,
    ) -> DeepResult<bool> {
        if left.len() != right.len() {
            return Ok(false);
        }
        let mut hasher = DeepHasher::new(self.options);
        let left = hash_entries(&mut hasher, left)?;
        let right = hash_entries(&mut hasher, right)?;

        multiset_equals(left, right, |(rk, rv), (ck, cv)| {
            Ok(self.compare(*rk, *ck)? && self.compare(*rv, *cv)?)
        })
    }

    fn compare_records(&mut self, left: &dyn Composite, right: &dyn Composite) -> DeepResult<bool> {
        if !self.options.ignore_custom_equals && left.has_custom_equals() {
            if let Some(equal) = left.custom_equals(right) {
                tracing::debug!(record = left.record_name(), equal, "used custom equality");
                return Ok(equal);
            }
        }

        let (left_fields, right_fields) = (left.fields(), right.fields());
        if left_fields.len() != right_fields.len() {
            return Ok(false);
        }
        for (l, r) in left_fields.iter().zip(&right_fields) {
            if !self.compare(l.value, r.value)? {
                tracing::trace!(record = left.record_name(), field = l.name, "field mismatch");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn hash_elements<'a>(
    hasher: &mut DeepHasher,
    items: Elements<'a>,
) -> DeepResult<Vec<(u64, &'a dyn DeepValue)>> {
    let mut hashed = Vec::with_capacity(items.len());
    for item in items {
        hashed.push((hasher.hash(item)?, item));
    }
    Ok(hashed)
}

fn hash_entries<'a>(
    hasher: &mut DeepHasher,
    entries: Entries<'a>,
) -> DeepResult<Vec<(u64, (&'a dyn DeepValue, &'a dyn DeepValue))>> {
    let mut hashed = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        hashed.push((hasher.hash_entry(key, value)?, (key, value)));
    }
    Ok(hashed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Node {
        value: i32,
        next: RefCell<Option<Rc<Node>>>,
    }

    impl crate::Record for Node {
        const FIELDS: &'static [crate::FieldDescriptor<Self>] = crate::fields![value, next];
    }

    crate::impl_record_value!(Node);

    fn ring(values: &[i32]) -> Rc<Node> {
        let nodes: Vec<Rc<Node>> = values
            .iter()
            .map(|v| {
                Rc::new(Node {
                    value: *v,
                    next: RefCell::new(None),
                })
            })
            .collect();
        for (i, node) in nodes.iter().enumerate() {
            *node.next.borrow_mut() = Some(Rc::clone(&nodes[(i + 1) % nodes.len()]));
        }
        Rc::clone(&nodes[0])
    }

    fn unlink(head: &Rc<Node>) {
        let mut next = head.next.borrow_mut().take();
        while let Some(node) = next {
            next = node.next.borrow_mut().take();
        }
    }

    #[test]
    fn traversal_state_is_released() {
        let options = DeepEqualsOptions::default();
        let mut traversal = Traversal::new(&options);
        assert!(traversal.compare(&vec![vec![1], vec![2]], &vec![vec![1], vec![2]]).unwrap());
        assert_eq!(traversal.in_progress_len(), 0);
        assert!(!traversal.compare(&vec![1], &vec![2]).unwrap());
        assert_eq!(traversal.in_progress_len(), 0);
    }

    #[test]
    fn cyclic_graphs_terminate() {
        let a = ring(&[1, 2, 3]);
        let b = ring(&[1, 2, 3]);
        let c = ring(&[1, 2, 4]);

        assert!(is_deep_equals(&a, &a).unwrap());
        assert!(is_deep_equals(&a, &b).unwrap());
        assert!(!is_deep_equals(&a, &c).unwrap());
        assert_eq!(crate::deep_hash(&a).unwrap(), crate::deep_hash(&b).unwrap());

        for head in [&a, &b, &c] {
            unlink(head);
        }
    }

    #[test]
    fn rings_with_the_same_unrolling_hash_alike() {
        let one = ring(&[1]);
        let two = ring(&[1, 1]);
        let other = ring(&[1, 2]);

        assert!(is_deep_equals(&one, &two).unwrap());
        assert_eq!(crate::deep_hash(&one).unwrap(), crate::deep_hash(&two).unwrap());
        assert!(is_deep_equals(&[Rc::clone(&one)], &[Rc::clone(&two)]).unwrap());
        assert!(!is_deep_equals(&[Rc::clone(&one)], &[Rc::clone(&other)]).unwrap());

        for head in [&one, &two, &other] {
            unlink(head);
        }
    }

    #[test]
    fn introspection_failures_propagate() {
        let a = RefCell::new(vec![1]);
        let b = RefCell::new(vec![1]);
        let _writer = b.borrow_mut();
        let err = is_deep_equals(&a, &b).unwrap_err();
        assert!(matches!(err, crate::IntrospectionError::Borrowed { .. }));
        assert_eq!(err.type_name(), core::any::type_name::<RefCell<Vec<i32>>>());
    }

    #[test]
    fn shared_comparator_across_threads() {
        let comparator = DeepEquals::default();
        let left: Vec<Vec<u32>> = (0..64).map(|i| vec![i; 8]).collect();
        let right = left.clone();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..16 {
                        assert!(comparator.is_deep_equals(&left, &right).unwrap());
                    }
                });
            }
        });
    }
}
