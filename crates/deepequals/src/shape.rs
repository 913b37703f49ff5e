//! Value shapes and the closed set of comparison categories.
//!
//! Every comparable type implements [`DeepValue`] and describes itself as a
//! [`Shape`]: a scalar, a container with a declared capability (ordered,
//! sorted, unordered, keyed), an array, a composite record, or a transparent
//! forward to another value. The engine and the hasher switch on shapes
//! exhaustively; nothing is decided from concrete type lists.

use core::any::{Any, TypeId};

use crate::error::{DeepResult, IntrospectionError};
use crate::record::Composite;

/// Concrete type information for any `'static` value.
///
/// Blanket-implemented for every `T: Any`; through `dyn DeepValue` it reports
/// the erased concrete type.
pub trait TypeIdentity: Any {
    fn type_key(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> TypeIdentity for T {
    fn type_key(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

/// A value that can take part in deep comparison and deep hashing.
///
/// `visit` must call `visitor` exactly once with the value's shape, unless it
/// fails to read its own state, in which case it returns the error without
/// calling the visitor. The callback style lets guard-based wrappers
/// (`RefCell`, `Mutex`, `RwLock`) hand out references that live only as long
/// as the guard.
///
/// ```ignore
/// impl DeepValue for Meters {
///     fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
///         visitor(Shape::Scalar(Scalar::F64(self.0)));
///         Ok(())
///     }
/// }
/// ```
pub trait DeepValue: TypeIdentity {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()>;
}

/// Borrowed elements of a container, in iteration order.
pub type Elements<'a> = Vec<&'a dyn DeepValue>;

/// Borrowed `(key, value)` entries of a map, in iteration order.
pub type Entries<'a> = Vec<(&'a dyn DeepValue, &'a dyn DeepValue)>;

/// How a value presents itself to the comparator.
pub enum Shape<'a> {
    /// Absent value (`None`, JSON `null`).
    Null,
    /// A primitive compared by value.
    Scalar(Scalar<'a>),
    /// A box around a single primitive (atomics); compared by contained value.
    Atomic(Scalar<'a>),
    /// Fixed-size array; compared as a multiset of elements.
    Array(Elements<'a>),
    /// Sequence whose order is meaningful (`Vec`, `VecDeque`, ...).
    Ordered(Elements<'a>),
    /// Collection iterated in element order (`BTreeSet`).
    Sorted(Elements<'a>),
    /// Collection with no reliable iteration order (`HashSet`).
    Unordered(Elements<'a>),
    /// Map iterated in key order (`BTreeMap`).
    SortedMap(Entries<'a>),
    /// Map with no reliable iteration order (`HashMap`).
    UnorderedMap(Entries<'a>),
    /// A record compared field by field (or by its own equality).
    Composite(&'a dyn Composite),
    /// Transparent forward to another value (`Some`, `Box`, `Rc`, cells, locks).
    Indirect(&'a dyn DeepValue),
}

impl Shape<'_> {
    /// Category of this shape, or `None` for an unresolved [`Shape::Indirect`].
    pub fn category(&self) -> Option<Category> {
        let category = match self {
            Shape::Null => Category::Null,
            Shape::Scalar(_) => Category::Scalar,
            Shape::Atomic(_) => Category::Atomic,
            Shape::Array(_) => Category::Array,
            Shape::Ordered(_) => Category::Ordered,
            Shape::Sorted(_) => Category::Sorted,
            Shape::Unordered(_) => Category::Unordered,
            Shape::SortedMap(_) => Category::SortedMap,
            Shape::UnorderedMap(_) => Category::UnorderedMap,
            Shape::Composite(_) => Category::Composite,
            Shape::Indirect(_) => return None,
        };
        Some(category)
    }
}

/// Closed set of comparison categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Null,
    Scalar,
    Atomic,
    Array,
    Ordered,
    Sorted,
    Unordered,
    SortedMap,
    UnorderedMap,
    Composite,
}

impl Category {
    /// Collections and maps compare across concrete container types of the
    /// same category; every other category requires the exact same type.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Category::Ordered
                | Category::Sorted
                | Category::Unordered
                | Category::SortedMap
                | Category::UnorderedMap
        )
    }
}

/// Primitive values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Bool(bool),
    Char(char),
    Int(i128),
    UInt(u128),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    /// Nanoseconds since the Unix epoch.
    Timestamp(i128),
    /// Days since 0001-01-01 (proleptic Gregorian).
    Date(i32),
    /// Nanoseconds.
    Duration(u128),
    /// A named constant of an enumeration.
    Constant(&'static str),
}

/// Relative tolerance for `f64` comparison (absolute below magnitude 1.0).
pub const F64_EPSILON: f64 = 1e-12;

/// Relative tolerance for `f32` comparison (absolute below magnitude 1.0).
pub const F32_EPSILON: f32 = 1e-6;

impl Scalar<'_> {
    /// Value equality; floats compare within [`F64_EPSILON`] / [`F32_EPSILON`].
    pub fn deep_equals(&self, other: &Scalar<'_>) -> bool {
        match (self, other) {
            (Scalar::F64(a), Scalar::F64(b)) => nearly_equal_f64(*a, *b),
            (Scalar::F32(a), Scalar::F32(b)) => nearly_equal_f32(*a, *b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Char(a), Scalar::Char(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::UInt(a), Scalar::UInt(b)) => a == b,
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Bytes(a), Scalar::Bytes(b)) => a == b,
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a == b,
            (Scalar::Date(a), Scalar::Date(b)) => a == b,
            (Scalar::Duration(a), Scalar::Duration(b)) => a == b,
            (Scalar::Constant(a), Scalar::Constant(b)) => a == b,
            _ => false,
        }
    }
}

fn nearly_equal_f64(a: f64, b: f64) -> bool {
    if a == b || (a.is_nan() && b.is_nan()) {
        return true;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= F64_EPSILON * scale
}

fn nearly_equal_f32(a: f32, b: f32) -> bool {
    if a == b || (a.is_nan() && b.is_nan()) {
        return true;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= F32_EPSILON * scale
}

/// Identity of a value during one traversal: its address and concrete type.
///
/// The type component keeps a struct apart from its first field, which lives
/// at the same address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    addr: usize,
    type_key: TypeId,
}

impl Identity {
    pub fn of(value: &dyn DeepValue) -> Self {
        Self {
            addr: value as *const dyn DeepValue as *const () as usize,
            type_key: value.type_key(),
        }
    }
}

/// Run `f` with the shape of `value`.
pub fn with_shape<R>(value: &dyn DeepValue, f: impl FnOnce(Shape<'_>) -> R) -> DeepResult<R> {
    let mut f = Some(f);
    let mut out = None;
    value.visit(&mut |shape| {
        if let Some(f) = f.take() {
            out = Some(f(shape));
        }
    })?;
    out.ok_or_else(|| IntrospectionError::no_shape(value.type_name()))
}

/// Classify `value`, following transparent forwards (`Some`, smart pointers,
/// cells, locks) to the value that actually carries the shape.
///
/// `None` classifies as [`Category::Null`]. Fails only when a wrapper cannot be
/// read (see [`IntrospectionError`]).
pub fn classify(value: &dyn DeepValue) -> DeepResult<Category> {
    with_shape(value, |shape| match shape {
        Shape::Indirect(inner) => classify(inner),
        other => other.category().ok_or_else(|| IntrospectionError::no_shape(value.type_name())),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    #[test]
    fn classifies_by_capability() {
        assert_eq!(classify(&1i32).unwrap(), Category::Scalar);
        assert_eq!(classify(&"x".to_string()).unwrap(), Category::Scalar);
        assert_eq!(classify(&vec![1, 2]).unwrap(), Category::Ordered);
        assert_eq!(classify(&VecDeque::from([1])).unwrap(), Category::Ordered);
        assert_eq!(classify(&[1, 2, 3]).unwrap(), Category::Array);
        assert_eq!(classify(&BTreeSet::from([1])).unwrap(), Category::Sorted);
        assert_eq!(classify(&HashSet::from([1])).unwrap(), Category::Unordered);
        assert_eq!(classify(&BTreeMap::from([(1, 2)])).unwrap(), Category::SortedMap);
        assert_eq!(classify(&HashMap::from([(1, 2)])).unwrap(), Category::UnorderedMap);
        assert_eq!(
            classify(&std::sync::atomic::AtomicI64::new(3)).unwrap(),
            Category::Atomic
        );
    }

    #[test]
    fn none_is_null() {
        assert_eq!(classify(&None::<i32>).unwrap(), Category::Null);
        assert_eq!(classify(&Some(5u8)).unwrap(), Category::Scalar);
    }

    #[test]
    fn decorated_sorted_map_is_still_sorted() {
        let map = Mutex::new(BTreeMap::from([("a", 1)]));
        assert_eq!(classify(&map).unwrap(), Category::SortedMap);

        let set = std::rc::Rc::new(RefCell::new(BTreeSet::from([1])));
        assert_eq!(classify(&set).unwrap(), Category::Sorted);
    }

    #[test]
    fn mutably_borrowed_cell_fails_classification() {
        let cell = RefCell::new(vec![1]);
        let _guard = cell.borrow_mut();
        let err = classify(&cell).unwrap_err();
        assert!(matches!(err, IntrospectionError::Borrowed { .. }));
    }

    #[test]
    fn floats_compare_within_tolerance() {
        let x = (std::f64::consts::PI / 4.0).tan();
        assert!(Scalar::F64(x).deep_equals(&Scalar::F64(1.0)));
        assert!(!Scalar::F64(1.0).deep_equals(&Scalar::F64(1.000_001)));
        assert!(Scalar::F64(f64::NAN).deep_equals(&Scalar::F64(f64::NAN)));
        assert!(Scalar::F32(1.0f64.atan() as f32).deep_equals(&Scalar::F32(
            std::f32::consts::PI / 4.0
        )));
    }

    #[test]
    fn mismatched_scalar_kinds_are_unequal() {
        assert!(!Scalar::Int(1).deep_equals(&Scalar::F64(1.0)));
        assert!(!Scalar::Str("1").deep_equals(&Scalar::Int(1)));
    }

    #[test]
    fn identity_tells_container_from_first_element() {
        let array = [7u32, 8];
        let whole: &dyn DeepValue = &array;
        let first: &dyn DeepValue = &array[0];
        assert_eq!(
            whole as *const dyn DeepValue as *const () as usize,
            first as *const dyn DeepValue as *const () as usize
        );
        assert_ne!(Identity::of(whole), Identity::of(first));
        assert_eq!(Identity::of(whole), Identity::of(&array));
    }
}
