//! `DeepValue` implementations for std and third-party types.
//!
//! Wrappers (`Option`, smart pointers, cells, locks) forward with
//! [`Shape::Indirect`] so that classification sees through them: a
//! `Mutex<BTreeMap<_, _>>` is still a sorted map.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{
    AtomicBool, AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU16,
    AtomicU32, AtomicU64, AtomicUsize, Ordering,
};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::error::{DeepResult, IntrospectionError};
use crate::shape::{DeepValue, Elements, Entries, Scalar, Shape};

fn elements<'a, T: DeepValue>(items: impl Iterator<Item = &'a T>) -> Elements<'a> {
    items.map(|item| item as &dyn DeepValue).collect()
}

fn entries<'a, K: DeepValue, V: DeepValue>(
    items: impl Iterator<Item = (&'a K, &'a V)>,
) -> Entries<'a> {
    items
        .map(|(k, v)| (k as &dyn DeepValue, v as &dyn DeepValue))
        .collect()
}

macro_rules! scalar_value {
    ($($ty:ty => |$v:ident| $scalar:expr),+ $(,)?) => {
        $(
            impl DeepValue for $ty {
                fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
                    let $v = self;
                    visitor(Shape::Scalar($scalar));
                    Ok(())
                }
            }
        )+
    };
}

scalar_value! {
    bool => |v| Scalar::Bool(*v),
    char => |v| Scalar::Char(*v),
    i8 => |v| Scalar::Int(i128::from(*v)),
    i16 => |v| Scalar::Int(i128::from(*v)),
    i32 => |v| Scalar::Int(i128::from(*v)),
    i64 => |v| Scalar::Int(i128::from(*v)),
    i128 => |v| Scalar::Int(*v),
    isize => |v| Scalar::Int(*v as i128),
    u8 => |v| Scalar::UInt(u128::from(*v)),
    u16 => |v| Scalar::UInt(u128::from(*v)),
    u32 => |v| Scalar::UInt(u128::from(*v)),
    u64 => |v| Scalar::UInt(u128::from(*v)),
    u128 => |v| Scalar::UInt(*v),
    usize => |v| Scalar::UInt(*v as u128),
    f32 => |v| Scalar::F32(*v),
    f64 => |v| Scalar::F64(*v),
    String => |v| Scalar::Str(v.as_str()),
    &'static str => |v| Scalar::Str(v),
    Cow<'static, str> => |v| Scalar::Str(v),
    Duration => |v| Scalar::Duration(v.as_nanos()),
    SystemTime => |v| Scalar::Timestamp(system_time_nanos(*v)),
    DateTime<Utc> => |v| Scalar::Timestamp(epoch_nanos(v.timestamp(), v.timestamp_subsec_nanos())),
    DateTime<FixedOffset> => |v| Scalar::Timestamp(epoch_nanos(v.timestamp(), v.timestamp_subsec_nanos())),
    NaiveDateTime => |v| Scalar::Timestamp(epoch_nanos(
        v.and_utc().timestamp(),
        v.and_utc().timestamp_subsec_nanos(),
    )),
    NaiveDate => |v| Scalar::Date(v.num_days_from_ce()),
    uuid::Uuid => |v| Scalar::Bytes(v.as_bytes()),
}

fn epoch_nanos(secs: i64, subsec_nanos: u32) -> i128 {
    i128::from(secs) * 1_000_000_000 + i128::from(subsec_nanos)
}

fn system_time_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    }
}

macro_rules! atomic_value {
    ($($ty:ty => |$v:ident| $scalar:expr),+ $(,)?) => {
        $(
            impl DeepValue for $ty {
                fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
                    let $v = self.load(Ordering::SeqCst);
                    visitor(Shape::Atomic($scalar));
                    Ok(())
                }
            }
        )+
    };
}

atomic_value! {
    AtomicBool => |v| Scalar::Bool(v),
    AtomicI8 => |v| Scalar::Int(i128::from(v)),
    AtomicI16 => |v| Scalar::Int(i128::from(v)),
    AtomicI32 => |v| Scalar::Int(i128::from(v)),
    AtomicI64 => |v| Scalar::Int(i128::from(v)),
    AtomicIsize => |v| Scalar::Int(v as i128),
    AtomicU8 => |v| Scalar::UInt(u128::from(v)),
    AtomicU16 => |v| Scalar::UInt(u128::from(v)),
    AtomicU32 => |v| Scalar::UInt(u128::from(v)),
    AtomicU64 => |v| Scalar::UInt(u128::from(v)),
    AtomicUsize => |v| Scalar::UInt(v as u128),
}

impl<T: DeepValue> DeepValue for Option<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        match self {
            Some(value) => visitor(Shape::Indirect(value)),
            None => visitor(Shape::Null),
        }
        Ok(())
    }
}

/// Conversion to `&dyn DeepValue` that also works when the pointee of a smart
/// pointer is already a trait object (`Box<dyn DeepValue>`).
pub trait AsDeepValue {
    fn as_deep_value(&self) -> &dyn DeepValue;
}

impl<T: DeepValue> AsDeepValue for T {
    fn as_deep_value(&self) -> &dyn DeepValue {
        self
    }
}

impl AsDeepValue for dyn DeepValue {
    fn as_deep_value(&self) -> &dyn DeepValue {
        self
    }
}

macro_rules! pointer_value {
    ($($ptr:ident),+) => {
        $(
            impl<T: AsDeepValue + ?Sized + 'static> DeepValue for $ptr<T> {
                fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
                    visitor(Shape::Indirect((**self).as_deep_value()));
                    Ok(())
                }
            }
        )+
    };
}

pointer_value!(Box, Rc, Arc);

impl<T: DeepValue> DeepValue for RefCell<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        let guard = self
            .try_borrow()
            .map_err(|_| IntrospectionError::borrowed::<Self>())?;
        visitor(Shape::Indirect(&*guard));
        Ok(())
    }
}

impl<T: DeepValue> DeepValue for Mutex<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        let guard = match self.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(IntrospectionError::locked::<Self>()),
            Err(TryLockError::Poisoned(_)) => return Err(IntrospectionError::poisoned::<Self>()),
        };
        visitor(Shape::Indirect(&*guard));
        Ok(())
    }
}

impl<T: DeepValue> DeepValue for RwLock<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        let guard = match self.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(IntrospectionError::locked::<Self>()),
            Err(TryLockError::Poisoned(_)) => return Err(IntrospectionError::poisoned::<Self>()),
        };
        visitor(Shape::Indirect(&*guard));
        Ok(())
    }
}

impl<T: DeepValue, const N: usize> DeepValue for [T; N] {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Array(elements(self.iter())));
        Ok(())
    }
}

impl<T: DeepValue> DeepValue for Vec<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Ordered(elements(self.iter())));
        Ok(())
    }
}

impl<T: DeepValue> DeepValue for VecDeque<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Ordered(elements(self.iter())));
        Ok(())
    }
}

impl<T: DeepValue> DeepValue for LinkedList<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Ordered(elements(self.iter())));
        Ok(())
    }
}

impl<T: DeepValue> DeepValue for BTreeSet<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Sorted(elements(self.iter())));
        Ok(())
    }
}

impl<T: DeepValue, S: 'static> DeepValue for HashSet<T, S> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Unordered(elements(self.iter())));
        Ok(())
    }
}

// Heap iteration order is an implementation detail.
impl<T: DeepValue> DeepValue for BinaryHeap<T> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::Unordered(elements(self.iter())));
        Ok(())
    }
}

impl<K: DeepValue, V: DeepValue> DeepValue for BTreeMap<K, V> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::SortedMap(entries(self.iter())));
        Ok(())
    }
}

impl<K: DeepValue, V: DeepValue, S: 'static> DeepValue for HashMap<K, V, S> {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        visitor(Shape::UnorderedMap(entries(self.iter())));
        Ok(())
    }
}

/// JSON documents: objects are unordered maps, arrays are ordered.
impl DeepValue for serde_json::Value {
    fn visit(&self, visitor: &mut dyn FnMut(Shape<'_>)) -> DeepResult<()> {
        use serde_json::Value;

        let shape = match self {
            Value::Null => Shape::Null,
            Value::Bool(b) => Shape::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => Shape::Scalar(json_number(n)),
            Value::String(s) => Shape::Scalar(Scalar::Str(s)),
            Value::Array(items) => Shape::Ordered(elements(items.iter())),
            Value::Object(map) => Shape::UnorderedMap(
                map.iter()
                    .map(|(k, v)| (k as &dyn DeepValue, v as &dyn DeepValue))
                    .collect(),
            ),
        };
        visitor(shape);
        Ok(())
    }
}

fn json_number(n: &serde_json::Number) -> Scalar<'static> {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i128::from(i))
    } else if let Some(u) = n.as_u64() {
        Scalar::Int(i128::from(u))
    } else {
        Scalar::F64(n.as_f64().unwrap_or(f64::NAN))
    }
}
