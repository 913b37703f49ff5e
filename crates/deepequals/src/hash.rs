//! Deep hash consistent with deep equality.
//!
//! `is_deep_equals(a, b)` implies `deep_hash(a) == deep_hash(b)`; the converse
//! does not hold and nothing relies on it.
//!
//! ## Combination rules
//!
//! - **Ordered** sequences fold element hashes polynomially, so reordering
//!   changes the hash.
//! - **Arrays** compare as multisets, so they use the order-independent sum.
//! - **Sets and maps**, sorted or not, sum mixed element (entry) hashes. A
//!   sorted container's order is a function of its content, so a sorted and a
//!   hashed container with the same content hash alike.
//! - **Records** fold field hashes in declared order. While custom equality is
//!   honored, a record that declares it hashes through its own `HASH`, or to a
//!   per-type constant when it has none.
//! - **Floats** compare within a tolerance, which no bucketing of their bits
//!   can respect, so every float of one width hashes to the same constant.
//!
//! ## Depth bound
//!
//! Hashing descends at most [`MAX_HASH_DEPTH`] container or record levels;
//! anything deeper contributes a constant. Deep equality follows cycles by
//! unrolling them, so two graphs it calls equal agree on every finite prefix
//! and therefore on the bounded hash. Transparent forwards (`Some`, pointers,
//! cells, locks) do not count as levels. A forward met again on the current
//! path is not visited a second time: its already resolved content is reused,
//! so a cycle through a `Mutex` never tries to lock it twice.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::error::DeepResult;
use crate::options::DeepEqualsOptions;
use crate::record::Composite;
use crate::shape::{DeepValue, Identity, Scalar, Shape, with_shape};

/// Container or record levels that contribute to a hash.
pub const MAX_HASH_DEPTH: usize = 10;

const NULL_HASH: u64 = 0x9e37_79b9_7f4a_7c15;
const DEPTH_LIMIT_HASH: u64 = 0xc2b2_ae3d_27d4_eb4f;
const ORDERED_SEED: u64 = 0x1656_67b1_9e37_79f9;
const ARRAY_SEED: u64 = 0x27d4_eb2f_1656_67c5;
const SET_SEED: u64 = 0x85eb_ca77_c2b2_ae63;
const MAP_SEED: u64 = 0xff51_afd7_ed55_8ccd;
const RECORD_SEED: u64 = 0xc4ce_b9fe_1a85_ec53;

/// Hash `value` with default options.
pub fn deep_hash(value: &dyn DeepValue) -> DeepResult<u64> {
    DeepHasher::new(&DeepEqualsOptions::default()).hash(value)
}

/// A transparent forward resolved further up the current path.
struct Resolved<'a> {
    forward: Identity,
    inner: &'a dyn DeepValue,
    /// Hasher depth when the forward was resolved.
    depth: usize,
    outer: Option<&'a Resolved<'a>>,
}

impl<'a> Resolved<'a> {
    fn find(&self, forward: Identity) -> Option<&Resolved<'a>> {
        let mut link = Some(self);
        while let Some(resolved) = link {
            if resolved.forward == forward {
                return Some(resolved);
            }
            link = resolved.outer;
        }
        None
    }
}

/// Reusable deep hasher.
#[derive(Debug)]
pub struct DeepHasher {
    honor_custom_equals: bool,
    depth: usize,
}

impl DeepHasher {
    pub fn new(options: &DeepEqualsOptions) -> Self {
        Self {
            honor_custom_equals: !options.ignore_custom_equals,
            depth: 0,
        }
    }

    pub fn hash(&mut self, value: &dyn DeepValue) -> DeepResult<u64> {
        self.hash_value(value, None)
    }

    /// Hash of one map entry; asymmetric in key and value.
    pub fn hash_entry(&mut self, key: &dyn DeepValue, value: &dyn DeepValue) -> DeepResult<u64> {
        self.hash_entry_in(key, value, None)
    }

    fn hash_value(
        &mut self,
        value: &dyn DeepValue,
        path: Option<&Resolved<'_>>,
    ) -> DeepResult<u64> {
        if self.depth >= MAX_HASH_DEPTH {
            return Ok(DEPTH_LIMIT_HASH);
        }
        let identity = Identity::of(value);
        if let Some(resolved) = path.and_then(|path| path.find(identity)) {
            // A loop made only of forwards never reaches content.
            if resolved.depth == self.depth {
                return Ok(DEPTH_LIMIT_HASH);
            }
            return self.hash_value(resolved.inner, path);
        }
        with_shape(value, |shape| match shape {
            Shape::Indirect(inner) => {
                let resolved = Resolved {
                    forward: identity,
                    inner,
                    depth: self.depth,
                    outer: path,
                };
                self.hash_value(inner, Some(&resolved))
            }
            shape => self.hash_shape(shape, path),
        })?
    }

    fn hash_child(
        &mut self,
        value: &dyn DeepValue,
        path: Option<&Resolved<'_>>,
    ) -> DeepResult<u64> {
        self.depth += 1;
        let result = self.hash_value(value, path);
        self.depth -= 1;
        result
    }

    fn hash_entry_in(
        &mut self,
        key: &dyn DeepValue,
        value: &dyn DeepValue,
        path: Option<&Resolved<'_>>,
    ) -> DeepResult<u64> {
        let key = self.hash_value(key, path)?;
        let value = self.hash_value(value, path)?;
        Ok(mix(key).wrapping_add(mix(value).rotate_left(29)))
    }

    fn hash_shape(&mut self, shape: Shape<'_>, path: Option<&Resolved<'_>>) -> DeepResult<u64> {
        match shape {
            Shape::Null => Ok(NULL_HASH),
            Shape::Indirect(inner) => self.hash_value(inner, path),
            Shape::Scalar(scalar) | Shape::Atomic(scalar) => Ok(hash_scalar(&scalar)),
            Shape::Ordered(items) => {
                let mut acc = ORDERED_SEED;
                for item in items {
                    acc = acc.wrapping_mul(31).wrapping_add(self.hash_child(item, path)?);
                }
                Ok(mix(acc))
            }
            Shape::Array(items) => {
                let count = items.len();
                let mut sum = 0u64;
                for item in items {
                    sum = sum.wrapping_add(mix(self.hash_child(item, path)?));
                }
                Ok(combine_unordered(ARRAY_SEED, sum, count))
            }
            Shape::Sorted(items) | Shape::Unordered(items) => {
                let count = items.len();
                let mut sum = 0u64;
                for item in items {
                    sum = sum.wrapping_add(mix(self.hash_child(item, path)?));
                }
                Ok(combine_unordered(SET_SEED, sum, count))
            }
            Shape::SortedMap(entries) | Shape::UnorderedMap(entries) => {
                let count = entries.len();
                let mut sum = 0u64;
                self.depth += 1;
                let mut result = Ok(());
                for (key, value) in entries {
                    match self.hash_entry_in(key, value, path) {
                        Ok(entry) => sum = sum.wrapping_add(mix(entry)),
                        Err(err) => {
                            result = Err(err);
                            break;
                        }
                    }
                }
                self.depth -= 1;
                result?;
                Ok(combine_unordered(MAP_SEED, sum, count))
            }
            Shape::Composite(record) => self.hash_record(record, path),
        }
    }

    fn hash_record(
        &mut self,
        record: &dyn Composite,
        path: Option<&Resolved<'_>>,
    ) -> DeepResult<u64> {
        if self.honor_custom_equals && record.has_custom_equals() {
            let custom = if record.has_custom_hash() {
                record.custom_hash()
            } else {
                None
            };
            return Ok(custom.unwrap_or_else(|| hash_of(record.record_name())));
        }
        let mut acc = RECORD_SEED;
        for field in record.fields() {
            acc = acc
                .wrapping_mul(31)
                .wrapping_add(self.hash_child(field.value, path)?);
        }
        Ok(mix(acc))
    }
}

fn combine_unordered(seed: u64, sum: u64, count: usize) -> u64 {
    mix(seed ^ sum ^ (count as u64).rotate_left(17))
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn hash_of(value: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn hash_scalar(scalar: &Scalar<'_>) -> u64 {
    match *scalar {
        Scalar::Bool(v) => hash_of((0u8, v)),
        Scalar::Char(v) => hash_of((1u8, v)),
        Scalar::Int(v) => hash_of((2u8, v)),
        Scalar::UInt(v) => hash_of((3u8, v)),
        Scalar::F32(_) => hash_of(4u8),
        Scalar::F64(_) => hash_of(5u8),
        Scalar::Str(v) => hash_of((6u8, v)),
        Scalar::Bytes(v) => hash_of((7u8, v)),
        Scalar::Timestamp(v) => hash_of((8u8, v)),
        Scalar::Date(v) => hash_of((9u8, v)),
        Scalar::Duration(v) => hash_of((10u8, v)),
        Scalar::Constant(v) => hash_of((11u8, v)),
    }
}
