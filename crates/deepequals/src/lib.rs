//! Deep structural equality and hashing for object graphs.
//!
//! Two values are deep-equal when they have the same shape and the same
//! content, recursively, regardless of where they live in memory. Graphs may
//! contain cycles and shared nodes; both comparison and hashing terminate.
//!
//! - [`is_deep_equals`] / [`DeepEquals::is_deep_equals`] compare two graphs.
//! - [`deep_hash`] / [`DeepEquals::deep_hash`] hash a graph consistently with
//!   the comparison under the same options.
//! - [`DeepValue`] describes how a type is traversed. The standard scalars,
//!   containers, smart pointers, cells and locks are covered here; record types
//!   implement [`Record`] and use [`impl_record_value!`].

pub mod engine;
pub mod error;
pub mod hash;
pub mod impls;
pub mod matcher;
pub mod options;
pub mod record;
pub mod shape;

mod assert;

pub use engine::{DeepEquals, Traversal, is_deep_equals};
pub use error::{ConfigError, DeepResult, IntrospectionError};
pub use hash::{DeepHasher, MAX_HASH_DEPTH, deep_hash};
pub use impls::AsDeepValue;
pub use matcher::multiset_equals;
pub use options::{DeepEqualsOptions, IGNORE_CUSTOM_EQUALS_ENV};
pub use record::{
    Composite, Field, FieldDescriptor, Parent, Record, has_custom_equals, has_custom_hash,
};
pub use shape::{
    Category, DeepValue, Elements, Entries, F32_EPSILON, F64_EPSILON, Identity, Scalar, Shape,
    TypeIdentity, classify, with_shape,
};

#[doc(hidden)]
pub use assert::{deep_eq_or_panic, deep_ne_or_panic};
