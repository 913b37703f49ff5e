//! Composite records: field introspection and custom equality capability.
//!
//! A record declares its comparable state once, as an associated constant of
//! `(name, accessor)` pairs. There is no inheritance in Rust; a record that
//! extends another one embeds it and points at it through [`Record::PARENT`],
//! whose fields are then reported first, exactly like inherited fields.
//!
//! ## Declaring a record
//!
//! ```ignore
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl Person {
//!     fn same_name(a: &Self, b: &Self) -> bool {
//!         a.name == b.name
//!     }
//! }
//!
//! impl Record for Person {
//!     const FIELDS: &'static [FieldDescriptor<Self>] = &[
//!         FieldDescriptor::<Self>::new("name", |p| &p.name),
//!         FieldDescriptor::<Self>::new("age", |p| &p.age),
//!     ];
//!     const EQUALS: Option<fn(&Self, &Self) -> bool> = Some(Person::same_name);
//! }
//!
//! impl_record_value!(Person);
//! ```
//!
//! [`fields!`](crate::fields) shortens the field list to `fields![name, age]`.

use core::any::Any;

use crate::shape::DeepValue;

/// Name and accessor of one comparable field of `T`.
pub struct FieldDescriptor<T: ?Sized> {
    name: &'static str,
    get: fn(&T) -> &dyn DeepValue,
}

impl<T: ?Sized> FieldDescriptor<T> {
    pub const fn new(name: &'static str, get: fn(&T) -> &dyn DeepValue) -> Self {
        Self { name, get }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<'a>(&self, value: &'a T) -> &'a dyn DeepValue {
        (self.get)(value)
    }
}

impl<T: ?Sized> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for FieldDescriptor<T> {}

impl<T: ?Sized> core::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldDescriptor").field("name", &self.name).finish()
    }
}

/// The embedded record a record "extends".
pub struct Parent<T: ?Sized> {
    get: fn(&T) -> &dyn Composite,
    has_custom_equals: fn() -> bool,
    has_custom_hash: fn() -> bool,
}

impl<T: ?Sized> Parent<T> {
    /// `get` must return the embedded `P`.
    pub const fn of<P: Record>(get: fn(&T) -> &dyn Composite) -> Self {
        Self {
            get,
            has_custom_equals: has_custom_equals::<P>,
            has_custom_hash: has_custom_hash::<P>,
        }
    }

    pub fn get<'a>(&self, value: &'a T) -> &'a dyn Composite {
        (self.get)(value)
    }
}

impl<T: ?Sized> Clone for Parent<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Parent<T> {}

/// A type compared by its fields.
pub trait Record: Any + Sized {
    /// Fields declared by this type, in comparison order.
    const FIELDS: &'static [FieldDescriptor<Self>];

    /// Embedded ancestor, whose fields come before [`Record::FIELDS`].
    const PARENT: Option<Parent<Self>> = None;

    /// The type's own equality. Honored unless `ignore_custom_equals` is set.
    const EQUALS: Option<fn(&Self, &Self) -> bool> = None;

    /// The type's own hash. Must agree with [`Record::EQUALS`].
    const HASH: Option<fn(&Self) -> u64> = None;
}

/// Whether `T` or one of its ancestors defines its own equality.
pub fn has_custom_equals<T: Record>() -> bool {
    T::EQUALS.is_some() || T::PARENT.is_some_and(|parent| (parent.has_custom_equals)())
}

/// Whether `T` or one of its ancestors defines its own hash.
pub fn has_custom_hash<T: Record>() -> bool {
    T::HASH.is_some() || T::PARENT.is_some_and(|parent| (parent.has_custom_hash)())
}

/// One field value of a record instance.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    pub name: &'static str,
    pub value: &'a dyn DeepValue,
}

/// Type-erased view of a [`Record`], as handed to the engine by
/// [`Shape::Composite`](crate::Shape::Composite).
pub trait Composite {
    fn record_name(&self) -> &'static str;

    /// Field values, ancestors first.
    fn fields(&self) -> Vec<Field<'_>>;

    fn has_custom_equals(&self) -> bool;

    fn has_custom_hash(&self) -> bool;

    /// Result of the type's own equality, `None` if there is none or `other`
    /// is a different type.
    fn custom_equals(&self, other: &dyn Composite) -> Option<bool>;

    fn custom_hash(&self) -> Option<u64>;

    fn as_any(&self) -> &dyn Any;
}

impl<T: Record> Composite for T {
    fn record_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }

    fn fields(&self) -> Vec<Field<'_>> {
        let mut fields = match T::PARENT {
            Some(parent) => parent.get(self).fields(),
            None => Vec::with_capacity(T::FIELDS.len()),
        };
        fields.extend(T::FIELDS.iter().map(|descriptor| Field {
            name: descriptor.name(),
            value: descriptor.get(self),
        }));
        fields
    }

    fn has_custom_equals(&self) -> bool {
        has_custom_equals::<T>()
    }

    fn has_custom_hash(&self) -> bool {
        has_custom_hash::<T>()
    }

    fn custom_equals(&self, other: &dyn Composite) -> Option<bool> {
        let other = other.as_any().downcast_ref::<T>()?;
        if let Some(equals) = T::EQUALS {
            return Some(equals(self, other));
        }
        // Inherited equality only sees the ancestor's part.
        let parent = T::PARENT?;
        parent.get(self).custom_equals(parent.get(other))
    }

    fn custom_hash(&self) -> Option<u64> {
        if let Some(hash) = T::HASH {
            return Some(hash(self));
        }
        let parent = T::PARENT?;
        parent.get(self).custom_hash()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Field descriptors for the named fields of `Self`, for use in
/// [`Record::FIELDS`]. Tuple fields are written by index (`fields![0, 1]`).
#[macro_export]
macro_rules! fields {
    ($($field:tt),* $(,)?) => {
        &[$($crate::FieldDescriptor::<Self>::new(stringify!($field), |record| &record.$field)),*]
    };
}

/// Implement [`DeepValue`] for record types as [`Shape::Composite`](crate::Shape::Composite).
#[macro_export]
macro_rules! impl_record_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::DeepValue for $ty {
                fn visit(
                    &self,
                    visitor: &mut dyn FnMut($crate::Shape<'_>),
                ) -> $crate::DeepResult<()> {
                    visitor($crate::Shape::Composite(self));
                    Ok(())
                }
            }
        )+
    };
}
