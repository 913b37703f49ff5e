//! Error model for deep comparison.

use thiserror::Error;

/// Result type used across the comparison layer.
pub type DeepResult<T> = Result<T, IntrospectionError>;

/// A value could not be read while comparing or hashing it.
///
/// This is never a data inequality: it means the host environment denied access
/// to state the comparison needs (a `RefCell` held mutably, a lock held by
/// someone else, ...). It is propagated to the caller as-is and not retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntrospectionError {
    /// A `RefCell` was mutably borrowed while we tried to read it.
    #[error("`{type_name}` is mutably borrowed")]
    Borrowed { type_name: &'static str },

    /// A lock is held elsewhere; we never block on it.
    #[error("`{type_name}` is locked elsewhere")]
    Locked { type_name: &'static str },

    /// A lock was poisoned by a panicking writer.
    #[error("`{type_name}` is poisoned")]
    Poisoned { type_name: &'static str },

    /// A `DeepValue` implementation returned without describing its shape.
    #[error("`{type_name}` did not describe its shape")]
    NoShape { type_name: &'static str },
}

impl IntrospectionError {
    pub fn borrowed<T: ?Sized>() -> Self {
        Self::Borrowed {
            type_name: core::any::type_name::<T>(),
        }
    }

    pub fn locked<T: ?Sized>() -> Self {
        Self::Locked {
            type_name: core::any::type_name::<T>(),
        }
    }

    pub fn poisoned<T: ?Sized>() -> Self {
        Self::Poisoned {
            type_name: core::any::type_name::<T>(),
        }
    }

    pub fn no_shape(type_name: &'static str) -> Self {
        Self::NoShape { type_name }
    }

    /// Name of the type whose state could not be read.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Borrowed { type_name }
            | Self::Locked { type_name }
            | Self::Poisoned { type_name }
            | Self::NoShape { type_name } => type_name,
        }
    }
}

/// Configuration could not be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held something other than a boolean.
    #[error("invalid boolean for {key}: {value:?}")]
    InvalidBool { key: &'static str, value: String },
}
