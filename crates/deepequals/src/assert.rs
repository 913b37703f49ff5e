//! Test assertions over deep equality.

use core::fmt::Debug;

use crate::engine::is_deep_equals;
use crate::shape::DeepValue;

/// Assert that two values are deep-equal, printing both on failure.
///
/// Panics as well when either value cannot be read.
#[macro_export]
macro_rules! assert_deep_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::deep_eq_or_panic(&$left, &$right, ::core::option::Option::None)
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        $crate::deep_eq_or_panic(
            &$left,
            &$right,
            ::core::option::Option::Some(::std::format!($($arg)+)),
        )
    };
}

/// Assert that two values are not deep-equal.
#[macro_export]
macro_rules! assert_not_deep_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::deep_ne_or_panic(&$left, &$right, ::core::option::Option::None)
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        $crate::deep_ne_or_panic(
            &$left,
            &$right,
            ::core::option::Option::Some(::std::format!($($arg)+)),
        )
    };
}

#[track_caller]
pub fn deep_eq_or_panic<A, B>(left: &A, right: &B, message: Option<String>)
where
    A: DeepValue + Debug,
    B: DeepValue + Debug,
{
    check(left, right, true, message);
}

#[track_caller]
pub fn deep_ne_or_panic<A, B>(left: &A, right: &B, message: Option<String>)
where
    A: DeepValue + Debug,
    B: DeepValue + Debug,
{
    check(left, right, false, message);
}

#[track_caller]
fn check<A, B>(left: &A, right: &B, expected: bool, message: Option<String>)
where
    A: DeepValue + Debug,
    B: DeepValue + Debug,
{
    let relation = if expected { "==" } else { "!=" };
    match is_deep_equals(left, right) {
        Ok(equal) if equal == expected => {}
        Ok(_) => panic!(
            "assertion `left {relation} right` failed (deep){}\n  left: {left:?}\n right: {right:?}",
            suffix(message.as_deref()),
        ),
        Err(err) => panic!(
            "deep comparison could not read its input: {err}{}\n  left: {left:?}\n right: {right:?}",
            suffix(message.as_deref()),
        ),
    }
}

fn suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    #[test]
    fn passes_on_equal_graphs() {
        crate::assert_deep_eq!(vec![1, 2, 3], VecDeque::from([1, 2, 3]));
        crate::assert_not_deep_eq!(vec![1, 2, 3], vec![3, 2, 1]);
        crate::assert_deep_eq!(HashSet::from(["a", "b"]), HashSet::from(["b", "a"]), "sets");
    }

    #[test]
    #[should_panic(expected = "assertion `left == right` failed (deep): context 7")]
    fn reports_custom_message() {
        crate::assert_deep_eq!(vec![1], vec![2], "context {}", 7);
    }

    #[test]
    #[should_panic(expected = "could not read its input")]
    fn panics_on_unreadable_input() {
        let cell = std::cell::RefCell::new(1);
        let _guard = cell.borrow_mut();
        crate::assert_deep_eq!(cell, std::cell::RefCell::new(1));
    }
}
