// SPDX-FileCopyrightText: Copyright (c) The Rust Project Contributors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
use std::fmt;

/// Asserts that an expression matches a pattern, printing the value on failure.
///
/// Used throughout the client tests to check error variants without requiring
/// `PartialEq` on errors that wrap transport failures.
#[macro_export]
macro_rules! assert_matches {
    ($left:expr, $(|)? $( $pattern:pat_param )|+ $( if $guard: expr )? $(,)?) => {
        match $left {
            $( $pattern )|+ $( if $guard )? => {}
            ref left_val => {
                $crate::assert_matches::assert_matches_failed(
                    left_val,
                    std::stringify!($($pattern)|+ $(if $guard)?),
                    std::option::Option::None
                );
            }
        }
    };

    ($left:expr, $(|)? $( $pattern:pat_param )|+ $( if $guard: expr )?, $($arg:tt)+) => {
        match $left {
            $( $pattern )|+ $( if $guard )? => {}
            ref left_val => {
                $crate::assert_matches::assert_matches_failed(
                    left_val,
                    std::stringify!($($pattern)|+ $(if $guard)?),
                    std::option::Option::Some(std::format_args!($($arg)+))
                );
            }
        }
    };
}

/// Internal function for `assert_match!`
#[track_caller]
#[doc(hidden)]
pub fn assert_matches_failed<T: fmt::Debug + ?Sized>(
    left: &T,
    right: &str,
    args: Option<fmt::Arguments<'_>>,
) -> ! {
    // The pattern is a string so it can be displayed directly.
    struct Pattern<'a>(&'a str);
    impl fmt::Debug for Pattern<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }
    let pattern = Pattern(right);
    match args {
        Some(args) => panic!(
            r#"assertion `value matches pattern` failed: {args}
  value: {left:?}
pattern: {pattern:?}"#
        ),
        None => panic!(
            r#"assertion `value matches pattern` failed
  value: {left:?}
pattern: {pattern:?}"#
        ),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn matching_pattern_passes() {
        let value: Result<u8, &str> = Ok(3);
        crate::assert_matches!(value, Ok(n) if n == 3);
    }

    #[test]
    #[should_panic(expected = "value matches pattern")]
    fn mismatching_pattern_panics() {
        let value: Result<u8, &str> = Err("boom");
        crate::assert_matches!(value, Ok(_));
    }
}
