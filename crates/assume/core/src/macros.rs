//! Call-form macros.
//!
//! The macros capture what the plain [`assume`](crate::assume()) function
//! cannot: the source text of the condition and, on request, the `Debug`
//! rendering of named locals for show-locals output. Messages are only
//! formatted when the check fails.

/// Record a failure when the condition is not truthy; evaluates to `bool`.
///
/// ```rust,ignore
/// assume!(a == b);
/// assume!(a == b, "a:{} b:{}", a, b);
/// assume!(a == b => [a, b]);
/// assume!(a == b => [a, b], "a:{} b:{}", a, b);
/// ```
#[macro_export]
macro_rules! assume {
    ($cond:expr $(,)?) => {
        $crate::__assume_check!($cond, [], ::std::option::Option::None)
    };
    ($cond:expr => [$($local:ident),* $(,)?] $(,)?) => {
        $crate::__assume_check!($cond, [$($local),*], ::std::option::Option::None)
    };
    ($cond:expr => [$($local:ident),* $(,)?], $($arg:tt)+) => {
        $crate::__assume_check!(
            $cond,
            [$($local),*],
            ::std::option::Option::Some(::std::format!($($arg)+))
        )
    };
    ($cond:expr, $($arg:tt)+) => {
        $crate::__assume_check!(
            $cond,
            [],
            ::std::option::Option::Some(::std::format!($($arg)+))
        )
    };
}

/// Record a failure unless `left == right`; evaluates to `bool`.
///
/// The entry carries the same `left:` / `right:` explanation as
/// `assert_eq!`.
#[macro_export]
macro_rules! assume_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::__assume_compare!(==, $left, $right, ::std::option::Option::None)
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        $crate::__assume_compare!(
            ==,
            $left,
            $right,
            ::std::option::Option::Some(::std::format!($($arg)+))
        )
    };
}

/// Record a failure unless `left != right`; evaluates to `bool`.
#[macro_export]
macro_rules! assume_ne {
    ($left:expr, $right:expr $(,)?) => {
        $crate::__assume_compare!(!=, $left, $right, ::std::option::Option::None)
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        $crate::__assume_compare!(
            !=,
            $left,
            $right,
            ::std::option::Option::Some(::std::format!($($arg)+))
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __assume_check {
    ($cond:expr, [$($local:ident),*], $message:expr) => {{
        let __evaluation = $crate::Evaluation::new(::std::option::Option::Some(::std::stringify!($cond)));
        if $crate::Truthy::is_truthy(&($cond)) {
            __evaluation.pass()
        } else {
            __evaluation.fail(
                ::std::option::Option::None,
                $message,
                ::std::vec![
                    $(
                        $crate::LocalBinding::new(
                            ::std::stringify!($local),
                            ::std::format!("{:?}", $local),
                        )
                    ),*
                ],
            )
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __assume_compare {
    ($op:tt, $left:expr, $right:expr, $message:expr) => {{
        let __evaluation = $crate::Evaluation::new(::std::option::Option::Some(::std::concat!(
            ::std::stringify!($left),
            " ",
            ::std::stringify!($op),
            " ",
            ::std::stringify!($right)
        )));
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val $op *right_val {
                    __evaluation.pass()
                } else {
                    __evaluation.fail(
                        ::std::option::Option::Some($crate::explain_comparison(
                            ::std::stringify!($op),
                            &*left_val,
                            &*right_val,
                        )),
                        $message,
                        ::std::vec::Vec::new(),
                    )
                }
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::store::PhaseScope;
    use assume_types::Phase;

    #[test]
    fn assume_captures_expression_and_message() {
        let guard = PhaseScope::new("t", Phase::Call).enter();
        let a = 1;
        let b = 2;

        assert!(!crate::assume!(a == b, "a:{} b:{}", a, b));
        assert!(crate::assume!(a < b));

        let entries = guard.finish().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].expression(), Some("a == b"));
        assert_eq!(entries[0].message(), "a:1 b:2");
        assert!(entries[0].locals().is_empty());
    }

    #[test]
    fn assume_captures_locals() {
        let guard = PhaseScope::new("t", Phase::Call).enter();
        let name = "widget";
        let count = 3;

        crate::assume!(count > 5 => [name, count]);
        crate::assume!(count > 5 => [count], "count too small");

        let entries = guard.finish().unwrap();
        let locals = entries[0].locals();
        assert_eq!(locals.len(), 2);
        assert_eq!(locals[0].name, "name");
        assert_eq!(locals[0].value, "\"widget\"");
        assert_eq!(locals[1].value, "3");
        assert_eq!(entries[1].message(), "count too small");
    }

    #[test]
    fn assume_eq_explains_both_sides() {
        let guard = PhaseScope::new("t", Phase::Call).enter();

        assert!(!crate::assume_eq!(b"\x01", b"\x5b"));
        assert!(!crate::assume_eq!("\x5b", "\x5a", "text differs"));
        assert!(!crate::assume_eq!(b"\x5b".as_slice(), "\x5a".as_bytes()));
        assert!(crate::assume_ne!(1, 2));

        let entries = guard.finish().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].expression(), Some("b\"\\x01\" == b\"\\x5b\""));
        assert!(entries[0].message().contains("left: [1]"));
        assert!(entries[0].message().contains("right: [91]"));
        assert!(entries[1].message().starts_with("text differs\n"));
        assert!(entries[2].message().contains("right: [90]"));
    }

    #[test]
    fn message_is_only_built_on_failure() {
        struct Loud;
        impl std::fmt::Display for Loud {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("message construction should not run");
            }
        }

        let guard = PhaseScope::new("t", Phase::Call).enter();
        assert!(crate::assume!(true, "{}", Loud));
        assert!(guard.finish().unwrap().is_empty());
    }
}
