//! The assume evaluator.
//!
//! Two calling conventions record a failed check instead of stopping the
//! test:
//!
//! - call form: [`assume`] (or the [`assume!`](crate::assume) family of
//!   macros, which also capture the expression text and local bindings)
//! - scoped form: [`scoped`] / [`try_scoped`] run a block and turn an
//!   assertion-kind panic inside it into an entry
//!
//! Either way a failure is appended to the active phase context and the
//! context's observers are notified.

use crate::panic::{self, CaughtPanic};
use crate::store;
use assume_types::{AssumptionEntry, LocalBinding, SourceLocation};
use std::fmt::Debug;

/// Values that can stand for a pass/fail condition.
///
/// Mirrors the usual notion of truthiness: `false`, `None`, `Err`, zero and
/// empty collections fail; everything else passes.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> Truthy for Result<T, E> {
    fn is_truthy(&self) -> bool {
        self.is_ok()
    }
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for [T] {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T, const N: usize> Truthy for [T; N] {
    fn is_truthy(&self) -> bool {
        N > 0
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

macro_rules! truthy_numeric {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl Truthy for $ty {
                fn is_truthy(&self) -> bool {
                    *self != $zero
                }
            }
        )*
    };
}

truthy_numeric! {
    i8 => 0, i16 => 0, i32 => 0, i64 => 0, i128 => 0, isize => 0,
    u8 => 0, u16 => 0, u32 => 0, u64 => 0, u128 => 0, usize => 0,
    f32 => 0.0, f64 => 0.0,
}

/// One evaluation in progress.
///
/// Created where the check is written (so its location is the caller's) and
/// consumed by either [`Evaluation::pass`] or [`Evaluation::fail`]. The macros
/// drive this type; call it directly only when building your own checks.
#[derive(Debug)]
pub struct Evaluation {
    location: SourceLocation,
    expression: Option<&'static str>,
}

impl Evaluation {
    #[track_caller]
    pub fn new(expression: Option<&'static str>) -> Self {
        Self {
            location: SourceLocation::from(std::panic::Location::caller()),
            expression,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Notify observers of a pass; always returns `true`
    pub fn pass(self) -> bool {
        let entry = AssumptionEntry::passed(self.location);
        for observer in store::observers() {
            observer.on_assumption_passed(entry.line(), &entry);
        }
        true
    }

    /// Record a failure; always returns `false`
    pub fn fail(
        self,
        explanation: Option<String>,
        message: Option<String>,
        locals: Vec<LocalBinding>,
    ) -> bool {
        let text = compose_message(message, explanation);
        let mut entry = AssumptionEntry::new(self.location, text).with_locals(locals);
        if let Some(expression) = self.expression {
            entry = entry.with_expression(expression);
        }
        if let Some(traceback) = panic::capture_backtrace() {
            entry = entry.with_traceback(traceback);
        }
        record_failure(entry)
    }

    /// Record a failure from an assertion panic caught in a scoped block.
    ///
    /// The entry is located where the assertion panicked, falling back to
    /// the scope's own location.
    pub fn fail_from_panic(self, caught: CaughtPanic) -> bool {
        let location = caught.location().cloned().unwrap_or(self.location);
        let mut entry = AssumptionEntry::new(location, caught.message());
        if let Some(traceback) = caught.backtrace() {
            entry = entry.with_traceback(traceback);
        }
        record_failure(entry)
    }
}

fn compose_message(message: Option<String>, explanation: Option<String>) -> String {
    match (message, explanation) {
        (Some(message), Some(explanation)) => format!("{}\n{}", message, explanation),
        (Some(message), None) => message,
        (None, Some(explanation)) => explanation,
        (None, None) => String::new(),
    }
}

fn record_failure(entry: AssumptionEntry) -> bool {
    let observers = store::observers();
    let line = entry.line();
    store::record(entry.clone());
    for observer in observers {
        observer.on_assumption_failed(line, &entry);
    }
    false
}

/// Explanation for a failed binary comparison, in the standard library's
/// `assert_eq!` format
pub fn explain_comparison<L, R>(op: &str, left: &L, right: &R) -> String
where
    L: Debug + ?Sized,
    R: Debug + ?Sized,
{
    format!(
        "assertion `left {} right` failed\n  left: {:?}\n right: {:?}",
        op, left, right
    )
}

/// Message recorded by [`assume`] when no message is given
pub const FALSY_CONDITION: &str = "assume(..) condition was falsy";

/// Call form: record a failure when `condition` is not truthy.
///
/// Returns the truthiness of `condition`. Without a message the entry only
/// says the condition was falsy; [`assume!`](crate::assume!) also records
/// the expression text.
#[track_caller]
pub fn assume<C>(condition: C, message: Option<&str>) -> bool
where
    C: Truthy,
{
    let evaluation = Evaluation::new(None);
    if condition.is_truthy() {
        evaluation.pass()
    } else {
        let message = message.filter(|message| !message.is_empty()).unwrap_or(FALSY_CONDITION);
        evaluation.fail(None, Some(message.to_owned()), Vec::new())
    }
}

/// Scoped form: run `block`, converting an assertion-kind panic inside it
/// into a recorded failure.
///
/// Returns `true` when the block completed. Panics with any other payload
/// continue unwinding unchanged and are not recorded.
#[track_caller]
pub fn scoped<F>(block: F) -> bool
where
    F: FnOnce(),
{
    let evaluation = Evaluation::new(None);
    match panic::catch(block) {
        Ok(()) => evaluation.pass(),
        Err(caught) if caught.is_assertion() => evaluation.fail_from_panic(caught),
        Err(caught) => caught.resume(),
    }
}

/// Scoped form for fallible blocks.
///
/// An `Err` returned by the block is handed back untouched and nothing is
/// recorded; assertion-kind panics are recorded as in [`scoped`].
#[track_caller]
pub fn try_scoped<F, E>(block: F) -> Result<bool, E>
where
    F: FnOnce() -> Result<(), E>,
{
    let evaluation = Evaluation::new(None);
    match panic::catch(block) {
        Ok(Ok(())) => Ok(evaluation.pass()),
        Ok(Err(err)) => Err(err),
        Err(caught) if caught.is_assertion() => Ok(evaluation.fail_from_panic(caught)),
        Err(caught) => caught.resume(),
    }
}
