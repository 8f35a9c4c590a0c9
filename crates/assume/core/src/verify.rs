//! Assumptions inside plain `#[test]` functions.
//!
//! The built-in test harness has no phase hooks, so [`verify`] supplies one:
//! it opens a call-phase context around the body and, when the body returns,
//! panics once with every failure it recorded.

use crate::observer::AssumptionObserver;
use crate::panic;
use crate::report::FailedAssumptions;
use crate::store::PhaseScope;
use assume_types::{Phase, TestId};
use std::sync::Arc;

/// Environment variable that turns on local-variable rendering
pub const SHOW_LOCALS_ENV: &str = "ASSUME_SHOWLOCALS";

/// Whether `value` spells an enabled flag (`1`, `true`, `yes`, `on`)
pub fn flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Options for [`Verify::run`].
#[derive(Clone, Default)]
pub struct Verify {
    show_locals: Option<bool>,
    observers: Vec<Arc<dyn AssumptionObserver>>,
}

impl Verify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the `ASSUME_SHOWLOCALS` setting
    pub fn show_locals(mut self, show_locals: bool) -> Self {
        self.show_locals = Some(show_locals);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn AssumptionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Run `body` and report its failed assumptions.
    ///
    /// - no failures: returns normally
    /// - failures only: panics with the aggregated report
    /// - the body panicked: the original panic stays first and the report is
    ///   appended to it; non-string payloads are re-raised as they are, with
    ///   the report written to stderr
    #[track_caller]
    pub fn run<F>(self, body: F)
    where
        F: FnOnce(),
    {
        let show_locals = self.show_locals.unwrap_or_else(|| {
            std::env::var(SHOW_LOCALS_ENV)
                .map(|value| flag_enabled(&value))
                .unwrap_or(false)
        });
        let test = TestId::new(std::thread::current().name().unwrap_or("<unnamed>"));

        let guard = PhaseScope::new(test, Phase::Call)
            .show_locals(show_locals)
            .observers(self.observers)
            .enter();
        let outcome = panic::catch(body);
        let entries = match guard.finish() {
            Ok(entries) => entries,
            Err(err) => panic!("{}", err),
        };
        let failed = FailedAssumptions::from_entries(entries).map(|f| f.show_locals(show_locals));

        match (outcome, failed) {
            (Ok(()), None) => {}
            (Ok(()), Some(failed)) => panic!("{}", failed),
            (Err(caught), None) => caught.resume(),
            (Err(caught), Some(failed)) => {
                if caught.payload().is::<String>() || caught.payload().is::<&'static str>() {
                    panic!("{}", failed.append_to(&caught.render()));
                }
                eprintln!("{}", failed);
                caught.resume()
            }
        }
    }
}

/// Run `body` with default [`Verify`] options
#[track_caller]
pub fn verify<F>(body: F)
where
    F: FnOnce(),
{
    Verify::new().run(body)
}
