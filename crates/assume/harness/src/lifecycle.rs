//! Phase lifecycle hooks.
//!
//! [`run_phase`] wraps one phase of one test. It opens an assumption context
//! for the phase, runs the body with panics captured, then flushes the
//! context and decides the phase's failure:
//!
//! | fault | entries | result                                        |
//! |-------|---------|-----------------------------------------------|
//! | no    | none    | pass                                          |
//! | no    | some    | one aggregated `FailedAssumptions` failure    |
//! | yes   | none    | the fault, rendered unchanged                 |
//! | yes   | some    | the fault first, summary appended after it    |

use assume::{catch_panic, AssumptionObserver, CaughtPanic, FailedAssumptions, PhaseScope};
use assume_types::{Phase, SourceLocation, TestId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What aborted a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// An assertion-kind panic (`assert!`, `AssertionFailure`, string panics)
    Assertion,
    /// A panic with any other payload
    Panic,
    /// An `Err` returned by the phase body
    Error,
}

/// A fault that aborted a phase, with its rendering fixed at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    /// Kind name as reported, e.g. `assertion`, `DummyAssertionError`, `error`
    pub label: String,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub rendered: String,
}

impl Fault {
    pub fn from_panic(caught: &CaughtPanic) -> Self {
        Self {
            kind: if caught.is_assertion() {
                FaultKind::Assertion
            } else {
                FaultKind::Panic
            },
            label: caught.kind().to_string(),
            message: caught.message(),
            location: caught.location().cloned(),
            rendered: caught.render(),
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            kind: FaultKind::Error,
            label: "error".to_string(),
            message: format!("{:#}", err),
            location: None,
            rendered: format!("Error: {:?}", err),
        }
    }
}

/// Why a phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFailure {
    /// The fault that aborted the phase; always the primary cause
    pub fault: Option<Fault>,
    pub assumptions: Option<FailedAssumptions>,
    /// Full failure text as shown in the session report
    pub longrepr: String,
}

impl PhaseFailure {
    fn classify(fault: Option<Fault>, assumptions: Option<FailedAssumptions>) -> Option<Self> {
        let longrepr = match (&fault, &assumptions) {
            (None, None) => return None,
            (None, Some(failed)) => failed.render(),
            (Some(fault), None) => fault.rendered.clone(),
            (Some(fault), Some(failed)) => failed.append_to(&fault.rendered),
        };
        Some(Self {
            fault,
            assumptions,
            longrepr,
        })
    }

    pub fn assumption_count(&self) -> usize {
        self.assumptions.as_ref().map_or(0, |failed| failed.count())
    }

    /// First line of the primary cause, for one-line summaries
    pub fn headline(&self) -> String {
        match (&self.fault, &self.assumptions) {
            (Some(fault), _) => fault.message.lines().next().unwrap_or_default().to_string(),
            (None, Some(failed)) => failed.header(),
            (None, None) => String::new(),
        }
    }
}

/// Result of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub failure: Option<PhaseFailure>,
    pub duration: Duration,
}

impl PhaseReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn assumption_count(&self) -> usize {
        self.failure.as_ref().map_or(0, |failure| failure.assumption_count())
    }
}

/// Per-phase settings handed to every assumption context.
#[derive(Clone, Default)]
pub struct PhaseSettings {
    pub show_locals: bool,
    pub observers: Vec<Arc<dyn AssumptionObserver>>,
}

/// Run one phase of `test` and classify its result
pub fn run_phase<F>(test: &TestId, phase: Phase, settings: &PhaseSettings, body: F) -> PhaseReport
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let start = Instant::now();
    let guard = PhaseScope::new(test.clone(), phase)
        .show_locals(settings.show_locals)
        .observers(settings.observers.iter().cloned())
        .enter();

    let result = catch_panic(body);

    let entries = match guard.finish() {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(test = %test, phase = %phase, error = %err, "assumption context lost");
            Vec::new()
        }
    };

    let fault = match result {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(Fault::from_error(&err)),
        Err(caught) => Some(Fault::from_panic(&caught)),
    };
    let assumptions =
        FailedAssumptions::from_entries(entries).map(|failed| failed.show_locals(settings.show_locals));
    let failure = PhaseFailure::classify(fault, assumptions);

    if let Some(ref failure) = failure {
        tracing::debug!(
            test = %test,
            phase = %phase,
            faulted = failure.fault.is_some(),
            assumptions = failure.assumption_count(),
            "phase failed"
        );
    }

    PhaseReport {
        phase,
        failure,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assume::{assume, scoped};

    fn id() -> TestId {
        TestId::new("lifecycle::t")
    }

    #[test]
    fn clean_phase_passes() {
        let report = run_phase(&id(), Phase::Call, &PhaseSettings::default(), || {
            assume(true, None);
            Ok(())
        });
        assert!(report.passed());
        assert_eq!(report.assumption_count(), 0);
    }

    #[test]
    fn entries_only_become_one_failure() {
        let report = run_phase(&id(), Phase::Call, &PhaseSettings::default(), || {
            assume(1 == 2, None);
            assume(true, None);
            scoped(|| assert!(false, "second"));
            Ok(())
        });
        let failure = report.failure.unwrap();
        assert!(failure.fault.is_none());
        assert_eq!(failure.assumption_count(), 2);
        assert!(failure.longrepr.starts_with("2 Failed Assumptions:"));
        assert_eq!(failure.headline(), "2 Failed Assumptions");
    }

    #[test]
    fn assertion_stays_primary() {
        let report = run_phase(&id(), Phase::Call, &PhaseSettings::default(), || {
            assume(1 == 2, None);
            assert_eq!(1, 2);
            Ok(())
        });
        let failure = report.failure.unwrap();
        let fault = failure.fault.as_ref().unwrap();
        assert_eq!(fault.kind, FaultKind::Assertion);
        assert!(failure.longrepr.starts_with(&fault.rendered));
        assert!(failure.longrepr.contains("1 Failed Assumptions:"));
    }

    #[test]
    fn returned_error_keeps_identity() {
        let report = run_phase(&id(), Phase::Setup, &PhaseSettings::default(), || {
            assume(false, None);
            anyhow::bail!("setup error")
        });
        let failure = report.failure.unwrap();
        let fault = failure.fault.as_ref().unwrap();
        assert_eq!(fault.kind, FaultKind::Error);
        assert_eq!(fault.message, "setup error");
        assert!(failure.longrepr.starts_with("Error: setup error"));
        assert_eq!(failure.assumption_count(), 1);
    }

    #[test]
    fn entries_do_not_cross_phases() {
        let settings = PhaseSettings::default();
        let setup = run_phase(&id(), Phase::Setup, &settings, || {
            assume(false, None);
            Ok(())
        });
        let call = run_phase(&id(), Phase::Call, &settings, || Ok(()));

        assert_eq!(setup.assumption_count(), 1);
        assert!(call.passed());
    }
}
