//! Suite runner

use crate::case::{Fixture, Suite, TestCase};
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::lifecycle::{run_phase, PhaseSettings};
use crate::report::{SessionReport, TestReport};
use assume::{catch_panic, AssumptionObserver, TracingObserver};
use assume_types::{Outcome, Phase, TestId};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// A selected test with its fixtures resolved
struct Planned<'a> {
    id: TestId,
    test: &'a TestCase,
    fixtures: Vec<&'a Fixture>,
}

/// Runs suites and produces session reports
pub struct Runner {
    config: HarnessConfig,
    observers: Vec<Arc<dyn AssumptionObserver>>,
}

impl Runner {
    /// Create a new runner
    pub fn new(config: HarnessConfig) -> Self {
        let mut observers: Vec<Arc<dyn AssumptionObserver>> = Vec::new();
        if config.trace_assumptions {
            observers.push(Arc::new(TracingObserver));
        }
        Self { config, observers }
    }

    /// Notify `observer` of every evaluation in every phase
    pub fn with_observer(mut self, observer: Arc<dyn AssumptionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every selected test of `suite`
    pub fn run(&self, suite: &Suite) -> HarnessResult<SessionReport> {
        self.config.validate()?;

        let mut plan = Vec::new();
        for test in suite.tests() {
            let id = suite.test_id(test);
            if !self.config.selects(&id) {
                continue;
            }
            plan.push(Planned {
                fixtures: suite.resolve(test)?,
                id: TestId::new(id),
                test,
            });
        }

        let workers = self.config.workers.clamp(1, plan.len().max(1));
        tracing::info!(
            suite = suite.name(),
            tests = plan.len(),
            workers,
            "Starting test session"
        );

        let start = Instant::now();
        let mut report = SessionReport::new(suite.name(), self.config.report_chars.clone());

        let results: Vec<TestReport> = if workers == 1 {
            plan.iter().map(|planned| self.run_test(planned)).collect()
        } else {
            self.run_parallel(&plan, workers)?
        };
        for result in results {
            report.add_test(result);
        }

        report.duration = start.elapsed();
        report.finalize();

        tracing::info!(
            suite = suite.name(),
            summary = %report.summary.line(),
            "Test session complete"
        );

        Ok(report)
    }

    /// Run `suite` and panic with the text report unless it succeeded
    pub fn assert_success(&self, suite: &Suite) -> SessionReport {
        let report = match self.run(suite) {
            Ok(report) => report,
            Err(err) => panic!("suite '{}' could not run: {}", suite.name(), err),
        };
        if !report.is_success() {
            panic!("suite '{}' failed:\n{}", suite.name(), report.to_text());
        }
        report
    }

    fn settings(&self) -> PhaseSettings {
        PhaseSettings {
            show_locals: self.config.show_locals,
            observers: self.observers.clone(),
        }
    }

    /// Each test runs start to finish on one pool thread; reports keep suite order
    fn run_parallel(&self, plan: &[Planned<'_>], workers: usize) -> HarnessResult<Vec<TestReport>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("assume-worker-{}", index))
            .build()?;

        Ok(pool.install(|| plan.par_iter().map(|planned| self.run_test(planned)).collect()))
    }

    fn run_test(&self, planned: &Planned<'_>) -> TestReport {
        let Planned { id, test, fixtures } = planned;

        if let Some(reason) = test.skip_reason() {
            tracing::debug!(test = %id, reason, "test skipped");
            return TestReport::skipped(id.clone(), reason);
        }

        let xfail = test.xfail_mark();
        if let Some(mark) = xfail.filter(|mark| !mark.run) {
            tracing::debug!(test = %id, reason = %mark.reason, "xfail test not run");
            return TestReport {
                id: id.clone(),
                outcome: Outcome::XFailed,
                teardown_outcome: None,
                phases: Vec::new(),
                reason: Some(format!("[NOTRUN] {}", mark.reason)),
                duration: std::time::Duration::ZERO,
            };
        }

        let start = Instant::now();
        let settings = self.settings();
        let mut phases = Vec::with_capacity(Phase::ALL.len());

        let mut ready = 0;
        let setup = run_phase(id, Phase::Setup, &settings, || {
            for fixture in fixtures {
                fixture.setup()?;
                ready += 1;
            }
            Ok(())
        });
        let setup_failed = !setup.passed();
        phases.push(setup);

        let mut call_failed = false;
        if !setup_failed {
            let call = run_phase(id, Phase::Call, &settings, || test.call());
            call_failed = !call.passed();
            phases.push(call);
        }

        let teardown = run_phase(id, Phase::Teardown, &settings, || {
            teardown_fixtures(&fixtures[..ready])
        });
        let teardown_failed = !teardown.passed();
        phases.push(teardown);

        let (outcome, reason) = match xfail {
            Some(mark) if setup_failed || call_failed => (Outcome::XFailed, Some(mark.reason.clone())),
            Some(mark) if mark.strict => (
                Outcome::Failed,
                Some(format!("[XPASS(strict)] {}", mark.reason)),
            ),
            Some(mark) => (Outcome::XPassed, Some(mark.reason.clone())),
            None if setup_failed => (Outcome::Error, None),
            None if call_failed => (Outcome::Failed, None),
            None => (Outcome::Passed, None),
        };
        let teardown_outcome = teardown_failed.then(|| match xfail {
            Some(_) => Outcome::XFailed,
            None => Outcome::Error,
        });

        tracing::debug!(
            test = %id,
            outcome = %outcome,
            teardown_failed,
            "test finished"
        );

        TestReport {
            id: id.clone(),
            outcome,
            teardown_outcome,
            phases,
            reason,
            duration: start.elapsed(),
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

/// Tear fixtures down in reverse setup order. Every teardown runs; the first
/// panic is resumed, otherwise the first error is returned.
fn teardown_fixtures(fixtures: &[&Fixture]) -> anyhow::Result<()> {
    let mut first_error = None;
    let mut first_panic = None;

    for fixture in fixtures.iter().rev() {
        match catch_panic(|| fixture.teardown()) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(caught) => {
                first_panic.get_or_insert(caught);
            }
        }
    }

    if let Some(caught) = first_panic {
        caught.resume();
    }
    first_error.map_or(Ok(()), Err)
}
