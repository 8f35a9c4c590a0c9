//! Shared helpers for harness integration tests.

#![allow(dead_code)]

use assume::Outcome;
use assume_harness::{HarnessConfig, Runner, SessionReport, Suite};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a test-writer subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().without_time().with_test_writer())
        .try_init();
}

pub fn run(suite: &Suite) -> SessionReport {
    run_with(suite, HarnessConfig::default())
}

pub fn run_with(suite: &Suite, config: HarnessConfig) -> SessionReport {
    init_tracing();
    Runner::new(config).run(suite).expect("suite should run")
}

/// Check counts the way the session summary reports them
pub fn assert_outcomes(report: &SessionReport, passed: usize, failed: usize, errors: usize) {
    let counts = (
        report.count(Outcome::Passed),
        report.count(Outcome::Failed),
        report.count(Outcome::Error),
    );
    assert_eq!(
        counts,
        (passed, failed, errors),
        "unexpected outcomes:\n{}",
        report.to_text()
    );
}
