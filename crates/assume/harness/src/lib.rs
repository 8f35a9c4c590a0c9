//! Assume Harness: phase-aware test runner
//!
//! Runs suites of tests with function-scoped fixtures through three phases
//! (setup, call, teardown). Each phase gets its own assumption context; when
//! the phase ends its failed assumptions are aggregated into one failure and
//! mapped onto the usual outcome categories.
//!
//! # Outcomes
//!
//! - setup failure: `error`, the call phase is skipped
//! - call failure: `failed`
//! - teardown failure: an extra `error` for the test
//! - xfail mark: failures become `xfailed`, a clean pass `xpassed`
//! - skip mark: `skipped`, nothing runs
//!
//! # Example
//!
//! ```rust,ignore
//! use assume::assume;
//! use assume_harness::{Fixture, HarnessArgs, Runner, Suite, TestCase};
//! use clap::Parser;
//!
//! let suite = Suite::new("widgets")
//!     .with_fixture(Fixture::new("db", || Ok(())))?
//!     .with_test(TestCase::new("test_sizes", || {
//!         assume(1 == 2, None);
//!         Ok(())
//!     }).uses("db"))?;
//!
//! let config = HarnessArgs::parse().into_config()?;
//! let report = Runner::new(config).run(&suite)?;
//! println!("{}", report.to_text());
//! ```

#![deny(unsafe_code)]

pub mod case;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod report;
pub mod runner;

pub use case::{Fixture, PhaseFn, Suite, TestCase, XFail};
pub use config::{HarnessArgs, HarnessConfig, CONFIG_ENV, REPORT_CHARS_ENV, WORKERS_ENV};
pub use error::{HarnessError, HarnessResult};
pub use lifecycle::{run_phase, Fault, FaultKind, PhaseFailure, PhaseReport, PhaseSettings};
pub use report::{SessionReport, SessionSummary, TestReport};
pub use runner::Runner;
