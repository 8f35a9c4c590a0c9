//! Harness errors

use assume_types::AssumeError;
use thiserror::Error;

/// Errors raised while assembling or running a suite.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("duplicate test: {0}")]
    DuplicateTest(String),

    #[error("duplicate fixture: {0}")]
    DuplicateFixture(String),

    #[error("test {test} requests unknown fixture {fixture}")]
    UnknownFixture { test: String, fixture: String },

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Assume(#[from] AssumeError),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
