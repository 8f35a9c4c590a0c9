//! Test identity, phases and outcome categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an executing test (for example `suite::test_func`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Test phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Call,
    Teardown,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Setup, Phase::Call, Phase::Teardown];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Call => write!(f, "call"),
            Phase::Teardown => write!(f, "teardown"),
        }
    }
}

/// Outcome category of a test report.
///
/// The set is closed: assumptions only change which category a report lands
/// in, they never add one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Failed,
    Passed,
    Skipped,
    XFailed,
    XPassed,
    Error,
}

impl Outcome {
    /// Order used in the terminal summary line
    pub const SUMMARY_ORDER: [Outcome; 6] = [
        Outcome::Failed,
        Outcome::Passed,
        Outcome::Skipped,
        Outcome::XFailed,
        Outcome::XPassed,
        Outcome::Error,
    ];

    /// Noun used in the summary line for `count` reports
    pub fn noun(&self, count: usize) -> &'static str {
        match (self, count) {
            (Outcome::Error, 1) => "error",
            (Outcome::Error, _) => "errors",
            (other, _) => other.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Failed => "failed",
            Outcome::Passed => "passed",
            Outcome::Skipped => "skipped",
            Outcome::XFailed => "xfailed",
            Outcome::XPassed => "xpassed",
            Outcome::Error => "error",
        }
    }

    /// Whether this outcome makes the session unsuccessful
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Error)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
