//! Session reporting

use crate::config::report_chars_select;
use crate::lifecycle::{PhaseFailure, PhaseReport};
use assume_types::{Outcome, Phase, TestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

const WIDTH: usize = 80;

/// Order of the short test summary sections
const SHORT_SUMMARY_ORDER: [Outcome; 6] = [
    Outcome::Failed,
    Outcome::Error,
    Outcome::Skipped,
    Outcome::XFailed,
    Outcome::XPassed,
    Outcome::Passed,
];

/// Result of one test across its phases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub id: TestId,
    pub outcome: Outcome,

    /// Extra report raised by a failing teardown
    pub teardown_outcome: Option<Outcome>,

    /// Phases that ran, in execution order
    pub phases: Vec<PhaseReport>,

    /// Skip or xfail reason as displayed
    pub reason: Option<String>,
    pub duration: Duration,
}

impl TestReport {
    /// Create a skipped test report
    pub fn skipped(id: TestId, reason: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Outcome::Skipped,
            teardown_outcome: None,
            phases: Vec::new(),
            reason: Some(reason.into()),
            duration: Duration::ZERO,
        }
    }

    /// Every outcome this test contributes to the summary
    pub fn outcomes(&self) -> impl Iterator<Item = Outcome> + '_ {
        std::iter::once(self.outcome).chain(self.teardown_outcome)
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|report| report.phase == phase)
    }

    pub fn failure(&self, phase: Phase) -> Option<&PhaseFailure> {
        self.phase(phase).and_then(|report| report.failure.as_ref())
    }

    /// Failed assumptions recorded across all phases
    pub fn assumption_count(&self) -> usize {
        self.phases.iter().map(PhaseReport::assumption_count).sum()
    }

    /// Number of aggregated `FailedAssumptions` reports; at most one per phase
    pub fn aggregated_reports(&self) -> usize {
        self.phases
            .iter()
            .filter(|report| report.assumption_count() > 0)
            .count()
    }

    /// The failure behind the main outcome, if any
    pub fn primary_failure(&self) -> Option<&PhaseFailure> {
        match self.outcome {
            Outcome::Error => self.failure(Phase::Setup),
            Outcome::Failed => self.failure(Phase::Call),
            Outcome::XFailed => self
                .phases
                .iter()
                .filter(|report| report.phase != Phase::Teardown)
                .find_map(|report| report.failure.as_ref()),
            _ => None,
        }
    }

    fn detail(&self, outcome: Outcome, failure: Option<&PhaseFailure>) -> Option<String> {
        match outcome {
            Outcome::Skipped | Outcome::XFailed | Outcome::XPassed => self.reason.clone(),
            Outcome::Passed => None,
            Outcome::Failed | Outcome::Error => failure
                .map(PhaseFailure::headline)
                .or_else(|| self.reason.clone()),
        }
    }
}

/// Outcome counts of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub counts: BTreeMap<Outcome, usize>,
    pub duration: Duration,
}

impl SessionSummary {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// `1 failed, 1 passed, 1 error in 0.01s`
    pub fn line(&self) -> String {
        let parts: Vec<String> = Outcome::SUMMARY_ORDER
            .iter()
            .filter_map(|outcome| {
                let count = self.count(*outcome);
                (count > 0).then(|| format!("{} {}", count, outcome.noun(count)))
            })
            .collect();

        let body = if parts.is_empty() {
            "no tests ran".to_string()
        } else {
            parts.join(", ")
        };
        format!("{} in {:.2}s", body, self.duration.as_secs_f64())
    }
}

/// Complete session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub suite: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,

    /// Outcomes listed in the short test summary
    pub report_chars: String,
    pub tests: Vec<TestReport>,
    pub summary: SessionSummary,
}

impl SessionReport {
    /// Create a new report
    pub fn new(suite: impl Into<String>, report_chars: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            suite: suite.into(),
            timestamp: Utc::now(),
            duration: Duration::ZERO,
            report_chars: report_chars.into(),
            tests: Vec::new(),
            summary: SessionSummary::default(),
        }
    }

    pub fn add_test(&mut self, test: TestReport) {
        self.tests.push(test);
    }

    /// Finalize the report and compute summary
    pub fn finalize(&mut self) {
        let mut counts = BTreeMap::new();
        for outcome in self.tests.iter().flat_map(|test| test.outcomes()) {
            *counts.entry(outcome).or_insert(0) += 1;
        }
        self.summary = SessionSummary {
            counts,
            duration: self.duration,
        };
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.summary.count(outcome)
    }

    /// No test failed or errored
    pub fn is_success(&self) -> bool {
        !Outcome::SUMMARY_ORDER
            .iter()
            .any(|outcome| outcome.is_failure() && self.count(*outcome) > 0)
    }

    /// Look a test up by its full id or its bare name
    pub fn test(&self, name: &str) -> Option<&TestReport> {
        self.tests.iter().find(|test| {
            let id = test.id.as_str();
            id == name || id.rsplit("::").next() == Some(name)
        })
    }

    /// Generate a text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&banner("test session starts", '='));
        output.push_str(&format!(
            "session {} ({})\n",
            self.session_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "collected {} item{}\n\n",
            self.tests.len(),
            if self.tests.len() == 1 { "" } else { "s" }
        ));

        for test in &self.tests {
            for outcome in test.outcomes() {
                output.push_str(&format!("{} {}\n", test.id, status_word(outcome)));
            }
        }

        let errors = self.error_sections();
        if !errors.is_empty() {
            output.push('\n');
            output.push_str(&banner("ERRORS", '='));
            for (title, text) in errors {
                output.push_str(&banner(&title, '_'));
                output.push_str(&text);
                output.push_str("\n\n");
            }
        }

        let failures = self.failure_sections();
        if !failures.is_empty() {
            output.push('\n');
            output.push_str(&banner("FAILURES", '='));
            for (title, text) in failures {
                output.push_str(&banner(&title, '_'));
                output.push_str(&text);
                output.push_str("\n\n");
            }
        }

        let short = self.short_summary();
        if !short.is_empty() {
            output.push('\n');
            output.push_str(&banner("short test summary info", '='));
            for line in short {
                output.push_str(&line);
                output.push('\n');
            }
        }

        output.push_str(&banner(&self.summary.line(), '='));
        output
    }

    /// Generate JSON report
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn error_sections(&self) -> Vec<(String, String)> {
        let mut sections = Vec::new();
        for test in &self.tests {
            if test.outcome == Outcome::Error {
                if let Some(failure) = test.failure(Phase::Setup) {
                    sections.push((format!("ERROR at setup of {}", test.id), failure.longrepr.clone()));
                }
            }
            if test.teardown_outcome == Some(Outcome::Error) {
                if let Some(failure) = test.failure(Phase::Teardown) {
                    sections.push((
                        format!("ERROR at teardown of {}", test.id),
                        failure.longrepr.clone(),
                    ));
                }
            }
        }
        sections
    }

    fn failure_sections(&self) -> Vec<(String, String)> {
        self.tests
            .iter()
            .filter(|test| test.outcome == Outcome::Failed)
            .filter_map(|test| {
                let text = match test.failure(Phase::Call) {
                    Some(failure) => failure.longrepr.clone(),
                    None => test.reason.clone()?,
                };
                Some((test.id.to_string(), text))
            })
            .collect()
    }

    fn short_summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for outcome in SHORT_SUMMARY_ORDER {
            if !report_chars_select(&self.report_chars, outcome) {
                continue;
            }
            for test in &self.tests {
                if test.outcome == outcome {
                    push_short(&mut lines, test, outcome, test.primary_failure());
                }
                if test.teardown_outcome == Some(outcome) {
                    push_short(&mut lines, test, outcome, test.failure(Phase::Teardown));
                }
            }
        }
        lines
    }
}

fn push_short(lines: &mut Vec<String>, test: &TestReport, outcome: Outcome, failure: Option<&PhaseFailure>) {
    let word = status_word(outcome);
    match test.detail(outcome, failure) {
        Some(detail) => lines.push(format!("{} {} - {}", word, test.id, detail)),
        None => lines.push(format!("{} {}", word, test.id)),
    }
}

fn status_word(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Failed => "FAILED",
        Outcome::Passed => "PASSED",
        Outcome::Skipped => "SKIPPED",
        Outcome::XFailed => "XFAIL",
        Outcome::XPassed => "XPASS",
        Outcome::Error => "ERROR",
    }
}

fn banner(title: &str, fill: char) -> String {
    let title = format!(" {} ", title);
    let len = title.chars().count();
    if len >= WIDTH {
        return format!("{}\n", title.trim());
    }
    let left = (WIDTH - len) / 2;
    let right = WIDTH - len - left;
    format!(
        "{}{}{}\n",
        fill.to_string().repeat(left),
        title,
        fill.to_string().repeat(right)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, outcome: Outcome) -> TestReport {
        TestReport {
            id: TestId::new(id),
            outcome,
            teardown_outcome: None,
            phases: Vec::new(),
            reason: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_summary_line_order_and_plurals() {
        let mut session = SessionReport::new("s", "fE");
        session.add_test(report("s::a", Outcome::Error));
        session.add_test(report("s::b", Outcome::Passed));
        session.add_test(report("s::c", Outcome::Failed));
        session.duration = Duration::from_millis(10);
        session.finalize();

        assert_eq!(session.summary.line(), "1 failed, 1 passed, 1 error in 0.01s");
        assert!(!session.is_success());

        session.add_test(report("s::d", Outcome::Error));
        session.finalize();
        assert_eq!(session.summary.line(), "1 failed, 1 passed, 2 errors in 0.01s");
    }

    #[test]
    fn test_empty_session() {
        let mut session = SessionReport::new("s", "fE");
        session.finalize();
        assert_eq!(session.summary.line(), "no tests ran in 0.00s");
        assert!(session.is_success());
    }

    #[test]
    fn test_teardown_error_counts_twice() {
        let mut test = report("s::t", Outcome::Passed);
        test.teardown_outcome = Some(Outcome::Error);

        let mut session = SessionReport::new("s", "fE");
        session.add_test(test);
        session.finalize();

        assert_eq!(session.summary.total(), 2);
        assert_eq!(session.count(Outcome::Passed), 1);
        assert_eq!(session.count(Outcome::Error), 1);
    }

    #[test]
    fn test_short_summary_respects_report_chars() {
        let mut xfailed = report("s::x", Outcome::XFailed);
        xfailed.reason = Some("testfail".to_string());

        let mut session = SessionReport::new("s", "fE");
        session.add_test(xfailed.clone());
        session.finalize();
        assert!(!session.to_text().contains("XFAIL s::x"));

        let mut session = SessionReport::new("s", "x");
        session.add_test(xfailed);
        session.finalize();
        let text = session.to_text();
        assert!(text.contains("XFAIL s::x - testfail"));
        assert!(text.contains("1 xfailed in"));
    }

    #[test]
    fn test_lookup_by_name() {
        let mut session = SessionReport::new("s", "fE");
        session.add_test(report("s::test_func1", Outcome::Passed));
        assert!(session.test("test_func1").is_some());
        assert!(session.test("s::test_func1").is_some());
        assert!(session.test("func1").is_none());
    }

    #[test]
    fn test_report_to_json() {
        let mut session = SessionReport::new("json-suite", "fE");
        session.add_test(report("json-suite::t", Outcome::Passed));
        session.finalize();

        let json = session.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["suite"], "json-suite");
        assert_eq!(value["summary"]["counts"]["passed"], 1);
        assert_eq!(value["tests"][0]["outcome"], "passed");
    }

    #[test]
    fn test_banner_width() {
        let line = banner("FAILURES", '=');
        assert_eq!(line.trim_end().chars().count(), WIDTH);
        assert!(line.contains(" FAILURES "));
    }
}
