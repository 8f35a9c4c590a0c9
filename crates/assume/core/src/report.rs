//! Aggregated failure reporting.
//!
//! A phase that recorded entries fails once, with a [`FailedAssumptions`]
//! carrying all of them:
//!
//! ```text
//! 2 Failed Assumptions:
//!
//! tests/widget.rs:14: FailedAssumption
//! >>	a == b
//! a:1 b:2
//!
//! tests/widget.rs:15: FailedAssumption
//! >>	count > 5
//! Locals:
//!     count      = 3
//! ```

use assume_types::{AssumptionEntry, LocalBinding};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Label on each entry's location line
pub const ENTRY_LABEL: &str = "FailedAssumption";

const MIN_LOCALS_WIDTH: usize = 10;

/// Every failed assumption of one phase, reported as a single failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAssumptions {
    entries: Vec<AssumptionEntry>,
    show_locals: bool,
}

impl FailedAssumptions {
    /// Aggregate `entries`; `None` when there is nothing to report
    pub fn from_entries(entries: Vec<AssumptionEntry>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self {
                entries,
                show_locals: false,
            })
        }
    }

    /// Render each entry's local bindings
    pub fn show_locals(mut self, show_locals: bool) -> Self {
        self.show_locals = show_locals;
        self
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[AssumptionEntry] {
        &self.entries
    }

    /// `"N Failed Assumptions"`, plural for every `N`
    pub fn header(&self) -> String {
        format!("{} Failed Assumptions", self.count())
    }

    /// Full text: header, then each entry in recorded order
    pub fn render(&self) -> String {
        let mut out = format!("{}:\n", self.header());
        for entry in &self.entries {
            out.push('\n');
            self.render_entry(&mut out, entry);
        }
        while out.ends_with('\n') {
            out.pop();
        }
        out
    }

    /// `primary` left exactly as it is, with this summary appended after a
    /// blank line
    pub fn append_to(&self, primary: &str) -> String {
        let mut out = String::with_capacity(primary.len() + 2);
        out.push_str(primary);
        if !primary.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.render());
        out
    }

    fn render_entry(&self, out: &mut String, entry: &AssumptionEntry) {
        if let Some(traceback) = entry.traceback() {
            out.push_str(traceback.trim_end());
            out.push('\n');
        }
        let _ = writeln!(out, "{}: {}", entry.location(), ENTRY_LABEL);
        if let Some(expression) = entry.expression() {
            let _ = writeln!(out, ">>\t{}", expression);
        }
        if !entry.message().is_empty() {
            out.push_str(entry.message());
            out.push('\n');
        }
        if self.show_locals && !entry.locals().is_empty() {
            out.push_str(&render_locals(entry.locals()));
        }
    }
}

/// `name = value` lines with the names padded to a common column
pub fn render_locals(locals: &[LocalBinding]) -> String {
    let width = locals
        .iter()
        .map(|local| local.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(MIN_LOCALS_WIDTH);

    let mut out = String::from("Locals:\n");
    for local in locals {
        let _ = writeln!(out, "    {:<width$} = {}", local.name, local.value, width = width);
    }
    out
}

impl fmt::Display for FailedAssumptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for FailedAssumptions {}

#[cfg(test)]
mod tests {
    use super::*;
    use assume_types::SourceLocation;

    fn entry(line: u32, message: &str) -> AssumptionEntry {
        AssumptionEntry::new(SourceLocation::new("tests/widget.rs", line, 5), message)
    }

    #[test]
    fn report_serializes_entries() {
        let report = FailedAssumptions::from_entries(vec![entry(14, "a:1 b:2")]).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["entries"][0]["message"], "a:1 b:2");
        assert_eq!(value["entries"][0]["location"]["line"], 14);
        assert_eq!(value["show_locals"], false);
    }

    #[test]
    fn empty_entries_produce_no_report() {
        assert!(FailedAssumptions::from_entries(Vec::new()).is_none());
    }

    #[test]
    fn header_uses_plural_noun_for_every_count() {
        let one = FailedAssumptions::from_entries(vec![entry(1, "x")]).unwrap();
        assert_eq!(one.header(), "1 Failed Assumptions");

        let two = FailedAssumptions::from_entries(vec![entry(1, "x"), entry(2, "y")]).unwrap();
        assert_eq!(two.header(), "2 Failed Assumptions");
    }

    #[test]
    fn render_lists_entries_in_order() {
        let report = FailedAssumptions::from_entries(vec![
            entry(14, "a:1 b:2").with_expression("a == b"),
            entry(15, ""),
        ])
        .unwrap();

        let expected = "2 Failed Assumptions:\n\
                        \n\
                        tests/widget.rs:14: FailedAssumption\n\
                        >>\ta == b\n\
                        a:1 b:2\n\
                        \n\
                        tests/widget.rs:15: FailedAssumption";
        assert_eq!(report.render(), expected);
        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn locals_render_only_when_enabled() {
        let with_locals = entry(3, "")
            .with_expression("a == b")
            .with_locals(vec![LocalBinding::new("a", "1"), LocalBinding::new("b", "2")]);

        let hidden = FailedAssumptions::from_entries(vec![with_locals.clone()]).unwrap();
        assert!(!hidden.render().contains("a          = 1"));

        let shown = hidden.show_locals(true);
        let text = shown.render();
        assert!(text.contains("Locals:\n    a          = 1\n    b          = 2"));
    }

    #[test]
    fn locals_align_to_longest_name() {
        let text = render_locals(&[
            LocalBinding::new("short", "1"),
            LocalBinding::new("a_much_longer_name", "2"),
        ]);
        assert!(text.contains("    short              = 1\n"));
        assert!(text.contains("    a_much_longer_name = 2\n"));
    }

    #[test]
    fn append_keeps_primary_first_and_intact() {
        let report = FailedAssumptions::from_entries(vec![entry(9, "late")]).unwrap();
        let primary = "panicked at tests/widget.rs:10:5:\nassertion failed: a == b";

        let merged = report.append_to(primary);
        assert!(merged.starts_with(primary));
        assert!(merged.ends_with("tests/widget.rs:9: FailedAssumption\nlate"));
        assert!(merged.contains("\n\n1 Failed Assumptions:\n"));
    }

    #[test]
    fn traceback_precedes_location() {
        let report =
            FailedAssumptions::from_entries(vec![entry(2, "m").with_traceback("   0: frame\n")]).unwrap();
        assert!(report.render().contains("   0: frame\ntests/widget.rs:2: FailedAssumption"));
    }
}
