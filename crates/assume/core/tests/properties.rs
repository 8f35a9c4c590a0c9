//! Property tests: aggregation counts and store clearing.

use assume::{assume, catch_panic, scoped, FailedAssumptions, Phase, PhaseScope, RecordingObserver};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

/// One evaluation: which form to use and whether it passes.
#[derive(Debug, Clone, Copy)]
enum Check {
    Call(bool),
    Scoped(bool),
}

impl Check {
    fn run(self) -> bool {
        match self {
            Check::Call(ok) => assume(ok, Some("call form")),
            Check::Scoped(ok) => scoped(|| assert!(ok, "scoped form")),
        }
    }

    fn passes(self) -> bool {
        match self {
            Check::Call(ok) | Check::Scoped(ok) => ok,
        }
    }
}

fn arb_check() -> impl Strategy<Value = Check> {
    prop_oneof![any::<bool>().prop_map(Check::Call), any::<bool>().prop_map(Check::Scoped)]
}

fn arb_checks(max: usize) -> impl Strategy<Value = Vec<Check>> {
    prop::collection::vec(arb_check(), 0..max)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// k failing evaluations among N produce one report whose count is k.
    #[test]
    fn header_count_matches_failures(checks in arb_checks(24)) {
        let guard = PhaseScope::new("prop", Phase::Call).enter();
        let returned: Vec<bool> = checks.iter().map(|c| c.run()).collect();
        let entries = guard.finish().unwrap();

        let expected: Vec<bool> = checks.iter().map(|c| c.passes()).collect();
        prop_assert_eq!(returned, expected);

        let k = checks.iter().filter(|c| !c.passes()).count();
        match FailedAssumptions::from_entries(entries) {
            None => prop_assert_eq!(k, 0),
            Some(report) => {
                prop_assert_eq!(report.count(), k);
                let prefix = format!("{} Failed Assumptions:", k);
                prop_assert!(report.render().starts_with(&prefix));
            }
        }
    }

    /// After a phase is flushed the next phase starts empty.
    #[test]
    fn flushed_phase_does_not_leak(first in arb_checks(12), second in arb_checks(12)) {
        let setup = PhaseScope::new("prop", Phase::Setup).enter();
        for check in &first {
            check.run();
        }
        let setup_entries = setup.finish().unwrap();

        let call = PhaseScope::new("prop", Phase::Call).enter();
        for check in &second {
            check.run();
        }
        let call_entries = call.finish().unwrap();

        prop_assert_eq!(setup_entries.len(), first.iter().filter(|c| !c.passes()).count());
        prop_assert_eq!(call_entries.len(), second.iter().filter(|c| !c.passes()).count());
    }

    /// Observers see exactly one notification per evaluation.
    #[test]
    fn observers_see_every_evaluation(checks in arb_checks(16)) {
        let observer = RecordingObserver::new();
        let guard = PhaseScope::new("prop", Phase::Call).observer(observer.clone()).enter();
        for check in &checks {
            check.run();
        }
        guard.finish().unwrap();

        prop_assert_eq!(observer.events().len(), checks.len());
        prop_assert_eq!(observer.failed(), checks.iter().filter(|c| !c.passes()).count());
    }
}

#[test]
fn byte_and_text_comparisons_share_the_failure_path() {
    let guard = PhaseScope::new("bytes", Phase::Call).enter();

    assume::assume_eq!(b"\x01", b"\x5b");
    assume::assume_eq!("\u{5b}", "\u{5a}");
    assume::assume_eq!(b"\x5b".as_slice(), "\x5a".as_bytes());
    assume::assume_eq!(b"same", b"same");

    let entries = guard.finish().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.message().starts_with("assertion `left == right` failed")));
}

#[test]
fn unrelated_panic_in_scope_is_not_recorded() {
    #[derive(Debug)]
    struct ValueError;

    let guard = PhaseScope::new("scope", Phase::Call).enter();
    let caught = catch_panic(|| {
        scoped(|| std::panic::panic_any(ValueError));
    })
    .unwrap_err();

    assert!(caught.payload().is::<ValueError>());
    assert!(guard.finish().unwrap().is_empty());
}
