//! Notification hooks for evaluations.

use assume_types::AssumptionEntry;
use std::sync::{Arc, Mutex};

/// Extension point invoked synchronously at every evaluation.
///
/// `line` is the line the check was evaluated on. For a passing check the
/// entry is trivial: it carries only the location.
pub trait AssumptionObserver: Send + Sync {
    fn on_assumption_passed(&self, line: u32, entry: &AssumptionEntry) {
        let _ = (line, entry);
    }

    fn on_assumption_failed(&self, line: u32, entry: &AssumptionEntry) {
        let _ = (line, entry);
    }
}

/// Logs every evaluation through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AssumptionObserver for TracingObserver {
    fn on_assumption_passed(&self, line: u32, entry: &AssumptionEntry) {
        tracing::trace!(line, file = %entry.location().file, "assumption passed");
    }

    fn on_assumption_failed(&self, line: u32, entry: &AssumptionEntry) {
        tracing::info!(line, file = %entry.location().file, message = %entry.message(), "assumption failed");
    }
}

/// An observed evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Passed { line: u32, entry: AssumptionEntry },
    Failed { line: u32, entry: AssumptionEntry },
}

impl ObservedEvent {
    pub fn line(&self) -> u32 {
        match self {
            ObservedEvent::Passed { line, .. } | ObservedEvent::Failed { line, .. } => *line,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ObservedEvent::Failed { .. })
    }
}

/// Collects every evaluation it observes.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the events observed so far
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn passed(&self) -> usize {
        self.events().iter().filter(|e| !e.is_failure()).count()
    }

    pub fn failed(&self) -> usize {
        self.events().iter().filter(|e| e.is_failure()).count()
    }

    fn push(&self, event: ObservedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl AssumptionObserver for RecordingObserver {
    fn on_assumption_passed(&self, line: u32, entry: &AssumptionEntry) {
        self.push(ObservedEvent::Passed {
            line,
            entry: entry.clone(),
        });
    }

    fn on_assumption_failed(&self, line: u32, entry: &AssumptionEntry) {
        self.push(ObservedEvent::Failed {
            line,
            entry: entry.clone(),
        });
    }
}
