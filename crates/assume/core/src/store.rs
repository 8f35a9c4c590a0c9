//! Assumption store.
//!
//! Pending entries live in thread-local storage, one context per executing
//! phase. A [`PhaseScope`] pushes a context and hands back a [`PhaseGuard`];
//! finishing the guard reads and clears that context exactly once. Because
//! the storage is per thread, tests running on different worker threads never
//! observe each other's entries.
//!
//! Evaluations made while no context is active land in a detached bucket. It
//! is never merged into a phase and can be drained with [`drain_detached`].

use crate::observer::AssumptionObserver;
use assume_types::{AssumeError, AssumeResult, AssumptionEntry, Phase, TestId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static STORE: RefCell<AssumptionStore> = RefCell::new(AssumptionStore::default());
    static NEXT_SERIAL: Cell<u64> = const { Cell::new(0) };
}

/// Identity of a phase context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub test: TestId,
    pub phase: Phase,
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.test, self.phase)
    }
}

struct PhaseContext {
    serial: u64,
    key: ContextKey,
    entries: Vec<AssumptionEntry>,
    show_locals: bool,
    observers: Vec<Arc<dyn AssumptionObserver>>,
}

#[derive(Default)]
struct AssumptionStore {
    active: Vec<PhaseContext>,
    detached: Vec<AssumptionEntry>,
}

/// Builder for a phase context.
pub struct PhaseScope {
    key: ContextKey,
    show_locals: bool,
    observers: Vec<Arc<dyn AssumptionObserver>>,
}

impl PhaseScope {
    pub fn new(test: impl Into<TestId>, phase: Phase) -> Self {
        Self {
            key: ContextKey {
                test: test.into(),
                phase,
            },
            show_locals: false,
            observers: Vec::new(),
        }
    }

    /// Whether failures in this phase render their local bindings
    pub fn show_locals(mut self, show_locals: bool) -> Self {
        self.show_locals = show_locals;
        self
    }

    /// Add an observer notified of every evaluation in this phase
    pub fn observer(mut self, observer: Arc<dyn AssumptionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn observers<I>(mut self, observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn AssumptionObserver>>,
    {
        self.observers.extend(observers);
        self
    }

    /// Push the context onto this thread's store
    pub fn enter(self) -> PhaseGuard {
        let serial = NEXT_SERIAL.with(|next| {
            let serial = next.get();
            next.set(serial + 1);
            serial
        });

        tracing::debug!(context = %self.key, serial, "entering assumption context");

        let key = self.key.clone();
        STORE.with(|store| {
            store.borrow_mut().active.push(PhaseContext {
                serial,
                key: self.key,
                entries: Vec::new(),
                show_locals: self.show_locals,
                observers: self.observers,
            })
        });

        PhaseGuard {
            serial,
            key,
            finished: false,
            _not_send: PhantomData,
        }
    }
}

/// Handle on an active phase context.
///
/// Dropping an unfinished guard (for example while unwinding) discards its
/// entries so they cannot leak into the next phase.
pub struct PhaseGuard {
    serial: u64,
    key: ContextKey,
    finished: bool,
    _not_send: PhantomData<*const ()>,
}

impl PhaseGuard {
    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    /// Number of entries recorded so far in this context
    pub fn pending(&self) -> usize {
        STORE.with(|store| {
            store
                .borrow()
                .active
                .iter()
                .find(|ctx| ctx.serial == self.serial)
                .map(|ctx| ctx.entries.len())
                .unwrap_or(0)
        })
    }

    /// Remove the context and return its entries in recorded order
    pub fn finish(mut self) -> AssumeResult<Vec<AssumptionEntry>> {
        let entries = STORE.with(|store| {
            let mut store = store.borrow_mut();
            match store.active.last() {
                Some(top) if top.serial == self.serial => {
                    Ok(store.active.pop().map(|ctx| ctx.entries).unwrap_or_default())
                }
                _ if store.active.iter().any(|ctx| ctx.serial == self.serial) => {
                    Err(AssumeError::ContextMismatch {
                        test: self.key.test.clone(),
                        phase: self.key.phase,
                    })
                }
                _ => Err(AssumeError::ContextClosed {
                    test: self.key.test.clone(),
                    phase: self.key.phase,
                }),
            }
        })?;

        self.finished = true;
        tracing::debug!(
            context = %self.key,
            failed = entries.len(),
            "flushed assumption context"
        );
        Ok(entries)
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let _ = STORE.try_with(|store| {
            let mut store = store.borrow_mut();
            if let Some(index) = store.active.iter().position(|ctx| ctx.serial == self.serial) {
                let ctx = store.active.remove(index);
                tracing::debug!(
                    context = %ctx.key,
                    discarded = ctx.entries.len(),
                    "dropped unfinished assumption context"
                );
            }
        });
    }
}

impl fmt::Debug for PhaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseGuard")
            .field("key", &self.key)
            .field("serial", &self.serial)
            .finish()
    }
}

pub(crate) fn record(entry: AssumptionEntry) {
    STORE.with(|store| {
        let mut store = store.borrow_mut();
        match store.active.last_mut() {
            Some(ctx) => {
                tracing::debug!(context = %ctx.key, location = %entry.location(), "assumption failed");
                ctx.entries.push(entry);
            }
            None => {
                tracing::debug!(location = %entry.location(), "assumption failed outside a phase");
                store.detached.push(entry);
            }
        }
    })
}

/// Observers of the innermost context, cloned so callbacks run without the
/// store borrowed.
pub(crate) fn observers() -> Vec<Arc<dyn AssumptionObserver>> {
    STORE.with(|store| {
        store
            .borrow()
            .active
            .last()
            .map(|ctx| ctx.observers.clone())
            .unwrap_or_default()
    })
}

/// Key of the innermost active context on this thread
pub fn current_key() -> Option<ContextKey> {
    STORE.with(|store| store.borrow().active.last().map(|ctx| ctx.key.clone()))
}

/// Entries pending in the innermost context (or the detached bucket)
pub fn pending_count() -> usize {
    STORE.with(|store| {
        let store = store.borrow();
        match store.active.last() {
            Some(ctx) => ctx.entries.len(),
            None => store.detached.len(),
        }
    })
}

/// Show-locals setting of the innermost context
pub fn show_locals() -> bool {
    STORE.with(|store| {
        store
            .borrow()
            .active
            .last()
            .map(|ctx| ctx.show_locals)
            .unwrap_or(false)
    })
}

/// Take every entry recorded outside a phase context on this thread
pub fn drain_detached() -> Vec<AssumptionEntry> {
    STORE.with(|store| std::mem::take(&mut store.borrow_mut().detached))
}
