//! Assume: soft assumptions for tests
//!
//! An assumption is a check that records its failure instead of stopping
//! the test. Every failure of a phase is collected and reported once, as a
//! single aggregated failure, when the phase ends.
//!
//! # Components
//!
//! - **Store** ([`store`]): thread-local, per-phase pending entries
//! - **Evaluator** ([`evaluator`], [`assume!`], [`assume_eq!`]): call form
//!   and scoped form
//! - **Observers** ([`observer`]): passed / failed notification hooks
//! - **Reporter** ([`report`]): the `N Failed Assumptions` text block
//! - **Verify** ([`verify()`]): phase integration for plain `#[test]`s
//!
//! # Example
//!
//! ```rust,ignore
//! use assume::{assume, assume_eq, scoped, verify};
//!
//! #[test]
//! fn widget_dimensions() {
//!     verify(|| {
//!         let widget = build_widget();
//!         assume!(widget.width > 0, "width was {}", widget.width);
//!         assume_eq!(widget.height, 10);
//!         scoped(|| assert!(widget.visible));
//!     });
//! }
//! ```

#![deny(unsafe_code)]

#[macro_use]
mod macros;

pub mod evaluator;
pub mod observer;
pub mod panic;
pub mod report;
pub mod store;
pub mod verify;

pub use assume_types::{
    AssumeError, AssumeResult, AssumptionEntry, LocalBinding, Outcome, Phase, SourceLocation, TestId,
};
pub use evaluator::{assume, explain_comparison, scoped, try_scoped, Evaluation, Truthy};
pub use observer::{AssumptionObserver, ObservedEvent, RecordingObserver, TracingObserver};
pub use panic::{catch as catch_panic, raise_assertion, AssertionFailure, CaughtPanic};
pub use report::FailedAssumptions;
pub use store::{ContextKey, PhaseGuard, PhaseScope};
pub use verify::{verify, Verify, SHOW_LOCALS_ENV};
