//! Assume Core Types
//!
//! Shared vocabulary for soft assumptions:
//!
//! - [`AssumptionEntry`]: one failed check, with its location and rendering
//! - [`Phase`]: the test phase an entry was recorded in
//! - [`Outcome`]: the outcome categories a test report can land in
//! - [`TestId`]: identity of the test whose phase is executing
//!
//! These types carry no behavior beyond construction and display; the store,
//! evaluator and reporter live in the `assume` crate.

#![deny(unsafe_code)]

pub mod entry;
pub mod error;
pub mod phase;

pub use entry::{AssumptionEntry, LocalBinding, SourceLocation};
pub use error::{AssumeError, AssumeResult};
pub use phase::{Outcome, Phase, TestId};
