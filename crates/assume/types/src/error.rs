//! Error types for the assumption store.

use crate::phase::{Phase, TestId};
use thiserror::Error;

/// Errors raised by misuse of the assumption store.
#[derive(Debug, Error)]
pub enum AssumeError {
    /// A phase guard was finished while another context sat above it.
    #[error("phase {test}/{phase} is not the innermost active context")]
    ContextMismatch { test: TestId, phase: Phase },

    /// The guard's context was already removed from the store.
    #[error("phase {test}/{phase} is no longer active")]
    ContextClosed { test: TestId, phase: Phase },
}

/// Result type for store operations.
pub type AssumeResult<T> = Result<T, AssumeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = AssumeError::ContextMismatch {
            test: TestId::new("t"),
            phase: Phase::Call,
        };
        assert_eq!(err.to_string(), "phase t/call is not the innermost active context");

        let err = AssumeError::ContextClosed {
            test: TestId::new("t"),
            phase: Phase::Setup,
        };
        assert_eq!(err.to_string(), "phase t/setup is no longer active");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssumeError>();
    }
}
