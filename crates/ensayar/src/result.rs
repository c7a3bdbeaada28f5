//! Result and error types for Ensayar.

use thiserror::Error;

/// Result type for Ensayar operations
pub type EnsayarResult<T> = Result<T, EnsayarError>;

/// Errors that can occur while building or running tests
#[derive(Debug, Error)]
pub enum EnsayarError {
    /// Explicit assertion raised inside a test body
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Assertion text
        message: String,
    },

    /// A panic caught at the scheduler boundary
    #[error("Unhandled panic: {message}")]
    UnhandledPanic {
        /// Panic payload rendered as text
        message: String,
    },

    /// An error-level log line not covered by the permitted-error registry
    #[error("Unexpected error log: {message}")]
    LogError {
        /// Offending log text
        message: String,
    },

    /// Test body exceeded its configured timeout
    #[error("Test timed out after {seconds:.1}s")]
    Timeout {
        /// Configured timeout in seconds
        seconds: f64,
    },

    /// Setup or one-time setup failed before the body could start
    #[error("Fixture error: {message}")]
    FixtureError {
        /// Error message
        message: String,
    },

    /// Operation called in a state that does not allow it
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Invalid permitted-error pattern
    #[error("Invalid error pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Regex error text
        message: String,
    },

    /// I/O error (persisted tree load/save)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (persisted tree, run reports)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnsayarError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::FixtureError {
            message: message.into(),
        }
    }

    /// Create an invalid-state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check if this error classifies as a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message() {
        let err = EnsayarError::assertion("score should be 10");
        assert_eq!(err.to_string(), "Assertion failed: score should be 10");
    }

    #[test]
    fn test_timeout_classification() {
        let err = EnsayarError::Timeout { seconds: 5.0 };
        assert!(err.is_timeout());
        assert!(!EnsayarError::assertion("x").is_timeout());
    }

    #[test]
    fn test_fixture_error_display() {
        let err = EnsayarError::fixture("OneTimeSetUp threw");
        assert_eq!(err.to_string(), "Fixture error: OneTimeSetUp threw");
    }
}
