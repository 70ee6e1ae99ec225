//! Validation error shared by value constructors and realm decoders.

use thiserror::Error;

/// Raised when a raw value cannot become a domain value, or when an
/// operation would break an invariant stated on the domain model.
///
/// The message is human-readable and is surfaced to callers untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InputValidationError {
    message: String,
}

impl InputValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Result alias for value-layer operations.
pub type ValidationResult<T> = Result<T, InputValidationError>;
