//! # Error Types
//!
//! Domain-specific error types for dupscan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dupscan-core errors (this file)                                       │
//! │  ├── CoreError        - Rejected scan transitions, domain errors       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dupscan-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  dupscan-scan errors (separate crate)                                  │
//! │  ├── ScanError        - Session / config / channel failures            │
//! │  └── DecodeError      - Swallowed at the decoder boundary              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Note that a duplicate scan is NOT an error: it is a regular
//! [`ScanState::Duplicate`](crate::scan::ScanState::Duplicate) branch.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The scan state machine has no transition for this event.
    ///
    /// ## When This Occurs
    /// - `dismiss()` while a success banner is still showing
    /// - `forceAdd()` when no duplicate is pending
    /// - A detection arriving while the previous one is unresolved
    #[error("No transition from {state} on {event}")]
    InvalidTransition { state: String, event: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., control characters in a name).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTransition {
            state: "success".to_string(),
            event: "dismiss".to_string(),
        };
        assert_eq!(err.to_string(), "No transition from success on dismiss");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "name must be at most 100 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
