//! # Validation Module
//!
//! Input validation for list names and decoded values.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                           │
//! │  └── Empty-name checks, immediate feedback                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Store entry points                                           │
//! │  └── THIS MODULE: name / value rules                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── Foreign key constraints (ON DELETE CASCADE)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dupscan_core::validation::{validate_list_name, normalize_list_name};
//!
//! validate_list_name("Warehouse A").unwrap();
//! assert_eq!(normalize_list_name("  Shelf 3 "), "Shelf 3");
//! ```

use crate::error::ValidationError;
use crate::{MAX_BARCODE_VALUE_LEN, MAX_LIST_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// List Names
// =============================================================================

/// Validates a list name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_LIST_NAME_LEN`] characters
/// - No control characters
///
/// ## Example
/// ```rust
/// use dupscan_core::validation::validate_list_name;
///
/// assert!(validate_list_name("Inbound pallets").is_ok());
/// assert!(validate_list_name("   ").is_err());
/// ```
pub fn validate_list_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_LIST_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_LIST_NAME_LEN,
        });
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "name".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Trims surrounding whitespace from a list name.
pub fn normalize_list_name(name: &str) -> String {
    name.trim().to_string()
}

// =============================================================================
// Barcode Values
// =============================================================================

/// Validates a decoded barcode value before it is stored.
///
/// Values are stored exactly as decoded (no trimming): two symbols that
/// differ only in whitespace are different codes.
pub fn validate_barcode_value(value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: "value".to_string(),
        });
    }

    if value.len() > MAX_BARCODE_VALUE_LEN {
        return Err(ValidationError::TooLong {
            field: "value".to_string(),
            max: MAX_BARCODE_VALUE_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
