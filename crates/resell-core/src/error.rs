//! # Error Types
//!
//! Domain-specific error types for resell-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  resell-core errors (this file)                                        │
//! │  ├── CoreError        - Lifecycle and backup rule violations           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  resell-db errors (separate crate)                                     │
//! │  ├── DbError          - Store operation failures                       │
//! │  ├── ServiceError     - CoreError | DbError from the engine            │
//! │  └── BackupError      - Import/export failures                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//! Lifecycle violations are logical errors, not transient faults. They are
//! surfaced to the caller with a message meant for display; nobody retries
//! them.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Lifecycle and backup rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A referenced record does not exist for this tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The IMEI is already carried by another phone (as imei1 or imei2).
    #[error("A phone with IMEI {imei} already exists")]
    DuplicateImei { imei: String },

    /// `record_sale` on a phone that is already sold.
    #[error("Phone {phone_id} is already sold")]
    AlreadySold { phone_id: String },

    /// `record_return` on a phone that is in stock.
    #[error("Phone {phone_id} is not sold, nothing to return")]
    NotSold { phone_id: String },

    /// Inventory attributes of a sold phone cannot be edited.
    #[error("Phone {phone_id} is sold; its details can no longer be edited")]
    Immutable { phone_id: String },

    /// An in-stock phone still carries sale history and cannot be deleted.
    ///
    /// ## When This Occurs
    /// - The phone row carries a `sale_date` marker
    /// - Sale records reference the phone (sold, returned, back in stock)
    #[error("Phone {phone_id} has sale history and cannot be deleted")]
    SaleHistory { phone_id: String },

    /// Credit payment amount is zero or negative.
    #[error("Payment amount must be greater than zero (got {amount_cents} cents)")]
    InvalidAmount { amount_cents: i64 },

    /// Credit payment is larger than what is still owed.
    #[error("Payment of {amount_cents} cents exceeds the remaining {remaining_cents} cents")]
    ExceedsRemaining {
        amount_cents: i64,
        remaining_cents: i64,
    },

    /// Backup document failed structural or referential checks.
    ///
    /// Carries every problem found, not just the first.
    #[error("Backup validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// A restore completed but some records were skipped.
    #[error("Import finished with {skipped} skipped record(s)")]
    PartialImportFailure { skipped: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are raised before any record is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., IMEI with punctuation, unparsable date).
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
        let err = CoreError::ExceedsRemaining {
            amount_cents: 30_100,
            remaining_cents: 30_000,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 30100 cents exceeds the remaining 30000 cents"
        );

        let err = CoreError::not_found("Phone", "abc");
        assert_eq!(err.to_string(), "Phone not found: abc");
    }

    #[test]
    fn test_validation_failed_lists_every_problem() {
        let err = CoreError::ValidationFailed(vec![
            "sales[0] references missing phone p9".to_string(),
            "returns[1] references missing sale s4".to_string(),
        ]);
        let message = err.to_string();
        assert!(message.contains("p9"));
        assert!(message.contains("s4"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "model".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
