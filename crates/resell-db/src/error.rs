//! # Storage Error Types
//!
//! Error types for store, engine and backup operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / io::Error / serde_json::Error                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization                             │
//! │       │                                                                 │
//! │       ├──────────────────────┐                                          │
//! │       ▼                      ▼                                          │
//! │  ServiceError           BackupError                                    │
//! │  (Lifecycle Engine)     (Backup Codec; says whether a safety           │
//! │  Core(CoreError)         backup exists)                                 │
//! │  Db(DbError)                                                           │
//! │       │                      │                                          │
//! │       ▼                      ▼                                          │
//! │  Caller displays the message as-is                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use resell_core::CoreError;
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Store operation errors.
///
/// These errors wrap sqlx, I/O and serialization errors and provide
/// additional context for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in the store.
    ///
    /// ## When This Occurs
    /// - `update` or `delete` of an id that does not exist for the tenant
    /// - `Table::require` on a missing id
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a phone whose imei1 is already stored for the tenant
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - Runtime SQL error
    /// - A query named a column the record does not have
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File system error (backup archive).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: phones.tenant_id, phones.imei1"
                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    let column = columns.split(", ").last().unwrap_or(columns);
                    let field = column.rsplit('.').next().unwrap_or(column).to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// ServiceError
// =============================================================================

/// Errors returned by the Lifecycle Engine.
///
/// Rule violations come through as `Core`; a store reporting a missing row
/// is folded into `Core(NotFound)` so callers match on one variant.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::Core(CoreError::NotFound { entity, id }),
            other => ServiceError::Db(other),
        }
    }
}

impl From<resell_core::ValidationError> for ServiceError {
    fn from(err: resell_core::ValidationError) -> Self {
        ServiceError::Core(err.into())
    }
}

impl ServiceError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            ServiceError::Core(err) => Some(err),
            ServiceError::Db(_) => None,
        }
    }
}

/// Result type for engine operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// BackupError
// =============================================================================

/// Backup export and restore failures.
///
/// Restore failures that can happen after live data was touched say
/// whether a safety backup was written, and where.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The document is not JSON at all. Nothing was modified.
    #[error("Backup file could not be read: {reason}. No data was modified")]
    Unreadable { reason: String },

    /// Structural or referential problems. Nothing was modified.
    #[error("{}", CoreError::ValidationFailed(.0.clone()))]
    Invalid(Vec<String>),

    /// The restore stopped after live data may have been cleared.
    #[error("Restore aborted: {source}. {}", safety_note(.safety_backup))]
    Aborted {
        #[source]
        source: DbError,
        safety_backup: Option<String>,
    },

    /// Reading live data or writing the export failed.
    #[error("Export failed: {0}")]
    Export(#[source] DbError),
}

fn safety_note(safety_backup: &Option<String>) -> String {
    match safety_backup {
        Some(name) => format!("Previous data was saved to safety backup {}", name),
        None => "No safety backup exists".to_string(),
    }
}

impl BackupError {
    /// Name of the safety backup, if one was written before the failure.
    pub fn safety_backup(&self) -> Option<&str> {
        match self {
            BackupError::Aborted { safety_backup, .. } => safety_backup.as_deref(),
            _ => None,
        }
    }
}

/// Result type for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_becomes_domain_not_found() {
        let err: ServiceError = DbError::not_found("Phone", "p1").into();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::NotFound { entity, id }) if entity == "Phone" && id == "p1"
        ));

        let err: ServiceError = DbError::PoolExhausted.into();
        assert!(err.as_core().is_none());
    }

    #[test]
    fn test_aborted_restore_names_safety_backup() {
        let err = BackupError::Aborted {
            source: DbError::PoolExhausted,
            safety_backup: Some("safety-backup-20260520-101500000.json".to_string()),
        };
        assert!(err.to_string().contains("safety-backup-20260520-101500000.json"));
        assert_eq!(err.safety_backup(), Some("safety-backup-20260520-101500000.json"));

        let err = BackupError::Aborted {
            source: DbError::PoolExhausted,
            safety_backup: None,
        };
        assert!(err.to_string().contains("No safety backup exists"));
    }

    #[test]
    fn test_invalid_backup_lists_problems() {
        let err = BackupError::Invalid(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Backup validation failed: a; b");
    }
}
