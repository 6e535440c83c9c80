//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (mortar-core)             │
//! │       │                                 │                               │
//! │       └──────────────┬──────────────────┘                               │
//! │                      ▼                                                  │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── kind()          → ErrorKind (machine readable)               │
//! │       └── user_message()  → text for the person at the counter         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error returned from a mutating operation means its transaction was
//! rolled back; nothing partial is left behind.

use mortar_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate (name, manufacturer) medicine
    /// - Duplicate customer / employee / supplier / user email
    /// - Duplicate username
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a customer, employee or medicine that doesn't exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Delete refused because other records still point at the row.
    #[error("{entity} {id} is still referenced by {referenced_by}")]
    Referenced {
        entity: String,
        id: String,
        referenced_by: String,
    },

    /// CHECK constraint violation (negative stock, negative price, ...).
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// Stale optimistic version or concurrent modification.
    #[error("{entity} {id} was modified concurrently (expected version {expected_version})")]
    Conflict {
        entity: String,
        id: String,
        expected_version: i64,
    },

    /// Business rule or validation failure from mortar-core.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Username/password pair did not match.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Coarse error category for callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad field values.
    Validation,
    /// Not enough stock to reserve.
    InsufficientStock,
    /// Unique / foreign key / check violation from the store.
    Integrity,
    NotFound,
    /// Stale version or an operation the current state forbids.
    Conflict,
    /// Anything else: connection, migration, query failures.
    Operation,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Referenced error.
    pub fn referenced(
        entity: impl Into<String>,
        id: impl ToString,
        referenced_by: impl Into<String>,
    ) -> Self {
        DbError::Referenced {
            entity: entity.into(),
            id: id.to_string(),
            referenced_by: referenced_by.into(),
        }
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::Referenced { .. }
            | DbError::CheckViolation { .. } => ErrorKind::Integrity,
            DbError::Conflict { .. } => ErrorKind::Conflict,
            DbError::Domain(core) => match core {
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CoreError::InvalidSaleStatus { .. } => ErrorKind::Conflict,
                CoreError::ItemNotInSale { .. } => ErrorKind::NotFound,
                CoreError::Validation(_) => ErrorKind::Validation,
            },
            DbError::InvalidCredentials => ErrorKind::Validation,
            DbError::PasswordHash(_)
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::Operation,
        }
    }

    /// Message suitable for showing to the user.
    ///
    /// Store internals (SQL text, constraint names) never leak through here.
    pub fn user_message(&self) -> String {
        match self {
            DbError::NotFound { entity, .. } => format!("{} not found.", entity),
            DbError::UniqueViolation { field, .. } => {
                if field.contains("medicines.name") || field.contains("medicines.manufacturer") {
                    "A medicine with this name and manufacturer already exists.".to_string()
                } else if field.contains("email") {
                    "A record with this email already exists.".to_string()
                } else if field.contains("username") {
                    "This username is already taken.".to_string()
                } else {
                    "A record with these details already exists.".to_string()
                }
            }
            DbError::ForeignKeyViolation { .. } => {
                "A referenced record does not exist or is still in use.".to_string()
            }
            DbError::Referenced {
                entity,
                referenced_by,
                ..
            } => format!(
                "Cannot delete {} as it is used in {}.",
                entity.to_lowercase(),
                referenced_by
            ),
            DbError::CheckViolation { .. } => "The values entered are out of range.".to_string(),
            DbError::Conflict { entity, .. } => format!(
                "This {} was changed by someone else. Reload and try again.",
                entity.to_lowercase()
            ),
            DbError::Domain(CoreError::InsufficientStock { available, .. }) => {
                format!("Not enough stock. Only {} units available.", available)
            }
            DbError::Domain(CoreError::InvalidSaleStatus { operation, .. })
                if operation == "edit" =>
            {
                "Cannot edit sale with existing items.".to_string()
            }
            DbError::Domain(CoreError::InvalidSaleStatus {
                status, operation, ..
            }) => format!("Cannot {} a {} sale.", operation, status),
            DbError::Domain(CoreError::ItemNotInSale { .. }) => "Invalid sale item.".to_string(),
            DbError::Domain(CoreError::Validation(v)) => v.to_string(),
            DbError::InvalidCredentials => "Invalid username or password.".to_string(),
            _ => "An error occurred while saving your changes.".to_string(),
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
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
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <name>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
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

impl From<argon2::password_hash::Error> for DbError {
    fn from(err: argon2::password_hash::Error) -> Self {
        DbError::PasswordHash(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_kind_and_message() {
        let err: DbError = CoreError::InsufficientStock {
            medicine: "Aspirin".to_string(),
            available: 5,
            requested: 10,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(err.user_message(), "Not enough stock. Only 5 units available.");
    }

    #[test]
    fn test_integrity_kinds() {
        assert_eq!(
            DbError::duplicate("customers.email", "a@b.com").kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            DbError::referenced("Medicine", 3, "prescriptions or sales").kind(),
            ErrorKind::Integrity
        );
    }

    #[test]
    fn test_unique_message_for_medicine() {
        let err = DbError::duplicate("medicines.name, medicines.manufacturer", "unknown");
        assert_eq!(
            err.user_message(),
            "A medicine with this name and manufacturer already exists."
        );
    }

    #[test]
    fn test_referenced_message() {
        let err = DbError::referenced("Medicine", 3, "prescriptions or sales");
        assert_eq!(
            err.user_message(),
            "Cannot delete medicine as it is used in prescriptions or sales."
        );
    }

    #[test]
    fn test_edit_with_items_message() {
        let err: DbError = CoreError::InvalidSaleStatus {
            sale_id: 1,
            status: "active".to_string(),
            operation: "edit".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.user_message(), "Cannot edit sale with existing items.");
    }

    #[test]
    fn test_validation_kind() {
        let err: DbError = ValidationError::Required {
            field: "name".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "name is required");
    }

    #[test]
    fn test_operation_message_hides_details() {
        let err = DbError::QueryFailed("near \"SELEC\": syntax error".to_string());
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert!(!err.user_message().contains("SELEC"));
    }
}
