use common::{ParseStatusError, Version};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A versioned update found a different stored version (or no record).
    /// Nothing from the change set was written.
    #[error(
        "Concurrency conflict on {record_type} {id}: expected version {expected}, found {}",
        actual.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
    )]
    ConcurrencyConflict {
        record_type: &'static str,
        id: Uuid,
        expected: Version,
        actual: Option<Version>,
    },

    /// An insert collided with an existing unique key.
    #[error("{record_type} with {field} {value} already exists")]
    UniqueViolation {
        record_type: &'static str,
        field: &'static str,
        value: String,
    },

    /// The database aborted the transaction because of a deadlock or a
    /// serialization failure. Nothing from the change set was written.
    #[error("Transaction aborted ({sqlstate}): {message}")]
    TransactionAborted { sqlstate: String, message: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to a record.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<ParseStatusError> for StoreError {
    fn from(e: ParseStatusError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// SQLSTATE codes for transactions the server rolled back on its own.
const DEADLOCK_DETECTED: &str = "40P01";
const SERIALIZATION_FAILURE: &str = "40001";

impl StoreError {
    /// Returns true if retrying the whole read-validate-commit cycle may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrencyConflict { .. } | StoreError::TransactionAborted { .. }
        )
    }

    /// Wraps a database error, separating aborted transactions from other failures.
    pub fn from_database(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && let Some(code) = db_err.code()
            && (code == DEADLOCK_DETECTED || code == SERIALIZATION_FAILURE)
        {
            return StoreError::TransactionAborted {
                sqlstate: code.into_owned(),
                message: db_err.message().to_string(),
            };
        }
        StoreError::Database(e)
    }

    /// Re-examines a `Database` error raised through `?`.
    pub(crate) fn reclassify(self) -> Self {
        match self {
            StoreError::Database(e) => StoreError::from_database(e),
            other => other,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
