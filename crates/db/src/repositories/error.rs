//! Repository error type shared by every ledger repository.

use sea_orm::{DbErr, RuntimeErr, SqlErr};

use bukubesar_core::accounts::AccountError;
use bukubesar_core::closing::ClosingError;
use bukubesar_core::journal::JournalError;
use bukubesar_core::payment::PaymentError;
use bukubesar_core::reconciliation::ReconciliationError;
use bukubesar_shared::{AppError, ErrorKind};

/// SQLSTATE codes that mean "another transaction holds what you need".
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
/// Raised by the guard triggers.
const RAISE_EXCEPTION: &str = "P0001";

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Chart of accounts rule violated.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Journal rule violated.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// Payment rule violated.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Closing rule violated.
    #[error(transparent)]
    Closing(#[from] ClosingError),

    /// Reconciliation rule violated.
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    /// Lock wait exceeded, serialization failure or deadlock.
    #[error("Concurrent modification detected, please retry: {0}")]
    Contention(String),

    /// Unique constraint violated.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A guard trigger rejected the write.
    #[error("Rejected by database guard: {0}")]
    Guard(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        match sqlstate(&err).as_deref() {
            Some(LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                Self::Contention(err.to_string())
            }
            Some(RAISE_EXCEPTION) => Self::Guard(err.to_string()),
            _ => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Duplicate(detail),
                _ => Self::Database(err),
            },
        }
    }
}

/// Extracts the PostgreSQL SQLSTATE from a query or exec error.
fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db))) => {
            db.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

impl RepositoryError {
    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Account(e) => e.kind(),
            Self::Journal(e) => e.kind(),
            Self::Payment(e) => e.kind(),
            Self::Closing(e) => e.kind(),
            Self::Reconciliation(e) => e.kind(),
            Self::Contention(_) | Self::Duplicate(_) | Self::Guard(_) => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Account(e) => e.error_code(),
            Self::Journal(e) => e.error_code(),
            Self::Payment(e) => e.error_code(),
            Self::Closing(e) => e.error_code(),
            Self::Reconciliation(e) => e.error_code(),
            Self::Contention(_) => "CONTENTION",
            Self::Duplicate(_) => "DUPLICATE",
            Self::Guard(_) => "IMMUTABLE_RECORD",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the same request may succeed when retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Account(e) => e.into(),
            RepositoryError::Journal(e) => e.into(),
            RepositoryError::Payment(e) => e.into(),
            RepositoryError::Closing(e) => e.into(),
            RepositoryError::Reconciliation(e) => e.into(),
            RepositoryError::Contention(msg) => Self::Contention(msg),
            RepositoryError::Duplicate(msg) | RepositoryError::Guard(msg) => Self::Conflict(msg),
            RepositoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_db_error_is_internal() {
        let err = RepositoryError::from(DbErr::Custom("boom".into()));
        assert!(matches!(err, RepositoryError::Database(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_contention_is_retryable_conflict() {
        let err = RepositoryError::Contention("lock timeout".into());
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_retryable());
        assert!(AppError::from(err).is_retryable());
    }

    #[test]
    fn test_domain_errors_keep_their_kind() {
        let err = RepositoryError::from(JournalError::InsufficientLines);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }
}
