//! Account directory errors.

use bukubesar_shared::{AppError, ErrorKind};
use thiserror::Error;

use super::types::AccountType;

/// Errors raised while maintaining the chart of accounts.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Account code is empty or contains unsupported characters.
    #[error("Invalid account code '{0}': use digits, '.' or '-'")]
    InvalidCode(String),

    /// Account name is blank.
    #[error("Account name cannot be empty")]
    EmptyName,

    /// Account code already exists.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Parent account not found.
    #[error("Parent account '{0}' not found")]
    ParentNotFound(String),

    /// Parent account is not a header account.
    #[error("Parent account '{0}' is not a header account")]
    ParentNotHeader(String),

    /// Child type differs from the parent's type.
    #[error("Account type {child} does not match parent type {parent}")]
    ParentTypeMismatch {
        /// Requested type of the new account.
        child: AccountType,
        /// Type of the parent account.
        parent: AccountType,
    },

    /// Code or type change on an account that posted lines reference.
    #[error("Account '{0}' is referenced by posted journal lines; only name and metadata may change")]
    ReferencedByPostings(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(String),
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCode(_) => "INVALID_ACCOUNT_CODE",
            Self::EmptyName => "EMPTY_ACCOUNT_NAME",
            Self::DuplicateCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::ParentNotHeader(_) => "PARENT_NOT_HEADER",
            Self::ParentTypeMismatch { .. } => "PARENT_TYPE_MISMATCH",
            Self::ReferencedByPostings(_) => "ACCOUNT_REFERENCED",
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
        }
    }

    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCode(_)
            | Self::EmptyName
            | Self::ParentNotHeader(_)
            | Self::ParentTypeMismatch { .. } => ErrorKind::Validation,
            Self::DuplicateCode(_) | Self::ReferencedByPostings(_) => ErrorKind::Conflict,
            Self::ParentNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
