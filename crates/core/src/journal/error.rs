//! Journal engine errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use bukubesar_shared::types::{AccountId, JournalEntryId};
use bukubesar_shared::{AppError, ErrorKind};

use super::types::{EntryStatus, SourceType};

/// Errors that can occur while creating, posting or reversing entries.
#[derive(Debug, Error)]
pub enum JournalError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Line has neither a debit nor a credit amount.
    #[error("Line {0} has no amount")]
    ZeroAmount(i32),

    /// Line amount is negative.
    #[error("Line {0} has a negative amount")]
    NegativeAmount(i32),

    /// Line specifies both a debit and a credit.
    #[error("Line {0} must specify either debit or credit, not both")]
    BothSidesSet(i32),

    /// Description is blank.
    #[error("Journal entry description cannot be empty")]
    EmptyDescription,

    /// Reversal reason is blank.
    #[error("Reversal reason is required")]
    ReasonRequired,

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    /// Account is a header account and cannot hold lines.
    #[error("Account {0} is a header account and does not accept postings")]
    HeaderAccount(String),

    // ========== State Errors ==========
    /// Entry date falls inside a closed period.
    #[error("Date {0} falls in a closed period, no posting allowed")]
    PeriodClosed(NaiveDate),

    /// Transition not allowed from the current status.
    #[error("Cannot {action} a journal entry in status {from}")]
    InvalidTransition {
        /// The attempted action.
        action: &'static str,
        /// Current status.
        from: EntryStatus,
    },

    /// Entry was already reversed.
    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(JournalEntryId),

    /// Entry belongs to a payment or closing and must be reversed there.
    #[error(
        "Journal entry {id} has source {} and can only be reversed through {operation}",
        .source_type.as_str()
    )]
    ManagedBySource {
        /// The entry.
        id: JournalEntryId,
        /// Its source.
        source_type: SourceType,
        /// The operation that reverses it.
        operation: &'static str,
    },

    /// Entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),
}

impl JournalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::ZeroAmount(_) => "ZERO_AMOUNT",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::BothSidesSet(_) => "BOTH_SIDES_SET",
            Self::EmptyDescription => "EMPTY_DESCRIPTION",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::HeaderAccount(_) => "HEADER_ACCOUNT",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::ManagedBySource { .. } => "MANAGED_BY_SOURCE",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
        }
    }

    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientLines
            | Self::Unbalanced { .. }
            | Self::ZeroAmount(_)
            | Self::NegativeAmount(_)
            | Self::BothSidesSet(_)
            | Self::EmptyDescription
            | Self::ReasonRequired
            | Self::AccountNotFound(_)
            | Self::AccountInactive(_)
            | Self::HeaderAccount(_) => ErrorKind::Validation,

            Self::PeriodClosed(_)
            | Self::InvalidTransition { .. }
            | Self::AlreadyReversed(_)
            | Self::ManagedBySource { .. } => ErrorKind::Conflict,

            Self::EntryNotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<JournalError> for AppError {
    fn from(err: JournalError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
