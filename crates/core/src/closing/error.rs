//! Period closing errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use bukubesar_shared::types::PeriodClosingId;
use bukubesar_shared::{AppError, ErrorKind};

/// Errors raised while previewing, executing or reopening a closing.
#[derive(Debug, Error)]
pub enum ClosingError {
    /// Start date after end date.
    #[error("Invalid closing range: {start} is after {end}")]
    InvalidRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Range overlaps an already closed period.
    #[error("Range overlaps closed period {start}..{end}")]
    OverlapsClosedPeriod {
        /// Start of the closed period.
        start: NaiveDate,
        /// End of the closed period.
        end: NaiveDate,
    },

    /// No revenue or expense activity in the range.
    #[error("No revenue or expense activity to close between {start} and {end}")]
    NothingToClose {
        /// Range start.
        start: NaiveDate,
        /// Range end.
        end: NaiveDate,
    },

    /// Retained earnings account is missing.
    #[error("Retained earnings account {0} not found")]
    RetainedEarningsMissing(String),

    /// Retained earnings account is not an equity account.
    #[error("Retained earnings account {0} must be an EQUITY account")]
    RetainedEarningsNotEquity(String),

    /// Posted entries in the range do not balance.
    #[error("Posted entries in range are unbalanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntries {
        /// Σ debit in range.
        debit: Decimal,
        /// Σ credit in range.
        credit: Decimal,
    },

    /// Closing record not found.
    #[error("Period closing not found: {0}")]
    ClosingNotFound(PeriodClosingId),

    /// Closing record is not CLOSED.
    #[error("Period closing {0} is not closed")]
    NotClosed(PeriodClosingId),

    /// Reopen reason is blank.
    #[error("Reopen reason is required")]
    ReasonRequired,
}

impl ClosingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::OverlapsClosedPeriod { .. } => "OVERLAPS_CLOSED_PERIOD",
            Self::NothingToClose { .. } => "NOTHING_TO_CLOSE",
            Self::RetainedEarningsMissing(_) => "RETAINED_EARNINGS_MISSING",
            Self::RetainedEarningsNotEquity(_) => "RETAINED_EARNINGS_NOT_EQUITY",
            Self::UnbalancedEntries { .. } => "UNBALANCED_ENTRIES",
            Self::ClosingNotFound(_) => "CLOSING_NOT_FOUND",
            Self::NotClosed(_) => "NOT_CLOSED",
            Self::ReasonRequired => "REASON_REQUIRED",
        }
    }

    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange { .. }
            | Self::NothingToClose { .. }
            | Self::RetainedEarningsNotEquity(_)
            | Self::ReasonRequired => ErrorKind::Validation,
            Self::OverlapsClosedPeriod { .. }
            | Self::UnbalancedEntries { .. }
            | Self::NotClosed(_) => ErrorKind::Conflict,
            Self::RetainedEarningsMissing(_) | Self::ClosingNotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<ClosingError> for AppError {
    fn from(err: ClosingError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
