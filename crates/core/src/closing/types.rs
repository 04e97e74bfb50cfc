//! Period closing domain types.

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use bukubesar_shared::types::{AccountId, JournalEntryId, PeriodClosingId};

use super::error::ClosingError;
use crate::accounts::AccountType;

/// Status of a period closing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClosingStatus {
    /// Reopened; postings inside the range are accepted again.
    Open,
    /// Closed; postings inside the range are rejected.
    Closed,
}

impl fmt::Display for ClosingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Scope of a closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingType {
    /// Arbitrary date range.
    Period,
    /// Twelve months ending at the fiscal-year end.
    FiscalYear,
}

/// Inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    /// First day of the range.
    pub start: NaiveDate,
    /// Last day of the range.
    pub end: NaiveDate,
}

impl PeriodRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ClosingError> {
        if start > end {
            return Err(ClosingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The fiscal year ending at `end`: `[end − 1 year + 1 day, end]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if the start date is not representable.
    pub fn fiscal_year_ending(end: NaiveDate) -> Result<Self, ClosingError> {
        let start = end
            .checked_sub_months(Months::new(12))
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .ok_or(ClosingError::InvalidRange { start: end, end })?;
        Self::new(start, end)
    }

    /// Returns true if `date` lies inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Activity of one account in a range, as aggregated from on-books lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountActivity {
    /// The account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Whether the account is a header.
    pub is_header: bool,
    /// Σ debit in range.
    pub total_debit: Decimal,
    /// Σ credit in range.
    pub total_credit: Decimal,
}

impl AccountActivity {
    /// Balance on the account's normal side.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.account_type
            .normal_balance()
            .balance_change(self.total_debit, self.total_credit)
    }
}

/// A revenue or expense account that closing will zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingAccountLine {
    /// The account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type (REVENUE or EXPENSE).
    pub account_type: AccountType,
    /// Normal-side balance in range.
    pub balance: Decimal,
}

/// Retained earnings account as seen by the closing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedEarnings {
    /// The account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account type; must be EQUITY.
    pub account_type: AccountType,
}

/// Read-only closing preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingPreview {
    /// Range being closed.
    pub range: PeriodRange,
    /// Revenue accounts with activity.
    pub revenue_accounts: Vec<ClosingAccountLine>,
    /// Expense accounts with activity.
    pub expense_accounts: Vec<ClosingAccountLine>,
    /// Σ revenue balances.
    pub total_revenue: Decimal,
    /// Σ expense balances.
    pub total_expense: Decimal,
    /// Revenue minus expense.
    pub net_income: Decimal,
    /// Retained earnings account code, if present.
    pub retained_earnings_code: Option<String>,
    /// Whether execution would be accepted.
    pub can_close: bool,
    /// Reasons preventing the close.
    pub validation_messages: Vec<String>,
}

/// Stored closing record as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosedPeriod {
    /// Record ID.
    pub id: PeriodClosingId,
    /// Closed range.
    pub range: PeriodRange,
    /// Current status.
    pub status: ClosingStatus,
    /// Closing journal entry.
    pub journal_entry_id: Option<JournalEntryId>,
    /// Net income recorded at closing.
    pub net_income: Decimal,
}

/// Summary of the most recent closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastClosingInfo {
    /// Whether any CLOSED period exists.
    pub has_previous_closing: bool,
    /// End date of the latest CLOSED period.
    pub last_closing_date: Option<NaiveDate>,
    /// Day after the latest closing; where the next period starts.
    pub next_start_date: Option<NaiveDate>,
    /// Net income of the latest CLOSED period.
    pub last_net_income: Option<Decimal>,
}
