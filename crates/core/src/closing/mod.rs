//! Period closing.
//!
//! Moves revenue and expense into retained earnings and locks the range
//! against further postings until it is reopened.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod props;

pub use error::ClosingError;
pub use service::{ClosingContext, ClosingPlan, ClosingService};
pub use types::{
    AccountActivity, ClosedPeriod, ClosingAccountLine, ClosingPreview, ClosingStatus,
    ClosingType, LastClosingInfo, PeriodRange, RetainedEarnings,
};

use chrono::NaiveDate;

/// Returns true if `date` falls inside any CLOSED period in `closed`.
#[must_use]
pub fn is_date_in_closed_period(date: NaiveDate, closed: &[ClosedPeriod]) -> bool {
    closed
        .iter()
        .any(|c| c.status == ClosingStatus::Closed && c.range.contains(date))
}
