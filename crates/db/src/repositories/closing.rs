//! Closing repository: period and fiscal-year closing, reopening and
//! closed-period lookups.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{info, instrument};

use bukubesar_core::accounts::AccountType;
use bukubesar_core::closing::{
    AccountActivity, ClosedPeriod, ClosingContext, ClosingError, ClosingPreview, ClosingService,
    ClosingType, LastClosingInfo, PeriodRange, RetainedEarnings,
};
use bukubesar_core::journal::EntryStatus;
use bukubesar_shared::types::{AccountId, PeriodClosingId, UserId};

use super::account::account_by_code;
use super::convert;
use super::error::RepositoryError;
use super::journal;
use super::posting::{self, EntryWithLines, LedgerSettings};
use crate::entities::{
    accounts, period_closings,
    sea_orm_active_enums::{AccountType as DbAccountType, ClosingStatus as DbClosingStatus},
};

/// A committed closing with its journal entry.
#[derive(Debug, Clone, Serialize)]
pub struct ClosingRecord {
    /// The CLOSED period row.
    pub closing: period_closings::Model,
    /// The closing entry.
    pub entry: EntryWithLines,
}

/// Everything the closing rules read for one range.
struct RangeState {
    activity: Vec<AccountActivity>,
    retained_earnings: Option<RetainedEarnings>,
    overlapping: Vec<PeriodRange>,
    range_totals: (Decimal, Decimal),
}

impl RangeState {
    fn context<'a>(&'a self, range: PeriodRange, code: &'a str) -> ClosingContext<'a> {
        ClosingContext {
            range,
            activity: &self.activity,
            retained_earnings_code: code,
            retained_earnings: self.retained_earnings.as_ref(),
            overlapping: &self.overlapping,
            range_totals: self.range_totals,
        }
    }
}

/// Closing repository.
#[derive(Debug, Clone)]
pub struct ClosingRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl ClosingRepository {
    /// Creates a new closing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Previews closing `range` without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn preview(&self, range: PeriodRange) -> Result<ClosingPreview, RepositoryError> {
        let state = self.range_state(&self.db, range).await?;
        Ok(ClosingService::preview(
            &state.context(range, &self.settings.ledger.retained_earnings_code),
        ))
    }

    /// Previews closing the fiscal year ending on `fiscal_year_end`.
    ///
    /// # Errors
    ///
    /// `InvalidRange` for an unrepresentable year, or a database error.
    pub async fn preview_fiscal_year(
        &self,
        fiscal_year_end: NaiveDate,
    ) -> Result<ClosingPreview, RepositoryError> {
        self.preview(PeriodRange::fiscal_year_ending(fiscal_year_end)?)
            .await
    }

    /// Closes `range`: zeroes revenue and expense into retained earnings
    /// and records the CLOSED period.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The range overlaps a CLOSED period
    /// - Retained earnings is missing or not an equity account
    /// - Lines in the range do not balance, or nothing has activity
    /// - In-flight postings hold the period gate past the lock timeout
    pub async fn execute(
        &self,
        range: PeriodRange,
        description: Option<&str>,
        closed_by: UserId,
    ) -> Result<ClosingRecord, RepositoryError> {
        self.close(range, ClosingType::Period, description, closed_by)
            .await
    }

    /// Closes the fiscal year ending on `fiscal_year_end`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`].
    pub async fn execute_fiscal_year(
        &self,
        fiscal_year_end: NaiveDate,
        description: Option<&str>,
        closed_by: UserId,
    ) -> Result<ClosingRecord, RepositoryError> {
        let range = PeriodRange::fiscal_year_ending(fiscal_year_end)?;
        self.close(range, ClosingType::FiscalYear, description, closed_by)
            .await
    }

    #[instrument(skip(self, description), fields(start = %range.start, end = %range.end))]
    async fn close(
        &self,
        range: PeriodRange,
        closing_type: ClosingType,
        description: Option<&str>,
        closed_by: UserId,
    ) -> Result<ClosingRecord, RepositoryError> {
        let txn = posting::begin(&self.db, &self.settings).await?;
        posting::enter_closing_gate(&txn).await?;

        let state = self.range_state(&txn, range).await?;
        let ctx = state.context(range, &self.settings.ledger.retained_earnings_code);
        let plan = ClosingService::plan(&ctx, closing_type, description, closed_by)?;

        let closed = posting::closed_periods(&txn).await?;
        let entry =
            posting::insert_entry(&txn, &plan.entry, EntryStatus::Posted, &closed, None).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let closing = period_closings::ActiveModel {
            id: Set(PeriodClosingId::new().into_inner()),
            start_date: Set(range.start),
            end_date: Set(range.end),
            closing_type: Set(closing_type.into()),
            status: Set(DbClosingStatus::Closed),
            description: Set(entry.entry.description.clone()),
            journal_entry_id: Set(Some(entry.entry.id)),
            total_revenue: Set(plan.total_revenue),
            total_expense: Set(plan.total_expense),
            net_income: Set(plan.net_income),
            closed_by: Set(closed_by.into_inner()),
            closed_at: Set(now),
            reopened_by: Set(None),
            reopened_at: Set(None),
            reopen_reason: Set(None),
            reopen_entry_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            closing_id = %closing.id,
            entry_id = %entry.entry.id,
            total_revenue = %plan.total_revenue,
            total_expense = %plan.total_expense,
            net_income = %plan.net_income,
            "period closed"
        );
        Ok(ClosingRecord { closing, entry })
    }

    /// Reopens a CLOSED period by reversing its closing entry.
    ///
    /// The reversal is dated at the period end. The row stays, flipped to
    /// OPEN with who reopened it, when and why.
    ///
    /// # Errors
    ///
    /// `ClosingNotFound`, `NotClosed` or `ReasonRequired`.
    #[instrument(skip(self, reason))]
    pub async fn reopen(
        &self,
        id: PeriodClosingId,
        reason: &str,
        reopened_by: UserId,
    ) -> Result<period_closings::Model, RepositoryError> {
        let txn = posting::begin(&self.db, &self.settings).await?;
        posting::enter_closing_gate(&txn).await?;

        let row = period_closings::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ClosingError::ClosingNotFound(id))?;
        let closing = convert::closed_period(&row);
        ClosingService::validate_reopen(&closing, reason)?;

        let others: Vec<ClosedPeriod> = posting::closed_periods(&txn)
            .await?
            .into_iter()
            .filter(|c| c.id != closing.id)
            .collect();

        let reopen_entry_id = match closing.journal_entry_id {
            Some(entry_id) => {
                let pair = journal::reverse_in(
                    &txn,
                    entry_id,
                    reason,
                    closing.range.end,
                    reopened_by,
                    &others,
                )
                .await?;
                Some(pair.reversal.entry.id)
            }
            None => None,
        };

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: period_closings::ActiveModel = row.into();
        active.status = Set(DbClosingStatus::Open);
        active.reopened_by = Set(Some(reopened_by.into_inner()));
        active.reopened_at = Set(Some(now));
        active.reopen_reason = Set(Some(reason.trim().to_string()));
        active.reopen_entry_id = Set(reopen_entry_id);
        active.updated_at = Set(now);
        let reopened = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            closing_id = %reopened.id,
            reversal_id = ?reopen_entry_id,
            "period reopened"
        );
        Ok(reopened)
    }

    /// Summary of the latest CLOSED period.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn last_closing_info(&self) -> Result<LastClosingInfo, RepositoryError> {
        let latest = period_closings::Entity::find()
            .filter(period_closings::Column::Status.eq(DbClosingStatus::Closed))
            .order_by_desc(period_closings::Column::EndDate)
            .limit(1)
            .one(&self.db)
            .await?
            .map(|row| convert::closed_period(&row));
        Ok(ClosingService::last_closing_info(latest.as_ref()))
    }

    /// Closed and reopened periods, newest end date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(&self, limit: u64) -> Result<Vec<period_closings::Model>, RepositoryError> {
        Ok(period_closings::Entity::find()
            .order_by_desc(period_closings::Column::EndDate)
            .order_by_desc(period_closings::Column::ClosedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// The CLOSED period containing `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn period_info_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Option<period_closings::Model>, RepositoryError> {
        Ok(period_closings::Entity::find()
            .filter(period_closings::Column::Status.eq(DbClosingStatus::Closed))
            .filter(period_closings::Column::StartDate.lte(date))
            .filter(period_closings::Column::EndDate.gte(date))
            .one(&self.db)
            .await?)
    }

    /// Returns true if `date` lies in a CLOSED period.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn is_date_in_closed_period(&self, date: NaiveDate) -> Result<bool, RepositoryError> {
        Ok(self.period_info_for_date(date).await?.is_some())
    }

    async fn range_state<C: ConnectionTrait>(
        &self,
        conn: &C,
        range: PeriodRange,
    ) -> Result<RangeState, DbErr> {
        let sums = posting::line_sums(conn, None, Some(range.start), Some(range.end)).await?;
        let range_totals = sums.iter().fold((Decimal::ZERO, Decimal::ZERO), |acc, s| {
            (acc.0 + s.total_debit, acc.1 + s.total_credit)
        });

        let temporary = accounts::Entity::find()
            .filter(
                accounts::Column::AccountType.is_in([DbAccountType::Revenue, DbAccountType::Expense]),
            )
            .order_by_asc(accounts::Column::Code)
            .all(conn)
            .await?;
        let activity = temporary
            .into_iter()
            .filter_map(|account| {
                let sum = sums.iter().find(|s| s.account_id == account.id)?;
                Some(AccountActivity {
                    account_id: AccountId::from_uuid(account.id),
                    account_type: AccountType::from(account.account_type),
                    code: account.code,
                    name: account.name,
                    is_header: account.is_header,
                    total_debit: sum.total_debit,
                    total_credit: sum.total_credit,
                })
            })
            .collect();

        let retained_earnings = account_by_code(conn, &self.settings.ledger.retained_earnings_code)
            .await?
            .map(|account| RetainedEarnings {
                account_id: AccountId::from_uuid(account.id),
                code: account.code,
                account_type: account.account_type.into(),
            });

        let overlapping = posting::closed_periods(conn)
            .await?
            .into_iter()
            .map(|c| c.range)
            .filter(|r| r.overlaps(&range))
            .collect();

        Ok(RangeState {
            activity,
            retained_earnings,
            overlapping,
            range_totals,
        })
    }
}
