//! Closing computation.
//!
//! Zeroes every revenue and expense account with activity in a range and
//! moves the net result into retained earnings with one balanced entry.

use rust_decimal::Decimal;

use bukubesar_shared::types::UserId;

use super::error::ClosingError;
use super::types::{
    AccountActivity, ClosedPeriod, ClosingAccountLine, ClosingPreview, ClosingStatus,
    ClosingType, LastClosingInfo, PeriodRange, RetainedEarnings,
};
use crate::accounts::AccountType;
use crate::journal::{EntryInput, LineInput, SourceType};

/// Everything the closing engine reads before deciding.
#[derive(Debug, Clone)]
pub struct ClosingContext<'a> {
    /// Range to close.
    pub range: PeriodRange,
    /// Per-account activity in the range.
    pub activity: &'a [AccountActivity],
    /// Configured retained earnings code.
    pub retained_earnings_code: &'a str,
    /// The retained earnings account, if it exists.
    pub retained_earnings: Option<&'a RetainedEarnings>,
    /// CLOSED periods that overlap the range.
    pub overlapping: &'a [PeriodRange],
    /// Σ debit and Σ credit of all on-books lines in the range.
    pub range_totals: (Decimal, Decimal),
}

/// A validated closing ready to be posted.
#[derive(Debug, Clone)]
pub struct ClosingPlan {
    /// The closing journal entry.
    pub entry: EntryInput,
    /// Σ revenue balances.
    pub total_revenue: Decimal,
    /// Σ expense balances.
    pub total_expense: Decimal,
    /// Revenue minus expense.
    pub net_income: Decimal,
}

/// Stateless closing calculations.
pub struct ClosingService;

impl ClosingService {
    /// Revenue and expense accounts with non-zero activity, by code.
    #[must_use]
    pub fn closing_lines(
        activity: &[AccountActivity],
    ) -> (Vec<ClosingAccountLine>, Vec<ClosingAccountLine>) {
        let mut lines: Vec<ClosingAccountLine> = activity
            .iter()
            .filter(|a| a.account_type.is_temporary() && !a.is_header)
            .filter(|a| !a.balance().is_zero())
            .map(|a| ClosingAccountLine {
                account_id: a.account_id,
                code: a.code.clone(),
                name: a.name.clone(),
                account_type: a.account_type,
                balance: a.balance(),
            })
            .collect();
        lines.sort_by(|a, b| a.code.cmp(&b.code));

        lines
            .into_iter()
            .partition(|l| l.account_type == AccountType::Revenue)
    }

    /// Rejects `range` if any closed period overlaps it.
    ///
    /// # Errors
    ///
    /// `OverlapsClosedPeriod` naming the first overlapping period.
    pub fn ensure_not_overlapping(
        range: &PeriodRange,
        closed: &[PeriodRange],
    ) -> Result<(), ClosingError> {
        match closed.iter().find(|c| c.overlaps(range)) {
            Some(c) => Err(ClosingError::OverlapsClosedPeriod {
                start: c.start,
                end: c.end,
            }),
            None => Ok(()),
        }
    }

    /// All reasons the closing would be refused, in precedence order.
    fn blockers(ctx: &ClosingContext<'_>, has_lines: bool) -> Vec<ClosingError> {
        let mut blockers = Vec::new();

        if let Err(err) = Self::ensure_not_overlapping(&ctx.range, ctx.overlapping) {
            blockers.push(err);
        }

        match ctx.retained_earnings {
            None => blockers.push(ClosingError::RetainedEarningsMissing(
                ctx.retained_earnings_code.to_string(),
            )),
            Some(re) if re.account_type != AccountType::Equity => {
                blockers.push(ClosingError::RetainedEarningsNotEquity(re.code.clone()));
            }
            Some(_) => {}
        }

        let (debit, credit) = ctx.range_totals;
        if debit != credit {
            blockers.push(ClosingError::UnbalancedEntries { debit, credit });
        }

        if !has_lines {
            blockers.push(ClosingError::NothingToClose {
                start: ctx.range.start,
                end: ctx.range.end,
            });
        }

        blockers
    }

    /// Builds the read-only preview.
    #[must_use]
    pub fn preview(ctx: &ClosingContext<'_>) -> ClosingPreview {
        let (revenue_accounts, expense_accounts) = Self::closing_lines(ctx.activity);
        let total_revenue: Decimal = revenue_accounts.iter().map(|l| l.balance).sum();
        let total_expense: Decimal = expense_accounts.iter().map(|l| l.balance).sum();
        let has_lines = !revenue_accounts.is_empty() || !expense_accounts.is_empty();

        let validation_messages: Vec<String> = Self::blockers(ctx, has_lines)
            .iter()
            .map(ToString::to_string)
            .collect();

        ClosingPreview {
            range: ctx.range,
            revenue_accounts,
            expense_accounts,
            total_revenue,
            total_expense,
            net_income: total_revenue - total_expense,
            retained_earnings_code: ctx.retained_earnings.map(|re| re.code.clone()),
            can_close: validation_messages.is_empty(),
            validation_messages,
        }
    }

    /// Validates the closing and builds its journal entry.
    ///
    /// Revenue with a credit balance is debited, expense with a debit
    /// balance is credited (contra balances the other way). Net income is
    /// credited to retained earnings, a net loss debited; a zero result
    /// posts no retained earnings line.
    ///
    /// # Errors
    ///
    /// The first blocker: overlap, retained earnings problems, unbalanced
    /// entries in range, or nothing to close.
    pub fn plan(
        ctx: &ClosingContext<'_>,
        closing_type: ClosingType,
        description: Option<&str>,
        created_by: UserId,
    ) -> Result<ClosingPlan, ClosingError> {
        let (revenue, expense) = Self::closing_lines(ctx.activity);
        let has_lines = !revenue.is_empty() || !expense.is_empty();

        if let Some(err) = Self::blockers(ctx, has_lines).into_iter().next() {
            return Err(err);
        }
        let retained = ctx
            .retained_earnings
            .ok_or_else(|| ClosingError::RetainedEarningsMissing(ctx.retained_earnings_code.to_string()))?;

        let total_revenue: Decimal = revenue.iter().map(|l| l.balance).sum();
        let total_expense: Decimal = expense.iter().map(|l| l.balance).sum();
        let net_income = total_revenue - total_expense;

        let mut lines = Vec::with_capacity(revenue.len() + expense.len() + 1);
        for line in &revenue {
            let closing = if line.balance > Decimal::ZERO {
                LineInput::debit(line.account_id, line.balance)
            } else {
                LineInput::credit(line.account_id, -line.balance)
            };
            lines.push(closing.with_description(format!("Close {} {}", line.code, line.name)));
        }
        for line in &expense {
            let closing = if line.balance > Decimal::ZERO {
                LineInput::credit(line.account_id, line.balance)
            } else {
                LineInput::debit(line.account_id, -line.balance)
            };
            lines.push(closing.with_description(format!("Close {} {}", line.code, line.name)));
        }

        if net_income > Decimal::ZERO {
            lines.push(
                LineInput::credit(retained.account_id, net_income)
                    .with_description("Net income to retained earnings"),
            );
        } else if net_income < Decimal::ZERO {
            lines.push(
                LineInput::debit(retained.account_id, -net_income)
                    .with_description("Net loss to retained earnings"),
            );
        }

        let label = match closing_type {
            ClosingType::Period => "Period closing",
            ClosingType::FiscalYear => "Fiscal year closing",
        };
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map_or_else(|| format!("{label} {}", ctx.range), ToString::to_string);

        Ok(ClosingPlan {
            entry: EntryInput {
                entry_date: ctx.range.end,
                reference: None,
                description,
                source_type: SourceType::PeriodClosing,
                source_id: None,
                lines,
                created_by,
            },
            total_revenue,
            total_expense,
            net_income,
        })
    }

    /// Summarizes the latest CLOSED period.
    #[must_use]
    pub fn last_closing_info(latest: Option<&ClosedPeriod>) -> LastClosingInfo {
        match latest.filter(|c| c.status == ClosingStatus::Closed) {
            Some(closing) => LastClosingInfo {
                has_previous_closing: true,
                last_closing_date: Some(closing.range.end),
                next_start_date: closing.range.end.succ_opt(),
                last_net_income: Some(closing.net_income),
            },
            None => LastClosingInfo {
                has_previous_closing: false,
                last_closing_date: None,
                next_start_date: None,
                last_net_income: None,
            },
        }
    }

    /// Checks that a closing may be reopened.
    ///
    /// # Errors
    ///
    /// `ReasonRequired` or `NotClosed`.
    pub fn validate_reopen(closing: &ClosedPeriod, reason: &str) -> Result<(), ClosingError> {
        if reason.trim().is_empty() {
            return Err(ClosingError::ReasonRequired);
        }
        if closing.status != ClosingStatus::Closed {
            return Err(ClosingError::NotClosed(closing.id));
        }
        Ok(())
    }
}
