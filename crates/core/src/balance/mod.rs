//! Account balance materialization.
//!
//! Balances are a derived table keyed by account. The repository aggregates
//! on-books journal lines; this module turns those sums into signed
//! balances and compares materialized rows against fresh aggregates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bukubesar_shared::types::AccountId;

use crate::accounts::NormalBalance;

/// Aggregated totals and signed balance for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTotals {
    /// The account ID.
    pub account_id: AccountId,
    /// Sum of debit amounts.
    pub total_debit: Decimal,
    /// Sum of credit amounts.
    pub total_credit: Decimal,
    /// Net balance, signed per the normal side.
    pub balance: Decimal,
}

impl AccountTotals {
    /// Builds totals from raw debit/credit sums.
    ///
    /// - Debit-normal: balance = debit - credit
    /// - Credit-normal: balance = credit - debit
    #[must_use]
    pub fn from_sums(
        account_id: AccountId,
        normal_balance: NormalBalance,
        total_debit: Decimal,
        total_credit: Decimal,
    ) -> Self {
        Self {
            account_id,
            total_debit,
            total_credit,
            balance: normal_balance.balance_change(total_debit, total_credit),
        }
    }

    /// Totals for an account without any on-books lines.
    #[must_use]
    pub const fn empty(account_id: AccountId) -> Self {
        Self {
            account_id,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }
}

/// Difference between a materialized row and a fresh aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    /// The account ID.
    pub account_id: AccountId,
    /// Materialized balance (`None` if the row is missing).
    pub materialized: Option<Decimal>,
    /// Balance computed from journal lines.
    pub computed: Decimal,
    /// `computed - materialized`, treating a missing row as zero.
    pub difference: Decimal,
}

/// Result of the global double-entry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialBalance {
    /// Σ debit over all accounts.
    pub total_debit: Decimal,
    /// Σ credit over all accounts.
    pub total_credit: Decimal,
}

impl TrialBalance {
    /// Returns true when Σdebit = Σcredit.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// Pure balance calculations.
pub struct BalanceService;

impl BalanceService {
    /// Compares materialized rows with fresh aggregates.
    ///
    /// Only accounts whose values differ are reported. A computed account
    /// with a zero balance and no materialized row is not drift.
    #[must_use]
    pub fn detect_drift(
        materialized: &[AccountTotals],
        computed: &[AccountTotals],
    ) -> Vec<BalanceDrift> {
        let mut drifts: Vec<BalanceDrift> = computed
            .iter()
            .filter_map(|fresh| {
                let stored = materialized
                    .iter()
                    .find(|m| m.account_id == fresh.account_id);
                let stored_balance = stored.map(|m| m.balance);
                let matches = stored.map_or(fresh.balance.is_zero(), |m| m == fresh);
                (!matches).then(|| BalanceDrift {
                    account_id: fresh.account_id,
                    materialized: stored_balance,
                    computed: fresh.balance,
                    difference: fresh.balance - stored_balance.unwrap_or(Decimal::ZERO),
                })
            })
            .collect();

        // Rows for accounts that no longer aggregate to anything.
        drifts.extend(
            materialized
                .iter()
                .filter(|m| !computed.iter().any(|c| c.account_id == m.account_id))
                .filter(|m| !m.balance.is_zero())
                .map(|m| BalanceDrift {
                    account_id: m.account_id,
                    materialized: Some(m.balance),
                    computed: Decimal::ZERO,
                    difference: -m.balance,
                }),
        );

        drifts
    }

    /// Sums every account's raw totals.
    #[must_use]
    pub fn trial_balance(totals: &[AccountTotals]) -> TrialBalance {
        TrialBalance {
            total_debit: totals.iter().map(|t| t.total_debit).sum(),
            total_credit: totals.iter().map(|t| t.total_credit).sum(),
        }
    }
}

#[cfg(test)]
mod props;
