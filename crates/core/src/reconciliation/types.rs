//! Reconciliation types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bukubesar_shared::types::{AccountId, CashBankId, JournalEntryId};

/// Which side is treated as authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Ledger wins: subsidiary balance is set to the refreshed ledger balance.
    #[default]
    ToSsot,
    /// Subsidiary is rebuilt from its transaction log; ledger refreshed from lines.
    ToTransactions,
    /// Subsidiary wins: a correcting entry moves the ledger to match it.
    ToCoa,
}

impl ReconcileStrategy {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToSsot => "to_ssot",
            Self::ToTransactions => "to_transactions",
            Self::ToCoa => "to_coa",
        }
    }
}

/// Reconciliation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Strategy; `to_ssot` when omitted.
    #[serde(default)]
    pub strategy: ReconcileStrategy,
    /// Compute outcomes without writing.
    #[serde(default)]
    pub dry_run: bool,
    /// Restrict to these records; all linked records when empty.
    #[serde(default)]
    pub cash_bank_ids: Vec<CashBankId>,
}

/// Everything known about one cash/bank record before reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashBankSnapshot {
    /// The cash/bank record.
    pub cash_bank_id: CashBankId,
    /// Display name.
    pub name: String,
    /// Linked GL account.
    pub account_id: AccountId,
    /// Balance stored on the subsidiary record.
    pub stored_balance: Decimal,
    /// Σ of the record's transaction log.
    pub transaction_sum: Decimal,
    /// Balance in `account_balances`, if a row exists.
    pub ledger_materialized: Option<Decimal>,
    /// Balance aggregated from on-books journal lines.
    pub ledger_computed: Decimal,
}

impl CashBankSnapshot {
    /// Ledger balance as currently materialized (zero without a row).
    #[must_use]
    pub fn ledger_before(&self) -> Decimal {
        self.ledger_materialized.unwrap_or(Decimal::ZERO)
    }
}

/// Size of a subsidiary/ledger difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStatus {
    /// Equal.
    Matched,
    /// Non-zero but below the settlement epsilon.
    MinorVariance,
    /// At least the settlement epsilon.
    Variance,
}

/// What a strategy does to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileAction {
    /// Subsidiary balance to store.
    pub subsidiary_after: Decimal,
    /// Ledger balance after the action.
    pub ledger_after: Decimal,
    /// Amount of the correcting entry (subsidiary minus ledger), `to_coa` only.
    pub correction: Option<Decimal>,
}

/// Reported result for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// The cash/bank record.
    pub cash_bank_id: CashBankId,
    /// Display name.
    pub name: String,
    /// Linked GL account.
    pub account_id: AccountId,
    /// Strategy applied.
    pub strategy: ReconcileStrategy,
    /// Stored subsidiary balance before.
    pub subsidiary_before: Decimal,
    /// Materialized ledger balance before.
    pub ledger_before: Decimal,
    /// Σ of the transaction log.
    pub transaction_sum: Decimal,
    /// Subsidiary balance after.
    pub subsidiary_after: Decimal,
    /// Ledger balance after.
    pub ledger_after: Decimal,
    /// Subsidiary minus ledger, before.
    pub discrepancy_before: Decimal,
    /// Subsidiary minus ledger, after.
    pub discrepancy_after: Decimal,
    /// Classification of `discrepancy_after`.
    pub status: ReconcileStatus,
    /// Whether the action was written.
    pub applied: bool,
    /// Correcting entry posted by `to_coa`.
    pub journal_entry_id: Option<JournalEntryId>,
}

/// A record whose subsidiary and ledger balances disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    /// The cash/bank record.
    pub cash_bank_id: CashBankId,
    /// Display name.
    pub name: String,
    /// Linked GL account.
    pub account_id: AccountId,
    /// Stored subsidiary balance.
    pub subsidiary_balance: Decimal,
    /// Ledger balance aggregated from lines.
    pub ledger_balance: Decimal,
    /// Σ of the transaction log.
    pub transaction_sum: Decimal,
    /// Subsidiary minus ledger.
    pub difference: Decimal,
    /// Classification of `difference`.
    pub status: ReconcileStatus,
}
