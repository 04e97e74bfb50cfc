//! Cash/bank to ledger reconciliation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bukubesar_shared::types::{AccountId, JournalEntryId, UserId};

use super::error::ReconciliationError;
use super::types::{
    CashBankSnapshot, Discrepancy, ReconcileAction, ReconcileOutcome, ReconcileStatus,
    ReconcileStrategy,
};
use crate::accounts::{AccountInfo, AccountType};
use crate::journal::{EntryInput, LineInput, SourceType};

/// Stateless reconciliation rules.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Classifies a subsidiary/ledger difference.
    #[must_use]
    pub fn classify(difference: Decimal, epsilon: Decimal) -> ReconcileStatus {
        if difference.is_zero() {
            ReconcileStatus::Matched
        } else if difference.abs() < epsilon {
            ReconcileStatus::MinorVariance
        } else {
            ReconcileStatus::Variance
        }
    }

    /// Decides the target balances for one record.
    ///
    /// The ledger side always starts from the freshly computed aggregate;
    /// only `to_coa` moves it further, through a correcting entry.
    #[must_use]
    pub fn plan(strategy: ReconcileStrategy, snapshot: &CashBankSnapshot) -> ReconcileAction {
        let ledger = snapshot.ledger_computed;
        match strategy {
            ReconcileStrategy::ToSsot => ReconcileAction {
                subsidiary_after: ledger,
                ledger_after: ledger,
                correction: None,
            },
            ReconcileStrategy::ToTransactions => ReconcileAction {
                subsidiary_after: snapshot.transaction_sum,
                ledger_after: ledger,
                correction: None,
            },
            ReconcileStrategy::ToCoa => {
                let difference = snapshot.stored_balance - ledger;
                ReconcileAction {
                    subsidiary_after: snapshot.stored_balance,
                    ledger_after: snapshot.stored_balance,
                    correction: (!difference.is_zero()).then_some(difference),
                }
            }
        }
    }

    /// Assembles the reported outcome.
    #[must_use]
    pub fn outcome(
        strategy: ReconcileStrategy,
        snapshot: &CashBankSnapshot,
        action: &ReconcileAction,
        applied: bool,
        journal_entry_id: Option<JournalEntryId>,
        epsilon: Decimal,
    ) -> ReconcileOutcome {
        let ledger_before = snapshot.ledger_before();
        let discrepancy_after = action.subsidiary_after - action.ledger_after;
        ReconcileOutcome {
            cash_bank_id: snapshot.cash_bank_id,
            name: snapshot.name.clone(),
            account_id: snapshot.account_id,
            strategy,
            subsidiary_before: snapshot.stored_balance,
            ledger_before,
            transaction_sum: snapshot.transaction_sum,
            subsidiary_after: action.subsidiary_after,
            ledger_after: action.ledger_after,
            discrepancy_before: snapshot.stored_balance - ledger_before,
            discrepancy_after,
            status: Self::classify(discrepancy_after, epsilon),
            applied,
            journal_entry_id,
        }
    }

    /// The error for a planned correction that could not be posted.
    #[must_use]
    pub fn refuse_correction(
        snapshot: &CashBankSnapshot,
        correction: Decimal,
        reason: String,
    ) -> ReconciliationError {
        ReconciliationError::CorrectionRefused {
            cash_bank_id: snapshot.cash_bank_id,
            discrepancy: snapshot.stored_balance - snapshot.ledger_before(),
            correction,
            reason,
        }
    }

    /// Reports the record if its subsidiary balance disagrees with the ledger.
    #[must_use]
    pub fn discrepancy(snapshot: &CashBankSnapshot, epsilon: Decimal) -> Option<Discrepancy> {
        let difference = snapshot.stored_balance - snapshot.ledger_computed;
        if difference.is_zero() {
            return None;
        }
        Some(Discrepancy {
            cash_bank_id: snapshot.cash_bank_id,
            name: snapshot.name.clone(),
            account_id: snapshot.account_id,
            subsidiary_balance: snapshot.stored_balance,
            ledger_balance: snapshot.ledger_computed,
            transaction_sum: snapshot.transaction_sum,
            difference,
            status: Self::classify(difference, epsilon),
        })
    }

    /// Builds the `to_coa` correcting entry.
    ///
    /// A positive correction debits the cash account and credits the
    /// adjustment account; a negative one the other way round.
    #[must_use]
    pub fn correcting_entry(
        snapshot: &CashBankSnapshot,
        correction: Decimal,
        adjustment_account: AccountId,
        entry_date: NaiveDate,
        created_by: UserId,
    ) -> EntryInput {
        let amount = correction.abs();
        let description = format!("Reconciliation adjustment {}", snapshot.name);
        let (debit, credit) = if correction > Decimal::ZERO {
            (snapshot.account_id, adjustment_account)
        } else {
            (adjustment_account, snapshot.account_id)
        };

        EntryInput {
            entry_date,
            reference: None,
            description: description.clone(),
            source_type: SourceType::Reconciliation,
            source_id: Some(snapshot.cash_bank_id.into_inner()),
            lines: vec![
                LineInput::debit(debit, amount).with_description(description.clone()),
                LineInput::credit(credit, amount).with_description(description),
            ],
            created_by,
        }
    }

    /// Checks that `account` may back a cash/bank record.
    ///
    /// # Errors
    ///
    /// `NotAssetAccount`, `HeaderAccount` or `AccountInactive`.
    pub fn validate_link(account: &AccountInfo) -> Result<(), ReconciliationError> {
        if account.account_type != AccountType::Asset {
            return Err(ReconciliationError::NotAssetAccount {
                code: account.code.clone(),
                account_type: account.account_type.as_str().to_string(),
            });
        }
        if account.is_header {
            return Err(ReconciliationError::HeaderAccount(account.code.clone()));
        }
        if !account.is_active {
            return Err(ReconciliationError::AccountInactive(account.code.clone()));
        }
        Ok(())
    }
}
