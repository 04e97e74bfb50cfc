//! Reconciliation repository: cash/bank records against the ledger.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use bukubesar_core::balance::AccountTotals;
use bukubesar_core::journal::{EntryStatus, JournalError};
use bukubesar_core::reconciliation::{
    CashBankSnapshot, Discrepancy, ReconcileOutcome, ReconcileRequest, ReconcileStrategy,
    ReconciliationError, ReconciliationService,
};
use bukubesar_shared::types::{AccountId, CashBankId, JournalEntryId, UserId};

use super::account::account_by_code;
use super::convert;
use super::error::RepositoryError;
use super::posting::{self, LedgerSettings};
use crate::entities::{
    account_balances, accounts, cash_bank_transactions, cash_banks,
    sea_orm_active_enums::CashBankKind,
};

/// Input for registering a cash box or bank account.
#[derive(Debug, Clone)]
pub struct NewCashBank {
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Cash or bank.
    pub kind: CashBankKind,
    /// GL account backing the record.
    pub account_id: Option<AccountId>,
}

#[derive(Debug, FromQueryResult)]
struct TransactionSum {
    total: Option<Decimal>,
}

/// Reconciliation repository.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Reconciles linked cash/bank records with the ledger.
    ///
    /// Every outcome reports the discrepancy before and after, whether or
    /// not anything was written. A dry run reads only.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A requested record is missing or not linked to an account
    /// - `to_coa` computed a correction it cannot post (adjustment account
    ///   missing or unpostable, or today lies in a closed period); the
    ///   `CorrectionRefused` error carries the discrepancy and the correction
    #[instrument(skip(self, request), fields(strategy = request.strategy.as_str(), dry_run = request.dry_run))]
    pub async fn reconcile(
        &self,
        request: ReconcileRequest,
        reconciled_by: UserId,
    ) -> Result<Vec<ReconcileOutcome>, RepositoryError> {
        let epsilon = self.settings.ledger.settlement_epsilon;
        let apply = !request.dry_run;
        let today = Utc::now().date_naive();

        let txn = posting::begin(&self.db, &self.settings).await?;
        let closed = if apply {
            posting::enter_posting_gate(&txn).await?;
            posting::closed_periods(&txn).await?
        } else {
            Vec::new()
        };

        let records = linked_records(&txn, &request.cash_bank_ids, apply).await?;
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            let snapshot = cash_bank_snapshot(&txn, &record, apply).await?;
            let action = ReconciliationService::plan(request.strategy, &snapshot);

            let mut journal_entry_id = None;
            if apply {
                if let Some(correction) = action.correction {
                    let refuse = |reason: String| {
                        warn!(
                            cash_bank_id = %snapshot.cash_bank_id,
                            correction = %correction,
                            %reason,
                            "reconciliation correction refused"
                        );
                        RepositoryError::from(ReconciliationService::refuse_correction(
                            &snapshot, correction, reason,
                        ))
                    };

                    let adjustment = match self.adjustment_account(&txn).await {
                        Err(RepositoryError::Reconciliation(
                            err @ ReconciliationError::AdjustmentAccountMissing(_),
                        )) => return Err(refuse(err.to_string())),
                        other => other?,
                    };
                    let input = ReconciliationService::correcting_entry(
                        &snapshot,
                        correction,
                        adjustment,
                        today,
                        reconciled_by,
                    );
                    let posted =
                        match posting::insert_entry(&txn, &input, EntryStatus::Posted, &closed, None)
                            .await
                        {
                            Err(RepositoryError::Journal(
                                err @ (JournalError::PeriodClosed(_)
                                | JournalError::AccountInactive(_)
                                | JournalError::HeaderAccount(_)),
                            )) => return Err(refuse(err.to_string())),
                            other => other?,
                        };
                    journal_entry_id = Some(JournalEntryId::from_uuid(posted.entry.id));
                }
                if action.subsidiary_after != snapshot.stored_balance {
                    let log = request.strategy == ReconcileStrategy::ToSsot;
                    set_cash_bank_balance(&txn, record, action.subsidiary_after, log).await?;
                }
            }

            let outcome = ReconciliationService::outcome(
                request.strategy,
                &snapshot,
                &action,
                apply,
                journal_entry_id,
                epsilon,
            );
            info!(
                cash_bank_id = %outcome.cash_bank_id,
                discrepancy_before = %outcome.discrepancy_before,
                discrepancy_after = %outcome.discrepancy_after,
                applied = outcome.applied,
                "cash/bank reconciled"
            );
            outcomes.push(outcome);
        }

        if apply {
            txn.commit().await?;
        } else {
            txn.rollback().await?;
        }
        Ok(outcomes)
    }

    /// Linked records whose stored balance disagrees with the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_discrepancies(&self) -> Result<Vec<Discrepancy>, RepositoryError> {
        let epsilon = self.settings.ledger.settlement_epsilon;
        let records = linked_records(&self.db, &[], false).await?;

        let mut found = Vec::new();
        for record in records {
            let snapshot = cash_bank_snapshot(&self.db, &record, false).await?;
            if let Some(discrepancy) = ReconciliationService::discrepancy(&snapshot, epsilon) {
                found.push(discrepancy);
            }
        }
        Ok(found)
    }

    /// Links a cash/bank record to an ASSET posting account.
    ///
    /// # Errors
    ///
    /// `CashBankNotFound`, `AccountNotFound`, or the link rules.
    pub async fn link_cash_bank_to_account(
        &self,
        cash_bank_id: CashBankId,
        account_id: AccountId,
    ) -> Result<cash_banks::Model, RepositoryError> {
        self.check_link_target(account_id).await?;

        let record = cash_banks::Entity::find_by_id(cash_bank_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(ReconciliationError::CashBankNotFound(cash_bank_id))?;

        let mut active: cash_banks::ActiveModel = record.into();
        active.account_id = Set(Some(account_id.into_inner()));
        active.updated_at = Set(Utc::now().into());
        let linked = active.update(&self.db).await?;

        info!(cash_bank_id = %linked.id, account_id = %account_id, "cash/bank linked");
        Ok(linked)
    }

    /// Registers a cash box or bank account with a zero balance.
    ///
    /// # Errors
    ///
    /// The link rules when an account is given, `Duplicate` for a used code.
    pub async fn register_cash_bank(
        &self,
        input: NewCashBank,
    ) -> Result<cash_banks::Model, RepositoryError> {
        if let Some(account_id) = input.account_id {
            self.check_link_target(account_id).await?;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = cash_banks::ActiveModel {
            id: Set(CashBankId::new().into_inner()),
            code: Set(input.code),
            name: Set(input.name),
            kind: Set(input.kind),
            account_id: Set(input.account_id.map(AccountId::into_inner)),
            balance: Set(Decimal::ZERO),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(cash_bank_id = %record.id, code = %record.code, "cash/bank registered");
        Ok(record)
    }

    async fn check_link_target(&self, account_id: AccountId) -> Result<(), RepositoryError> {
        let account = accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| ReconciliationError::AccountNotFound(account_id.to_string()))?;
        ReconciliationService::validate_link(&convert::account_info(&account))?;
        Ok(())
    }

    async fn adjustment_account<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<AccountId, RepositoryError> {
        let code = &self.settings.ledger.adjustment_code;
        let account = account_by_code(conn, code)
            .await?
            .ok_or_else(|| ReconciliationError::AdjustmentAccountMissing(code.clone()))?;
        Ok(AccountId::from_uuid(account.id))
    }
}

/// Loads linked records; explicit ids must exist and be linked.
async fn linked_records<C: ConnectionTrait>(
    conn: &C,
    ids: &[CashBankId],
    lock: bool,
) -> Result<Vec<cash_banks::Model>, RepositoryError> {
    let mut query = cash_banks::Entity::find().order_by_asc(cash_banks::Column::Code);
    if ids.is_empty() {
        query = query.filter(cash_banks::Column::AccountId.is_not_null());
    } else {
        query = query.filter(cash_banks::Column::Id.is_in(ids.iter().map(|id| id.into_inner())));
    }
    if lock {
        query = query.lock_exclusive();
    }
    let records = query.all(conn).await?;

    for id in ids {
        match records.iter().find(|r| r.id == id.into_inner()) {
            None => return Err(ReconciliationError::CashBankNotFound(*id).into()),
            Some(r) if r.account_id.is_none() => {
                return Err(ReconciliationError::NotLinked(*id).into());
            }
            Some(_) => {}
        }
    }
    Ok(records)
}

/// Reads both sides of one linked record.
///
/// With `refresh`, the ledger side is recomputed and written back to
/// `account_balances`; otherwise it is only aggregated.
async fn cash_bank_snapshot<C: ConnectionTrait>(
    conn: &C,
    record: &cash_banks::Model,
    refresh: bool,
) -> Result<CashBankSnapshot, RepositoryError> {
    let cash_bank_id = CashBankId::from_uuid(record.id);
    let account_uuid = record
        .account_id
        .ok_or(ReconciliationError::NotLinked(cash_bank_id))?;
    let account_id = AccountId::from_uuid(account_uuid);

    let ledger_materialized = account_balances::Entity::find_by_id(account_uuid)
        .one(conn)
        .await?
        .map(|row| row.balance);

    let computed = if refresh {
        posting::refresh_balances(conn, &[account_id]).await?
    } else {
        let account = accounts::Entity::find_by_id(account_uuid)
            .one(conn)
            .await?
            .ok_or_else(|| ReconciliationError::AccountNotFound(account_id.to_string()))?;
        let sums =
            posting::line_sums(conn, Some(std::slice::from_ref(&account_uuid)), None, None)
                .await?;
        posting::totals_for(std::slice::from_ref(&account), &sums)
    };
    let ledger_computed = computed
        .first()
        .map_or(Decimal::ZERO, |t: &AccountTotals| t.balance);

    Ok(CashBankSnapshot {
        cash_bank_id,
        name: record.name.clone(),
        account_id,
        stored_balance: record.balance,
        transaction_sum: transaction_sum(conn, record.id).await?,
        ledger_materialized,
        ledger_computed,
    })
}

async fn transaction_sum<C: ConnectionTrait>(conn: &C, cash_bank_id: Uuid) -> Result<Decimal, DbErr> {
    let sum = cash_bank_transactions::Entity::find()
        .select_only()
        .column_as(cash_bank_transactions::Column::Amount.sum(), "total")
        .filter(cash_bank_transactions::Column::CashBankId.eq(cash_bank_id))
        .into_model::<TransactionSum>()
        .one(conn)
        .await?;
    Ok(sum.and_then(|s| s.total).unwrap_or(Decimal::ZERO))
}

/// Overwrites the stored balance; with `log`, records the adjustment in
/// the transaction log so the log keeps summing to the balance.
async fn set_cash_bank_balance<C: ConnectionTrait>(
    conn: &C,
    record: cash_banks::Model,
    balance: Decimal,
    log: bool,
) -> Result<(), DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let delta = balance - record.balance;
    let cash_bank_id = record.id;

    let mut active: cash_banks::ActiveModel = record.into();
    active.balance = Set(balance);
    active.updated_at = Set(now);
    active.update(conn).await?;

    if log {
        cash_bank_transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            cash_bank_id: Set(cash_bank_id),
            transaction_date: Set(now.date_naive()),
            amount: Set(delta),
            balance_after: Set(balance),
            reference_type: Set("RECONCILIATION".to_string()),
            reference_id: Set(None),
            journal_entry_id: Set(None),
            notes: Set(Some("Balance set to ledger".to_string())),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}
