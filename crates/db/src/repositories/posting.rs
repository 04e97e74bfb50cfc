//! Transaction plumbing shared by every repository that writes the ledger.
//!
//! Every posting takes the shared side of one advisory lock; closing and
//! reopening take the exclusive side. Closed periods are read only after
//! the gate is held, so a close cannot slip in between the closed-period
//! check and the insert.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use bukubesar_core::accounts::{AccountInfo, AccountType};
use bukubesar_core::balance::AccountTotals;
use bukubesar_core::closing::{is_date_in_closed_period, ClosedPeriod};
use bukubesar_core::journal::{
    generate_reference, EntryInput, EntryStatus, EntryTotals, JournalError, JournalService,
    ResolvedLine,
};
use bukubesar_shared::types::{AccountId, JournalEntryId};
use bukubesar_shared::{DatabaseConfig, LedgerConfig};

use super::convert;
use super::error::RepositoryError;
use crate::entities::{
    account_balances, accounts, journal_entries, journal_lines, period_closings,
    sea_orm_active_enums::{ClosingStatus, JournalStatus},
};

/// Advisory lock key guarding closed-period membership.
const PERIOD_GATE_KEY: i64 = 0x6275_6b75_6265_7361;

/// Settings the ledger repositories need beyond a connection.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Chart-of-accounts codes and tolerances.
    pub ledger: LedgerConfig,
    /// Bounded wait for row and advisory locks.
    pub lock_timeout_ms: u64,
    /// Upper bound for any single statement.
    pub statement_timeout_ms: u64,
}

impl LedgerSettings {
    /// Combines ledger rules with the database timeouts.
    #[must_use]
    pub fn new(ledger: LedgerConfig, database: &DatabaseConfig) -> Self {
        Self {
            ledger,
            lock_timeout_ms: database.lock_timeout_ms,
            statement_timeout_ms: database.statement_timeout_ms,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            lock_timeout_ms: 5_000,
            statement_timeout_ms: 30_000,
        }
    }
}

/// An entry header with its lines in `line_number` order.
#[derive(Debug, Clone, Serialize)]
pub struct EntryWithLines {
    /// Entry header.
    pub entry: journal_entries::Model,
    /// Entry lines.
    pub lines: Vec<journal_lines::Model>,
}

/// Raw on-books sums for one account.
#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct LineSums {
    pub account_id: Uuid,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub line_count: i64,
    pub last_entry_date: Option<NaiveDate>,
}

/// Opens a transaction with bounded lock and statement waits.
pub(crate) async fn begin(
    db: &DatabaseConnection,
    settings: &LedgerSettings,
) -> Result<DatabaseTransaction, DbErr> {
    let txn = db.begin().await?;
    set_timeouts(&txn, settings).await?;
    Ok(txn)
}

/// Applies the timeouts to an already open transaction.
pub(crate) async fn set_timeouts(
    txn: &DatabaseTransaction,
    settings: &LedgerSettings,
) -> Result<(), DbErr> {
    txn.execute_unprepared(&format!(
        "SET LOCAL lock_timeout = '{}ms'; SET LOCAL statement_timeout = '{}ms'",
        settings.lock_timeout_ms, settings.statement_timeout_ms
    ))
    .await?;
    Ok(())
}

/// Shared side of the period gate; held by every posting.
pub(crate) async fn enter_posting_gate(txn: &DatabaseTransaction) -> Result<(), DbErr> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock_shared($1)",
        [PERIOD_GATE_KEY.into()],
    ))
    .await?;
    Ok(())
}

/// Exclusive side of the period gate; held while closing or reopening.
pub(crate) async fn enter_closing_gate(txn: &DatabaseTransaction) -> Result<(), DbErr> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock($1)",
        [PERIOD_GATE_KEY.into()],
    ))
    .await?;
    Ok(())
}

/// All CLOSED periods.
pub(crate) async fn closed_periods<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<ClosedPeriod>, DbErr> {
    let rows = period_closings::Entity::find()
        .filter(period_closings::Column::Status.eq(ClosingStatus::Closed))
        .order_by_asc(period_closings::Column::StartDate)
        .all(conn)
        .await?;
    Ok(rows.iter().map(convert::closed_period).collect())
}

/// Loads the accounts named by `ids`.
pub(crate) async fn account_directory<C: ConnectionTrait>(
    conn: &C,
    ids: &[AccountId],
) -> Result<HashMap<AccountId, AccountInfo>, DbErr> {
    let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
    let rows = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(uuids))
        .all(conn)
        .await?;
    Ok(rows
        .iter()
        .map(|row| (AccountId::from_uuid(row.id), convert::account_info(row)))
        .collect())
}

/// Posts `input` under the shared period gate.
pub(crate) async fn post_entry(
    txn: &DatabaseTransaction,
    input: &EntryInput,
    reversal_of: Option<JournalEntryId>,
) -> Result<EntryWithLines, RepositoryError> {
    enter_posting_gate(txn).await?;
    let closed = closed_periods(txn).await?;
    insert_entry(txn, input, EntryStatus::Posted, &closed, reversal_of).await
}

/// Validates and writes an entry with its lines.
///
/// A POSTED entry is checked against `closed` and refreshes the balances
/// of the accounts it touches; a DRAFT is checked when it is posted.
pub(crate) async fn insert_entry(
    txn: &DatabaseTransaction,
    input: &EntryInput,
    status: EntryStatus,
    closed: &[ClosedPeriod],
    reversal_of: Option<JournalEntryId>,
) -> Result<EntryWithLines, RepositoryError> {
    let posting = status.is_on_books();
    let (lines, totals) = resolve(txn, input, |date| {
        posting && is_date_in_closed_period(date, closed)
    })
    .await?;

    let touched = JournalService::touched_accounts(&lines);
    if posting {
        lock_accounts(txn, &touched).await?;
    }

    let id = JournalEntryId::new();
    let now: DateTimeWithTimeZone = Utc::now().into();
    let created_by = input.created_by.into_inner();
    let reference = input
        .reference
        .clone()
        .unwrap_or_else(|| generate_reference(input.entry_date, id));

    let entry = journal_entries::ActiveModel {
        id: Set(id.into_inner()),
        reference: Set(reference),
        entry_date: Set(input.entry_date),
        description: Set(input.description.trim().to_string()),
        source_type: Set(input.source_type.into()),
        source_id: Set(input.source_id),
        status: Set(status.into()),
        total_debit: Set(totals.total_debit),
        total_credit: Set(totals.total_credit),
        reversal_of_id: Set(reversal_of.map(JournalEntryId::into_inner)),
        created_by: Set(created_by),
        posted_by: Set(posting.then_some(created_by)),
        posted_at: Set(posting.then_some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let lines = insert_lines(txn, id, &lines).await?;

    if posting {
        refresh_balances(txn, &touched).await?;
    }

    Ok(EntryWithLines { entry, lines })
}

/// Resolves an entry's lines against the account directory.
pub(crate) async fn resolve<P>(
    txn: &DatabaseTransaction,
    input: &EntryInput,
    is_date_closed: P,
) -> Result<(Vec<ResolvedLine>, EntryTotals), RepositoryError>
where
    P: Fn(NaiveDate) -> bool,
{
    let mut ids: Vec<AccountId> = input.lines.iter().map(|l| l.account_id).collect();
    ids.sort();
    ids.dedup();
    let directory = account_directory(txn, &ids).await?;

    let resolved = JournalService::validate_and_resolve(
        input,
        |id| {
            directory
                .get(&id)
                .cloned()
                .ok_or(JournalError::AccountNotFound(id))
        },
        is_date_closed,
    )?;
    Ok(resolved)
}

async fn insert_lines(
    txn: &DatabaseTransaction,
    entry_id: JournalEntryId,
    lines: &[ResolvedLine],
) -> Result<Vec<journal_lines::Model>, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut inserted = Vec::with_capacity(lines.len());
    for line in lines {
        let model = journal_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            journal_entry_id: Set(entry_id.into_inner()),
            line_number: Set(line.line_number),
            account_id: Set(line.account_id.into_inner()),
            debit: Set(line.debit),
            credit: Set(line.credit),
            description: Set(line.description.clone()),
            document_kind: Set(line.document.map(|d| d.kind.into())),
            document_id: Set(line.document.map(|d| d.id.into_inner())),
            allocation_id: Set(line.allocation_id),
            created_at: Set(now),
        };
        inserted.push(model.insert(txn).await?);
    }
    Ok(inserted)
}

/// Row-locks the accounts in id order.
///
/// `FOR NO KEY UPDATE` serializes balance writers without blocking the
/// foreign-key checks of concurrent line inserts.
pub(crate) async fn lock_accounts<C: ConnectionTrait>(
    conn: &C,
    ids: &[AccountId],
) -> Result<Vec<accounts::Model>, DbErr> {
    let mut uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
    uuids.sort();
    uuids.dedup();
    accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(uuids))
        .order_by_asc(accounts::Column::Id)
        .lock(LockType::NoKeyUpdate)
        .all(conn)
        .await
}

/// On-books sums grouped by account.
///
/// `accounts` limits the accounts, `from`/`to` bound the entry date
/// (both inclusive).
pub(crate) async fn line_sums<C: ConnectionTrait>(
    conn: &C,
    accounts: Option<&[Uuid]>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<LineSums>, DbErr> {
    let mut query = journal_lines::Entity::find()
        .select_only()
        .column(journal_lines::Column::AccountId)
        .column_as(journal_lines::Column::Debit.sum(), "total_debit")
        .column_as(journal_lines::Column::Credit.sum(), "total_credit")
        .column_as(journal_lines::Column::Id.count(), "line_count")
        .column_as(journal_entries::Column::EntryDate.max(), "last_entry_date")
        .inner_join(journal_entries::Entity)
        .filter(
            journal_entries::Column::Status.is_in([JournalStatus::Posted, JournalStatus::Reversed]),
        );

    if let Some(ids) = accounts {
        query = query.filter(journal_lines::Column::AccountId.is_in(ids.iter().copied()));
    }
    if let Some(from) = from {
        query = query.filter(journal_entries::Column::EntryDate.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(journal_entries::Column::EntryDate.lte(to));
    }

    query
        .group_by(journal_lines::Column::AccountId)
        .into_model::<LineSums>()
        .all(conn)
        .await
}

/// Folds raw sums into signed totals for the given accounts.
pub(crate) fn totals_for(accounts: &[accounts::Model], sums: &[LineSums]) -> Vec<AccountTotals> {
    accounts
        .iter()
        .map(|account| {
            let id = AccountId::from_uuid(account.id);
            sums.iter()
                .find(|s| s.account_id == account.id)
                .map_or_else(
                    || AccountTotals::empty(id),
                    |s| {
                        AccountTotals::from_sums(
                            id,
                            AccountType::from(account.account_type).normal_balance(),
                            s.total_debit,
                            s.total_credit,
                        )
                    },
                )
        })
        .collect()
}

/// Re-aggregates and upserts the balance rows of `ids`.
///
/// The accounts are locked first, so concurrent refreshes of the same
/// account apply one after the other and each sees the other's lines.
pub(crate) async fn refresh_balances<C: ConnectionTrait>(
    conn: &C,
    ids: &[AccountId],
) -> Result<Vec<AccountTotals>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let locked = lock_accounts(conn, ids).await?;
    let uuids: Vec<Uuid> = locked.iter().map(|a| a.id).collect();
    let sums = line_sums(conn, Some(&uuids), None, None).await?;
    let totals = totals_for(&locked, &sums);
    let now: DateTimeWithTimeZone = Utc::now().into();

    for total in &totals {
        let account_id = total.account_id.into_inner();
        let sum = sums.iter().find(|s| s.account_id == account_id);
        let row = account_balances::ActiveModel {
            account_id: Set(account_id),
            total_debit: Set(total.total_debit),
            total_credit: Set(total.total_credit),
            balance: Set(total.balance),
            line_count: Set(sum.map_or(0, |s| s.line_count)),
            last_entry_date: Set(sum.and_then(|s| s.last_entry_date)),
            refreshed_at: Set(now),
        };
        account_balances::Entity::insert(row)
            .on_conflict(
                OnConflict::column(account_balances::Column::AccountId)
                    .update_columns([
                        account_balances::Column::TotalDebit,
                        account_balances::Column::TotalCredit,
                        account_balances::Column::Balance,
                        account_balances::Column::LineCount,
                        account_balances::Column::LastEntryDate,
                        account_balances::Column::RefreshedAt,
                    ])
                    .to_owned(),
            )
            .exec(conn)
            .await?;
    }

    Ok(totals)
}
