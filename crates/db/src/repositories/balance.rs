//! Balance repository: the materialized `account_balances` table.

use chrono::NaiveDate;
use sea_orm::{
    AccessMode, ColumnTrait, DatabaseConnection, EntityTrait, IsolationLevel, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tracing::{info, warn};

use bukubesar_core::accounts::AccountError;
use bukubesar_core::balance::{AccountTotals, BalanceDrift, BalanceService, TrialBalance};
use bukubesar_shared::types::AccountId;

use super::error::RepositoryError;
use super::posting::{self, LedgerSettings};
use crate::entities::{account_balances, accounts};

/// Balance repository.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Recomputes materialized balances for `ids`, or for every account.
    ///
    /// Runs in its own REPEATABLE READ transaction, so every row is
    /// computed from one snapshot of the journal. Running it twice yields
    /// the same rows.
    ///
    /// # Errors
    ///
    /// `Contention` on lock timeout or serialization failure.
    pub async fn refresh(
        &self,
        ids: Option<&[AccountId]>,
    ) -> Result<Vec<AccountTotals>, RepositoryError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), None)
            .await?;
        posting::set_timeouts(&txn, &self.settings).await?;

        let targets = match ids {
            Some(ids) => ids.to_vec(),
            None => accounts::Entity::find()
                .order_by_asc(accounts::Column::Id)
                .all(&txn)
                .await?
                .into_iter()
                .map(|a| AccountId::from_uuid(a.id))
                .collect(),
        };

        let totals = posting::refresh_balances(&txn, &targets).await?;
        txn.commit().await?;

        info!(accounts = totals.len(), "balances refreshed");
        Ok(totals)
    }

    /// Reads materialized rows for `ids`, or all rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_balances(
        &self,
        ids: Option<&[AccountId]>,
    ) -> Result<Vec<account_balances::Model>, RepositoryError> {
        let mut query =
            account_balances::Entity::find().order_by_asc(account_balances::Column::AccountId);
        if let Some(ids) = ids {
            query = query.filter(
                account_balances::Column::AccountId.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        Ok(query.all(&self.db).await?)
    }

    /// Reads the materialized row of one account.
    ///
    /// An existing account without postings has no row yet; `None` is
    /// returned in that case.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist.
    pub async fn get_balance(
        &self,
        id: AccountId,
    ) -> Result<Option<account_balances::Model>, RepositoryError> {
        if accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(AccountError::NotFound(id.to_string()).into());
        }
        Ok(account_balances::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?)
    }

    /// Aggregates an account's on-books lines dated on or before `as_of`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist.
    pub async fn compute_balance_as_of(
        &self,
        id: AccountId,
        as_of: NaiveDate,
    ) -> Result<AccountTotals, RepositoryError> {
        let account = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| AccountError::NotFound(id.to_string()))?;
        let sums = posting::line_sums(
            &self.db,
            Some(std::slice::from_ref(&account.id)),
            None,
            Some(as_of),
        )
        .await?;
        let mut totals = posting::totals_for(std::slice::from_ref(&account), &sums);
        Ok(totals.pop().unwrap_or_else(|| AccountTotals::empty(id)))
    }

    /// Compares materialized rows against a fresh aggregate. Read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn detect_drift(&self) -> Result<Vec<BalanceDrift>, RepositoryError> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await?;

        let (materialized, computed) = snapshot(&txn).await?;
        txn.commit().await?;

        let drift = BalanceService::detect_drift(&materialized, &computed);
        for d in &drift {
            warn!(
                account_id = %d.account_id,
                materialized = ?d.materialized,
                computed = %d.computed,
                difference = %d.difference,
                "balance drift detected"
            );
        }
        Ok(drift)
    }

    /// Global Σdebit/Σcredit over every on-books line.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn trial_balance(&self) -> Result<TrialBalance, RepositoryError> {
        let (_, computed) = snapshot(&self.db).await?;
        Ok(BalanceService::trial_balance(&computed))
    }
}

/// Materialized rows and fresh aggregates for every account.
async fn snapshot<C: sea_orm::ConnectionTrait>(
    conn: &C,
) -> Result<(Vec<AccountTotals>, Vec<AccountTotals>), RepositoryError> {
    let all_accounts = accounts::Entity::find().all(conn).await?;
    let sums = posting::line_sums(conn, None, None, None).await?;
    let computed = posting::totals_for(&all_accounts, &sums);

    let materialized = account_balances::Entity::find()
        .all(conn)
        .await?
        .into_iter()
        .map(|row| AccountTotals {
            account_id: AccountId::from_uuid(row.account_id),
            total_debit: row.total_debit,
            total_credit: row.total_credit,
            balance: row.balance,
        })
        .collect();

    Ok((materialized, computed))
}
