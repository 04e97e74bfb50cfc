//! Account repository for chart of accounts database operations.

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info};
use uuid::Uuid;

use bukubesar_core::accounts::{
    validate_new_account, validate_structural_change, AccountError, AccountType,
};
use bukubesar_shared::types::AccountId;

use super::convert;
use super::error::RepositoryError;
use crate::entities::{
    accounts, journal_entries, journal_lines,
    sea_orm_active_enums::{AccountType as DbAccountType, JournalStatus},
};

/// Upper bound on cached account codes.
const CACHE_CAPACITY: u64 = 1_000;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Account code (unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account description.
    pub description: Option<String>,
    /// Account type.
    pub account_type: AccountType,
    /// Parent header account.
    pub parent_id: Option<AccountId>,
    /// Whether the account only groups children.
    pub is_header: bool,
}

/// Input for updating an account.
///
/// Only the listed fields can change. `code` and `account_type` are
/// refused once posted lines reference the account.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// New code.
    pub code: Option<String>,
    /// New name.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New type.
    pub account_type: Option<AccountType>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    by_code: Cache<String, accounts::Model>,
}

impl AccountRepository {
    /// Creates a new account repository with a code cache of `ttl_secs`.
    #[must_use]
    pub fn new(db: DatabaseConnection, ttl_secs: u64) -> Self {
        let by_code = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { db, by_code }
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code or name is invalid
    /// - The code already exists
    /// - The parent is missing, not a header, or of another type
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, RepositoryError> {
        let parent = match input.parent_id {
            Some(parent_id) => Some(
                accounts::Entity::find_by_id(parent_id.into_inner())
                    .one(&self.db)
                    .await?
                    .map(|p| convert::account_info(&p))
                    .ok_or_else(|| AccountError::ParentNotFound(parent_id.to_string()))?,
            ),
            None => None,
        };

        validate_new_account(
            &input.code,
            &input.name,
            input.account_type,
            parent.as_ref(),
        )?;

        if account_by_code(&self.db, &input.code).await?.is_some() {
            return Err(AccountError::DuplicateCode(input.code).into());
        }

        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            code: Set(input.code.clone()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            account_type: Set(input.account_type.into()),
            parent_id: Set(input.parent_id.map(AccountId::into_inner)),
            is_header: Set(input.is_header),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Lost races on the code surface as unique violations.
        let account = account.insert(&self.db).await.map_err(|err| {
            match RepositoryError::from(err) {
                RepositoryError::Duplicate(_) => AccountError::DuplicateCode(input.code).into(),
                other => other,
            }
        })?;

        info!(account_id = %account.id, code = %account.code, "account created");
        Ok(account)
    }

    /// Lists accounts ordered by code, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> Result<Vec<accounts::Model>, RepositoryError> {
        let mut query = accounts::Entity::find().order_by_asc(accounts::Column::Code);
        if let Some(account_type) = account_type {
            query = query.filter(accounts::Column::AccountType.eq(DbAccountType::from(account_type)));
        }
        Ok(query.all(&self.db).await?)
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub async fn find_account_by_id(
        &self,
        id: AccountId,
    ) -> Result<accounts::Model, RepositoryError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| AccountError::NotFound(id.to_string()).into())
    }

    /// Finds an account by code, serving repeat lookups from the cache.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has the code.
    pub async fn find_account_by_code(
        &self,
        code: &str,
    ) -> Result<accounts::Model, RepositoryError> {
        if let Some(account) = self.by_code.get(code).await {
            return Ok(account);
        }

        let account = account_by_code(&self.db, code)
            .await?
            .ok_or_else(|| AccountError::NotFound(code.to_string()))?;
        self.by_code.insert(code.to_string(), account.clone()).await;
        debug!(code, "account cached");
        Ok(account)
    }

    /// Updates the allow-listed fields of an account.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Account not found
    /// - Code or type changes while posted lines reference the account
    /// - The new code already exists
    pub async fn update_account(
        &self,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> Result<accounts::Model, RepositoryError> {
        let account = self.find_account_by_id(id).await?;
        let info = convert::account_info(&account);

        let posted_lines = self.count_posted_lines(account.id).await?;
        validate_structural_change(
            &info,
            input.code.as_deref(),
            input.account_type,
            posted_lines,
        )?;

        if let Some(new_code) = &input.code
            && *new_code != account.code
            && account_by_code(&self.db, new_code).await?.is_some()
        {
            return Err(AccountError::DuplicateCode(new_code.clone()).into());
        }
        if let Some(name) = &input.name
            && name.trim().is_empty()
        {
            return Err(AccountError::EmptyName.into());
        }

        let old_code = account.code.clone();
        let mut active: accounts::ActiveModel = account.into();

        if let Some(code) = input.code {
            active.code = Set(code);
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(account_type) = input.account_type {
            active.account_type = Set(account_type.into());
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await?;

        self.by_code.invalidate(&old_code).await;
        self.by_code.invalidate(&updated.code).await;

        info!(account_id = %updated.id, code = %updated.code, "account updated");
        Ok(updated)
    }

    /// Counts lines of non-draft entries that reference the account.
    async fn count_posted_lines(&self, account_id: Uuid) -> Result<u64, DbErr> {
        journal_lines::Entity::find()
            .inner_join(journal_entries::Entity)
            .filter(journal_lines::Column::AccountId.eq(account_id))
            .filter(journal_entries::Column::Status.ne(JournalStatus::Draft))
            .count(&self.db)
            .await
    }
}

/// Uncached lookup by code, usable inside a transaction.
pub(crate) async fn account_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find()
        .filter(accounts::Column::Code.eq(code))
        .limit(1)
        .one(conn)
        .await
}
