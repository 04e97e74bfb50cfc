//! Chart of accounts routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::info;

use bukubesar_core::accounts::AccountType;
use bukubesar_db::repositories::{CreateAccountInput, UpdateAccountInput};
use bukubesar_shared::types::AccountId;

use crate::{ApiError, AppState, middleware::ActingUser};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", patch(update_account).get(get_account))
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by account type.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account code (digits, '.' or '-').
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account description.
    pub description: Option<String>,
    /// ASSET, LIABILITY, EQUITY, REVENUE or EXPENSE.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Parent header account.
    pub parent_id: Option<AccountId>,
    /// Header accounts group children and never hold lines.
    #[serde(default)]
    pub is_header: bool,
}

/// Request body for updating an account. Absent fields are left alone.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// New code; refused once posted lines reference the account.
    pub code: Option<String>,
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New type; refused once posted lines reference the account.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// GET `/accounts` - List accounts ordered by code.
async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.accounts.list_accounts(query.account_type).await?;
    Ok(Json(accounts))
}

/// GET `/accounts/{id}` - Get one account.
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.accounts.find_account_by_id(id).await?;
    Ok(Json(account))
}

/// POST `/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .accounts
        .create_account(CreateAccountInput {
            code: payload.code,
            name: payload.name,
            description: payload.description,
            account_type: payload.account_type,
            parent_id: payload.parent_id,
            is_header: payload.is_header,
        })
        .await?;

    info!(account_id = %account.id, code = %account.code, user = %user.id(), "account created via api");
    Ok((StatusCode::CREATED, Json(account)))
}

/// PATCH `/accounts/{id}` - Update the allow-listed fields of an account.
async fn update_account(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<AccountId>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .accounts
        .update_account(
            id,
            UpdateAccountInput {
                code: payload.code,
                name: payload.name,
                description: payload.description.map(Some),
                account_type: payload.account_type,
                is_active: payload.is_active,
            },
        )
        .await?;

    info!(account_id = %account.id, user = %user.id(), "account updated via api");
    Ok(Json(account))
}
