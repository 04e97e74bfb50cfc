//! Cash/bank reconciliation routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use bukubesar_core::reconciliation::ReconcileRequest;
use bukubesar_db::entities::sea_orm_active_enums::CashBankKind;
use bukubesar_db::repositories::NewCashBank;
use bukubesar_shared::types::{AccountId, CashBankId};

use crate::{ApiError, AppState, middleware::ActingUser};

/// Creates the reconciliation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reconciliation", post(reconcile))
        .route("/reconciliation/discrepancies", get(find_discrepancies))
        .route("/cash-banks", post(register_cash_bank))
        .route("/cash-banks/{id}/link", post(link_cash_bank))
}

/// Request body for registering a cash box or bank account.
#[derive(Debug, Deserialize)]
pub struct CashBankBody {
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// CASH or BANK.
    pub kind: CashBankKind,
    /// Linked ASSET account.
    pub account_id: Option<AccountId>,
}

/// Request body for linking.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    /// ASSET, non-header account.
    pub account_id: AccountId,
}

/// POST `/reconciliation` - Reconcile linked records, or dry-run.
async fn reconcile(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<ReconcileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcomes = state.reconciliation().reconcile(payload, user.id()).await?;
    Ok(Json(outcomes))
}

/// GET `/reconciliation/discrepancies` - Records whose balance disagrees with the ledger.
async fn find_discrepancies(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reconciliation().find_discrepancies().await?))
}

/// POST `/cash-banks` - Register a record with a zero balance.
async fn register_cash_bank(
    State(state): State<AppState>,
    _user: ActingUser,
    Json(payload): Json<CashBankBody>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .reconciliation()
        .register_cash_bank(NewCashBank {
            code: payload.code,
            name: payload.name,
            kind: payload.kind,
            account_id: payload.account_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST `/cash-banks/{id}/link` - Link a record to its GL account.
async fn link_cash_bank(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<CashBankId>,
    Json(payload): Json<LinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .reconciliation()
        .link_cash_bank_to_account(id, payload.account_id)
        .await?;
    Ok(Json(record))
}
