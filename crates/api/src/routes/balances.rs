//! Materialized balance routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use bukubesar_shared::types::AccountId;

use crate::{ApiError, AppState, middleware::ActingUser};

/// Creates the balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/balances", get(get_balances))
        .route("/balances/refresh", post(refresh))
        .route("/balances/drift", get(detect_drift))
        .route("/balances/trial", get(trial_balance))
}

/// Query parameters for reading balances.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Restrict to one account.
    pub account_id: Option<AccountId>,
    /// Aggregate from lines dated on or before this day instead of reading
    /// the materialized row. Requires `account_id`.
    pub as_of: Option<NaiveDate>,
}

/// Request body for a refresh.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Accounts to recompute; every account when absent.
    pub account_ids: Option<Vec<AccountId>>,
}

/// GET `/balances` - Materialized balances, or one balance as of a date.
async fn get_balances(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Response, ApiError> {
    let balances = state.balances();
    let response = match (query.account_id, query.as_of) {
        (Some(id), Some(as_of)) => {
            Json(balances.compute_balance_as_of(id, as_of).await?).into_response()
        }
        (None, Some(_)) => {
            return Err(ApiError::validation(
                "AS_OF_REQUIRES_ACCOUNT",
                "as_of needs an account_id",
            ));
        }
        (Some(id), None) => {
            Json(balances.get_balances(Some(std::slice::from_ref(&id))).await?).into_response()
        }
        (None, None) => Json(balances.get_balances(None).await?).into_response(),
    };
    Ok(response)
}

/// POST `/balances/refresh` - Recompute materialized balances.
async fn refresh(
    State(state): State<AppState>,
    _user: ActingUser,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let totals = state
        .balances()
        .refresh(payload.account_ids.as_deref())
        .await?;
    Ok(Json(totals))
}

/// GET `/balances/drift` - Materialized rows that disagree with the lines.
async fn detect_drift(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.balances().detect_drift().await?))
}

/// GET `/balances/trial` - Trial balance over every account.
async fn trial_balance(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.balances().trial_balance().await?))
}
