//! Period closing routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use bukubesar_core::closing::PeriodRange;
use bukubesar_shared::types::PeriodClosingId;

use crate::{ApiError, AppState, middleware::ActingUser};

const DEFAULT_HISTORY_LIMIT: u64 = 20;
const MAX_HISTORY_LIMIT: u64 = 100;

/// Creates the closing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/closings", post(execute))
        .route("/closings/preview", post(preview))
        .route("/closings/fiscal-year", post(execute_fiscal_year))
        .route("/closings/fiscal-year/preview", post(preview_fiscal_year))
        .route("/closings/{id}/reopen", post(reopen))
        .route("/closings/history", get(history))
        .route("/closings/last", get(last_closing_info))
        .route("/closings/period-info", get(period_info))
}

/// Inclusive closing range.
#[derive(Debug, Deserialize)]
pub struct RangeRequest {
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period; the closing entry is dated here.
    pub end_date: NaiveDate,
    /// Closing entry description.
    pub description: Option<String>,
}

impl RangeRequest {
    fn range(&self) -> Result<PeriodRange, ApiError> {
        Ok(PeriodRange::new(self.start_date, self.end_date)?)
    }
}

/// Fiscal year identified by its last day.
#[derive(Debug, Deserialize)]
pub struct FiscalYearRequest {
    /// Last day of the fiscal year.
    pub fiscal_year_end: NaiveDate,
    /// Closing entry description.
    pub description: Option<String>,
}

/// Request body for reopening.
#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    /// Why the period is reopened; kept on the closing row.
    pub reason: String,
}

/// Query parameters for closing history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Number of rows (default 20, max 100).
    pub limit: Option<u64>,
}

/// Query parameters for period lookup.
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    /// Day to look up.
    pub date: NaiveDate,
}

/// POST `/closings/preview` - What a close of the range would post.
async fn preview(
    State(state): State<AppState>,
    Json(payload): Json<RangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let range = payload.range()?;
    Ok(Json(state.closings().preview(range).await?))
}

/// POST `/closings` - Close a range into retained earnings.
async fn execute(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<RangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let range = payload.range()?;
    let record = state
        .closings()
        .execute(range, payload.description.as_deref(), user.id())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST `/closings/fiscal-year/preview` - Preview a twelve-month close.
async fn preview_fiscal_year(
    State(state): State<AppState>,
    Json(payload): Json<FiscalYearRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let preview = state
        .closings()
        .preview_fiscal_year(payload.fiscal_year_end)
        .await?;
    Ok(Json(preview))
}

/// POST `/closings/fiscal-year` - Close the twelve months ending on a date.
async fn execute_fiscal_year(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<FiscalYearRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .closings()
        .execute_fiscal_year(
            payload.fiscal_year_end,
            payload.description.as_deref(),
            user.id(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST `/closings/{id}/reopen` - Reverse a closing and reopen its period.
async fn reopen(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<PeriodClosingId>,
    Json(payload): Json<ReopenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let closing = state
        .closings()
        .reopen(id, &payload.reason, user.id())
        .await?;
    Ok(Json(closing))
}

/// GET `/closings/history` - Closings, newest period first.
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(state.closings().history(limit).await?))
}

/// GET `/closings/last` - Most recent closing and the next start date.
async fn last_closing_info(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.closings().last_closing_info().await?))
}

/// GET `/closings/period-info?date=` - The closed period containing a day.
async fn period_info(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period = state.closings().period_info_for_date(query.date).await?;
    Ok(Json(json!({
        "date": query.date,
        "is_closed": period.is_some(),
        "period": period,
    })))
}
