//! Journal entry routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use bukubesar_core::journal::{DocumentRef, EntryInput, LineInput, SourceType};
use bukubesar_shared::types::{AccountId, JournalEntryId, UserId};

use crate::{ApiError, AppState, middleware::ActingUser};

/// Creates the journal routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/journal-entries", post(create_and_post))
        .route("/journal-entries/drafts", post(create_draft))
        .route("/journal-entries/{id}", get(get_entry).delete(discard_draft))
        .route("/journal-entries/{id}/post", post(post_draft))
        .route("/journal-entries/{id}/reverse", post(reverse_entry))
        .route("/journal-entries/{id}/reversal", get(reversal_history))
}

/// Request body for a journal entry.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Reference code; `JE-YYYYMMDD-XXXXXXXX` when absent.
    pub reference: Option<String>,
    /// Entry description.
    pub description: String,
    /// Business event type (default MANUAL).
    pub source_type: Option<SourceType>,
    /// Originating record, lookup only.
    pub source_id: Option<Uuid>,
    /// The lines (at least 2).
    pub lines: Vec<LineRequest>,
}

/// One line of an [`EntryRequest`]. Exactly one of `debit`/`credit` is
/// positive; the other may be omitted.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount.
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount.
    #[serde(default)]
    pub credit: Decimal,
    /// Line description.
    pub description: Option<String>,
    /// Originating document.
    pub document: Option<DocumentRef>,
    /// Payment allocation settled by this line.
    pub allocation_id: Option<Uuid>,
}

impl EntryRequest {
    fn into_input(self, created_by: UserId) -> EntryInput {
        EntryInput {
            entry_date: self.entry_date,
            reference: self.reference,
            description: self.description,
            source_type: self.source_type.unwrap_or(SourceType::Manual),
            source_id: self.source_id,
            lines: self
                .lines
                .into_iter()
                .map(|line| LineInput {
                    account_id: line.account_id,
                    debit: line.debit,
                    credit: line.credit,
                    description: line.description,
                    document: line.document,
                    allocation_id: line.allocation_id,
                })
                .collect(),
            created_by,
        }
    }
}

/// Request body for a reversal.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    /// Why the entry is reversed.
    pub reason: String,
    /// Date of the reversing entry; today when absent.
    pub reversal_date: Option<NaiveDate>,
}

/// POST `/journal-entries` - Validate and post an entry in one step.
async fn create_and_post(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<EntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let posted = state
        .journal()
        .create_and_post(payload.into_input(user.id()))
        .await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

/// POST `/journal-entries/drafts` - Save an entry as DRAFT.
async fn create_draft(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<EntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = state
        .journal()
        .create_draft(payload.into_input(user.id()))
        .await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

/// GET `/journal-entries/{id}` - Entry with lines in line order.
async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<JournalEntryId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.journal().get_entry(id).await?))
}

/// POST `/journal-entries/{id}/post` - DRAFT to POSTED.
async fn post_draft(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<JournalEntryId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.journal().post_draft(id, user.id()).await?))
}

/// DELETE `/journal-entries/{id}` - Discard a DRAFT.
async fn discard_draft(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<JournalEntryId>,
) -> Result<impl IntoResponse, ApiError> {
    state.journal().discard_draft(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/journal-entries/{id}/reverse` - Post the mirror of an entry.
async fn reverse_entry(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<JournalEntryId>,
    Json(payload): Json<ReverseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pair = state
        .journal()
        .reverse_entry(id, &payload.reason, payload.reversal_date, user.id())
        .await?;
    Ok((StatusCode::CREATED, Json(pair)))
}

/// GET `/journal-entries/{id}/reversal` - Reversal links and eligibility.
async fn reversal_history(
    State(state): State<AppState>,
    Path(id): Path<JournalEntryId>,
) -> Result<impl IntoResponse, ApiError> {
    let journal = state.journal();
    let history = journal.reversal_history(id).await?;
    let eligibility = journal.can_reverse(id).await?;
    Ok(Json(serde_json::json!({
        "history": history,
        "eligibility": eligibility,
    })))
}
