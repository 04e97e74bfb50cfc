//! Payment and open-document routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bukubesar_core::journal::DocumentKind;
use bukubesar_core::payment::{AllocationTarget, PaymentDirection, PaymentRequest};
use bukubesar_db::repositories::{NewDocument, PaymentRecord};
use bukubesar_shared::types::{CashBankId, ContactId, PaymentId};

use crate::{ApiError, AppState, middleware::ActingUser};

/// Creates the payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(record_payment))
        .route("/payments/{id}", get(get_payment))
        .route("/payments/{id}/reverse", post(reverse_payment))
        .route("/documents", post(register_document))
        .route("/contacts/{id}/open-documents", get(list_open_documents))
}

/// Request body for recording a payment.
#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    /// Payer (RECEIVE) or payee (PAY).
    pub contact_id: ContactId,
    /// RECEIVE or PAY.
    pub direction: PaymentDirection,
    /// Amount (> 0).
    pub amount: Decimal,
    /// Payment date, not in the future.
    pub payment_date: NaiveDate,
    /// Payment method, e.g. `BANK_TRANSFER`.
    pub method: String,
    /// External reference.
    pub reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Cash box or bank used; the default cash account when absent.
    pub cash_bank_id: Option<CashBankId>,
    /// `{"mode":"document","document_id":..}`, `{"mode":"auto"}` or
    /// `{"mode":"unassigned"}`; auto when absent.
    #[serde(default = "default_target")]
    pub target: AllocationTarget,
}

const fn default_target() -> AllocationTarget {
    AllocationTarget::Auto
}

/// A payment with its allocations and unassigned remainder.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Payment row and allocations.
    #[serde(flatten)]
    pub record: PaymentRecord,
    /// Sum of allocations without a document.
    pub unassigned: Decimal,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        let unassigned = record.unassigned();
        Self { record, unassigned }
    }
}

/// Request body for a payment reversal.
#[derive(Debug, Deserialize)]
pub struct ReversePaymentRequest {
    /// Why the payment is reversed.
    pub reason: String,
}

/// Request body for registering a sale or purchase document.
#[derive(Debug, Deserialize)]
pub struct DocumentBody {
    /// SALE or PURCHASE.
    pub kind: DocumentKind,
    /// Customer or vendor.
    pub contact_id: ContactId,
    /// Document number, unique per kind.
    pub number: String,
    /// Issue date.
    pub document_date: NaiveDate,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Total amount (> 0).
    pub total_amount: Decimal,
}

/// Query parameters for open documents.
#[derive(Debug, Deserialize)]
pub struct OpenDocumentsQuery {
    /// RECEIVE lists sales, PAY lists purchases.
    pub direction: PaymentDirection,
}

/// POST `/payments` - Record, allocate and post a payment.
async fn record_payment(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<PaymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .payments()
        .record_payment(PaymentRequest {
            contact_id: payload.contact_id,
            direction: payload.direction,
            amount: payload.amount,
            payment_date: payload.payment_date,
            method: payload.method,
            reference: payload.reference,
            notes: payload.notes,
            cash_bank_id: payload.cash_bank_id,
            target: payload.target,
            created_by: user.id(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(record))))
}

/// GET `/payments/{id}` - Payment with allocations.
async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.payments().get_payment(id).await?;
    Ok(Json(PaymentResponse::from(record)))
}

/// POST `/payments/{id}/reverse` - Undo a payment and restore its documents.
async fn reverse_payment(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<PaymentId>,
    Json(payload): Json<ReversePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .payments()
        .reverse_payment(id, &payload.reason, user.id())
        .await?;
    Ok(Json(PaymentResponse::from(record)))
}

/// POST `/documents` - Register an open sale or purchase document.
async fn register_document(
    State(state): State<AppState>,
    _user: ActingUser,
    Json(payload): Json<DocumentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .payments()
        .register_document(NewDocument {
            kind: payload.kind,
            contact_id: payload.contact_id,
            number: payload.number,
            document_date: payload.document_date,
            due_date: payload.due_date,
            total_amount: payload.total_amount,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET `/contacts/{id}/open-documents` - Allocatable documents, oldest due first.
async fn list_open_documents(
    State(state): State<AppState>,
    Path(contact_id): Path<ContactId>,
    Query(query): Query<OpenDocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state
        .payments()
        .list_open_documents(contact_id, query.direction)
        .await?;
    Ok(Json(documents))
}
