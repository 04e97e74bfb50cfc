//! Payment allocation errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use bukubesar_shared::types::{CashBankId, DocumentId, PaymentId};
use bukubesar_shared::{AppError, ErrorKind};

use super::types::{DocumentStatus, PaymentDirection};

/// Errors raised while allocating or reversing payments.
#[derive(Debug, Error)]
pub enum PaymentError {
    // ========== Validation Errors ==========
    /// Payment amount must be positive.
    #[error("Payment amount must be positive")]
    NonPositiveAmount,

    /// Payment method is blank.
    #[error("Payment method is required")]
    MethodRequired,

    /// Payment date lies in the future.
    #[error("Payment date {0} cannot be in the future")]
    FutureDate(NaiveDate),

    /// Target document belongs to another contact.
    #[error("Document {0} does not belong to the payment's contact")]
    ContactMismatch(String),

    /// Target document kind does not match the payment direction.
    #[error("Document {document} cannot be settled by a {direction} payment")]
    DirectionMismatch {
        /// Document number.
        document: String,
        /// Payment direction.
        direction: PaymentDirection,
    },

    /// Cash/bank record has no linked ledger account.
    #[error("Cash/bank account {0} is not linked to a ledger account")]
    CashBankNotLinked(CashBankId),

    /// Cash/bank record is inactive.
    #[error("Cash/bank account {0} is inactive")]
    CashBankInactive(CashBankId),

    /// Reversal reason is blank.
    #[error("Reversal reason is required")]
    ReasonRequired,

    // ========== Conflict Errors ==========
    /// Document is not in an allocatable status.
    #[error("Document {document} is {status} and cannot receive allocations")]
    DocumentNotAllocatable {
        /// Document number.
        document: String,
        /// Current status.
        status: DocumentStatus,
    },

    /// Outgoing payment exceeds the cash/bank balance.
    #[error("Insufficient balance. Available: {available}, Required: {required}")]
    InsufficientFunds {
        /// Current cash/bank balance.
        available: Decimal,
        /// Payment amount.
        required: Decimal,
    },

    /// Payment was already reversed.
    #[error("Payment {0} has already been reversed")]
    AlreadyReversed(PaymentId),

    /// A date involved in the operation lies in a closed period.
    #[error("Date {0} falls in a closed period")]
    PeriodClosed(NaiveDate),

    /// A target document was voided after the payment.
    #[error("Document {0} has been voided; restoring its outstanding amount is ambiguous")]
    DocumentVoid(String),

    /// Restoring the allocation would exceed the document total.
    #[error(
        "Restoring {document} would raise outstanding to {restored} above its total {total} (discrepancy {discrepancy})"
    )]
    RestorationExceedsTotal {
        /// Document number.
        document: String,
        /// Document total.
        total: Decimal,
        /// Outstanding after the would-be restoration.
        restored: Decimal,
        /// Amount by which the total would be exceeded.
        discrepancy: Decimal,
    },

    // ========== Not Found Errors ==========
    /// Document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Cash/bank record not found.
    #[error("Cash/bank account not found: {0}")]
    CashBankNotFound(CashBankId),
}

impl PaymentError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::MethodRequired => "PAYMENT_METHOD_REQUIRED",
            Self::FutureDate(_) => "FUTURE_PAYMENT_DATE",
            Self::ContactMismatch(_) => "CONTACT_MISMATCH",
            Self::DirectionMismatch { .. } => "DIRECTION_MISMATCH",
            Self::CashBankNotLinked(_) => "CASH_BANK_NOT_LINKED",
            Self::CashBankInactive(_) => "CASH_BANK_INACTIVE",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::DocumentNotAllocatable { .. } => "DOCUMENT_NOT_ALLOCATABLE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::AlreadyReversed(_) => "PAYMENT_ALREADY_REVERSED",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::DocumentVoid(_) => "DOCUMENT_VOID",
            Self::RestorationExceedsTotal { .. } => "RESTORATION_EXCEEDS_TOTAL",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::CashBankNotFound(_) => "CASH_BANK_NOT_FOUND",
        }
    }

    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveAmount
            | Self::MethodRequired
            | Self::FutureDate(_)
            | Self::ContactMismatch(_)
            | Self::DirectionMismatch { .. }
            | Self::CashBankNotLinked(_)
            | Self::CashBankInactive(_)
            | Self::ReasonRequired => ErrorKind::Validation,

            Self::DocumentNotAllocatable { .. }
            | Self::InsufficientFunds { .. }
            | Self::AlreadyReversed(_)
            | Self::PeriodClosed(_)
            | Self::DocumentVoid(_)
            | Self::RestorationExceedsTotal { .. } => ErrorKind::Conflict,

            Self::DocumentNotFound(_) | Self::PaymentNotFound(_) | Self::CashBankNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
