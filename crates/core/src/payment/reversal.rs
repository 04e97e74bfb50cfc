//! Restoring documents when a payment is reversed.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bukubesar_shared::types::PaymentId;

use super::error::PaymentError;
use super::types::{DocumentStatus, DocumentUpdate, OpenDocument, PaymentStatus};

/// An allocation of the payment being reversed with its locked document.
#[derive(Debug, Clone)]
pub struct AllocatedDocument {
    /// Amount the payment allocated to the document.
    pub amount: Decimal,
    /// The document as currently stored.
    pub document: OpenDocument,
}

/// Stateless planner for payment reversals.
pub struct PaymentReversalService;

impl PaymentReversalService {
    /// Checks the payment itself may be reversed.
    ///
    /// # Errors
    ///
    /// `ReasonRequired`, `AlreadyReversed`, or `PeriodClosed` when either the
    /// payment's entry date or the reversal date lies in a closed period.
    pub fn validate<P>(
        payment_id: PaymentId,
        status: PaymentStatus,
        reason: &str,
        payment_date: NaiveDate,
        reversal_date: NaiveDate,
        is_date_closed: P,
    ) -> Result<(), PaymentError>
    where
        P: Fn(NaiveDate) -> bool,
    {
        if reason.trim().is_empty() {
            return Err(PaymentError::ReasonRequired);
        }
        if status == PaymentStatus::Reversed {
            return Err(PaymentError::AlreadyReversed(payment_id));
        }
        for date in [payment_date, reversal_date] {
            if is_date_closed(date) {
                return Err(PaymentError::PeriodClosed(date));
            }
        }
        Ok(())
    }

    /// Computes restored counters for every allocated document.
    ///
    /// Each document's outstanding amount grows back by its allocation and
    /// its status is recomputed. Nothing is guessed: a voided document or a
    /// restoration beyond the document total is a conflict carrying the
    /// computed discrepancy.
    ///
    /// # Errors
    ///
    /// `DocumentVoid` or `RestorationExceedsTotal`.
    pub fn plan_restoration(
        allocations: &[AllocatedDocument],
        epsilon: Decimal,
    ) -> Result<Vec<DocumentUpdate>, PaymentError> {
        allocations
            .iter()
            .map(|allocated| {
                let document = &allocated.document;
                if document.status == DocumentStatus::Void {
                    return Err(PaymentError::DocumentVoid(document.number.clone()));
                }

                let restored = document.outstanding_amount + allocated.amount;
                let paid = document.paid_amount - allocated.amount;
                let discrepancy = (restored - document.total_amount).max(-paid);
                if discrepancy > Decimal::ZERO {
                    return Err(PaymentError::RestorationExceedsTotal {
                        document: document.number.clone(),
                        total: document.total_amount,
                        restored,
                        discrepancy,
                    });
                }

                Ok(DocumentUpdate {
                    document_id: document.id,
                    paid_amount: paid,
                    outstanding_amount: restored,
                    status: DocumentStatus::for_outstanding(
                        document.total_amount,
                        restored,
                        epsilon,
                    ),
                })
            })
            .collect()
    }
}
