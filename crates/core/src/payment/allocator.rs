//! Payment allocation planning.
//!
//! The repository locks the candidate document rows, then hands them to
//! [`PaymentAllocator::plan`]. The plan is a pure function of the locked
//! rows, so two payments racing for the same invoice see each other's
//! committed counters and never over-allocate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::PaymentError;
use super::types::{
    AllocationPlan, AllocationTarget, DocumentStatus, DocumentUpdate, OpenDocument,
    PaymentDirection, PaymentRequest, PlannedAllocation,
};

/// Stateless allocation planner.
pub struct PaymentAllocator;

impl PaymentAllocator {
    /// Validates the request fields that need no stored state.
    ///
    /// # Errors
    ///
    /// `NonPositiveAmount`, `MethodRequired` or `FutureDate`.
    pub fn validate_request(request: &PaymentRequest, today: NaiveDate) -> Result<(), PaymentError> {
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::NonPositiveAmount);
        }
        if request.method.trim().is_empty() {
            return Err(PaymentError::MethodRequired);
        }
        if request.payment_date > today {
            return Err(PaymentError::FutureDate(request.payment_date));
        }
        Ok(())
    }

    /// Checks that an outgoing payment is covered by the cash/bank balance.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when paying more than `available`.
    pub fn check_funds(
        direction: PaymentDirection,
        available: Decimal,
        amount: Decimal,
    ) -> Result<(), PaymentError> {
        if direction == PaymentDirection::Pay && available < amount {
            return Err(PaymentError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        Ok(())
    }

    /// Checks that an explicit target may be settled by this payment.
    ///
    /// # Errors
    ///
    /// `ContactMismatch`, `DirectionMismatch` or `DocumentNotAllocatable`.
    pub fn check_target(
        request: &PaymentRequest,
        document: &OpenDocument,
    ) -> Result<(), PaymentError> {
        if document.contact_id != request.contact_id {
            return Err(PaymentError::ContactMismatch(document.number.clone()));
        }
        if document.kind != request.direction.document_kind() {
            return Err(PaymentError::DirectionMismatch {
                document: document.number.clone(),
                direction: request.direction,
            });
        }
        if !document.status.is_allocatable() || document.outstanding_amount <= Decimal::ZERO {
            return Err(PaymentError::DocumentNotAllocatable {
                document: document.number.clone(),
                status: document.status,
            });
        }
        Ok(())
    }

    /// Settles as much of `document` as `available` covers.
    ///
    /// Returns the allocated amount `min(available, outstanding)` and the
    /// document's new counters.
    #[must_use]
    pub fn settle(
        document: &OpenDocument,
        available: Decimal,
        epsilon: Decimal,
    ) -> (Decimal, DocumentUpdate) {
        let allocated = available.min(document.outstanding_amount);
        let outstanding = document.outstanding_amount - allocated;
        let update = DocumentUpdate {
            document_id: document.id,
            paid_amount: document.paid_amount + allocated,
            outstanding_amount: outstanding,
            status: DocumentStatus::for_outstanding(document.total_amount, outstanding, epsilon),
        };
        (allocated, update)
    }

    /// Orders documents oldest-due-first: due date, then issue date, then id.
    pub fn fifo_order(documents: &mut [OpenDocument]) {
        documents.sort_by(|a, b| {
            a.effective_due_date()
                .cmp(&b.effective_due_date())
                .then(a.document_date.cmp(&b.document_date))
                .then(a.id.cmp(&b.id))
        });
    }

    /// Plans the allocations for `request` against the locked `documents`.
    ///
    /// For an explicit target, `documents` must contain that document. For
    /// auto allocation, every allocatable document of the contact in the
    /// payment's direction is a candidate. Whatever is left becomes one
    /// unassigned allocation.
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` if an explicit target is missing, plus the errors
    /// of [`Self::check_target`].
    pub fn plan(
        request: &PaymentRequest,
        documents: &[OpenDocument],
        epsilon: Decimal,
    ) -> Result<AllocationPlan, PaymentError> {
        let mut remaining = request.amount;
        let mut allocations = Vec::new();
        let mut updates = Vec::new();

        let candidates: Vec<OpenDocument> = match request.target {
            AllocationTarget::Document(id) => {
                let document = documents
                    .iter()
                    .find(|d| d.id == id)
                    .ok_or(PaymentError::DocumentNotFound(id))?;
                Self::check_target(request, document)?;
                vec![document.clone()]
            }
            AllocationTarget::Auto => {
                let mut open: Vec<OpenDocument> = documents
                    .iter()
                    .filter(|d| Self::check_target(request, d).is_ok())
                    .cloned()
                    .collect();
                Self::fifo_order(&mut open);
                open
            }
            AllocationTarget::Unassigned => Vec::new(),
        };

        for document in &candidates {
            if remaining <= Decimal::ZERO {
                break;
            }
            let (allocated, update) = Self::settle(document, remaining, epsilon);
            if allocated <= Decimal::ZERO {
                continue;
            }
            remaining -= allocated;
            allocations.push(PlannedAllocation {
                id: Uuid::now_v7(),
                document: Some(document.document_ref()),
                document_number: Some(document.number.clone()),
                amount: allocated,
            });
            updates.push(update);
        }

        let allocated = request.amount - remaining;
        if remaining > Decimal::ZERO {
            allocations.push(PlannedAllocation {
                id: Uuid::now_v7(),
                document: None,
                document_number: None,
                amount: remaining,
            });
        }

        Ok(AllocationPlan {
            allocations,
            updates,
            allocated,
            unassigned: remaining,
        })
    }
}
