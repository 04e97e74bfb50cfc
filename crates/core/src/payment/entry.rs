//! Journal entry for a payment.
//!
//! One entry per payment. The cash side carries the full amount; the
//! receivable/payable side is split per allocation so each line points at
//! the document it settles.

use bukubesar_shared::types::{AccountId, PaymentId};

use super::types::{AllocationPlan, PaymentDirection, PaymentRequest};
use crate::journal::{EntryInput, LineInput, SourceType};

/// Builds the journal entry for a planned payment.
///
/// - RECEIVE: debit `cash_account`, credit `control_account` per allocation
/// - PAY: debit `control_account` per allocation, credit `cash_account`
#[must_use]
pub fn build_payment_entry(
    payment_id: PaymentId,
    payment_number: &str,
    request: &PaymentRequest,
    plan: &AllocationPlan,
    cash_account: AccountId,
    control_account: AccountId,
) -> EntryInput {
    let mut lines = Vec::with_capacity(plan.allocations.len() + 1);

    let cash_description = match request.direction {
        PaymentDirection::Receive => format!("Payment received {payment_number}"),
        PaymentDirection::Pay => format!("Payment sent {payment_number}"),
    };
    let cash_line = match request.direction {
        PaymentDirection::Receive => LineInput::debit(cash_account, request.amount),
        PaymentDirection::Pay => LineInput::credit(cash_account, request.amount),
    }
    .with_description(cash_description);

    for allocation in &plan.allocations {
        let line = match request.direction {
            PaymentDirection::Receive => LineInput::credit(control_account, allocation.amount),
            PaymentDirection::Pay => LineInput::debit(control_account, allocation.amount),
        };
        let description = allocation.document_number.as_ref().map_or_else(
            || format!("Unapplied amount {payment_number}"),
            |number| format!("Settlement of {number}"),
        );
        let mut line = line
            .with_description(description)
            .with_allocation(allocation.id);
        if let Some(document) = allocation.document {
            line = line.with_document(document);
        }
        lines.push(line);
    }

    match request.direction {
        PaymentDirection::Receive => lines.insert(0, cash_line),
        PaymentDirection::Pay => lines.push(cash_line),
    }

    EntryInput {
        entry_date: request.payment_date,
        reference: Some(payment_number.to_string()),
        description: format!("{} payment {payment_number}", request.direction),
        source_type: SourceType::Payment,
        source_id: Some(payment_id.into_inner()),
        lines,
        created_by: request.created_by,
    }
}
