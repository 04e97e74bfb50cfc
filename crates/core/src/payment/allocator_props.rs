//! Property-based tests for PaymentAllocator.
//!
//! - Property 6: Allocation Never Overdraws
//! - Property 7: Reversal Restores Counters

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use bukubesar_shared::types::{ContactId, DocumentId, UserId};

use super::allocator::PaymentAllocator;
use super::reversal::{AllocatedDocument, PaymentReversalService};
use super::types::{
    AllocationTarget, DocumentStatus, OpenDocument, PaymentDirection, PaymentRequest,
};
use crate::journal::DocumentKind;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn epsilon() -> Decimal {
    Decimal::new(1, 2)
}

/// Strategy for a contact's open invoices with assorted due dates.
fn arb_invoices(contact_id: ContactId) -> impl Strategy<Value = Vec<OpenDocument>> {
    prop::collection::vec((amount(), 1u32..28, 1u32..13), 0..6).prop_map(move |rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (outstanding, d, m))| OpenDocument {
                id: DocumentId::new(),
                kind: DocumentKind::Sale,
                contact_id,
                number: format!("INV-{i:04}"),
                document_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, m, d),
                total_amount: outstanding,
                paid_amount: Decimal::ZERO,
                outstanding_amount: outstanding,
                status: DocumentStatus::Open,
            })
            .collect()
    })
}

fn receipt(contact_id: ContactId, amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        contact_id,
        direction: PaymentDirection::Receive,
        amount,
        payment_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        method: "CASH".to_string(),
        reference: None,
        notes: None,
        cash_bank_id: None,
        target: AllocationTarget::Auto,
        created_by: UserId::new(),
    }
}

fn contact() -> ContactId {
    ContactId::from_uuid(uuid::Uuid::from_u128(42))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 6: Allocation Never Overdraws
    // =========================================================================

    /// **Property 6.1: Allocations sum to exactly the payment amount.**
    ///
    /// *For any* payment and set of open invoices, document allocations plus
    /// the unassigned remainder SHALL equal the payment, and the document
    /// share SHALL never exceed it.
    #[test]
    fn prop_allocations_conserve_amount(
        pay in amount(),
        invoices in arb_invoices(contact()),
    ) {
        let plan = PaymentAllocator::plan(&receipt(contact(), pay), &invoices, epsilon()).unwrap();

        let total: Decimal = plan.allocations.iter().map(|a| a.amount).sum();
        prop_assert_eq!(total, pay);
        prop_assert!(plan.allocated <= pay);
        prop_assert_eq!(plan.allocated + plan.unassigned, pay);
        prop_assert!(plan.allocations.iter().filter(|a| a.is_unassigned()).count() <= 1);
    }

    /// **Property 6.2: Outstanding never goes negative.**
    #[test]
    fn prop_outstanding_non_negative(
        pay in amount(),
        invoices in arb_invoices(contact()),
    ) {
        let plan = PaymentAllocator::plan(&receipt(contact(), pay), &invoices, epsilon()).unwrap();

        for update in &plan.updates {
            let original = invoices.iter().find(|d| d.id == update.document_id).unwrap();
            prop_assert!(update.outstanding_amount >= Decimal::ZERO);
            prop_assert!(update.outstanding_amount <= original.outstanding_amount);
            prop_assert_eq!(
                update.paid_amount + update.outstanding_amount,
                original.total_amount
            );
        }
    }

    /// **Property 6.3: FIFO ordering fills older documents first.**
    ///
    /// *For any* plan, every document except the last one allocated SHALL be
    /// settled in full.
    #[test]
    fn prop_fifo_fills_in_order(
        pay in amount(),
        invoices in arb_invoices(contact()),
    ) {
        let plan = PaymentAllocator::plan(&receipt(contact(), pay), &invoices, epsilon()).unwrap();

        if let Some((_, earlier)) = plan.updates.split_last() {
            for update in earlier {
                prop_assert_eq!(update.outstanding_amount, Decimal::ZERO);
                prop_assert_eq!(update.status, DocumentStatus::Paid);
            }
        }
    }

    // =========================================================================
    // Property 7: Reversal Restores Counters
    // =========================================================================

    /// **Property 7.1: Reversing an allocation restores the original counters.**
    #[test]
    fn prop_reversal_restores(
        pay in amount(),
        invoices in arb_invoices(contact()),
    ) {
        let plan = PaymentAllocator::plan(&receipt(contact(), pay), &invoices, epsilon()).unwrap();

        let allocated: Vec<AllocatedDocument> = plan
            .updates
            .iter()
            .zip(plan.allocations.iter().filter(|a| !a.is_unassigned()))
            .map(|(update, allocation)| {
                let mut document = invoices
                    .iter()
                    .find(|d| d.id == update.document_id)
                    .unwrap()
                    .clone();
                document.paid_amount = update.paid_amount;
                document.outstanding_amount = update.outstanding_amount;
                document.status = update.status;
                AllocatedDocument { amount: allocation.amount, document }
            })
            .collect();

        let restored = PaymentReversalService::plan_restoration(&allocated, epsilon()).unwrap();
        for update in restored {
            let original = invoices.iter().find(|d| d.id == update.document_id).unwrap();
            prop_assert_eq!(update.outstanding_amount, original.outstanding_amount);
            prop_assert_eq!(update.paid_amount, Decimal::ZERO);
            prop_assert_eq!(update.status, DocumentStatus::Open);
        }
    }
}
