//! Concurrent access tests for postings, allocations and closing.
//!
//! These tests verify that:
//! - Concurrent postings on the same accounts produce the exact final balance
//! - Concurrent payments never over-allocate one document
//! - A posting racing a close is either closed out or refused
//! - A lock held past the bounded wait surfaces as retryable contention
//!
//! Each test starts a PostgreSQL testcontainer, so Docker must be running.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, QuerySelect, TransactionTrait};
use tokio::sync::Barrier;

use bukubesar_core::closing::PeriodRange;
use bukubesar_core::journal::{DocumentKind, JournalError};
use bukubesar_core::payment::{AllocationTarget, PaymentDirection, PaymentRequest};
use bukubesar_db::entities::{documents, sea_orm_active_enums::DocumentStatus};
use bukubesar_db::repositories::NewDocument;
use bukubesar_db::{LedgerSettings, RepositoryError};
use bukubesar_shared::types::{ContactId, DocumentId};

use common::{date, TestLedger};

fn payment(
    ledger: &TestLedger,
    contact: ContactId,
    amount: Decimal,
    document: DocumentId,
) -> PaymentRequest {
    PaymentRequest {
        contact_id: contact,
        direction: PaymentDirection::Receive,
        amount,
        payment_date: date(2024, 4, 2),
        method: "CASH".to_string(),
        reference: None,
        notes: None,
        cash_bank_id: None,
        target: AllocationTarget::Document(document),
        created_by: ledger.user,
    }
}

async fn invoice(ledger: &TestLedger, contact: ContactId, total: Decimal) -> documents::Model {
    ledger
        .payments()
        .register_document(NewDocument {
            kind: DocumentKind::Sale,
            contact_id: contact,
            number: "INV-RACE".to_string(),
            document_date: date(2024, 3, 1),
            due_date: None,
            total_amount: total,
        })
        .await
        .unwrap()
}

// ============================================================================
// Postings on the same accounts
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_postings_keep_exact_balance() {
    let ledger = Arc::new(TestLedger::start().await);
    const TASKS: usize = 50;
    let amount = dec!(10.00);
    let barrier = Arc::new(Barrier::new(TASKS));

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .journal()
                    .create_and_post(ledger.entry(date(2024, 6, 1), "6101", "1101", amount))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0_i64;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(err.is_retryable(), "unexpected failure: {err}"),
        }
    }

    assert!(succeeded > 0);
    assert_eq!(ledger.balance("6101").await, amount * Decimal::from(succeeded));
    assert_eq!(ledger.balance("1101").await, -amount * Decimal::from(succeeded));
    assert!(ledger.balances().detect_drift().await.unwrap().is_empty());
}

// ============================================================================
// Payments against one document
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_never_over_allocate() {
    let ledger = Arc::new(TestLedger::start().await);
    let customer = ContactId::new();
    let inv = invoice(&ledger, customer, dec!(500)).await;
    let target = DocumentId::from_uuid(inv.id);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .payments()
                    .record_payment(payment(&ledger, customer, dec!(400), target))
                    .await
            })
        })
        .collect();

    let records: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let allocated: Decimal = records
        .iter()
        .flat_map(|r| &r.allocations)
        .filter(|a| a.document_id == Some(inv.id))
        .map(|a| a.amount)
        .sum();
    let unassigned: Decimal = records.iter().map(|r| r.unassigned()).sum();
    assert_eq!(allocated, dec!(500));
    assert_eq!(unassigned, dec!(300));

    let settled = documents::Entity::find_by_id(inv.id)
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, DocumentStatus::Paid);
    assert_eq!(settled.outstanding_amount, dec!(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_document_lock_timeout_is_retryable_contention() {
    let ledger = TestLedger::start_with(LedgerSettings {
        lock_timeout_ms: 200,
        ..LedgerSettings::default()
    })
    .await;
    let customer = ContactId::new();
    let inv = invoice(&ledger, customer, dec!(500)).await;

    let holder = ledger.db.begin().await.unwrap();
    documents::Entity::find_by_id(inv.id)
        .lock_exclusive()
        .one(&holder)
        .await
        .unwrap();

    let err = ledger
        .payments()
        .record_payment(payment(&ledger, customer, dec!(100), DocumentId::from_uuid(inv.id)))
        .await
        .unwrap_err();
    holder.rollback().await.unwrap();

    assert!(matches!(err, RepositoryError::Contention(_)), "got {err:?}");
    assert!(err.is_retryable());
}

// ============================================================================
// Posting racing a close
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postings_racing_a_close_are_closed_out_or_refused() {
    let ledger = Arc::new(TestLedger::start().await);
    ledger
        .journal()
        .create_and_post(ledger.entry(date(2024, 1, 5), "1101", "4101", dec!(1_000)))
        .await
        .unwrap();
    const POSTERS: usize = 20;
    let barrier = Arc::new(Barrier::new(POSTERS + 1));

    let mut handles: Vec<_> = (0..POSTERS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                let day = u32::try_from(i % 28).unwrap() + 1;
                ledger
                    .journal()
                    .create_and_post(ledger.entry(date(2024, 2, day), "1101", "4101", dec!(1)))
                    .await
                    .map(|_| ())
            })
        })
        .collect();

    let closer = {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            let q1 = PeriodRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
            ledger.closings().execute(q1, None, ledger.user).await.map(|_| ())
        })
    };
    handles.push(closer);

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    let closed = results.last().is_some_and(Result::is_ok);

    for result in &results[..POSTERS] {
        if let Err(err) = result {
            assert!(
                matches!(err, RepositoryError::Journal(JournalError::PeriodClosed(_)))
                    || err.is_retryable(),
                "unexpected failure: {err}"
            );
        }
    }
    if closed {
        // Every Q1 revenue line was either zeroed by the close or refused.
        assert_eq!(ledger.balance("4101").await, dec!(0));
    }
}
