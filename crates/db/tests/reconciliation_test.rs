//! Cash/bank reconciliation against a real database.
//!
//! Each test starts a PostgreSQL testcontainer, so Docker must be running.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

use bukubesar_core::payment::{AllocationTarget, PaymentDirection, PaymentRequest};
use bukubesar_core::reconciliation::{
    ReconcileRequest, ReconcileStatus, ReconcileStrategy, ReconciliationError,
};
use bukubesar_db::entities::{cash_banks, journal_entries, sea_orm_active_enums::CashBankKind};
use bukubesar_db::repositories::NewCashBank;
use bukubesar_db::{LedgerSettings, RepositoryError};
use bukubesar_shared::types::{CashBankId, ContactId};
use bukubesar_shared::{ErrorKind, LedgerConfig};

use common::{date, TestLedger};

async fn bank(ledger: &TestLedger, code: &str, account: Option<&str>) -> cash_banks::Model {
    ledger
        .reconciliation()
        .register_cash_bank(NewCashBank {
            code: code.to_string(),
            name: format!("Bank {code}"),
            kind: CashBankKind::Bank,
            account_id: account.map(|c| ledger.account(c)),
        })
        .await
        .unwrap()
}

async fn set_stored_balance(ledger: &TestLedger, record: &cash_banks::Model, balance: Decimal) {
    let mut active: cash_banks::ActiveModel = stored(ledger, record).await.into();
    active.balance = Set(balance);
    active.update(&ledger.db).await.unwrap();
}

async fn stored(ledger: &TestLedger, record: &cash_banks::Model) -> cash_banks::Model {
    cash_banks::Entity::find_by_id(record.id)
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap()
}

fn request(strategy: ReconcileStrategy, dry_run: bool) -> ReconcileRequest {
    ReconcileRequest {
        strategy,
        dry_run,
        cash_bank_ids: Vec::new(),
    }
}

#[tokio::test]
async fn test_dry_run_reports_discrepancy_without_writing() {
    let ledger = TestLedger::start().await;
    let record = bank(&ledger, "BANK-01", Some("1102")).await;
    ledger
        .journal()
        .create_and_post(ledger.entry(date(2024, 5, 1), "1102", "4101", dec!(500)))
        .await
        .unwrap();

    let found = ledger.reconciliation().find_discrepancies().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].difference, dec!(-500));
    assert_eq!(found[0].status, ReconcileStatus::Variance);

    let outcomes = ledger
        .reconciliation()
        .reconcile(request(ReconcileStrategy::ToSsot, true), ledger.user)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].applied);
    assert_eq!(outcomes[0].discrepancy_before, dec!(-500));
    assert_eq!(outcomes[0].discrepancy_after, dec!(0));
    assert_eq!(stored(&ledger, &record).await.balance, dec!(0));
}

#[tokio::test]
async fn test_to_ssot_adopts_ledger_balance() {
    let ledger = TestLedger::start().await;
    let record = bank(&ledger, "BANK-01", Some("1102")).await;
    ledger
        .journal()
        .create_and_post(ledger.entry(date(2024, 5, 1), "1102", "4101", dec!(500)))
        .await
        .unwrap();

    let outcomes = ledger
        .reconciliation()
        .reconcile(request(ReconcileStrategy::ToSsot, false), ledger.user)
        .await
        .unwrap();

    assert!(outcomes[0].applied);
    assert_eq!(outcomes[0].status, ReconcileStatus::Matched);
    assert_eq!(stored(&ledger, &record).await.balance, dec!(500));
    assert!(ledger.reconciliation().find_discrepancies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_to_coa_posts_correcting_entry_against_adjustment_account() {
    let ledger = TestLedger::start().await;
    let record = bank(&ledger, "BANK-01", Some("1102")).await;
    set_stored_balance(&ledger, &record, dec!(800)).await;

    let outcomes = ledger
        .reconciliation()
        .reconcile(request(ReconcileStrategy::ToCoa, false), ledger.user)
        .await
        .unwrap();

    let outcome = &outcomes[0];
    assert_eq!(outcome.discrepancy_before, dec!(800));
    assert_eq!(outcome.discrepancy_after, dec!(0));
    assert_eq!(outcome.ledger_after, dec!(800));
    let entry_id = outcome.journal_entry_id.expect("correcting entry posted");

    let entry = ledger.journal().get_entry(entry_id).await.unwrap();
    assert_eq!(entry.lines[0].account_id, ledger.account("1102").into_inner());
    assert_eq!(entry.lines[0].debit, dec!(800));
    assert_eq!(ledger.balance("1102").await, dec!(800));
    assert_eq!(ledger.balance("6901").await, dec!(-800));
    assert_eq!(stored(&ledger, &record).await.balance, dec!(800));
}

#[tokio::test]
async fn test_to_coa_without_adjustment_account_reports_the_delta() {
    let ledger = TestLedger::start_with(LedgerSettings {
        ledger: LedgerConfig {
            adjustment_code: "6999".to_string(),
            ..LedgerConfig::default()
        },
        ..LedgerSettings::default()
    })
    .await;
    let record = bank(&ledger, "BANK-01", Some("1102")).await;
    set_stored_balance(&ledger, &record, dec!(800)).await;

    let err = ledger
        .reconciliation()
        .reconcile(request(ReconcileStrategy::ToCoa, false), ledger.user)
        .await
        .unwrap_err();

    let RepositoryError::Reconciliation(ReconciliationError::CorrectionRefused {
        cash_bank_id,
        discrepancy,
        correction,
        reason,
    }) = &err
    else {
        panic!("expected a refused correction, got {err:?}");
    };
    assert_eq!(*cash_bank_id, CashBankId::from_uuid(record.id));
    assert_eq!(*discrepancy, dec!(800));
    assert_eq!(*correction, dec!(800));
    assert!(reason.contains("6999"));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(stored(&ledger, &record).await.balance, dec!(800));
    assert_eq!(ledger.balance("1102").await, dec!(0));
    assert_eq!(journal_entries::Entity::find().count(&ledger.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_to_transactions_rebuilds_subsidiary_from_its_log() {
    let ledger = TestLedger::start().await;
    let record = bank(&ledger, "BANK-01", Some("1102")).await;
    ledger
        .payments()
        .record_payment(PaymentRequest {
            contact_id: ContactId::new(),
            direction: PaymentDirection::Receive,
            amount: dec!(1_000),
            payment_date: date(2024, 5, 2),
            method: "TRANSFER".to_string(),
            reference: None,
            notes: None,
            cash_bank_id: Some(CashBankId::from_uuid(record.id)),
            target: AllocationTarget::Unassigned,
            created_by: ledger.user,
        })
        .await
        .unwrap();
    set_stored_balance(&ledger, &record, dec!(999.995)).await;

    let outcomes = ledger
        .reconciliation()
        .reconcile(request(ReconcileStrategy::ToTransactions, false), ledger.user)
        .await
        .unwrap();

    let outcome = &outcomes[0];
    assert_eq!(outcome.discrepancy_before, dec!(-0.005));
    assert_eq!(outcome.transaction_sum, dec!(1_000));
    assert_eq!(outcome.discrepancy_after, dec!(0));
    assert!(outcome.journal_entry_id.is_none());
    assert_eq!(stored(&ledger, &record).await.balance, dec!(1_000));
}

#[tokio::test]
async fn test_unlinked_record_cannot_be_reconciled() {
    let ledger = TestLedger::start().await;
    let record = bank(&ledger, "BANK-02", None).await;

    let err = ledger
        .reconciliation()
        .reconcile(
            ReconcileRequest {
                cash_bank_ids: vec![CashBankId::from_uuid(record.id)],
                ..request(ReconcileStrategy::ToSsot, false)
            },
            ledger.user,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Reconciliation(ReconciliationError::NotLinked(_))
    ));
}

#[tokio::test]
async fn test_link_requires_asset_posting_account() {
    let ledger = TestLedger::start().await;
    let record = bank(&ledger, "BANK-03", None).await;
    let id = CashBankId::from_uuid(record.id);
    let repo = ledger.reconciliation();

    let err = repo
        .link_cash_bank_to_account(id, ledger.account("4101"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Reconciliation(ReconciliationError::NotAssetAccount { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = repo
        .link_cash_bank_to_account(id, ledger.account("1000"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Reconciliation(ReconciliationError::HeaderAccount(_))
    ));

    let linked = repo
        .link_cash_bank_to_account(id, ledger.account("1102"))
        .await
        .unwrap();
    assert_eq!(linked.account_id, Some(ledger.account("1102").into_inner()));
}
