//! Guard triggers and table constraints.
//!
//! Writes that bypass the repositories must still be refused once an
//! entry has left DRAFT.
//!
//! Each test starts a PostgreSQL testcontainer, so Docker must be running.

mod common;

use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};

use bukubesar_core::journal::DocumentKind;
use bukubesar_db::entities::{documents, journal_entries, journal_lines};
use bukubesar_db::repositories::{EntryWithLines, NewDocument};
use bukubesar_db::RepositoryError;
use bukubesar_shared::types::{ContactId, JournalEntryId};

use common::{date, TestLedger};

async fn posted(ledger: &TestLedger) -> EntryWithLines {
    ledger
        .journal()
        .create_and_post(ledger.entry(date(2024, 1, 15), "1101", "4101", dec!(250)))
        .await
        .unwrap()
}

fn assert_guard(err: sea_orm::DbErr) {
    let err = RepositoryError::from(err);
    assert!(matches!(err, RepositoryError::Guard(_)), "got {err:?}");
}

// ============================================================================
// journal_entries
// ============================================================================

#[tokio::test]
async fn test_posted_entry_cannot_be_deleted() {
    let ledger = TestLedger::start().await;
    let entry = posted(&ledger).await;

    let err = entry.entry.clone().delete(&ledger.db).await.unwrap_err();

    assert_guard(err);
    assert!(journal_entries::Entity::find_by_id(entry.entry.id)
        .one(&ledger.db)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_posted_entry_cannot_move_date() {
    let ledger = TestLedger::start().await;
    let entry = posted(&ledger).await;

    let mut active: journal_entries::ActiveModel = entry.entry.into();
    active.entry_date = Set(date(2024, 1, 16));

    assert_guard(active.update(&ledger.db).await.unwrap_err());
}

#[tokio::test]
async fn test_posted_entry_description_may_change() {
    let ledger = TestLedger::start().await;
    let entry = posted(&ledger).await;

    let mut active: journal_entries::ActiveModel = entry.entry.into();
    active.description = Set("Corrected memo".to_string());
    let updated = active.update(&ledger.db).await.unwrap();

    assert_eq!(updated.description, "Corrected memo");
}

#[tokio::test]
async fn test_reversed_entry_is_frozen() {
    let ledger = TestLedger::start().await;
    let entry = posted(&ledger).await;
    let pair = ledger
        .journal()
        .reverse_entry(
            JournalEntryId::from_uuid(entry.entry.id),
            "Wrong account",
            None,
            ledger.user,
        )
        .await
        .unwrap();

    let mut active: journal_entries::ActiveModel = pair.original.entry.into();
    active.description = Set("Rewritten".to_string());

    assert_guard(active.update(&ledger.db).await.unwrap_err());
}

#[tokio::test]
async fn test_draft_entry_can_be_edited() {
    let ledger = TestLedger::start().await;
    let draft = ledger
        .journal()
        .create_draft(ledger.entry(date(2024, 1, 15), "1101", "4101", dec!(250)))
        .await
        .unwrap();

    let mut active: journal_entries::ActiveModel = draft.entry.into();
    active.entry_date = Set(date(2024, 1, 20));
    let updated = active.update(&ledger.db).await.unwrap();

    assert_eq!(updated.entry_date, date(2024, 1, 20));
}

// ============================================================================
// journal_lines
// ============================================================================

#[tokio::test]
async fn test_lines_of_posted_entry_are_immutable() {
    let ledger = TestLedger::start().await;
    let entry = posted(&ledger).await;
    let line = entry.lines[0].clone();

    let mut active: journal_lines::ActiveModel = line.clone().into();
    active.description = Set(Some("edited".to_string()));
    assert_guard(active.update(&ledger.db).await.unwrap_err());

    assert_guard(line.delete(&ledger.db).await.unwrap_err());
}

#[tokio::test]
async fn test_line_must_carry_exactly_one_side() {
    let ledger = TestLedger::start().await;
    let draft = ledger
        .journal()
        .create_draft(ledger.entry(date(2024, 1, 15), "1101", "4101", dec!(250)))
        .await
        .unwrap();

    let mut active: journal_lines::ActiveModel = draft.lines[0].clone().into();
    active.credit = Set(dec!(250));
    let err = RepositoryError::from(active.update(&ledger.db).await.unwrap_err());

    assert!(matches!(err, RepositoryError::Database(_)), "got {err:?}");
}

// ============================================================================
// documents
// ============================================================================

#[tokio::test]
async fn test_document_outstanding_stays_within_total() {
    let ledger = TestLedger::start().await;
    let doc = ledger
        .payments()
        .register_document(NewDocument {
            kind: DocumentKind::Purchase,
            contact_id: ContactId::new(),
            number: "BILL-001".to_string(),
            document_date: date(2024, 2, 1),
            due_date: None,
            total_amount: dec!(100),
        })
        .await
        .unwrap();

    let mut active: documents::ActiveModel = doc.into();
    active.outstanding_amount = Set(dec!(100.01));

    assert!(active.update(&ledger.db).await.is_err());
}
