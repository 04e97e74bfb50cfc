//! Journal repository: entry persistence and the posting state machine.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use bukubesar_core::closing::{is_date_in_closed_period, ClosedPeriod};
use bukubesar_core::journal::{
    EntryAction, EntryInput, EntryStatus, EntryWorkflow, JournalError, JournalService, LineInput,
    OriginalEntry, ReversalEligibility, ReversalService,
};
use bukubesar_shared::types::{JournalEntryId, UserId};

use super::convert;
use super::error::RepositoryError;
use super::posting::{self, EntryWithLines, LedgerSettings};
use crate::entities::{journal_entries, journal_lines};

/// An original entry and the entry that reversed it.
#[derive(Debug, Clone, Serialize)]
pub struct ReversalPair {
    /// The reversed entry (status REVERSED).
    pub original: EntryWithLines,
    /// The mirror entry.
    pub reversal: EntryWithLines,
}

/// Both sides of a reversal link, as far as they exist.
#[derive(Debug, Clone, Serialize)]
pub struct ReversalHistory {
    /// The entry asked about.
    pub entry: journal_entries::Model,
    /// The entry this one reverses, if it is a reversal.
    pub reversal_of: Option<journal_entries::Model>,
    /// The entry that reversed this one, if any.
    pub reversed_by: Option<journal_entries::Model>,
}

/// Journal repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Validates, posts and applies an entry in one transaction.
    ///
    /// # Errors
    ///
    /// Validation errors for bad lines, `PeriodClosed` when the date lies in
    /// a closed period, `Contention` when a lock wait times out.
    #[instrument(skip(self, input), fields(entry_date = %input.entry_date))]
    pub async fn create_and_post(
        &self,
        input: EntryInput,
    ) -> Result<EntryWithLines, RepositoryError> {
        let txn = posting::begin(&self.db, &self.settings).await?;
        let posted = posting::post_entry(&txn, &input, None).await?;
        txn.commit().await?;

        info!(
            entry_id = %posted.entry.id,
            reference = %posted.entry.reference,
            total = %posted.entry.total_debit,
            "journal entry posted"
        );
        Ok(posted)
    }

    /// Stores an entry as DRAFT.
    ///
    /// # Errors
    ///
    /// Validation errors for bad lines.
    pub async fn create_draft(&self, input: EntryInput) -> Result<EntryWithLines, RepositoryError> {
        let txn = posting::begin(&self.db, &self.settings).await?;
        let draft = posting::insert_entry(&txn, &input, EntryStatus::Draft, &[], None).await?;
        txn.commit().await?;

        info!(entry_id = %draft.entry.id, "journal draft created");
        Ok(draft)
    }

    /// Posts a draft after re-validating it.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, `InvalidTransition` unless DRAFT, plus the
    /// validation and closed-period errors of posting.
    #[instrument(skip(self))]
    pub async fn post_draft(
        &self,
        id: JournalEntryId,
        posted_by: UserId,
    ) -> Result<EntryWithLines, RepositoryError> {
        let txn = posting::begin(&self.db, &self.settings).await?;
        posting::enter_posting_gate(&txn).await?;

        let entry = lock_entry(&txn, id).await?;
        let EntryAction::Post {
            new_status,
            posted_by,
            posted_at,
        } = EntryWorkflow::post(entry.status.into(), posted_by)?
        else {
            return Err(JournalError::InvalidTransition {
                action: "post",
                from: entry.status.into(),
            }
            .into());
        };

        let lines = entry_lines(&txn, entry.id).await?;
        let input = stored_input(&entry, &lines);
        let closed = posting::closed_periods(&txn).await?;
        let (resolved, _) = posting::resolve(&txn, &input, |date| {
            is_date_in_closed_period(date, &closed)
        })
        .await?;

        let touched = JournalService::touched_accounts(&resolved);
        posting::lock_accounts(&txn, &touched).await?;

        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(new_status.into());
        active.posted_by = Set(Some(posted_by.into_inner()));
        active.posted_at = Set(Some(posted_at.into()));
        active.updated_at = Set(Utc::now().into());
        let entry = active.update(&txn).await?;

        posting::refresh_balances(&txn, &touched).await?;
        txn.commit().await?;

        info!(entry_id = %entry.id, reference = %entry.reference, "journal draft posted");
        Ok(EntryWithLines { entry, lines })
    }

    /// Deletes a DRAFT entry with its lines.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, or `InvalidTransition` for any other status.
    pub async fn discard_draft(&self, id: JournalEntryId) -> Result<(), RepositoryError> {
        let txn = posting::begin(&self.db, &self.settings).await?;
        let entry = lock_entry(&txn, id).await?;
        EntryWorkflow::discard(entry.status.into())?;
        entry.delete(&txn).await?;
        txn.commit().await?;

        info!(entry_id = %id, "journal draft discarded");
        Ok(())
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the entry does not exist.
    pub async fn get_entry(&self, id: JournalEntryId) -> Result<EntryWithLines, RepositoryError> {
        let entry = journal_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(JournalError::EntryNotFound(id))?;
        let lines = entry_lines(&self.db, entry.id).await?;
        Ok(EntryWithLines { entry, lines })
    }

    /// Reverses a POSTED entry.
    ///
    /// The mirror entry is dated `reversal_date`, or today when absent.
    ///
    /// # Errors
    ///
    /// `ReasonRequired`, `AlreadyReversed`, `InvalidTransition` for drafts,
    /// `PeriodClosed` when the reversal date lies in a closed period,
    /// `ManagedBySource` for PAYMENT and PERIOD_CLOSING entries.
    #[instrument(skip(self, reason))]
    pub async fn reverse_entry(
        &self,
        id: JournalEntryId,
        reason: &str,
        reversal_date: Option<NaiveDate>,
        reversed_by: UserId,
    ) -> Result<ReversalPair, RepositoryError> {
        let date = reversal_date.unwrap_or_else(|| Utc::now().date_naive());

        let txn = posting::begin(&self.db, &self.settings).await?;
        posting::enter_posting_gate(&txn).await?;
        let entry = lock_entry(&txn, id).await?;
        ReversalService::ensure_journal_owned(id, entry.source_type.into())?;

        let closed = posting::closed_periods(&txn).await?;
        let pair = reverse_in(&txn, id, reason, date, reversed_by, &closed).await?;
        txn.commit().await?;

        info!(
            entry_id = %pair.original.entry.id,
            reversal_id = %pair.reversal.entry.id,
            "journal entry reversed"
        );
        Ok(pair)
    }

    /// Reports whether an entry could be reversed right now.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the entry does not exist.
    pub async fn can_reverse(
        &self,
        id: JournalEntryId,
    ) -> Result<ReversalEligibility, RepositoryError> {
        let EntryWithLines { entry, lines } = self.get_entry(id).await?;
        if let Err(err) = ReversalService::ensure_journal_owned(id, entry.source_type.into()) {
            return Ok(ReversalEligibility {
                can_reverse: false,
                reason: Some(err.to_string()),
            });
        }
        Ok(ReversalService::can_reverse(&original_entry(&entry, &lines)))
    }

    /// Returns an entry together with its reversal links.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the entry does not exist.
    pub async fn reversal_history(
        &self,
        id: JournalEntryId,
    ) -> Result<ReversalHistory, RepositoryError> {
        let entry = journal_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(JournalError::EntryNotFound(id))?;

        let reversal_of = match entry.reversal_of_id {
            Some(original) => journal_entries::Entity::find_by_id(original).one(&self.db).await?,
            None => None,
        };
        let reversed_by = match entry.reversed_by_id {
            Some(reversal) => journal_entries::Entity::find_by_id(reversal).one(&self.db).await?,
            None => None,
        };

        Ok(ReversalHistory {
            entry,
            reversal_of,
            reversed_by,
        })
    }
}

/// Reverses `id` inside `txn` whatever its source; the caller holds the
/// period gate and keeps any source record in step.
pub(crate) async fn reverse_in(
    txn: &DatabaseTransaction,
    id: JournalEntryId,
    reason: &str,
    reversal_date: NaiveDate,
    reversed_by: UserId,
    closed: &[ClosedPeriod],
) -> Result<ReversalPair, RepositoryError> {
    let entry = lock_entry(txn, id).await?;
    let lines = entry_lines(txn, entry.id).await?;
    let original = original_entry(&entry, &lines);

    let mirror = ReversalService::create_reversal(
        &original,
        reason,
        reversal_date,
        reversed_by,
        |date| is_date_in_closed_period(date, closed),
    )?;
    let EntryAction::Reverse {
        new_status,
        reversed_by,
        reversed_at,
        reason,
    } = EntryWorkflow::reverse(original.status, reversed_by, reason.trim().to_string())?
    else {
        return Err(JournalError::InvalidTransition {
            action: "reverse",
            from: original.status,
        }
        .into());
    };

    let reversal =
        posting::insert_entry(txn, &mirror, EntryStatus::Posted, closed, Some(id)).await?;

    let mut active: journal_entries::ActiveModel = entry.into();
    active.status = Set(new_status.into());
    active.reversed_by_id = Set(Some(reversal.entry.id));
    active.reversed_by = Set(Some(reversed_by.into_inner()));
    active.reversed_at = Set(Some(reversed_at.into()));
    active.reversal_reason = Set(Some(reason));
    active.updated_at = Set(Utc::now().into());
    let entry = active.update(txn).await?;

    Ok(ReversalPair {
        original: EntryWithLines { entry, lines },
        reversal,
    })
}

async fn lock_entry(
    txn: &DatabaseTransaction,
    id: JournalEntryId,
) -> Result<journal_entries::Model, RepositoryError> {
    Ok(journal_entries::Entity::find_by_id(id.into_inner())
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(JournalError::EntryNotFound(id))?)
}

pub(crate) async fn entry_lines<C: sea_orm::ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> Result<Vec<journal_lines::Model>, sea_orm::DbErr> {
    journal_lines::Entity::find()
        .filter(journal_lines::Column::JournalEntryId.eq(entry_id))
        .order_by_asc(journal_lines::Column::LineNumber)
        .all(conn)
        .await
}

fn original_entry(entry: &journal_entries::Model, lines: &[journal_lines::Model]) -> OriginalEntry {
    OriginalEntry {
        id: JournalEntryId::from_uuid(entry.id),
        reference: entry.reference.clone(),
        status: entry.status.into(),
        reversed_by: entry.reversed_by_id.map(JournalEntryId::from_uuid),
        lines: lines.iter().map(convert::original_line).collect(),
    }
}

/// Rebuilds the input a stored draft was created from.
fn stored_input(entry: &journal_entries::Model, lines: &[journal_lines::Model]) -> EntryInput {
    EntryInput {
        entry_date: entry.entry_date,
        reference: Some(entry.reference.clone()),
        description: entry.description.clone(),
        source_type: entry.source_type.into(),
        source_id: entry.source_id,
        lines: lines
            .iter()
            .map(|line| LineInput {
                account_id: line.account_id.into(),
                debit: line.debit,
                credit: line.credit,
                description: line.description.clone(),
                document: convert::document_ref(line.document_kind, line.document_id),
                allocation_id: line.allocation_id,
            })
            .collect(),
        created_by: entry.created_by.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::{DocumentKind, JournalSourceType, JournalStatus};
    use bukubesar_core::journal::SourceType;
    use rust_decimal_macros::dec;
    use sea_orm::prelude::DateTimeWithTimeZone;

    fn stored() -> (journal_entries::Model, Vec<journal_lines::Model>) {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let entry_id = Uuid::now_v7();
        let entry = journal_entries::Model {
            id: entry_id,
            reference: "JE-20240315-0000ABCD".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            description: "Cash sale".to_string(),
            source_type: JournalSourceType::Sale,
            source_id: None,
            status: JournalStatus::Posted,
            total_debit: dec!(1000000),
            total_credit: dec!(1000000),
            reversal_of_id: None,
            reversed_by_id: None,
            reversal_reason: None,
            created_by: Uuid::now_v7(),
            posted_by: None,
            posted_at: None,
            reversed_by: None,
            reversed_at: None,
            created_at: now,
            updated_at: now,
        };
        let line = |n: i32, debit, credit, document_kind, document_id| journal_lines::Model {
            id: Uuid::now_v7(),
            journal_entry_id: entry_id,
            line_number: n,
            account_id: Uuid::now_v7(),
            debit,
            credit,
            description: Some(format!("line {n}")),
            document_kind,
            document_id,
            allocation_id: None,
            created_at: now,
        };
        let lines = vec![
            line(1, dec!(1000000), dec!(0), None, None),
            line(2, dec!(0), dec!(1000000), Some(DocumentKind::Sale), Some(Uuid::now_v7())),
        ];
        (entry, lines)
    }

    #[test]
    fn test_stored_input_keeps_lines_in_order() {
        let (entry, lines) = stored();
        let input = stored_input(&entry, &lines);
        assert_eq!(input.source_type, SourceType::Sale);
        assert_eq!(input.reference.as_deref(), Some("JE-20240315-0000ABCD"));
        assert_eq!(input.lines.len(), 2);
        assert_eq!(input.lines[0].debit, dec!(1000000));
        assert!(input.lines[0].document.is_none());
        assert!(input.lines[1].document.is_some());
    }

    #[test]
    fn test_original_entry_is_reversible_when_posted() {
        let (entry, lines) = stored();
        let original = original_entry(&entry, &lines);
        assert_eq!(original.status, EntryStatus::Posted);
        assert!(ReversalService::can_reverse(&original).can_reverse);
    }
}
