//! Reversal of posted journal entries.
//!
//! A reversal is a new POSTED entry whose lines mirror the original
//! (debit and credit swapped, order and document links preserved). The
//! original keeps its lines and moves to REVERSED.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use bukubesar_shared::types::{AccountId, JournalEntryId, UserId};

use super::error::JournalError;
use super::types::{DocumentRef, EntryInput, EntryStatus, LineInput, SourceType};

/// A posted entry about to be reversed.
#[derive(Debug, Clone)]
pub struct OriginalEntry {
    /// The entry ID.
    pub id: JournalEntryId,
    /// Reference code of the entry.
    pub reference: String,
    /// Current status.
    pub status: EntryStatus,
    /// Link to an existing reversal, if any.
    pub reversed_by: Option<JournalEntryId>,
    /// Lines in `line_number` order.
    pub lines: Vec<OriginalLine>,
}

/// A line of the entry being reversed.
#[derive(Debug, Clone)]
pub struct OriginalLine {
    /// The account ID.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional line description.
    pub description: Option<String>,
    /// Originating document, if any.
    pub document: Option<DocumentRef>,
    /// Payment allocation, if any.
    pub allocation_id: Option<Uuid>,
}

/// Whether an entry can be reversed, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReversalEligibility {
    /// True if a reversal would be accepted.
    pub can_reverse: bool,
    /// Human-readable reason when `can_reverse` is false.
    pub reason: Option<String>,
}

/// Stateless service for creating reversal entries.
pub struct ReversalService;

impl ReversalService {
    /// Build the mirror entry for `original`.
    ///
    /// # Errors
    ///
    /// - `ReasonRequired` for a blank reason
    /// - `AlreadyReversed` if the entry was reversed before
    /// - `InvalidTransition` if the entry is still a draft
    /// - `PeriodClosed` if `reversal_date` lies in a closed period
    /// - `Unbalanced` if the original lines do not balance
    pub fn create_reversal<P>(
        original: &OriginalEntry,
        reason: &str,
        reversal_date: NaiveDate,
        reversed_by: UserId,
        is_date_closed: P,
    ) -> Result<EntryInput, JournalError>
    where
        P: Fn(NaiveDate) -> bool,
    {
        if reason.trim().is_empty() {
            return Err(JournalError::ReasonRequired);
        }

        Self::ensure_reversible(original)?;

        if is_date_closed(reversal_date) {
            return Err(JournalError::PeriodClosed(reversal_date));
        }

        if !Self::validate_reversal(&original.lines) {
            let debit = original.lines.iter().map(|l| l.debit).sum();
            let credit = original.lines.iter().map(|l| l.credit).sum();
            return Err(JournalError::Unbalanced { debit, credit });
        }

        let lines = original
            .lines
            .iter()
            .map(|line| LineInput {
                account_id: line.account_id,
                debit: line.credit,
                credit: line.debit,
                description: Some(format!(
                    "Reversal: {}",
                    line.description.clone().unwrap_or_default()
                )),
                document: line.document,
                allocation_id: line.allocation_id,
            })
            .collect();

        Ok(EntryInput {
            entry_date: reversal_date,
            reference: None,
            description: format!(
                "Reversal of {}. Reason: {}",
                original.reference,
                reason.trim()
            ),
            source_type: SourceType::Reversal,
            source_id: Some(original.id.into_inner()),
            lines,
            created_by: reversed_by,
        })
    }

    /// Returns true if the original lines balance.
    #[must_use]
    pub fn validate_reversal(lines: &[OriginalLine]) -> bool {
        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();
        total_debit == total_credit
    }

    /// Reports whether `original` may be reversed.
    #[must_use]
    pub fn can_reverse(original: &OriginalEntry) -> ReversalEligibility {
        let reason = match Self::ensure_reversible(original) {
            Err(err) => Some(err.to_string()),
            Ok(()) if !Self::validate_reversal(&original.lines) => {
                Some("Journal entry is not balanced".to_string())
            }
            Ok(()) => None,
        };

        ReversalEligibility {
            can_reverse: reason.is_none(),
            reason,
        }
    }

    /// Refuses entries whose reversal belongs to the payment or closing
    /// that produced them.
    ///
    /// # Errors
    ///
    /// `ManagedBySource` naming the operation to use instead.
    pub fn ensure_journal_owned(
        id: JournalEntryId,
        source_type: SourceType,
    ) -> Result<(), JournalError> {
        match source_type.reversed_through() {
            Some(operation) => Err(JournalError::ManagedBySource {
                id,
                source_type,
                operation,
            }),
            None => Ok(()),
        }
    }

    fn ensure_reversible(original: &OriginalEntry) -> Result<(), JournalError> {
        if original.status == EntryStatus::Reversed || original.reversed_by.is_some() {
            return Err(JournalError::AlreadyReversed(original.id));
        }
        if original.status != EntryStatus::Posted {
            return Err(JournalError::InvalidTransition {
                action: "reverse",
                from: original.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn posted_sale() -> OriginalEntry {
        OriginalEntry {
            id: JournalEntryId::new(),
            reference: "JE-20240315-0000ABCD".to_string(),
            status: EntryStatus::Posted,
            reversed_by: None,
            lines: vec![
                OriginalLine {
                    account_id: AccountId::new(),
                    debit: dec!(1000000),
                    credit: Decimal::ZERO,
                    description: Some("Cash".to_string()),
                    document: None,
                    allocation_id: None,
                },
                OriginalLine {
                    account_id: AccountId::new(),
                    debit: Decimal::ZERO,
                    credit: dec!(1000000),
                    description: None,
                    document: None,
                    allocation_id: None,
                },
            ],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    #[test]
    fn test_reversal_mirrors_lines_in_order() {
        let original = posted_sale();
        let reversal =
            ReversalService::create_reversal(&original, "Duplicate", date(), UserId::new(), |_| {
                false
            })
            .unwrap();

        assert_eq!(reversal.lines.len(), 2);
        for (orig, rev) in original.lines.iter().zip(&reversal.lines) {
            assert_eq!(rev.account_id, orig.account_id);
            assert_eq!(rev.debit, orig.credit);
            assert_eq!(rev.credit, orig.debit);
        }
        assert_eq!(reversal.lines[0].description.as_deref(), Some("Reversal: Cash"));
        assert_eq!(reversal.lines[1].description.as_deref(), Some("Reversal: "));
        assert_eq!(reversal.entry_date, date());
        assert_eq!(reversal.source_type, SourceType::Reversal);
        assert_eq!(reversal.source_id, Some(original.id.into_inner()));
        assert_eq!(
            reversal.description,
            "Reversal of JE-20240315-0000ABCD. Reason: Duplicate"
        );
    }

    #[test]
    fn test_already_reversed_rejected() {
        let mut original = posted_sale();
        original.status = EntryStatus::Reversed;
        let result =
            ReversalService::create_reversal(&original, "Again", date(), UserId::new(), |_| false);
        assert!(matches!(result, Err(JournalError::AlreadyReversed(_))));

        let mut linked = posted_sale();
        linked.reversed_by = Some(JournalEntryId::new());
        assert!(!ReversalService::can_reverse(&linked).can_reverse);
    }

    #[test]
    fn test_payment_and_closing_entries_are_not_journal_owned() {
        let id = JournalEntryId::new();
        assert!(matches!(
            ReversalService::ensure_journal_owned(id, SourceType::Payment),
            Err(JournalError::ManagedBySource { operation: "reverse_payment", .. })
        ));
        assert!(matches!(
            ReversalService::ensure_journal_owned(id, SourceType::PeriodClosing),
            Err(JournalError::ManagedBySource { operation: "reopen", .. })
        ));
        for source in [SourceType::Manual, SourceType::Sale, SourceType::Reconciliation] {
            assert!(ReversalService::ensure_journal_owned(id, source).is_ok());
        }
    }

    #[test]
    fn test_draft_cannot_be_reversed() {
        let mut original = posted_sale();
        original.status = EntryStatus::Draft;
        let result =
            ReversalService::create_reversal(&original, "Oops", date(), UserId::new(), |_| false);
        assert!(matches!(result, Err(JournalError::InvalidTransition { .. })));
    }

    #[test]
    fn test_reversal_date_in_closed_period_rejected() {
        let result = ReversalService::create_reversal(
            &posted_sale(),
            "Late correction",
            date(),
            UserId::new(),
            |_| true,
        );
        assert!(matches!(result, Err(JournalError::PeriodClosed(d)) if d == date()));
    }

    #[test]
    fn test_reason_required() {
        let result =
            ReversalService::create_reversal(&posted_sale(), "", date(), UserId::new(), |_| false);
        assert!(matches!(result, Err(JournalError::ReasonRequired)));
    }

    #[test]
    fn test_can_reverse_posted_balanced_entry() {
        let eligibility = ReversalService::can_reverse(&posted_sale());
        assert!(eligibility.can_reverse);
        assert!(eligibility.reason.is_none());

        let mut unbalanced = posted_sale();
        unbalanced.lines[0].debit = dec!(999999);
        let eligibility = ReversalService::can_reverse(&unbalanced);
        assert!(!eligibility.can_reverse);
        assert_eq!(
            eligibility.reason.as_deref(),
            Some("Journal entry is not balanced")
        );
    }
}
