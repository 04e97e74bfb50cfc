//! Property-based tests for ReversalService.
//!
//! - Property 3: Reversal Mirrors The Original

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use bukubesar_shared::types::{AccountId, JournalEntryId, UserId};

use super::reversal::{OriginalEntry, OriginalLine, ReversalService};
use super::types::EntryStatus;

/// Strategy for generating random positive Decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn line(debit: Decimal, credit: Decimal, description: Option<String>) -> OriginalLine {
    OriginalLine {
        account_id: AccountId::new(),
        debit,
        credit,
        description,
        document: None,
        allocation_id: None,
    }
}

/// Strategy for a balanced entry: several debits against one credit.
fn arb_posted_entry() -> impl Strategy<Value = OriginalEntry> {
    (
        prop::collection::vec(arb_amount(), 1..5),
        prop::option::of("[a-zA-Z ]{0,20}"),
    )
        .prop_map(|(debits, memo)| {
            let total: Decimal = debits.iter().copied().sum();
            let mut lines: Vec<OriginalLine> = debits
                .into_iter()
                .map(|d| line(d, Decimal::ZERO, memo.clone()))
                .collect();
            lines.push(line(Decimal::ZERO, total, None));

            OriginalEntry {
                id: JournalEntryId::new(),
                reference: "JE-20240315-00000001".to_string(),
                status: EntryStatus::Posted,
                reversed_by: None,
                lines,
            }
        })
}

fn reversal_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 3: Reversal Mirrors The Original
    // =========================================================================

    /// **Property 3.1: Every line is the exact debit/credit mirror.**
    ///
    /// *For any* posted balanced entry, the reversal SHALL have the same number
    /// of lines, in the same order, on the same accounts, with sides swapped.
    #[test]
    fn prop_reversal_is_exact_mirror(original in arb_posted_entry()) {
        let reversal = ReversalService::create_reversal(
            &original,
            "Correction",
            reversal_date(),
            UserId::new(),
            |_| false,
        )
        .unwrap();

        prop_assert_eq!(reversal.lines.len(), original.lines.len());
        for (orig, rev) in original.lines.iter().zip(&reversal.lines) {
            prop_assert_eq!(rev.account_id, orig.account_id);
            prop_assert_eq!(rev.debit, orig.credit);
            prop_assert_eq!(rev.credit, orig.debit);
        }
    }

    /// **Property 3.2: Original plus reversal nets to zero per account.**
    #[test]
    fn prop_reversal_neutralizes(original in arb_posted_entry()) {
        let reversal = ReversalService::create_reversal(
            &original,
            "Correction",
            reversal_date(),
            UserId::new(),
            |_| false,
        )
        .unwrap();

        for (orig, rev) in original.lines.iter().zip(&reversal.lines) {
            let net = (orig.debit - orig.credit) + (rev.debit - rev.credit);
            prop_assert_eq!(net, Decimal::ZERO);
        }

        let debit: Decimal = reversal.lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = reversal.lines.iter().map(|l| l.credit).sum();
        prop_assert_eq!(debit, credit);
    }

    /// **Property 3.3: A reversed entry is never reversed twice.**
    #[test]
    fn prop_reversed_entry_not_reversible(mut original in arb_posted_entry()) {
        original.status = EntryStatus::Reversed;
        original.reversed_by = Some(JournalEntryId::new());

        prop_assert!(!ReversalService::can_reverse(&original).can_reverse);
        prop_assert!(ReversalService::create_reversal(
            &original,
            "Again",
            reversal_date(),
            UserId::new(),
            |_| false,
        )
        .is_err());
    }
}
