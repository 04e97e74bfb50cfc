//! Property-based tests for JournalService.
//!
//! - Property 1: Entry Balance Integrity
//! - Property 2: Line Side Exclusivity

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use bukubesar_shared::types::{AccountId, UserId};

use super::error::JournalError;
use super::service::JournalService;
use super::types::{EntryInput, LineInput, SourceType};
use crate::accounts::{AccountInfo, AccountType};

/// Strategy to generate positive decimal amounts (0.01 to 10,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Mock account lookup that accepts any id as an active posting account.
fn ok_account(id: AccountId) -> Result<AccountInfo, JournalError> {
    Ok(AccountInfo {
        id,
        code: "1101".to_string(),
        name: "Cash".to_string(),
        account_type: AccountType::Asset,
        is_active: true,
        is_header: false,
    })
}

fn open_period(_: NaiveDate) -> bool {
    false
}

fn make_input(lines: Vec<LineInput>) -> EntryInput {
    EntryInput {
        entry_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        reference: None,
        description: "Property entry".to_string(),
        source_type: SourceType::Manual,
        source_id: None,
        lines,
        created_by: UserId::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Entry Balance Integrity
    // =========================================================================

    /// **Property 1.1: Debits split across lines balance one credit.**
    ///
    /// *For any* set of debit amounts credited in total to a single account,
    /// validation SHALL succeed and the totals SHALL be exactly equal.
    #[test]
    fn prop_split_debits_balance(amounts in prop::collection::vec(positive_amount(), 1..8)) {
        let total: Decimal = amounts.iter().copied().sum();
        let mut lines: Vec<LineInput> = amounts
            .into_iter()
            .map(|a| LineInput::debit(AccountId::new(), a))
            .collect();
        lines.push(LineInput::credit(AccountId::new(), total));

        let (resolved, totals) =
            JournalService::validate_and_resolve(&make_input(lines), ok_account, open_period)
                .unwrap();

        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.total_debit, total);
        prop_assert_eq!(totals.total_credit, total);
        prop_assert_eq!(
            resolved.last().map(|l| l.line_number),
            i32::try_from(resolved.len()).ok()
        );
    }

    /// **Property 1.2: Any non-zero difference is rejected.**
    ///
    /// *For any* amount and any positive skew, an entry whose debit exceeds
    /// its credit by the skew SHALL be rejected as unbalanced.
    #[test]
    fn prop_skewed_entry_rejected(
        amount in positive_amount(),
        skew in (1i64..10_000i64).prop_map(|n| Decimal::new(n, 4)),
    ) {
        let lines = vec![
            LineInput::debit(AccountId::new(), amount + skew),
            LineInput::credit(AccountId::new(), amount),
        ];

        let result = JournalService::validate_and_resolve(&make_input(lines), ok_account, open_period);
        prop_assert!(
            matches!(result, Err(JournalError::Unbalanced { .. })),
            "Unbalanced entries must be rejected"
        );
    }

    /// **Property 1.3: Closed dates reject even balanced entries.**
    #[test]
    fn prop_closed_period_rejects(amount in positive_amount()) {
        let lines = vec![
            LineInput::debit(AccountId::new(), amount),
            LineInput::credit(AccountId::new(), amount),
        ];

        let result = JournalService::validate_and_resolve(&make_input(lines), ok_account, |_| true);
        prop_assert!(matches!(result, Err(JournalError::PeriodClosed(_))));
    }

    // =========================================================================
    // Property 2: Line Side Exclusivity
    // =========================================================================

    /// **Property 2.1: Exactly one positive side is accepted.**
    ///
    /// *For any* pair of non-negative amounts, a line SHALL be accepted if and
    /// only if exactly one of them is positive.
    #[test]
    fn prop_exactly_one_side(
        debit in prop_oneof![Just(Decimal::ZERO), positive_amount()],
        credit in prop_oneof![Just(Decimal::ZERO), positive_amount()],
    ) {
        let accepted = JournalService::validate_line_amounts(1, debit, credit).is_ok();
        let one_side = (debit > Decimal::ZERO) != (credit > Decimal::ZERO);
        prop_assert_eq!(accepted, one_side);
    }

    /// **Property 2.2: Negative amounts are rejected on either side.**
    #[test]
    fn prop_negative_rejected(amount in positive_amount(), on_debit in any::<bool>()) {
        let (debit, credit) = if on_debit {
            (-amount, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -amount)
        };
        prop_assert!(matches!(
            JournalService::validate_line_amounts(1, debit, credit),
            Err(JournalError::NegativeAmount(1))
        ));
    }
}
