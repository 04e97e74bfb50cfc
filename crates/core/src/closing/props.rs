//! Property-based tests for ClosingService.
//!
//! - Property 8: Closing Zeroes Temporary Accounts
//! - Property 9: Closed Ranges Never Overlap

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use bukubesar_shared::types::{AccountId, UserId};

use super::service::{ClosingContext, ClosingService};
use super::types::{AccountActivity, ClosingType, PeriodRange, RetainedEarnings};
use crate::accounts::AccountType;

fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_activity() -> impl Strategy<Value = Vec<AccountActivity>> {
    prop::collection::vec(
        (
            prop_oneof![Just(AccountType::Revenue), Just(AccountType::Expense)],
            amount(),
            amount(),
        ),
        1..8,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (account_type, debit, credit))| AccountActivity {
                account_id: AccountId::new(),
                code: format!("{}{i:03}", if account_type == AccountType::Revenue { 4 } else { 5 }),
                name: format!("Account {i}"),
                account_type,
                is_header: false,
                total_debit: debit,
                total_credit: credit,
            })
            .collect()
    })
}

fn arb_range() -> impl Strategy<Value = PeriodRange> {
    (0u64..730, 0u64..120).prop_map(|(offset, len)| {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let start = base.checked_add_days(Days::new(offset)).unwrap();
        let end = start.checked_add_days(Days::new(len)).unwrap();
        PeriodRange::new(start, end).unwrap()
    })
}

fn retained() -> RetainedEarnings {
    RetainedEarnings {
        account_id: AccountId::from_uuid(uuid::Uuid::from_u128(3201)),
        code: "3201".to_string(),
        account_type: AccountType::Equity,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 8: Closing Zeroes Temporary Accounts
    // =========================================================================

    /// **Property 8.1: The closing entry balances and zeroes every line.**
    ///
    /// *For any* revenue and expense activity, applying the closing entry
    /// SHALL leave each closed account at zero, and the retained earnings
    /// movement SHALL equal net income.
    #[test]
    fn prop_closing_zeroes_accounts(activity in arb_activity()) {
        let re = retained();
        let range = PeriodRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        ).unwrap();
        let ctx = ClosingContext {
            range,
            activity: &activity,
            retained_earnings_code: "3201",
            retained_earnings: Some(&re),
            overlapping: &[],
            range_totals: (Decimal::ZERO, Decimal::ZERO),
        };

        prop_assume!(activity.iter().any(|a| !a.balance().is_zero()));
        let plan = ClosingService::plan(&ctx, ClosingType::Period, None, UserId::new()).unwrap();

        let debit: Decimal = plan.entry.lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = plan.entry.lines.iter().map(|l| l.credit).sum();
        prop_assert_eq!(debit, credit);

        for account in activity.iter().filter(|a| !a.balance().is_zero()) {
            let line = plan.entry.lines.iter().find(|l| l.account_id == account.account_id).unwrap();
            let after = account.account_type.normal_balance().balance_change(
                account.total_debit + line.debit,
                account.total_credit + line.credit,
            );
            prop_assert_eq!(after, Decimal::ZERO);
        }

        let equity_credit: Decimal = plan
            .entry
            .lines
            .iter()
            .filter(|l| l.account_id == re.account_id)
            .map(|l| l.credit - l.debit)
            .sum();
        prop_assert_eq!(equity_credit, plan.net_income);
    }

    // =========================================================================
    // Property 9: Closed Ranges Never Overlap
    // =========================================================================

    /// **Property 9.1: Overlap check agrees with day containment.**
    ///
    /// *For any* two ranges, the check SHALL reject exactly when some day
    /// lies in both.
    #[test]
    fn prop_overlap_matches_containment(a in arb_range(), b in arb_range()) {
        let shares_day = a.contains(b.start) || b.contains(a.start);
        let result = ClosingService::ensure_not_overlapping(&a, &[b]);
        prop_assert_eq!(result.is_err(), shares_day);
    }
}
