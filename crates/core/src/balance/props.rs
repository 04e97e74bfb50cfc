//! Property-based tests for balance aggregation.
//!
//! - Property 4: Refresh Round-Trip
//! - Property 5: Global Double-Entry Invariant

use proptest::prelude::*;
use rust_decimal::Decimal;

use bukubesar_shared::types::AccountId;

use super::{AccountTotals, BalanceService};
use crate::accounts::NormalBalance;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn side() -> impl Strategy<Value = NormalBalance> {
    prop_oneof![Just(NormalBalance::Debit), Just(NormalBalance::Credit)]
}

/// Aggregates balanced two-line postings per account.
fn aggregate(postings: &[(usize, usize, Decimal)], ids: &[AccountId]) -> Vec<AccountTotals> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let debit: Decimal = postings.iter().filter(|p| p.0 == i).map(|p| p.2).sum();
            let credit: Decimal = postings.iter().filter(|p| p.1 == i).map(|p| p.2).sum();
            AccountTotals::from_sums(*id, NormalBalance::Debit, debit, credit)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 4: Refresh Round-Trip
    // =========================================================================

    /// **Property 4.1: A refreshed row never drifts from its aggregate.**
    ///
    /// *For any* debit/credit sums and normal side, materializing the fresh
    /// aggregate SHALL report no drift.
    #[test]
    fn prop_refresh_is_idempotent(debit in amount(), credit in amount(), normal in side()) {
        let totals = AccountTotals::from_sums(AccountId::new(), normal, debit, credit);
        prop_assert!(BalanceService::detect_drift(&[totals.clone()], &[totals]).is_empty());
    }

    /// **Property 4.2: Normal sides are exact negations.**
    #[test]
    fn prop_sides_negate(debit in amount(), credit in amount()) {
        let id = AccountId::new();
        let d = AccountTotals::from_sums(id, NormalBalance::Debit, debit, credit);
        let c = AccountTotals::from_sums(id, NormalBalance::Credit, debit, credit);
        prop_assert_eq!(d.balance, -c.balance);
    }

    // =========================================================================
    // Property 5: Global Double-Entry Invariant
    // =========================================================================

    /// **Property 5.1: Balanced postings keep the trial balance at zero.**
    ///
    /// *For any* sequence of balanced postings across a chart of accounts,
    /// Σ(debit − credit) over all accounts SHALL be zero.
    #[test]
    fn prop_trial_balance_zero(
        postings in prop::collection::vec((0usize..6, 0usize..6, amount()), 1..20),
    ) {
        let ids: Vec<AccountId> = (0..6).map(|_| AccountId::new()).collect();
        let totals = aggregate(&postings, &ids);
        let trial = BalanceService::trial_balance(&totals);

        prop_assert!(trial.is_balanced());
        let net: Decimal = totals.iter().map(|t| t.balance).sum();
        prop_assert_eq!(net, Decimal::ZERO);
    }
}
