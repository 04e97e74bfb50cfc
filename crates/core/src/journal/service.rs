//! Journal service for entry validation and resolution.
//!
//! Pure business logic: every check that decides whether an entry may be
//! written happens here, before the repository opens its transaction for
//! writes. Lookups are injected as closures so the same rules run against
//! the database or an in-memory chart of accounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bukubesar_shared::types::AccountId;

use super::error::JournalError;
use super::types::{EntryInput, EntryTotals, LineInput, ResolvedLine};
use crate::accounts::AccountInfo;

/// Journal service for entry validation and resolution.
pub struct JournalService;

impl JournalService {
    /// Validate and resolve an entry before it is persisted.
    ///
    /// Performs, in order:
    /// 1. At least 2 lines
    /// 2. Non-empty description
    /// 3. Entry date not inside a closed period
    /// 4. Each line has exactly one positive side
    /// 5. Each account exists, is active and is not a header account
    /// 6. Σdebit = Σcredit with exact decimal equality
    ///
    /// # Errors
    ///
    /// Returns the first failing constraint as a `JournalError`.
    pub fn validate_and_resolve<A, P>(
        input: &EntryInput,
        account_lookup: A,
        is_date_closed: P,
    ) -> Result<(Vec<ResolvedLine>, EntryTotals), JournalError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, JournalError>,
        P: Fn(NaiveDate) -> bool,
    {
        if input.lines.len() < 2 {
            return Err(JournalError::InsufficientLines);
        }

        if input.description.trim().is_empty() {
            return Err(JournalError::EmptyDescription);
        }

        if is_date_closed(input.entry_date) {
            return Err(JournalError::PeriodClosed(input.entry_date));
        }

        let mut resolved = Vec::with_capacity(input.lines.len());
        for (line_number, line) in (1_i32..).zip(&input.lines) {
            resolved.push(Self::resolve_line(line_number, line, &account_lookup)?);
        }

        let totals = Self::calculate_totals(&resolved);
        if !totals.is_balanced {
            return Err(JournalError::Unbalanced {
                debit: totals.total_debit,
                credit: totals.total_credit,
            });
        }

        Ok((resolved, totals))
    }

    /// Resolve a single line.
    fn resolve_line<A>(
        line_number: i32,
        line: &LineInput,
        account_lookup: &A,
    ) -> Result<ResolvedLine, JournalError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, JournalError>,
    {
        Self::validate_line_amounts(line_number, line.debit, line.credit)?;

        let account = account_lookup(line.account_id)?;
        if !account.is_active {
            return Err(JournalError::AccountInactive(account.code));
        }
        if account.is_header {
            return Err(JournalError::HeaderAccount(account.code));
        }

        Ok(ResolvedLine {
            line_number,
            account_id: line.account_id,
            debit: line.debit,
            credit: line.credit,
            description: line.description.clone(),
            document: line.document,
            allocation_id: line.allocation_id,
        })
    }

    /// Checks that exactly one side of a line is positive.
    ///
    /// # Errors
    ///
    /// Returns `NegativeAmount`, `BothSidesSet` or `ZeroAmount`.
    pub fn validate_line_amounts(
        line_number: i32,
        debit: Decimal,
        credit: Decimal,
    ) -> Result<(), JournalError> {
        if debit < Decimal::ZERO || credit < Decimal::ZERO {
            return Err(JournalError::NegativeAmount(line_number));
        }
        match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, true) => Err(JournalError::BothSidesSet(line_number)),
            (false, false) => Err(JournalError::ZeroAmount(line_number)),
            _ => Ok(()),
        }
    }

    /// Calculate entry totals from resolved lines.
    #[must_use]
    pub fn calculate_totals(lines: &[ResolvedLine]) -> EntryTotals {
        EntryTotals::from_lines(lines)
    }

    /// Returns the distinct accounts touched by a set of lines, sorted by id.
    ///
    /// Row locks on accounts are always taken in this order.
    #[must_use]
    pub fn touched_accounts(lines: &[ResolvedLine]) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountType;
    use crate::journal::types::SourceType;
    use bukubesar_shared::types::UserId;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct Chart {
        accounts: HashMap<AccountId, AccountInfo>,
    }

    impl Chart {
        fn new(list: &[(&str, AccountType)]) -> (Self, Vec<AccountId>) {
            let mut accounts = HashMap::new();
            let mut ids = Vec::new();
            for (code, account_type) in list {
                let id = AccountId::new();
                accounts.insert(
                    id,
                    AccountInfo {
                        id,
                        code: (*code).to_string(),
                        name: format!("Account {code}"),
                        account_type: *account_type,
                        is_active: true,
                        is_header: false,
                    },
                );
                ids.push(id);
            }
            (Self { accounts }, ids)
        }

        fn lookup(&self, id: AccountId) -> Result<AccountInfo, JournalError> {
            self.accounts
                .get(&id)
                .cloned()
                .ok_or(JournalError::AccountNotFound(id))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn entry(lines: Vec<LineInput>) -> EntryInput {
        EntryInput {
            entry_date: date(),
            reference: None,
            description: "Cash sale".to_string(),
            source_type: SourceType::Manual,
            source_id: None,
            lines,
            created_by: UserId::new(),
        }
    }

    fn never_closed(_: NaiveDate) -> bool {
        false
    }

    #[test]
    fn test_cash_sale_is_accepted() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset), ("4101", AccountType::Revenue)]);
        let input = entry(vec![
            LineInput::debit(ids[0], dec!(1000000)),
            LineInput::credit(ids[1], dec!(1000000)),
        ]);

        let (lines, totals) =
            JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed)
                .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_number, 1);
        assert_eq!(lines[1].line_number, 2);
        assert!(totals.is_balanced);
        assert_eq!(totals.total_debit, dec!(1000000));
    }

    #[test]
    fn test_single_line_rejected() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset)]);
        let input = entry(vec![LineInput::debit(ids[0], dec!(10))]);

        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(result, Err(JournalError::InsufficientLines)));
    }

    #[test]
    fn test_unbalanced_rejected_exactly() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset), ("4101", AccountType::Revenue)]);
        let input = entry(vec![
            LineInput::debit(ids[0], dec!(100.0001)),
            LineInput::credit(ids[1], dec!(100)),
        ]);

        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(
            result,
            Err(JournalError::Unbalanced { debit, credit }) if debit == dec!(100.0001) && credit == dec!(100)
        ));
    }

    #[test]
    fn test_closed_period_rejected_before_lines() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset), ("4101", AccountType::Revenue)]);
        let input = entry(vec![
            LineInput::debit(ids[0], dec!(100)),
            LineInput::credit(ids[1], dec!(100)),
        ]);

        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), |_| true);
        assert!(matches!(result, Err(JournalError::PeriodClosed(d)) if d == date()));
    }

    #[test]
    fn test_line_with_both_sides_rejected() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset), ("4101", AccountType::Revenue)]);
        let mut both = LineInput::debit(ids[0], dec!(100));
        both.credit = dec!(100);
        let input = entry(vec![both, LineInput::credit(ids[1], dec!(100))]);

        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(result, Err(JournalError::BothSidesSet(1))));
    }

    #[test]
    fn test_zero_and_negative_lines_rejected() {
        assert!(matches!(
            JournalService::validate_line_amounts(2, Decimal::ZERO, Decimal::ZERO),
            Err(JournalError::ZeroAmount(2))
        ));
        assert!(matches!(
            JournalService::validate_line_amounts(3, dec!(-5), Decimal::ZERO),
            Err(JournalError::NegativeAmount(3))
        ));
        assert!(JournalService::validate_line_amounts(1, Decimal::ZERO, dec!(0.01)).is_ok());
    }

    #[test]
    fn test_unknown_account_rejected() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset)]);
        let stranger = AccountId::new();
        let input = entry(vec![
            LineInput::debit(ids[0], dec!(100)),
            LineInput::credit(stranger, dec!(100)),
        ]);

        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(result, Err(JournalError::AccountNotFound(id)) if id == stranger));
    }

    #[test]
    fn test_inactive_and_header_accounts_rejected() {
        let (mut chart, ids) =
            Chart::new(&[("1101", AccountType::Asset), ("4101", AccountType::Revenue)]);
        let input = entry(vec![
            LineInput::debit(ids[0], dec!(100)),
            LineInput::credit(ids[1], dec!(100)),
        ]);

        chart.accounts.get_mut(&ids[1]).unwrap().is_active = false;
        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(result, Err(JournalError::AccountInactive(code)) if code == "4101"));

        let account = chart.accounts.get_mut(&ids[1]).unwrap();
        account.is_active = true;
        account.is_header = true;
        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(result, Err(JournalError::HeaderAccount(code)) if code == "4101"));
    }

    #[test]
    fn test_blank_description_rejected() {
        let (chart, ids) = Chart::new(&[("1101", AccountType::Asset), ("4101", AccountType::Revenue)]);
        let mut input = entry(vec![
            LineInput::debit(ids[0], dec!(100)),
            LineInput::credit(ids[1], dec!(100)),
        ]);
        input.description = "  ".to_string();

        let result = JournalService::validate_and_resolve(&input, |id| chart.lookup(id), never_closed);
        assert!(matches!(result, Err(JournalError::EmptyDescription)));
    }

    #[test]
    fn test_touched_accounts_sorted_and_distinct() {
        let a = AccountId::new();
        let b = AccountId::new();
        let line = |account_id, n| ResolvedLine {
            line_number: n,
            account_id,
            debit: dec!(1),
            credit: Decimal::ZERO,
            description: None,
            document: None,
            allocation_id: None,
        };
        let lines = vec![line(b, 1), line(a, 2), line(b, 3)];

        let touched = JournalService::touched_accounts(&lines);
        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(touched, expected);
    }
}
