//! Chart-of-accounts domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use bukubesar_shared::types::AccountId;

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Resources owned (cash, receivables, equipment).
    Asset,
    /// Obligations owed (payables, loans).
    Liability,
    /// Owner's residual interest, including retained earnings.
    Equity,
    /// Income earned during a period.
    Revenue,
    /// Costs incurred during a period.
    Expense,
}

impl AccountType {
    /// All account types in chart order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns the side on which balances of this type increase.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns true for accounts that are zeroed into equity at closing.
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::Revenue | Self::Expense)
    }

    /// Returns the string representation used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses an account type, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ASSET" => Some(Self::Asset),
            "LIABILITY" => Some(Self::Liability),
            "EQUITY" => Some(Self::Equity),
            "REVENUE" => Some(Self::Revenue),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normal balance side of an account.
///
/// - Debit-normal (Asset, Expense): balance += debit - credit
/// - Credit-normal (Liability, Equity, Revenue): balance += credit - debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NormalBalance {
    /// Balance increases with debits.
    Debit,
    /// Balance increases with credits.
    Credit,
}

impl NormalBalance {
    /// Calculates the signed balance change for a debit/credit pair.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Account metadata needed by the posting engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Hierarchical account code, e.g. "1101".
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the account accepts new postings.
    pub is_active: bool,
    /// Header accounts group children and never hold lines.
    pub is_header: bool,
}

impl AccountInfo {
    /// Returns the normal balance side derived from the account type.
    #[must_use]
    pub const fn normal_balance(&self) -> NormalBalance {
        self.account_type.normal_balance()
    }

    /// Returns true if journal lines may be posted to this account.
    #[must_use]
    pub const fn accepts_postings(&self) -> bool {
        self.is_active && !self.is_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AccountType::Asset, NormalBalance::Debit)]
    #[case(AccountType::Expense, NormalBalance::Debit)]
    #[case(AccountType::Liability, NormalBalance::Credit)]
    #[case(AccountType::Equity, NormalBalance::Credit)]
    #[case(AccountType::Revenue, NormalBalance::Credit)]
    fn test_normal_balance_by_type(#[case] account_type: AccountType, #[case] side: NormalBalance) {
        assert_eq!(account_type.normal_balance(), side);
    }

    #[test]
    fn test_balance_change_follows_normal_side() {
        assert_eq!(
            NormalBalance::Debit.balance_change(dec!(1000000), Decimal::ZERO),
            dec!(1000000)
        );
        assert_eq!(
            NormalBalance::Credit.balance_change(Decimal::ZERO, dec!(1000000)),
            dec!(1000000)
        );
        assert_eq!(
            NormalBalance::Debit.balance_change(dec!(10), dec!(25)),
            dec!(-15)
        );
    }

    #[test]
    fn test_only_revenue_and_expense_are_temporary() {
        let temporary: Vec<_> = AccountType::ALL
            .into_iter()
            .filter(|t| t.is_temporary())
            .collect();
        assert_eq!(temporary, vec![AccountType::Revenue, AccountType::Expense]);
    }

    #[test]
    fn test_parse_round_trips_storage_names() {
        for account_type in AccountType::ALL {
            assert_eq!(AccountType::parse(account_type.as_str()), Some(account_type));
        }
        assert_eq!(AccountType::parse("revenue"), Some(AccountType::Revenue));
        assert_eq!(AccountType::parse("income"), None);
    }

    #[test]
    fn test_header_and_inactive_accounts_reject_postings() {
        let mut account = AccountInfo {
            id: AccountId::new(),
            code: "1100".to_string(),
            name: "Current Assets".to_string(),
            account_type: AccountType::Asset,
            is_active: true,
            is_header: true,
        };
        assert!(!account.accepts_postings());

        account.is_header = false;
        assert!(account.accepts_postings());

        account.is_active = false;
        assert!(!account.accepts_postings());
    }
}
