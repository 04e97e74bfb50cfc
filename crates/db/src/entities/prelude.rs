pub use super::account_balances::Entity as AccountBalances;
pub use super::accounts::Entity as Accounts;
pub use super::cash_bank_transactions::Entity as CashBankTransactions;
pub use super::cash_banks::Entity as CashBanks;
pub use super::documents::Entity as Documents;
pub use super::journal_entries::Entity as JournalEntries;
pub use super::journal_lines::Entity as JournalLines;
pub use super::payment_allocations::Entity as PaymentAllocations;
pub use super::payments::Entity as Payments;
pub use super::period_closings::Entity as PeriodClosings;
