//! `SeaORM` entity definitions, one module per table.

#![allow(missing_docs)]

pub mod prelude;

pub mod account_balances;
pub mod accounts;
pub mod cash_bank_transactions;
pub mod cash_banks;
pub mod documents;
pub mod journal_entries;
pub mod journal_lines;
pub mod payment_allocations;
pub mod payments;
pub mod period_closings;
pub mod sea_orm_active_enums;
