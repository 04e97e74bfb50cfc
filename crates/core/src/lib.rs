//! Core ledger logic for bukubesar.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Repositories load the rows, these modules decide what to write.
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts rules
//! - `journal` - Entry validation, lifecycle and reversal
//! - `balance` - Balance aggregation and drift detection
//! - `payment` - Allocation of payments to open documents
//! - `closing` - Period and fiscal-year closing
//! - `reconciliation` - Cash/bank against ledger reconciliation

pub mod accounts;
pub mod balance;
pub mod closing;
pub mod journal;
pub mod payment;
pub mod reconciliation;
