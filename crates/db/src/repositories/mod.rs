//! Repository abstractions for data access.
//!
//! One repository per ledger component. Every mutating call runs in a
//! single database transaction and either commits all of its rows or none.

pub mod account;
pub mod balance;
pub mod closing;
mod convert;
pub mod error;
pub mod journal;
pub mod payment;
pub mod posting;
pub mod reconciliation;

pub use account::{AccountRepository, CreateAccountInput, UpdateAccountInput};
pub use balance::BalanceRepository;
pub use closing::{ClosingRecord, ClosingRepository};
pub use error::RepositoryError;
pub use journal::{JournalRepository, ReversalHistory, ReversalPair};
pub use payment::{NewDocument, PaymentRecord, PaymentRepository};
pub use posting::{EntryWithLines, LedgerSettings};
pub use reconciliation::{NewCashBank, ReconciliationRepository};
