//! Reconciliation between cash/bank records and their ledger accounts.

pub mod error;
pub mod service;
pub mod types;

pub use error::ReconciliationError;
pub use service::ReconciliationService;
pub use types::{
    CashBankSnapshot, Discrepancy, ReconcileAction, ReconcileOutcome, ReconcileRequest,
    ReconcileStatus, ReconcileStrategy,
};
