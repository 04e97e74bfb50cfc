//! Reconciliation errors.

use rust_decimal::Decimal;
use thiserror::Error;

use bukubesar_shared::types::CashBankId;
use bukubesar_shared::{AppError, ErrorKind};

/// Errors raised while linking or reconciling cash/bank records.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Cash/bank record not found.
    #[error("Cash/bank record not found: {0}")]
    CashBankNotFound(CashBankId),

    /// GL account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Only ASSET accounts can back a cash/bank record.
    #[error("Only ASSET accounts can be linked to cash/bank (account {code} is {account_type})")]
    NotAssetAccount {
        /// Account code.
        code: String,
        /// Its actual type.
        account_type: String,
    },

    /// Header accounts cannot be linked.
    #[error("Account {0} is a header account and cannot be linked")]
    HeaderAccount(String),

    /// Inactive accounts cannot be linked.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    /// Record has no linked GL account.
    #[error("Cash/bank record {0} is not linked to an account")]
    NotLinked(CashBankId),

    /// Adjustment account for `to_coa` is missing.
    #[error("Reconciliation adjustment account {0} not found")]
    AdjustmentAccountMissing(String),

    /// A `to_coa` correction was computed but could not be posted.
    #[error(
        "Correction of {correction} for cash/bank {cash_bank_id} refused \
         (discrepancy {discrepancy}): {reason}"
    )]
    CorrectionRefused {
        /// The record being reconciled.
        cash_bank_id: CashBankId,
        /// Subsidiary minus ledger before any write.
        discrepancy: Decimal,
        /// Amount of the correcting entry that was not posted.
        correction: Decimal,
        /// Why it could not be posted.
        reason: String,
    },
}

impl ReconciliationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CashBankNotFound(_) => "CASH_BANK_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::NotAssetAccount { .. } => "NOT_ASSET_ACCOUNT",
            Self::HeaderAccount(_) => "HEADER_ACCOUNT",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::NotLinked(_) => "CASH_BANK_NOT_LINKED",
            Self::AdjustmentAccountMissing(_) => "ADJUSTMENT_ACCOUNT_MISSING",
            Self::CorrectionRefused { .. } => "CORRECTION_REFUSED",
        }
    }

    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CashBankNotFound(_)
            | Self::AccountNotFound(_)
            | Self::AdjustmentAccountMissing(_) => ErrorKind::NotFound,
            Self::NotAssetAccount { .. }
            | Self::HeaderAccount(_)
            | Self::AccountInactive(_)
            | Self::NotLinked(_) => ErrorKind::Validation,
            Self::CorrectionRefused { .. } => ErrorKind::Conflict,
        }
    }
}

impl From<ReconciliationError> for AppError {
    fn from(err: ReconciliationError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
