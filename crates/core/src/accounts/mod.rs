//! Account directory rules.
//!
//! Chart-of-accounts metadata: code, type and normal-balance side.
//! Read mostly; referenced by every other module.

pub mod error;
pub mod rules;
pub mod types;

pub use error::AccountError;
pub use rules::{validate_code, validate_new_account, validate_structural_change};
pub use types::{AccountInfo, AccountType, NormalBalance};
