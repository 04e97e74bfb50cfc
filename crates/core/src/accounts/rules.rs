//! Chart-of-accounts maintenance rules.

use super::error::AccountError;
use super::types::{AccountInfo, AccountType};

/// Validates an account code.
///
/// Codes are hierarchical strings such as "1101" or "1-1-01".
pub fn validate_code(code: &str) -> Result<(), AccountError> {
    let trimmed = code.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= 20
        && trimmed.starts_with(|c: char| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(AccountError::InvalidCode(code.to_string()))
    }
}

/// Validates a new account against its parent account, if any.
pub fn validate_new_account(
    code: &str,
    name: &str,
    account_type: AccountType,
    parent: Option<&AccountInfo>,
) -> Result<(), AccountError> {
    validate_code(code)?;

    if name.trim().is_empty() {
        return Err(AccountError::EmptyName);
    }

    if let Some(parent) = parent {
        if !parent.is_header {
            return Err(AccountError::ParentNotHeader(parent.code.clone()));
        }
        if parent.account_type != account_type {
            return Err(AccountError::ParentTypeMismatch {
                child: account_type,
                parent: parent.account_type,
            });
        }
    }

    Ok(())
}

/// Rejects structural changes to an account that posted lines reference.
///
/// Name, description and the active flag stay editable.
pub fn validate_structural_change(
    account: &AccountInfo,
    new_code: Option<&str>,
    new_type: Option<AccountType>,
    posted_line_count: u64,
) -> Result<(), AccountError> {
    let code_changes = new_code.is_some_and(|c| c != account.code);
    let type_changes = new_type.is_some_and(|t| t != account.account_type);

    if let Some(code) = new_code {
        validate_code(code)?;
    }

    if (code_changes || type_changes) && posted_line_count > 0 {
        return Err(AccountError::ReferencedByPostings(account.code.clone()));
    }

    Ok(())
}
