//! Entry state machine.
//!
//! DRAFT → POSTED (one-way) → REVERSED (terminal). A draft may be
//! discarded without trace; nothing else is ever deleted.

use chrono::{DateTime, Utc};

use bukubesar_shared::types::UserId;

use super::error::JournalError;
use super::types::EntryStatus;

/// State transition with audit data.
#[derive(Debug, Clone)]
pub enum EntryAction {
    /// A draft becomes authoritative.
    Post {
        /// The new status (Posted).
        new_status: EntryStatus,
        /// The user who posted the entry.
        posted_by: UserId,
        /// When the entry was posted.
        posted_at: DateTime<Utc>,
    },
    /// A posted entry is neutralized by a mirror entry.
    Reverse {
        /// The new status (Reversed).
        new_status: EntryStatus,
        /// The user who reversed the entry.
        reversed_by: UserId,
        /// When the entry was reversed.
        reversed_at: DateTime<Utc>,
        /// The reason for reversing.
        reason: String,
    },
    /// A draft is deleted with its lines.
    Discard,
}

impl EntryAction {
    /// Returns the status after this action, or `None` for a discard.
    #[must_use]
    pub fn new_status(&self) -> Option<EntryStatus> {
        match self {
            Self::Post { new_status, .. } | Self::Reverse { new_status, .. } => Some(*new_status),
            Self::Discard => None,
        }
    }
}

/// Stateless service for entry status transitions.
pub struct EntryWorkflow;

impl EntryWorkflow {
    /// Post a draft entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the entry is a draft.
    pub fn post(current: EntryStatus, posted_by: UserId) -> Result<EntryAction, JournalError> {
        match current {
            EntryStatus::Draft => Ok(EntryAction::Post {
                new_status: EntryStatus::Posted,
                posted_by,
                posted_at: Utc::now(),
            }),
            _ => Err(JournalError::InvalidTransition {
                action: "post",
                from: current,
            }),
        }
    }

    /// Mark a posted entry as reversed.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for a blank reason and `InvalidTransition`
    /// unless the entry is posted.
    pub fn reverse(
        current: EntryStatus,
        reversed_by: UserId,
        reason: String,
    ) -> Result<EntryAction, JournalError> {
        if reason.trim().is_empty() {
            return Err(JournalError::ReasonRequired);
        }

        match current {
            EntryStatus::Posted => Ok(EntryAction::Reverse {
                new_status: EntryStatus::Reversed,
                reversed_by,
                reversed_at: Utc::now(),
                reason,
            }),
            _ => Err(JournalError::InvalidTransition {
                action: "reverse",
                from: current,
            }),
        }
    }

    /// Discard a draft entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the entry is a draft.
    pub fn discard(current: EntryStatus) -> Result<EntryAction, JournalError> {
        match current {
            EntryStatus::Draft => Ok(EntryAction::Discard),
            _ => Err(JournalError::InvalidTransition {
                action: "discard",
                from: current,
            }),
        }
    }
}
