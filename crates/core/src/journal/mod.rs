//! Journal engine: entry validation, the posting state machine and reversals.

pub mod error;
pub mod reversal;
pub mod service;
pub mod state;
pub mod types;

#[cfg(test)]
mod reversal_props;
#[cfg(test)]
mod service_props;

pub use error::JournalError;
pub use reversal::{OriginalEntry, OriginalLine, ReversalEligibility, ReversalService};
pub use service::JournalService;
pub use state::{EntryAction, EntryWorkflow};
pub use types::{
    DocumentKind, DocumentRef, EntryInput, EntryStatus, EntryTotals, LineInput, ResolvedLine,
    SourceType, generate_reference,
};
