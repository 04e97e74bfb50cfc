//! Payment allocation across receivables and payables.

pub mod allocator;
pub mod entry;
pub mod error;
pub mod reversal;
pub mod types;

#[cfg(test)]
mod allocator_props;

pub use allocator::PaymentAllocator;
pub use entry::build_payment_entry;
pub use error::PaymentError;
pub use reversal::{AllocatedDocument, PaymentReversalService};
pub use types::{
    AllocationPlan, AllocationTarget, DocumentStatus, DocumentUpdate, OpenDocument,
    PaymentDirection, PaymentRequest, PaymentStatus, PlannedAllocation,
};
