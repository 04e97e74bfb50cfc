//! Payment allocation domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use bukubesar_shared::types::{CashBankId, ContactId, DocumentId, UserId};

use crate::journal::{DocumentKind, DocumentRef};

/// Direction of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentDirection {
    /// Money received from a customer against sales invoices.
    Receive,
    /// Money paid to a vendor against purchase bills.
    Pay,
}

impl PaymentDirection {
    /// The document kind a payment in this direction settles.
    #[must_use]
    pub const fn document_kind(self) -> DocumentKind {
        match self {
            Self::Receive => DocumentKind::Sale,
            Self::Pay => DocumentKind::Purchase,
        }
    }

    /// Returns the string representation used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receive => "RECEIVE",
            Self::Pay => "PAY",
        }
    }
}

impl fmt::Display for PaymentDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a payable/receivable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    /// Not yet issued.
    Draft,
    /// Issued, nothing paid.
    Open,
    /// Partly paid.
    Partial,
    /// Outstanding below the settlement epsilon.
    Paid,
    /// Cancelled.
    Void,
}

impl DocumentStatus {
    /// Returns true if payments may be allocated to the document.
    #[must_use]
    pub const fn is_allocatable(self) -> bool {
        matches!(self, Self::Open | Self::Partial)
    }

    /// Derives the status from the document's counters.
    ///
    /// PAID once outstanding drops below `epsilon`, OPEN while nothing has
    /// been paid, PARTIAL in between.
    #[must_use]
    pub fn for_outstanding(total: Decimal, outstanding: Decimal, epsilon: Decimal) -> Self {
        if outstanding < epsilon {
            Self::Paid
        } else if outstanding >= total {
            Self::Open
        } else {
            Self::Partial
        }
    }

    /// Returns the string representation used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Open => "OPEN",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
            Self::Void => "VOID",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// Allocated and posted.
    Completed,
    /// Undone by a compensating entry.
    Reversed,
}

/// A sale or purchase document as seen by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDocument {
    /// Document ID.
    pub id: DocumentId,
    /// Sale or purchase.
    pub kind: DocumentKind,
    /// Customer or vendor.
    pub contact_id: ContactId,
    /// Human-facing number, e.g. "INV-2024-0001".
    pub number: String,
    /// Issue date.
    pub document_date: NaiveDate,
    /// Due date; falls back to the issue date for ordering.
    pub due_date: Option<NaiveDate>,
    /// Total amount.
    pub total_amount: Decimal,
    /// Amount paid so far.
    pub paid_amount: Decimal,
    /// Unpaid remainder.
    pub outstanding_amount: Decimal,
    /// Current status.
    pub status: DocumentStatus,
}

impl OpenDocument {
    /// Structured reference for journal lines.
    #[must_use]
    pub const fn document_ref(&self) -> DocumentRef {
        DocumentRef {
            kind: self.kind,
            id: self.id,
        }
    }

    /// Date used for oldest-due-first ordering.
    #[must_use]
    pub fn effective_due_date(&self) -> NaiveDate {
        self.due_date.unwrap_or(self.document_date)
    }
}

/// Where a payment should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "document_id", rename_all = "snake_case")]
pub enum AllocationTarget {
    /// Settle one specific document.
    Document(DocumentId),
    /// Settle the contact's open documents oldest-due-first.
    Auto,
    /// Record the whole amount as an advance.
    Unassigned,
}

/// A payment to allocate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Payer (RECEIVE) or payee (PAY).
    pub contact_id: ContactId,
    /// Money direction.
    pub direction: PaymentDirection,
    /// Payment amount (> 0).
    pub amount: Decimal,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Payment method, e.g. "BANK_TRANSFER".
    pub method: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Optional notes.
    pub notes: Option<String>,
    /// Cash box or bank account used; the default cash account if absent.
    pub cash_bank_id: Option<CashBankId>,
    /// Allocation mode.
    pub target: AllocationTarget,
    /// The user recording the payment.
    pub created_by: UserId,
}

/// New counters for a document after an allocation or its reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentUpdate {
    /// Document ID.
    pub document_id: DocumentId,
    /// New paid amount.
    pub paid_amount: Decimal,
    /// New outstanding amount.
    pub outstanding_amount: Decimal,
    /// New status.
    pub status: DocumentStatus,
}

/// One allocation row to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAllocation {
    /// Allocation ID; journal lines refer to it.
    pub id: Uuid,
    /// Target document, or `None` for the unassigned remainder.
    pub document: Option<DocumentRef>,
    /// Document number, for line descriptions.
    pub document_number: Option<String>,
    /// Allocated amount (> 0).
    pub amount: Decimal,
}

impl PlannedAllocation {
    /// Returns true for the advance/credit-balance allocation.
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.document.is_none()
    }
}

/// Result of planning a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    /// Allocation rows, documents first, remainder last.
    pub allocations: Vec<PlannedAllocation>,
    /// Counter updates for each settled document.
    pub updates: Vec<DocumentUpdate>,
    /// Sum allocated to documents.
    pub allocated: Decimal,
    /// Remainder recorded as unassigned.
    pub unassigned: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(500000), dec!(500000), DocumentStatus::Open)]
    #[case(dec!(500000), dec!(200000), DocumentStatus::Partial)]
    #[case(dec!(500000), dec!(0.01), DocumentStatus::Partial)]
    #[case(dec!(500000), dec!(0.009), DocumentStatus::Paid)]
    #[case(dec!(500000), Decimal::ZERO, DocumentStatus::Paid)]
    fn test_status_for_outstanding(
        #[case] total: Decimal,
        #[case] outstanding: Decimal,
        #[case] expected: DocumentStatus,
    ) {
        assert_eq!(
            DocumentStatus::for_outstanding(total, outstanding, dec!(0.01)),
            expected
        );
    }

    #[test]
    fn test_direction_settles_matching_kind() {
        assert_eq!(PaymentDirection::Receive.document_kind(), DocumentKind::Sale);
        assert_eq!(PaymentDirection::Pay.document_kind(), DocumentKind::Purchase);
    }

    #[test]
    fn test_only_open_and_partial_are_allocatable() {
        assert!(DocumentStatus::Open.is_allocatable());
        assert!(DocumentStatus::Partial.is_allocatable());
        assert!(!DocumentStatus::Paid.is_allocatable());
        assert!(!DocumentStatus::Void.is_allocatable());
        assert!(!DocumentStatus::Draft.is_allocatable());
    }

    #[test]
    fn test_target_serialization() {
        let json = serde_json::to_value(AllocationTarget::Auto).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "auto" }));

        let id = DocumentId::new();
        let json = serde_json::to_value(AllocationTarget::Document(id)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "mode": "document", "document_id": id.to_string() })
        );
    }
}
