//! Journal domain types for entry creation and validation.
//!
//! A journal entry is an atomic, balanced set of debit/credit lines.
//! Lines carry a structured reference to the business document they
//! originate from instead of relying on account-code prefixes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use bukubesar_shared::types::{AccountId, DocumentId, JournalEntryId, UserId};

/// Journal entry status.
///
/// The valid transitions are:
/// - Draft → Posted (post)
/// - Posted → Reversed (reverse, via a paired reversal entry)
/// - Draft → discarded (no trace)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    /// Entry is being prepared; lines may still change.
    Draft,
    /// Entry is authoritative and immutable.
    Posted,
    /// Entry was neutralized by a mirror entry (terminal).
    Reversed,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "POSTED" => Some(Self::Posted),
            "REVERSED" => Some(Self::Reversed),
            _ => None,
        }
    }

    /// Returns true if the entry's lines count towards account balances.
    ///
    /// A reversed entry stays on the books; its mirror entry neutralizes it.
    #[must_use]
    pub const fn is_on_books(&self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Returns true if the entry's lines can no longer change.
    #[must_use]
    pub const fn is_immutable(&self) -> bool {
        self.is_on_books()
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Business event that produced a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Hand-entered general journal entry.
    Manual,
    /// Sales invoice.
    Sale,
    /// Purchase bill.
    Purchase,
    /// Incoming or outgoing payment.
    Payment,
    /// Asset capitalization.
    AssetCapitalization,
    /// Period or fiscal-year closing.
    PeriodClosing,
    /// Mirror of a previously posted entry.
    Reversal,
    /// Correcting entry from cash/bank reconciliation.
    Reconciliation,
    /// Opening balances.
    OpeningBalance,
}

impl SourceType {
    /// Returns the string representation used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
            Self::Payment => "PAYMENT",
            Self::AssetCapitalization => "ASSET_CAPITALIZATION",
            Self::PeriodClosing => "PERIOD_CLOSING",
            Self::Reversal => "REVERSAL",
            Self::Reconciliation => "RECONCILIATION",
            Self::OpeningBalance => "OPENING_BALANCE",
        }
    }

    /// The operation that owns reversal of entries from this source, when
    /// a plain journal reversal would leave the source record out of step.
    #[must_use]
    pub const fn reversed_through(&self) -> Option<&'static str> {
        match self {
            Self::Payment => Some("reverse_payment"),
            Self::PeriodClosing => Some("reopen"),
            _ => None,
        }
    }
}

/// Kind of a payable/receivable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    /// Sales invoice (receivable).
    Sale,
    /// Purchase bill (payable).
    Purchase,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sale => write!(f, "SALE"),
            Self::Purchase => write!(f, "PURCHASE"),
        }
    }
}

/// Structured link from a journal line to its originating document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document kind.
    pub kind: DocumentKind,
    /// Document ID.
    pub id: DocumentId,
}

/// Input for a single journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero if this is a credit line).
    pub debit: Decimal,
    /// Credit amount (zero if this is a debit line).
    pub credit: Decimal,
    /// Optional line description.
    pub description: Option<String>,
    /// Originating document, if any.
    pub document: Option<DocumentRef>,
    /// Payment allocation this line settles, if any.
    pub allocation_id: Option<Uuid>,
}

impl LineInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
            document: None,
            allocation_id: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
            document: None,
            allocation_id: None,
        }
    }

    /// Sets the line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Links the line to a document.
    #[must_use]
    pub const fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }

    /// Links the line to a payment allocation.
    #[must_use]
    pub const fn with_allocation(mut self, allocation_id: Uuid) -> Self {
        self.allocation_id = Some(allocation_id);
        self
    }
}

/// Input for creating a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    /// Accounting date of the entry.
    pub entry_date: NaiveDate,
    /// Caller-supplied reference code; generated when absent.
    pub reference: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Business event type.
    pub source_type: SourceType,
    /// Weak reference to the originating record (lookup only).
    pub source_id: Option<Uuid>,
    /// The lines (at least 2).
    pub lines: Vec<LineInput>,
    /// The user creating the entry.
    pub created_by: UserId,
}

/// A validated journal line with its position in the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// 1-based position in the entry.
    pub line_number: i32,
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional line description.
    pub description: Option<String>,
    /// Originating document, if any.
    pub document: Option<DocumentRef>,
    /// Payment allocation, if any.
    pub allocation_id: Option<Uuid>,
}

/// Entry totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    /// Sum of debit amounts.
    pub total_debit: Decimal,
    /// Sum of credit amounts.
    pub total_credit: Decimal,
    /// Whether debits equal credits exactly.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(total_debit: Decimal, total_credit: Decimal) -> Self {
        Self {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Sums the debit and credit sides of a set of lines.
    #[must_use]
    pub fn from_lines(lines: &[ResolvedLine]) -> Self {
        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();
        Self::new(total_debit, total_credit)
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debit - self.total_credit
    }
}

/// Generates a reference code of the form `JE-YYYYMMDD-XXXXXXXX`.
#[must_use]
pub fn generate_reference(entry_date: NaiveDate, entry_id: JournalEntryId) -> String {
    let simple = entry_id.into_inner().simple().to_string();
    let suffix = &simple[simple.len() - 8..];
    format!(
        "JE-{}-{}",
        entry_date.format("%Y%m%d"),
        suffix.to_uppercase()
    )
}
