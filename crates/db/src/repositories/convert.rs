//! Conversions between stored rows and core ledger types.

use bukubesar_core::accounts::{AccountInfo, AccountType};
use bukubesar_core::closing::{ClosedPeriod, ClosingStatus, ClosingType, PeriodRange};
use bukubesar_core::journal::{DocumentKind, DocumentRef, EntryStatus, OriginalLine, SourceType};
use bukubesar_core::payment::{DocumentStatus, OpenDocument, PaymentDirection, PaymentStatus};
use bukubesar_shared::types::{AccountId, ContactId, DocumentId, JournalEntryId, PeriodClosingId};

use crate::entities::{
    accounts, documents, journal_lines, period_closings, sea_orm_active_enums as db,
};

// ============================================================================
// Enum mappings
// ============================================================================

impl From<db::AccountType> for AccountType {
    fn from(value: db::AccountType) -> Self {
        match value {
            db::AccountType::Asset => Self::Asset,
            db::AccountType::Liability => Self::Liability,
            db::AccountType::Equity => Self::Equity,
            db::AccountType::Revenue => Self::Revenue,
            db::AccountType::Expense => Self::Expense,
        }
    }
}

impl From<AccountType> for db::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<db::JournalStatus> for EntryStatus {
    fn from(value: db::JournalStatus) -> Self {
        match value {
            db::JournalStatus::Draft => Self::Draft,
            db::JournalStatus::Posted => Self::Posted,
            db::JournalStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<EntryStatus> for db::JournalStatus {
    fn from(value: EntryStatus) -> Self {
        match value {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<SourceType> for db::JournalSourceType {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::Manual => Self::Manual,
            SourceType::Sale => Self::Sale,
            SourceType::Purchase => Self::Purchase,
            SourceType::Payment => Self::Payment,
            SourceType::AssetCapitalization => Self::AssetCapitalization,
            SourceType::PeriodClosing => Self::PeriodClosing,
            SourceType::Reversal => Self::Reversal,
            SourceType::Reconciliation => Self::Reconciliation,
            SourceType::OpeningBalance => Self::OpeningBalance,
        }
    }
}

impl From<db::JournalSourceType> for SourceType {
    fn from(value: db::JournalSourceType) -> Self {
        match value {
            db::JournalSourceType::Manual => Self::Manual,
            db::JournalSourceType::Sale => Self::Sale,
            db::JournalSourceType::Purchase => Self::Purchase,
            db::JournalSourceType::Payment => Self::Payment,
            db::JournalSourceType::AssetCapitalization => Self::AssetCapitalization,
            db::JournalSourceType::PeriodClosing => Self::PeriodClosing,
            db::JournalSourceType::Reversal => Self::Reversal,
            db::JournalSourceType::Reconciliation => Self::Reconciliation,
            db::JournalSourceType::OpeningBalance => Self::OpeningBalance,
        }
    }
}

impl From<db::DocumentKind> for DocumentKind {
    fn from(value: db::DocumentKind) -> Self {
        match value {
            db::DocumentKind::Sale => Self::Sale,
            db::DocumentKind::Purchase => Self::Purchase,
        }
    }
}

impl From<DocumentKind> for db::DocumentKind {
    fn from(value: DocumentKind) -> Self {
        match value {
            DocumentKind::Sale => Self::Sale,
            DocumentKind::Purchase => Self::Purchase,
        }
    }
}

impl From<db::DocumentStatus> for DocumentStatus {
    fn from(value: db::DocumentStatus) -> Self {
        match value {
            db::DocumentStatus::Draft => Self::Draft,
            db::DocumentStatus::Open => Self::Open,
            db::DocumentStatus::Partial => Self::Partial,
            db::DocumentStatus::Paid => Self::Paid,
            db::DocumentStatus::Void => Self::Void,
        }
    }
}

impl From<DocumentStatus> for db::DocumentStatus {
    fn from(value: DocumentStatus) -> Self {
        match value {
            DocumentStatus::Draft => Self::Draft,
            DocumentStatus::Open => Self::Open,
            DocumentStatus::Partial => Self::Partial,
            DocumentStatus::Paid => Self::Paid,
            DocumentStatus::Void => Self::Void,
        }
    }
}

impl From<PaymentDirection> for db::PaymentDirection {
    fn from(value: PaymentDirection) -> Self {
        match value {
            PaymentDirection::Receive => Self::Receive,
            PaymentDirection::Pay => Self::Pay,
        }
    }
}

impl From<db::PaymentDirection> for PaymentDirection {
    fn from(value: db::PaymentDirection) -> Self {
        match value {
            db::PaymentDirection::Receive => Self::Receive,
            db::PaymentDirection::Pay => Self::Pay,
        }
    }
}

impl From<db::PaymentStatus> for PaymentStatus {
    fn from(value: db::PaymentStatus) -> Self {
        match value {
            db::PaymentStatus::Completed => Self::Completed,
            db::PaymentStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<db::ClosingStatus> for ClosingStatus {
    fn from(value: db::ClosingStatus) -> Self {
        match value {
            db::ClosingStatus::Open => Self::Open,
            db::ClosingStatus::Closed => Self::Closed,
        }
    }
}

impl From<db::ClosingType> for ClosingType {
    fn from(value: db::ClosingType) -> Self {
        match value {
            db::ClosingType::Period => Self::Period,
            db::ClosingType::FiscalYear => Self::FiscalYear,
        }
    }
}

impl From<ClosingType> for db::ClosingType {
    fn from(value: ClosingType) -> Self {
        match value {
            ClosingType::Period => Self::Period,
            ClosingType::FiscalYear => Self::FiscalYear,
        }
    }
}

// ============================================================================
// Row mappings
// ============================================================================

/// Account row as the posting engines see it.
pub(crate) fn account_info(model: &accounts::Model) -> AccountInfo {
    AccountInfo {
        id: AccountId::from_uuid(model.id),
        code: model.code.clone(),
        name: model.name.clone(),
        account_type: model.account_type.into(),
        is_active: model.is_active,
        is_header: model.is_header,
    }
}

/// Document row as an allocation candidate.
pub(crate) fn open_document(model: &documents::Model) -> OpenDocument {
    OpenDocument {
        id: DocumentId::from_uuid(model.id),
        kind: model.kind.into(),
        contact_id: ContactId::from_uuid(model.contact_id),
        number: model.number.clone(),
        document_date: model.document_date,
        due_date: model.due_date,
        total_amount: model.total_amount,
        paid_amount: model.paid_amount,
        outstanding_amount: model.outstanding_amount,
        status: model.status.into(),
    }
}

/// Stored line as input to a reversal.
pub(crate) fn original_line(model: &journal_lines::Model) -> OriginalLine {
    OriginalLine {
        account_id: AccountId::from_uuid(model.account_id),
        debit: model.debit,
        credit: model.credit,
        description: model.description.clone(),
        document: document_ref(model.document_kind, model.document_id),
        allocation_id: model.allocation_id,
    }
}

/// Rebuilds a structured document reference from its two columns.
pub(crate) fn document_ref(
    kind: Option<db::DocumentKind>,
    id: Option<uuid::Uuid>,
) -> Option<DocumentRef> {
    match (kind, id) {
        (Some(kind), Some(id)) => Some(DocumentRef {
            kind: kind.into(),
            id: DocumentId::from_uuid(id),
        }),
        _ => None,
    }
}

/// Closing row as seen by the closing engine.
pub(crate) fn closed_period(model: &period_closings::Model) -> ClosedPeriod {
    ClosedPeriod {
        id: PeriodClosingId::from_uuid(model.id),
        range: PeriodRange {
            start: model.start_date,
            end: model.end_date,
        },
        status: model.status.into(),
        journal_entry_id: model.journal_entry_id.map(JournalEntryId::from_uuid),
        net_income: model.net_income,
    }
}
