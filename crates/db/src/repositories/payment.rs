//! Payment repository: allocation against receivables and payables.
//!
//! Candidate documents are locked `FOR UPDATE` in id order before the
//! allocation is planned; the allocation, document counters, journal entry
//! and cash/bank movement commit together or not at all.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use bukubesar_core::accounts::AccountError;
use bukubesar_core::closing::is_date_in_closed_period;
use bukubesar_core::journal::{DocumentKind, EntryStatus};
use bukubesar_core::payment::{
    build_payment_entry, AllocatedDocument, AllocationTarget, DocumentUpdate,
    OpenDocument, PaymentAllocator, PaymentDirection, PaymentError, PaymentRequest,
    PaymentReversalService,
};
use bukubesar_shared::types::{CashBankId, ContactId, DocumentId, JournalEntryId, PaymentId, UserId};

use super::account::account_by_code;
use super::convert;
use super::error::RepositoryError;
use super::journal;
use super::posting::{self, LedgerSettings};
use crate::entities::{
    account_balances, cash_bank_transactions, cash_banks, documents, payment_allocations,
    payments,
    sea_orm_active_enums::{DocumentKind as DbDocumentKind, DocumentStatus as DbDocumentStatus,
        PaymentStatus as DbPaymentStatus},
};

/// Input for registering a sale or purchase document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Sale or purchase.
    pub kind: DocumentKind,
    /// Customer or vendor.
    pub contact_id: ContactId,
    /// Document number, unique per kind.
    pub number: String,
    /// Issue date.
    pub document_date: NaiveDate,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Total amount.
    pub total_amount: Decimal,
}

/// A payment with its allocation rows.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    /// Payment header.
    pub payment: payments::Model,
    /// Allocations, document allocations first.
    pub allocations: Vec<payment_allocations::Model>,
}

impl PaymentRecord {
    /// Sum of allocations without a target document.
    #[must_use]
    pub fn unassigned(&self) -> Decimal {
        self.allocations
            .iter()
            .filter(|a| a.document_id.is_none())
            .map(|a| a.amount)
            .sum()
    }
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Records a payment, allocates it and posts its journal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is invalid or its date lies in a closed period
    /// - The cash/bank record is missing, inactive or unlinked
    /// - A PAY payment exceeds the available funds
    /// - The target document cannot take the payment
    /// - A document lock cannot be acquired in time (`Contention`)
    #[instrument(skip(self, request), fields(contact = %request.contact_id, amount = %request.amount))]
    pub async fn record_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentRecord, RepositoryError> {
        let today = Utc::now().date_naive();
        PaymentAllocator::validate_request(&request, today)?;
        let epsilon = self.settings.ledger.settlement_epsilon;

        let txn = posting::begin(&self.db, &self.settings).await?;
        posting::enter_posting_gate(&txn).await?;
        let closed = posting::closed_periods(&txn).await?;
        if is_date_in_closed_period(request.payment_date, &closed) {
            return Err(PaymentError::PeriodClosed(request.payment_date).into());
        }

        let cash_bank = match request.cash_bank_id {
            Some(id) => Some(lock_cash_bank(&txn, id).await?),
            None => None,
        };
        let (cash_account, available) = match &cash_bank {
            Some(cb) => {
                let id = CashBankId::from_uuid(cb.id);
                if !cb.is_active {
                    return Err(PaymentError::CashBankInactive(id).into());
                }
                let account = cb.account_id.ok_or(PaymentError::CashBankNotLinked(id))?;
                (account, cb.balance)
            }
            None => {
                let account = self.account_id(&txn, &self.settings.ledger.default_cash_code).await?;
                let balance = account_balances::Entity::find_by_id(account)
                    .one(&txn)
                    .await?
                    .map_or(Decimal::ZERO, |b| b.balance);
                (account, balance)
            }
        };
        PaymentAllocator::check_funds(request.direction, available, request.amount)?;

        let control_code = match request.direction {
            PaymentDirection::Receive => &self.settings.ledger.receivable_code,
            PaymentDirection::Pay => &self.settings.ledger.payable_code,
        };
        let control_account = self.account_id(&txn, control_code).await?;

        let candidates = lock_candidates(&txn, &request).await?;
        let plan = PaymentAllocator::plan(&request, &candidates, epsilon)?;
        apply_document_updates(&txn, &plan.updates).await?;

        let payment_id = PaymentId::new();
        let number = payment_number(request.direction, request.payment_date, payment_id);
        let entry_input = build_payment_entry(
            payment_id,
            &number,
            &request,
            &plan,
            cash_account.into(),
            control_account.into(),
        );
        let posted =
            posting::insert_entry(&txn, &entry_input, EntryStatus::Posted, &closed, None).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let payment = payments::ActiveModel {
            id: Set(payment_id.into_inner()),
            number: Set(number),
            contact_id: Set(request.contact_id.into_inner()),
            direction: Set(request.direction.into()),
            payment_date: Set(request.payment_date),
            amount: Set(request.amount),
            method: Set(request.method.trim().to_string()),
            reference: Set(request.reference.clone()),
            notes: Set(request.notes.clone()),
            cash_bank_id: Set(request.cash_bank_id.map(CashBankId::into_inner)),
            journal_entry_id: Set(posted.entry.id),
            status: Set(DbPaymentStatus::Completed),
            created_by: Set(request.created_by.into_inner()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut allocations = Vec::with_capacity(plan.allocations.len());
        for planned in &plan.allocations {
            let row = payment_allocations::ActiveModel {
                id: Set(planned.id),
                payment_id: Set(payment.id),
                document_kind: Set(planned.document.map(|d| d.kind.into())),
                document_id: Set(planned.document.map(|d| d.id.into_inner())),
                amount: Set(planned.amount),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            allocations.push(row);
        }

        if let Some(cb) = cash_bank {
            let delta = match request.direction {
                PaymentDirection::Receive => request.amount,
                PaymentDirection::Pay => -request.amount,
            };
            move_cash_bank(
                &txn,
                cb,
                delta,
                request.payment_date,
                "PAYMENT",
                payment.id,
                posted.entry.id,
            )
            .await?;
        }

        txn.commit().await?;

        info!(
            payment_id = %payment.id,
            number = %payment.number,
            allocated = %plan.allocated,
            unassigned = %plan.unassigned,
            entry_id = %posted.entry.id,
            "payment recorded"
        );
        Ok(PaymentRecord {
            payment,
            allocations,
        })
    }

    /// Reverses a payment, restoring every document it settled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payment is missing or already reversed
    /// - The payment date or today lies in a closed period
    /// - A settled document was voided, or restoring it would exceed its
    ///   total (the discrepancy is part of the error)
    #[instrument(skip(self, reason))]
    pub async fn reverse_payment(
        &self,
        id: PaymentId,
        reason: &str,
        reversed_by: UserId,
    ) -> Result<PaymentRecord, RepositoryError> {
        let reversal_date = Utc::now().date_naive();
        let epsilon = self.settings.ledger.settlement_epsilon;

        let txn = posting::begin(&self.db, &self.settings).await?;
        posting::enter_posting_gate(&txn).await?;
        let closed = posting::closed_periods(&txn).await?;

        let payment = payments::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(PaymentError::PaymentNotFound(id))?;

        PaymentReversalService::validate(
            id,
            payment.status.into(),
            reason,
            payment.payment_date,
            reversal_date,
            |date| is_date_in_closed_period(date, &closed),
        )?;

        let allocations = allocations_of(&txn, payment.id).await?;
        let allocated = lock_allocated_documents(&txn, &allocations).await?;
        let updates = PaymentReversalService::plan_restoration(&allocated, epsilon)
            .inspect_err(|err| warn!(payment_id = %payment.id, error = %err, "payment reversal refused"))?;
        apply_document_updates(&txn, &updates).await?;

        let pair = journal::reverse_in(
            &txn,
            JournalEntryId::from_uuid(payment.journal_entry_id),
            reason,
            reversal_date,
            reversed_by,
            &closed,
        )
        .await?;

        if let Some(cash_bank_id) = payment.cash_bank_id {
            let cb = lock_cash_bank(&txn, CashBankId::from_uuid(cash_bank_id)).await?;
            let delta = match PaymentDirection::from(payment.direction) {
                PaymentDirection::Receive => -payment.amount,
                PaymentDirection::Pay => payment.amount,
            };
            move_cash_bank(
                &txn,
                cb,
                delta,
                reversal_date,
                "PAYMENT_REVERSAL",
                payment.id,
                pair.reversal.entry.id,
            )
            .await?;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: payments::ActiveModel = payment.into();
        active.status = Set(DbPaymentStatus::Reversed);
        active.reversal_entry_id = Set(Some(pair.reversal.entry.id));
        active.reversal_reason = Set(Some(reason.trim().to_string()));
        active.reversed_by = Set(Some(reversed_by.into_inner()));
        active.reversed_at = Set(Some(now));
        active.updated_at = Set(now);
        let payment = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            payment_id = %payment.id,
            restored_documents = updates.len(),
            reversal_id = %pair.reversal.entry.id,
            "payment reversed"
        );
        Ok(PaymentRecord {
            payment,
            allocations,
        })
    }

    /// Gets a payment with its allocations.
    ///
    /// # Errors
    ///
    /// `PaymentNotFound` if the payment does not exist.
    pub async fn get_payment(&self, id: PaymentId) -> Result<PaymentRecord, RepositoryError> {
        let payment = payments::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PaymentError::PaymentNotFound(id))?;
        let allocations = allocations_of(&self.db, payment.id).await?;
        Ok(PaymentRecord {
            payment,
            allocations,
        })
    }

    /// Allocatable documents of a contact, oldest due first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_open_documents(
        &self,
        contact_id: ContactId,
        direction: PaymentDirection,
    ) -> Result<Vec<OpenDocument>, RepositoryError> {
        let kind: DbDocumentKind = direction.document_kind().into();
        let rows = documents::Entity::find()
            .filter(documents::Column::ContactId.eq(contact_id.into_inner()))
            .filter(documents::Column::Kind.eq(kind))
            .filter(documents::Column::Status.is_in([DbDocumentStatus::Open, DbDocumentStatus::Partial]))
            .filter(documents::Column::OutstandingAmount.gt(Decimal::ZERO))
            .all(&self.db)
            .await?;

        let mut open: Vec<OpenDocument> = rows.iter().map(convert::open_document).collect();
        PaymentAllocator::fifo_order(&mut open);
        Ok(open)
    }

    /// Registers an issued sale or purchase document.
    ///
    /// Documents are owned by the invoicing side; this is the hook through
    /// which it hands them to the allocator.
    ///
    /// # Errors
    ///
    /// `NonPositiveAmount` for a non-positive total, `Duplicate` for a
    /// number already used by the same kind.
    pub async fn register_document(
        &self,
        input: NewDocument,
    ) -> Result<documents::Model, RepositoryError> {
        if input.total_amount <= Decimal::ZERO {
            return Err(PaymentError::NonPositiveAmount.into());
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let document = documents::ActiveModel {
            id: Set(DocumentId::new().into_inner()),
            kind: Set(input.kind.into()),
            contact_id: Set(input.contact_id.into_inner()),
            number: Set(input.number),
            document_date: Set(input.document_date),
            due_date: Set(input.due_date),
            total_amount: Set(input.total_amount),
            paid_amount: Set(Decimal::ZERO),
            outstanding_amount: Set(input.total_amount),
            status: Set(DbDocumentStatus::Open),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(document_id = %document.id, number = %document.number, "document registered");
        Ok(document)
    }

    /// Resolves an account id from a configured code.
    async fn account_id(&self, txn: &DatabaseTransaction, code: &str) -> Result<Uuid, RepositoryError> {
        Ok(account_by_code(txn, code)
            .await?
            .ok_or_else(|| AccountError::NotFound(code.to_string()))?
            .id)
    }
}

/// `RCV-YYYYMMDD-XXXXXXXX` or `PAY-YYYYMMDD-XXXXXXXX`.
fn payment_number(direction: PaymentDirection, date: NaiveDate, id: PaymentId) -> String {
    let prefix = match direction {
        PaymentDirection::Receive => "RCV",
        PaymentDirection::Pay => "PAY",
    };
    let simple = id.into_inner().simple().to_string();
    let suffix = &simple[simple.len() - 8..];
    format!("{prefix}-{}-{}", date.format("%Y%m%d"), suffix.to_uppercase())
}

async fn lock_cash_bank(
    txn: &DatabaseTransaction,
    id: CashBankId,
) -> Result<cash_banks::Model, RepositoryError> {
    Ok(cash_banks::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(PaymentError::CashBankNotFound(id))?)
}

/// Locks the documents the request may touch, in id order.
async fn lock_candidates(
    txn: &DatabaseTransaction,
    request: &PaymentRequest,
) -> Result<Vec<OpenDocument>, RepositoryError> {
    let query = documents::Entity::find().order_by_asc(documents::Column::Id);
    let query = match request.target {
        AllocationTarget::Document(id) => query.filter(documents::Column::Id.eq(id.into_inner())),
        AllocationTarget::Auto => {
            let kind: DbDocumentKind = request.direction.document_kind().into();
            query
                .filter(documents::Column::ContactId.eq(request.contact_id.into_inner()))
                .filter(documents::Column::Kind.eq(kind))
                .filter(
                    documents::Column::Status
                        .is_in([DbDocumentStatus::Open, DbDocumentStatus::Partial]),
                )
        }
        AllocationTarget::Unassigned => return Ok(Vec::new()),
    };

    let rows = query.lock_exclusive().all(txn).await?;
    Ok(rows.iter().map(convert::open_document).collect())
}

async fn allocations_of<C: sea_orm::ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
) -> Result<Vec<payment_allocations::Model>, sea_orm::DbErr> {
    payment_allocations::Entity::find()
        .filter(payment_allocations::Column::PaymentId.eq(payment_id))
        .order_by_asc(payment_allocations::Column::Id)
        .all(conn)
        .await
}

/// Locks the documents behind `allocations` and pairs them up.
async fn lock_allocated_documents(
    txn: &DatabaseTransaction,
    allocations: &[payment_allocations::Model],
) -> Result<Vec<AllocatedDocument>, RepositoryError> {
    let mut ids: Vec<Uuid> = allocations.iter().filter_map(|a| a.document_id).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = documents::Entity::find()
        .filter(documents::Column::Id.is_in(ids))
        .order_by_asc(documents::Column::Id)
        .lock_exclusive()
        .all(txn)
        .await?;

    allocations
        .iter()
        .filter_map(|a| a.document_id.map(|doc| (a, doc)))
        .map(|(allocation, doc)| {
            rows.iter()
                .find(|r| r.id == doc)
                .map(|row| AllocatedDocument {
                    amount: allocation.amount,
                    document: convert::open_document(row),
                })
                .ok_or_else(|| PaymentError::DocumentNotFound(DocumentId::from_uuid(doc)).into())
        })
        .collect()
}

async fn apply_document_updates(
    txn: &DatabaseTransaction,
    updates: &[DocumentUpdate],
) -> Result<(), RepositoryError> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    for update in updates {
        documents::ActiveModel {
            id: Set(update.document_id.into_inner()),
            paid_amount: Set(update.paid_amount),
            outstanding_amount: Set(update.outstanding_amount),
            status: Set(update.status.into()),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(txn)
        .await?;
    }
    Ok(())
}

/// Moves a cash/bank balance and logs the movement.
async fn move_cash_bank(
    txn: &DatabaseTransaction,
    cash_bank: cash_banks::Model,
    delta: Decimal,
    date: NaiveDate,
    reference_type: &str,
    reference_id: Uuid,
    journal_entry_id: Uuid,
) -> Result<(), RepositoryError> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let balance_after = cash_bank.balance + delta;
    let cash_bank_id = cash_bank.id;

    let mut active: cash_banks::ActiveModel = cash_bank.into();
    active.balance = Set(balance_after);
    active.updated_at = Set(now);
    active.update(txn).await?;

    cash_bank_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        cash_bank_id: Set(cash_bank_id),
        transaction_date: Set(date),
        amount: Set(delta),
        balance_after: Set(balance_after),
        reference_type: Set(reference_type.to_string()),
        reference_id: Set(Some(reference_id)),
        journal_entry_id: Set(Some(journal_entry_id)),
        notes: Set(None),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;
    Ok(())
}
