//! Initial database migration.
//!
//! Creates the ledger enums, tables, constraints and guard triggers.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;
        db.execute_unprepared(ACCOUNT_BALANCES_SQL).await?;

        // ============================================================
        // PART 4: DOCUMENTS & PAYMENTS
        // ============================================================
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        db.execute_unprepared(CASH_BANKS_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(PAYMENT_ALLOCATIONS_SQL).await?;
        db.execute_unprepared(CASH_BANK_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 5: PERIOD CLOSING
        // ============================================================
        db.execute_unprepared(PERIOD_CLOSINGS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE');

CREATE TYPE journal_status AS ENUM ('DRAFT', 'POSTED', 'REVERSED');

CREATE TYPE journal_source_type AS ENUM (
    'MANUAL',
    'SALE',
    'PURCHASE',
    'PAYMENT',
    'ASSET_CAPITALIZATION',
    'PERIOD_CLOSING',
    'REVERSAL',
    'RECONCILIATION',
    'OPENING_BALANCE'
);

CREATE TYPE document_kind AS ENUM ('SALE', 'PURCHASE');

CREATE TYPE document_status AS ENUM ('DRAFT', 'OPEN', 'PARTIAL', 'PAID', 'VOID');

CREATE TYPE payment_direction AS ENUM ('RECEIVE', 'PAY');

CREATE TYPE payment_status AS ENUM ('COMPLETED', 'REVERSED');

CREATE TYPE closing_status AS ENUM ('OPEN', 'CLOSED');

CREATE TYPE closing_type AS ENUM ('PERIOD', 'FISCAL_YEAR');

CREATE TYPE cash_bank_kind AS ENUM ('CASH', 'BANK');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id              UUID PRIMARY KEY,
    code            VARCHAR(20) NOT NULL UNIQUE,
    name            VARCHAR(255) NOT NULL,
    description     TEXT,
    account_type    account_type NOT NULL,
    parent_id       UUID REFERENCES accounts(id),
    is_header       BOOLEAN NOT NULL DEFAULT FALSE,
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_account_code_not_blank CHECK (length(trim(code)) > 0)
);

CREATE INDEX idx_accounts_type ON accounts(account_type);
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id                  UUID PRIMARY KEY,
    reference           VARCHAR(50) NOT NULL UNIQUE,
    entry_date          DATE NOT NULL,
    description         TEXT NOT NULL,
    source_type         journal_source_type NOT NULL DEFAULT 'MANUAL',
    source_id           UUID,
    status              journal_status NOT NULL DEFAULT 'DRAFT',
    total_debit         NUMERIC(19, 4) NOT NULL,
    total_credit        NUMERIC(19, 4) NOT NULL,
    reversal_of_id      UUID UNIQUE REFERENCES journal_entries(id),
    reversed_by_id      UUID UNIQUE REFERENCES journal_entries(id),
    reversal_reason     TEXT,
    created_by          UUID NOT NULL,
    posted_by           UUID,
    posted_at           TIMESTAMPTZ,
    reversed_by         UUID,
    reversed_at         TIMESTAMPTZ,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_entry_balanced CHECK (total_debit = total_credit),
    CONSTRAINT chk_entry_positive CHECK (total_debit > 0),
    CONSTRAINT chk_posted_has_poster CHECK (
        status = 'DRAFT' OR (posted_by IS NOT NULL AND posted_at IS NOT NULL)
    ),
    CONSTRAINT chk_reversed_has_link CHECK (
        status <> 'REVERSED' OR reversed_by_id IS NOT NULL
    )
);

CREATE INDEX idx_journal_entries_date ON journal_entries(entry_date);
CREATE INDEX idx_journal_entries_status ON journal_entries(status);
CREATE INDEX idx_journal_entries_source ON journal_entries(source_type, source_id);
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id                  UUID PRIMARY KEY,
    journal_entry_id    UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_number         INTEGER NOT NULL,
    account_id          UUID NOT NULL REFERENCES accounts(id),
    debit               NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit              NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description         TEXT,
    document_kind       document_kind,
    document_id         UUID,
    allocation_id       UUID,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_journal_line_number UNIQUE (journal_entry_id, line_number),
    CONSTRAINT chk_line_one_side CHECK (
        debit >= 0 AND credit >= 0
        AND ((debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0))
    ),
    CONSTRAINT chk_line_document_ref CHECK ((document_kind IS NULL) = (document_id IS NULL))
);

CREATE INDEX idx_journal_lines_account ON journal_lines(account_id);
CREATE INDEX idx_journal_lines_document ON journal_lines(document_id) WHERE document_id IS NOT NULL;
";

const ACCOUNT_BALANCES_SQL: &str = r"
CREATE TABLE account_balances (
    account_id          UUID PRIMARY KEY REFERENCES accounts(id),
    total_debit         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_credit        NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance             NUMERIC(19, 4) NOT NULL DEFAULT 0,
    line_count          BIGINT NOT NULL DEFAULT 0,
    last_entry_date     DATE,
    refreshed_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id                  UUID PRIMARY KEY,
    kind                document_kind NOT NULL,
    contact_id          UUID NOT NULL,
    number              VARCHAR(50) NOT NULL,
    document_date       DATE NOT NULL,
    due_date            DATE,
    total_amount        NUMERIC(19, 4) NOT NULL,
    paid_amount         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    outstanding_amount  NUMERIC(19, 4) NOT NULL,
    status              document_status NOT NULL DEFAULT 'OPEN',
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_document_number UNIQUE (kind, number),
    CONSTRAINT chk_document_total CHECK (total_amount >= 0),
    CONSTRAINT chk_document_outstanding CHECK (
        outstanding_amount >= 0 AND outstanding_amount <= total_amount
    )
);

CREATE INDEX idx_documents_open ON documents(contact_id, kind, status);
";

const CASH_BANKS_SQL: &str = r"
CREATE TABLE cash_banks (
    id              UUID PRIMARY KEY,
    code            VARCHAR(20) NOT NULL UNIQUE,
    name            VARCHAR(255) NOT NULL,
    kind            cash_bank_kind NOT NULL,
    account_id      UUID REFERENCES accounts(id),
    balance         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id                  UUID PRIMARY KEY,
    number              VARCHAR(50) NOT NULL UNIQUE,
    contact_id          UUID NOT NULL,
    direction           payment_direction NOT NULL,
    payment_date        DATE NOT NULL,
    amount              NUMERIC(19, 4) NOT NULL,
    method              VARCHAR(50) NOT NULL,
    reference           VARCHAR(100),
    notes               TEXT,
    cash_bank_id        UUID REFERENCES cash_banks(id),
    journal_entry_id    UUID NOT NULL REFERENCES journal_entries(id),
    status              payment_status NOT NULL DEFAULT 'COMPLETED',
    reversal_entry_id   UUID REFERENCES journal_entries(id),
    reversal_reason     TEXT,
    created_by          UUID NOT NULL,
    reversed_by         UUID,
    reversed_at         TIMESTAMPTZ,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_payment_positive CHECK (amount > 0)
);

CREATE INDEX idx_payments_contact ON payments(contact_id);
";

const PAYMENT_ALLOCATIONS_SQL: &str = r"
CREATE TABLE payment_allocations (
    id              UUID PRIMARY KEY,
    payment_id      UUID NOT NULL REFERENCES payments(id) ON DELETE CASCADE,
    document_kind   document_kind,
    document_id     UUID REFERENCES documents(id),
    amount          NUMERIC(19, 4) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_allocation_positive CHECK (amount > 0),
    CONSTRAINT chk_allocation_document_ref CHECK ((document_kind IS NULL) = (document_id IS NULL))
);

CREATE INDEX idx_payment_allocations_payment ON payment_allocations(payment_id);
CREATE INDEX idx_payment_allocations_document ON payment_allocations(document_id) WHERE document_id IS NOT NULL;
";

const CASH_BANK_TRANSACTIONS_SQL: &str = r"
CREATE TABLE cash_bank_transactions (
    id                  UUID PRIMARY KEY,
    cash_bank_id        UUID NOT NULL REFERENCES cash_banks(id),
    transaction_date    DATE NOT NULL,
    amount              NUMERIC(19, 4) NOT NULL,
    balance_after       NUMERIC(19, 4) NOT NULL,
    reference_type      VARCHAR(30) NOT NULL,
    reference_id        UUID,
    journal_entry_id    UUID REFERENCES journal_entries(id),
    notes               TEXT,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_cash_bank_tx_nonzero CHECK (amount <> 0)
);

CREATE INDEX idx_cash_bank_transactions_cb ON cash_bank_transactions(cash_bank_id);
";

const PERIOD_CLOSINGS_SQL: &str = r"
CREATE TABLE period_closings (
    id                  UUID PRIMARY KEY,
    start_date          DATE NOT NULL,
    end_date            DATE NOT NULL,
    closing_type        closing_type NOT NULL DEFAULT 'PERIOD',
    status              closing_status NOT NULL DEFAULT 'CLOSED',
    description         TEXT NOT NULL,
    journal_entry_id    UUID REFERENCES journal_entries(id),
    total_revenue       NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_expense       NUMERIC(19, 4) NOT NULL DEFAULT 0,
    net_income          NUMERIC(19, 4) NOT NULL DEFAULT 0,
    closed_by           UUID NOT NULL,
    closed_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    reopened_by         UUID,
    reopened_at         TIMESTAMPTZ,
    reopen_reason       TEXT,
    reopen_entry_id     UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_closing_range CHECK (start_date <= end_date),
    CONSTRAINT chk_reopen_audited CHECK (
        status = 'CLOSED' OR (reopened_by IS NOT NULL AND reopen_reason IS NOT NULL)
    )
);

CREATE INDEX idx_period_closings_range ON period_closings(start_date, end_date) WHERE status = 'CLOSED';
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: guard_journal_entry
-- Non-draft entries only change status/reversal links
-- ============================================================
CREATE OR REPLACE FUNCTION guard_journal_entry()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        IF OLD.status <> 'DRAFT' THEN
            RAISE EXCEPTION 'Cannot delete a % journal entry', OLD.status;
        END IF;
        RETURN OLD;
    END IF;

    IF OLD.status = 'REVERSED' THEN
        RAISE EXCEPTION 'Cannot modify a reversed journal entry';
    END IF;

    IF OLD.status = 'POSTED' THEN
        IF NEW.status NOT IN ('POSTED', 'REVERSED')
            OR NEW.entry_date <> OLD.entry_date
            OR NEW.total_debit <> OLD.total_debit
            OR NEW.total_credit <> OLD.total_credit THEN
            RAISE EXCEPTION 'Cannot modify posted journal entry. Create a reversing entry instead.';
        END IF;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_guard_journal_entry
BEFORE UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION guard_journal_entry();

-- ============================================================
-- FUNCTION: guard_journal_line
-- Lines of non-draft entries are immutable
-- ============================================================
CREATE OR REPLACE FUNCTION guard_journal_line()
RETURNS TRIGGER AS $$
DECLARE
    entry_status journal_status;
BEGIN
    SELECT status INTO entry_status
    FROM journal_entries
    WHERE id = OLD.journal_entry_id;

    -- Cascade from a draft delete leaves no parent row behind.
    IF entry_status IS NOT NULL AND entry_status <> 'DRAFT' THEN
        RAISE EXCEPTION 'Cannot modify lines of a % journal entry', entry_status;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_guard_journal_line
BEFORE UPDATE OR DELETE ON journal_lines
FOR EACH ROW
EXECUTE FUNCTION guard_journal_line();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS period_closings CASCADE;
DROP TABLE IF EXISTS cash_bank_transactions CASCADE;
DROP TABLE IF EXISTS payment_allocations CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS cash_banks CASCADE;
DROP TABLE IF EXISTS documents CASCADE;
DROP TABLE IF EXISTS account_balances CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP FUNCTION IF EXISTS guard_journal_line CASCADE;
DROP FUNCTION IF EXISTS guard_journal_entry CASCADE;

DROP TYPE IF EXISTS cash_bank_kind;
DROP TYPE IF EXISTS closing_type;
DROP TYPE IF EXISTS closing_status;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS payment_direction;
DROP TYPE IF EXISTS document_status;
DROP TYPE IF EXISTS document_kind;
DROP TYPE IF EXISTS journal_source_type;
DROP TYPE IF EXISTS journal_status;
DROP TYPE IF EXISTS account_type;
";
