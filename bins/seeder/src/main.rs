//! Database seeder for bukubesar development and testing.
//!
//! Seeds a default chart of accounts and one cash box linked to the
//! default cash account. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashMap;

use anyhow::Context;
use sea_orm::DatabaseConnection;

use bukubesar_core::accounts::AccountType;
use bukubesar_db::entities::sea_orm_active_enums::CashBankKind;
use bukubesar_db::repositories::{CreateAccountInput, NewCashBank};
use bukubesar_db::{AccountRepository, LedgerSettings, ReconciliationRepository, RepositoryError};
use bukubesar_shared::AppConfig;
use bukubesar_shared::types::AccountId;

/// `(code, name, type, parent code, is_header)`, parents first.
const CHART: &[(&str, &str, AccountType, Option<&str>, bool)] = &[
    ("1000", "Assets", AccountType::Asset, None, true),
    ("1101", "Cash on Hand", AccountType::Asset, Some("1000"), false),
    ("1102", "Bank", AccountType::Asset, Some("1000"), false),
    ("1201", "Accounts Receivable", AccountType::Asset, Some("1000"), false),
    ("1301", "Inventory", AccountType::Asset, Some("1000"), false),
    ("1501", "Equipment", AccountType::Asset, Some("1000"), false),
    ("2000", "Liabilities", AccountType::Liability, None, true),
    ("2101", "Accounts Payable", AccountType::Liability, Some("2000"), false),
    ("2201", "Taxes Payable", AccountType::Liability, Some("2000"), false),
    ("3000", "Equity", AccountType::Equity, None, true),
    ("3101", "Owner Capital", AccountType::Equity, Some("3000"), false),
    ("3201", "Retained Earnings", AccountType::Equity, Some("3000"), false),
    ("4000", "Revenue", AccountType::Revenue, None, true),
    ("4101", "Sales Revenue", AccountType::Revenue, Some("4000"), false),
    ("4201", "Other Income", AccountType::Revenue, Some("4000"), false),
    ("5000", "Cost of Sales", AccountType::Expense, None, true),
    ("5101", "Cost of Goods Sold", AccountType::Expense, Some("5000"), false),
    ("6000", "Operating Expenses", AccountType::Expense, None, true),
    ("6101", "Salaries", AccountType::Expense, Some("6000"), false),
    ("6201", "Rent", AccountType::Expense, Some("6000"), false),
    ("6901", "Reconciliation Adjustments", AccountType::Expense, Some("6000"), false),
];

const CASH_BOX_CODE: &str = "CASH-01";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = bukubesar_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let settings = LedgerSettings::new(config.ledger.clone(), &config.database);

    println!("Seeding chart of accounts...");
    let accounts = seed_chart(&db, &settings).await?;

    println!("Seeding cash box...");
    seed_cash_box(&db, &settings, &accounts).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Creates missing accounts and returns every seeded code with its id.
async fn seed_chart(
    db: &DatabaseConnection,
    settings: &LedgerSettings,
) -> anyhow::Result<HashMap<&'static str, AccountId>> {
    let repo = AccountRepository::new(db.clone(), settings.ledger.account_cache_ttl_secs);
    let existing: HashMap<String, AccountId> = repo
        .list_accounts(None)
        .await?
        .into_iter()
        .map(|account| (account.code, AccountId::from_uuid(account.id)))
        .collect();

    let mut seeded = HashMap::new();
    let mut inserted = 0;
    for &(code, name, account_type, parent, is_header) in CHART {
        if let Some(&id) = existing.get(code) {
            seeded.insert(code, id);
            continue;
        }

        let parent_id = parent.and_then(|p| seeded.get(p).copied());
        let account = repo
            .create_account(CreateAccountInput {
                code: code.to_string(),
                name: name.to_string(),
                description: None,
                account_type,
                parent_id,
                is_header,
            })
            .await
            .with_context(|| format!("failed to create account {code}"))?;
        seeded.insert(code, AccountId::from_uuid(account.id));
        inserted += 1;
    }

    println!(
        "  Inserted {inserted} accounts ({} already present)",
        CHART.len() - inserted
    );
    Ok(seeded)
}

/// Registers the cash box against the configured default cash account.
async fn seed_cash_box(
    db: &DatabaseConnection,
    settings: &LedgerSettings,
    accounts: &HashMap<&'static str, AccountId>,
) -> anyhow::Result<()> {
    let cash_code = settings.ledger.default_cash_code.as_str();
    let Some(&account_id) = accounts.get(cash_code) else {
        println!("  Default cash account {cash_code} is not in the seeded chart, skipping...");
        return Ok(());
    };

    let repo = ReconciliationRepository::new(db.clone(), settings.clone());
    match repo
        .register_cash_bank(NewCashBank {
            code: CASH_BOX_CODE.to_string(),
            name: "Petty Cash".to_string(),
            kind: CashBankKind::Cash,
            account_id: Some(account_id),
        })
        .await
    {
        Ok(record) => println!("  Created cash box {} linked to {cash_code}", record.code),
        Err(RepositoryError::Duplicate(_)) => {
            println!("  Cash box {CASH_BOX_CODE} already exists, skipping...");
        }
        Err(e) => return Err(e).context("failed to register cash box"),
    }
    Ok(())
}
