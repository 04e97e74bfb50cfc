//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - JSON routes over the ledger repositories
//! - The acting-user extractor
//! - Error rendering for the four error kinds

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bukubesar_db::{
    AccountRepository, BalanceRepository, ClosingRepository, JournalRepository, LedgerSettings,
    PaymentRepository, ReconciliationRepository,
};

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Ledger codes, tolerances and lock timeouts.
    pub settings: LedgerSettings,
    /// Account directory; holds the code lookup cache for the process.
    pub accounts: AccountRepository,
}

impl AppState {
    /// Builds the state from a connection pool and ledger settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        let accounts = AccountRepository::new(db.clone(), settings.ledger.account_cache_ttl_secs);
        Self {
            db: Arc::new(db),
            settings,
            accounts,
        }
    }

    pub(crate) fn journal(&self) -> JournalRepository {
        JournalRepository::new((*self.db).clone(), self.settings.clone())
    }

    pub(crate) fn balances(&self) -> BalanceRepository {
        BalanceRepository::new((*self.db).clone(), self.settings.clone())
    }

    pub(crate) fn payments(&self) -> PaymentRepository {
        PaymentRepository::new((*self.db).clone(), self.settings.clone())
    }

    pub(crate) fn closings(&self) -> ClosingRepository {
        ClosingRepository::new((*self.db).clone(), self.settings.clone())
    }

    pub(crate) fn reconciliation(&self) -> ReconciliationRepository {
        ReconciliationRepository::new((*self.db).clone(), self.settings.clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
