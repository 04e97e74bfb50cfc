//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod accounts;
pub mod balances;
pub mod closings;
pub mod health;
pub mod journal;
pub mod payments;
pub mod reconciliation;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(accounts::routes())
        .merge(journal::routes())
        .merge(balances::routes())
        .merge(payments::routes())
        .merge(closings::routes())
        .merge(reconciliation::routes())
}
