//! Purchase Router

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::application::config::PurchaseConfig;
use crate::domain::repository::{
    CatalogRepository, EntitlementGranter, PurchaseUnitOfWork, TransactionLedger,
};
use crate::domain::verifier::ReceiptVerifier;
use crate::infra::app_store::AppStoreVerifier;
use crate::infra::postgres::PgPurchaseRepository;
use crate::presentation::handlers::{self, PurchaseAppState};
use crate::presentation::middleware::{ApiAuthState, require_api_user};

/// Create the purchase router with PostgreSQL repository and App Store verifier
pub fn purchase_router(
    repo: PgPurchaseRepository,
    verifier: AppStoreVerifier,
    config: PurchaseConfig,
) -> Router {
    purchase_router_generic(verifier, repo, config)
}

/// Create a generic purchase router for any verifier and repository implementation
pub fn purchase_router_generic<V, R>(verifier: V, repo: R, config: PurchaseConfig) -> Router
where
    V: ReceiptVerifier + Clone + Send + Sync + 'static,
    R: CatalogRepository
        + TransactionLedger
        + EntitlementGranter
        + PurchaseUnitOfWork
        + Clone
        + Send
        + Sync
        + 'static,
{
    let config = Arc::new(config);
    let state = PurchaseAppState {
        verifier: Arc::new(verifier),
        repo: Arc::new(repo),
        config: config.clone(),
    };
    let auth_state = ApiAuthState { config };

    Router::new()
        .route("/verify", post(handlers::verify_receipt::<V, R>))
        .route("/library", get(handlers::list_library::<V, R>))
        .layer(middleware::from_fn_with_state(auth_state, require_api_user))
        .with_state(state)
}
