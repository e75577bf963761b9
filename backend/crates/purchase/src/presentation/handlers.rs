//! HTTP Handlers

use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::extract::State;

use crate::application::config::PurchaseConfig;
use crate::application::list_library::ListLibraryUseCase;
use crate::application::verify_and_grant::{VerifyAndGrantUseCase, VerifyReceiptInput};
use crate::domain::repository::{
    CatalogRepository, EntitlementGranter, PurchaseUnitOfWork, TransactionLedger,
};
use crate::domain::value_objects::Provider;
use crate::domain::verifier::ReceiptVerifier;
use crate::error::{PurchaseError, PurchaseResult};
use crate::presentation::dto::{LibraryResponse, PurchaseSummaryResponse, VerifyReceiptRequest};
use crate::presentation::middleware::AuthUser;

/// Shared state for purchase handlers
#[derive(Clone)]
pub struct PurchaseAppState<V, R>
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
    pub verifier: Arc<V>,
    pub repo: Arc<R>,
    pub config: Arc<PurchaseConfig>,
}

/// POST /api/purchases/verify
pub async fn verify_receipt<V, R>(
    State(state): State<PurchaseAppState<V, R>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<VerifyReceiptRequest>,
) -> PurchaseResult<Json<PurchaseSummaryResponse>>
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
    let raw_receipt = platform::crypto::from_base64(req.receipt_data.trim()).map_err(|_| {
        PurchaseError::InvalidReceipt("receipt_data is not valid base64".to_string())
    })?;

    let deadline = tokio::time::Instant::now() + state.config.call_deadline;

    let use_case = VerifyAndGrantUseCase::new(
        state.verifier.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );

    let input = VerifyReceiptInput {
        raw_receipt,
        provider: Provider::Apple,
        deadline: Some(deadline),
    };

    let summary = use_case.execute(input, user_id).await?;

    Ok(Json(PurchaseSummaryResponse::from_summary(&summary)))
}

/// GET /api/purchases/library
pub async fn list_library<V, R>(
    State(state): State<PurchaseAppState<V, R>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> PurchaseResult<Json<LibraryResponse>>
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
    let use_case = ListLibraryUseCase::new(state.repo.clone(), state.repo.clone());

    let items = use_case.execute(user_id).await?;

    Ok(Json(LibraryResponse::from_items(&items)))
}
