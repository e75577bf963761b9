//! Verify And Grant Use Case
//!
//! The purchase orchestrator: receipt verification, catalog resolution,
//! then one atomic unit of work recording billing and granting library
//! entitlements. Idempotent end-to-end: replaying the same receipt never
//! double-bills and heals a previous call that failed between billing
//! and granting.

use std::collections::HashMap;
use std::sync::Arc;

use kernel::id::{CatalogItemId, UserId};
use tokio::time::Instant;

use crate::application::config::PurchaseConfig;
use crate::domain::entities::{CatalogItem, NewTransaction};
use crate::domain::repository::{
    CatalogRepository, PlannedLine, PurchasePlan, PurchaseUnitOfWork,
};
use crate::domain::services;
use crate::domain::value_objects::{Provider, PurchaseLineItem};
use crate::domain::verifier::{ReceiptVerifier, VerifyError};
use crate::error::{PurchaseError, PurchaseResult};

/// Input DTO for verify and grant
#[derive(Debug, Clone)]
pub struct VerifyReceiptInput {
    /// Opaque receipt blob as issued by the vendor
    pub raw_receipt: Vec<u8>,
    pub provider: Provider,
    /// Caller-supplied deadline covering verification including retries
    pub deadline: Option<Instant>,
}

/// Output DTO for verify and grant
#[derive(Debug, Clone)]
pub struct PurchaseSummary {
    /// Items newly granted by this call
    pub granted_items: Vec<CatalogItem>,
    /// Items the user already owned
    pub already_owned_items: Vec<CatalogItem>,
    /// Product ids with no catalog item, skipped with a warning
    pub skipped_unknown_product_ids: Vec<String>,
}

/// Verify And Grant Use Case
pub struct VerifyAndGrantUseCase<V, C, U>
where
    V: ReceiptVerifier,
    C: CatalogRepository,
    U: PurchaseUnitOfWork,
{
    verifier: Arc<V>,
    catalog: Arc<C>,
    unit_of_work: Arc<U>,
    config: Arc<PurchaseConfig>,
}

impl<V, C, U> VerifyAndGrantUseCase<V, C, U>
where
    V: ReceiptVerifier,
    C: CatalogRepository,
    U: PurchaseUnitOfWork,
{
    pub fn new(
        verifier: Arc<V>,
        catalog: Arc<C>,
        unit_of_work: Arc<U>,
        config: Arc<PurchaseConfig>,
    ) -> Self {
        Self {
            verifier,
            catalog,
            unit_of_work,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: VerifyReceiptInput,
        user_id: UserId,
    ) -> PurchaseResult<PurchaseSummary> {
        // Verification always precedes any write
        let lines = self.verify_with_retry(&input).await?;
        if lines.is_empty() {
            return Err(PurchaseError::InvalidReceipt(
                "receipt contains no line items".to_string(),
            ));
        }

        let product_ids = services::distinct_product_ids(&lines);
        let catalog_items = self.catalog.find_by_product_ids(&product_ids).await?;
        let receipt = services::resolve_line_items(lines, &catalog_items);

        for product_id in &receipt.skipped_product_ids {
            tracing::warn!(
                user_id = %user_id,
                product_id = %product_id,
                "Unknown product id in receipt, skipping"
            );
        }

        // A receipt made of only unknown SKUs is not an error
        if receipt.resolved.is_empty() {
            return Ok(PurchaseSummary {
                granted_items: Vec::new(),
                already_owned_items: Vec::new(),
                skipped_unknown_product_ids: receipt.skipped_product_ids,
            });
        }

        let items_by_id: HashMap<CatalogItemId, CatalogItem> = receipt
            .resolved
            .iter()
            .map(|r| (r.item.id, r.item.clone()))
            .collect();

        let plan = PurchasePlan {
            user_id,
            lines: receipt
                .resolved
                .into_iter()
                .map(|r| PlannedLine {
                    item_id: r.item.id,
                    transaction: NewTransaction::purchase(
                        user_id,
                        input.provider,
                        r.line.original_transaction_id,
                        &r.item,
                    ),
                })
                .collect(),
        };

        let outcome = self.unit_of_work.commit_purchase(&plan).await?;

        tracing::info!(
            user_id = %user_id,
            provider = %input.provider,
            granted = outcome.granted.len(),
            already_owned = outcome.already_owned.len(),
            new_transactions = outcome.ledger.iter().filter(|l| l.created).count(),
            skipped = receipt.skipped_product_ids.len(),
            "Purchase applied"
        );

        let collect_items = |ids: &[CatalogItemId]| {
            ids.iter()
                .filter_map(|id| items_by_id.get(id).cloned())
                .collect::<Vec<_>>()
        };

        Ok(PurchaseSummary {
            granted_items: collect_items(&outcome.granted),
            already_owned_items: collect_items(&outcome.already_owned),
            skipped_unknown_product_ids: receipt.skipped_product_ids,
        })
    }

    /// Call the verifier, retrying transient failures with exponential
    /// backoff, bounded by config and clipped by the caller's deadline.
    /// Invalid receipts are never retried.
    async fn verify_with_retry(
        &self,
        input: &VerifyReceiptInput,
    ) -> PurchaseResult<Vec<PurchaseLineItem>> {
        let mut attempt: u32 = 0;
        loop {
            let verify = self.verifier.verify(&input.raw_receipt);
            let result = match input.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, verify).await {
                    Ok(result) => result,
                    Err(_) => return Err(PurchaseError::DeadlineExceeded),
                },
                None => verify.await,
            };

            match result {
                Ok(lines) => return Ok(lines),
                Err(err @ VerifyError::InvalidReceipt(_)) => return Err(err.into()),
                Err(VerifyError::ProviderUnavailable(message)) => {
                    if attempt >= self.config.verify_retry_attempts {
                        return Err(PurchaseError::ProviderUnavailable(message));
                    }
                    let delay = self
                        .config
                        .verify_retry_base_delay
                        .saturating_mul(1 << attempt.min(16));
                    if let Some(deadline) = input.deadline {
                        if Instant::now() + delay >= deadline {
                            return Err(PurchaseError::DeadlineExceeded);
                        }
                    }
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        message = %message,
                        "Receipt verification failed transiently, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
