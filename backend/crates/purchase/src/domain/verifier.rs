//! Receipt Verifier Port
//!
//! External capability: turns an opaque vendor receipt into purchased
//! line items. The concrete App Store implementation lives in infra.

use thiserror::Error;

use crate::domain::value_objects::PurchaseLineItem;

/// Receipt verification failures
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    /// Receipt is malformed, unsigned or rejected by the provider.
    /// Must not be retried with the same receipt.
    #[error("receipt rejected: {0}")]
    InvalidReceipt(String),

    /// Network failure or provider outage. Retryable with backoff.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Receipt verifier trait
#[trait_variant::make(ReceiptVerifier: Send)]
pub trait LocalReceiptVerifier {
    /// Verify a raw receipt blob and return the purchased line items
    async fn verify(&self, raw_receipt: &[u8]) -> Result<Vec<PurchaseLineItem>, VerifyError>;
}
