//! App Store Receipt Verifier
//!
//! Calls Apple's `verifyReceipt` endpoint and maps its status codes to
//! the verifier error taxonomy. A production endpoint that reports a
//! sandbox receipt (status 21007) is retried once against the sandbox
//! endpoint, which is how TestFlight builds verify against a production
//! backend.

use serde::Deserialize;

use crate::application::config::PurchaseConfig;
use crate::domain::value_objects::PurchaseLineItem;
use crate::domain::verifier::{ReceiptVerifier, VerifyError};

/// Receipt accepted
const STATUS_OK: i64 = 0;
/// Provider-side outage, retryable
const STATUS_SERVER_UNAVAILABLE: i64 = 21005;
/// Production endpoint received a sandbox receipt
const STATUS_SANDBOX_RECEIPT: i64 = 21007;
/// Internal data access error, retryable
const STATUS_INTERNAL_ERROR: i64 = 21009;

/// App Store `verifyReceipt` client
#[derive(Clone)]
pub struct AppStoreVerifier {
    client: reqwest::Client,
    verify_url: String,
    sandbox_url: String,
    shared_secret: Option<String>,
}

impl AppStoreVerifier {
    pub fn new(config: &PurchaseConfig) -> Result<Self, platform::http::HttpClientError> {
        Ok(Self {
            client: platform::http::provider_client(config.verify_timeout)?,
            verify_url: config.apple_verify_url.clone(),
            sandbox_url: config.apple_sandbox_url.clone(),
            shared_secret: config.apple_shared_secret.clone(),
        })
    }

    async fn call(
        &self,
        url: &str,
        receipt_b64: &str,
    ) -> Result<VerifyReceiptResponse, VerifyError> {
        let mut body = serde_json::json!({
            "receipt-data": receipt_b64,
            "exclude-old-transactions": true,
        });
        if let Some(secret) = &self.shared_secret {
            body["password"] = serde_json::Value::String(secret.clone());
        }

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VerifyError::ProviderUnavailable(e.to_string()))?;

        response
            .json::<VerifyReceiptResponse>()
            .await
            .map_err(|e| {
                VerifyError::ProviderUnavailable(format!("malformed provider response: {e}"))
            })
    }
}

impl ReceiptVerifier for AppStoreVerifier {
    async fn verify(&self, raw_receipt: &[u8]) -> Result<Vec<PurchaseLineItem>, VerifyError> {
        // The wire format is the base64 of the raw receipt blob
        let receipt_b64 = platform::crypto::to_base64(raw_receipt);

        let mut response = self.call(&self.verify_url, &receipt_b64).await?;

        if response.status == STATUS_SANDBOX_RECEIPT {
            tracing::debug!("Production endpoint reported sandbox receipt, retrying sandbox");
            response = self.call(&self.sandbox_url, &receipt_b64).await?;
        }

        match response.status {
            STATUS_OK => Ok(extract_line_items(response)),
            STATUS_SERVER_UNAVAILABLE | STATUS_INTERNAL_ERROR => Err(
                VerifyError::ProviderUnavailable(format!("App Store status {}", response.status)),
            ),
            status => Err(VerifyError::InvalidReceipt(format!(
                "App Store status {status}"
            ))),
        }
    }
}

/// Prefer `latest_receipt_info` (auto-renewables surface there) and fall
/// back to the receipt's own `in_app` list.
fn extract_line_items(response: VerifyReceiptResponse) -> Vec<PurchaseLineItem> {
    let lines = response
        .latest_receipt_info
        .filter(|lines| !lines.is_empty())
        .or(response.receipt.and_then(|r| r.in_app))
        .unwrap_or_default();

    lines
        .into_iter()
        .map(|line| PurchaseLineItem::new(line.product_id, line.original_transaction_id))
        .collect()
}

#[derive(Debug, Deserialize)]
struct VerifyReceiptResponse {
    status: i64,
    #[serde(default)]
    receipt: Option<ReceiptPayload>,
    #[serde(default)]
    latest_receipt_info: Option<Vec<InAppLine>>,
}

#[derive(Debug, Deserialize)]
struct ReceiptPayload {
    #[serde(default)]
    in_app: Option<Vec<InAppLine>>,
}

#[derive(Debug, Deserialize)]
struct InAppLine {
    product_id: String,
    original_transaction_id: String,
}
