//! Application Configuration
//!
//! Configuration for the purchase application layer.

use std::time::Duration;

/// App Store production verification endpoint
pub const APPLE_VERIFY_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";

/// App Store sandbox verification endpoint
pub const APPLE_SANDBOX_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

/// Purchase application configuration
#[derive(Debug, Clone)]
pub struct PurchaseConfig {
    /// Primary receipt verification endpoint
    pub apple_verify_url: String,
    /// Sandbox endpoint, used when the primary reports a sandbox receipt
    pub apple_sandbox_url: String,
    /// App-specific shared secret for the verify call
    pub apple_shared_secret: Option<String>,
    /// Per-attempt HTTP timeout for the verify call
    pub verify_timeout: Duration,
    /// Extra verification attempts after the first, on transient failure only
    pub verify_retry_attempts: u32,
    /// Base delay for exponential backoff between attempts
    pub verify_retry_base_delay: Duration,
    /// Deadline the HTTP boundary applies to a whole verify-and-grant call
    pub call_deadline: Duration,
    /// Secret key for HMAC-signed API tokens (32 bytes)
    pub api_token_secret: [u8; 32],
}

impl Default for PurchaseConfig {
    fn default() -> Self {
        Self {
            apple_verify_url: APPLE_VERIFY_URL.to_string(),
            apple_sandbox_url: APPLE_SANDBOX_URL.to_string(),
            apple_shared_secret: None,
            verify_timeout: Duration::from_secs(10),
            verify_retry_attempts: 2,
            verify_retry_base_delay: Duration::from_millis(250),
            call_deadline: Duration::from_secs(30),
            api_token_secret: [0u8; 32],
        }
    }
}

impl PurchaseConfig {
    /// Create config with a random token secret (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self {
            api_token_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (sandbox endpoint as primary)
    pub fn development() -> Self {
        Self {
            apple_verify_url: APPLE_SANDBOX_URL.to_string(),
            ..Self::with_random_secret()
        }
    }
}
