//! Outbound HTTP Client Construction
//!
//! Shared reqwest client setup for payment-provider APIs. Providers are
//! slow and occasionally unreachable, so every client carries both a
//! connect timeout and a total request timeout.

use std::time::Duration;
use thiserror::Error;

/// Connect timeout applied to every outbound client
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error building an outbound HTTP client
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Build an HTTPS client with the given total request timeout
///
/// TLS is rustls-only; no system OpenSSL dependency.
pub fn provider_client(request_timeout: Duration) -> Result<reqwest::Client, HttpClientError> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_client_builds() {
        let client = provider_client(Duration::from_secs(10));
        assert!(client.is_ok());
    }
}
