//! API Authentication Middleware
//!
//! The account system is an external collaborator; this boundary only
//! needs an authenticated user id. Tokens are the 16 user-uuid bytes
//! followed by an HMAC-SHA256 over them, base64 encoded, verified in
//! constant time.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::id::UserId;
use uuid::Uuid;

use crate::application::config::PurchaseConfig;
use crate::error::PurchaseError;

/// Authenticated user, inserted as a request extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

/// Middleware state
#[derive(Clone)]
pub struct ApiAuthState {
    pub config: Arc<PurchaseConfig>,
}

/// Middleware that requires a valid bearer token
pub async fn require_api_user(
    State(state): State<ApiAuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let user_id = token
        .and_then(|t| verify_user_token(t, &state.config.api_token_secret))
        .ok_or_else(|| PurchaseError::Unauthorized.into_response())?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Create a signed API token for a user
pub fn sign_user_token(user_id: UserId, secret: &[u8; 32]) -> String {
    let id_bytes = user_id.into_uuid().into_bytes();
    let signature = platform::crypto::hmac_sha256(secret, &id_bytes);
    let mut token_data = Vec::with_capacity(16 + 32);
    token_data.extend_from_slice(&id_bytes);
    token_data.extend_from_slice(&signature);
    platform::crypto::to_base64(&token_data)
}

/// Verify a signed API token and extract the user id
pub fn verify_user_token(token: &str, secret: &[u8; 32]) -> Option<UserId> {
    let token_data = platform::crypto::from_base64(token).ok()?;
    if token_data.len() != 48 {
        // 16 (UUID) + 32 (HMAC)
        return None;
    }

    let id_bytes: [u8; 16] = token_data[0..16].try_into().ok()?;
    let provided_signature: &[u8] = &token_data[16..48];

    let expected_signature = platform::crypto::hmac_sha256(secret, &id_bytes);

    // Constant-time comparison
    if !platform::crypto::constant_time_eq(provided_signature, &expected_signature) {
        return None;
    }

    Some(UserId::from_uuid(Uuid::from_bytes(id_bytes)))
}
