//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC, Base64)
//! - Outbound HTTP client construction for payment-provider APIs

pub mod crypto;
pub mod http;
