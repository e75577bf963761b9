//! Purchase Backend Module
//!
//! Verifies in-app-purchase receipts, records billing in an append-only
//! ledger and grants catalog items to user libraries.
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, port traits, pure services
//! - `application/` - Use cases
//! - `infra/` - PostgreSQL repository and App Store verifier
//! - `presentation/` - HTTP handlers
//!
//! ## Correctness Model
//! - The storage layer is the sole authority for duplicate suppression:
//!   unique constraints on (provider, provider_transaction_id) and
//!   (user_id, item_id), never an application-level check-then-insert
//! - All writes for one receipt happen inside one database transaction
//! - Entitlement is decided independently of ledger novelty, so a call
//!   that once crashed between billing and granting is healed by replay
//! - Unknown product ids are logged and skipped, never fatal

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::PurchaseConfig;
pub use error::{PurchaseError, PurchaseResult};
pub use infra::app_store::AppStoreVerifier;
pub use infra::postgres::PgPurchaseRepository;
pub use presentation::router::purchase_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, OptionExt, ResultExt},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
