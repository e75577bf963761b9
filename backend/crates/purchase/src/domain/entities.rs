//! Domain Entities
//!
//! Core business entities for the purchase domain.

use chrono::{DateTime, Utc};
use kernel::id::{CatalogItemId, TransactionId, UserId};

use crate::domain::value_objects::{
    Provider, TransactionDirection, TransactionKind, TransactionStatus,
};

/// Catalog item - a purchasable book, read-only from this crate's view
///
/// Externally keyed by the provider product id (the SKU configured in
/// the store, e.g. `"book.123"`). Prices are minor units (cents).
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub product_id: String,
    pub title: String,
    pub price_minor: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger transaction - one immutable billing event
///
/// Identity is `(provider, provider_transaction_id)`; at most one row
/// exists system-wide for that pair. A transaction existing does not by
/// itself imply entitlement: a prior call may have failed after billing
/// but before granting.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub provider: Provider,
    pub provider_transaction_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    pub direction: TransactionDirection,
    /// Open key-value map. Known keys: `product_id`, `quantity`.
    /// Validated at the boundary, opaque to the core.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Details for a transaction about to be recorded
///
/// The ledger assigns the row identity on first sighting; duplicate
/// deliveries of the same `(provider, provider_transaction_id)` are
/// no-ops.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub provider: Provider,
    pub provider_transaction_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    pub direction: TransactionDirection,
    pub metadata: serde_json::Value,
}

impl NewTransaction {
    /// Billing record for a store purchase of one catalog item
    pub fn purchase(
        user_id: UserId,
        provider: Provider,
        provider_transaction_id: String,
        item: &CatalogItem,
    ) -> Self {
        Self {
            user_id,
            provider,
            provider_transaction_id,
            amount_minor: item.price_minor,
            currency: item.currency.clone(),
            status: TransactionStatus::Success,
            kind: TransactionKind::Purchase,
            direction: TransactionDirection::Debit,
            metadata: serde_json::json!({
                "product_id": item.product_id,
                "quantity": 1,
            }),
        }
    }
}

/// Entitlement record - durable grant of one catalog item to one user
///
/// Identity is `(user_id, item_id)`, unique. Existence means "already
/// owned". Grants are monotonic: this flow only ever adds rows.
#[derive(Debug, Clone)]
pub struct EntitlementRecord {
    pub user_id: UserId,
    pub item_id: CatalogItemId,
    pub created_at: DateTime<Utc>,
}
