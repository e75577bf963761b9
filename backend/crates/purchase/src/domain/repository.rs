//! Repository Traits
//!
//! Ports for data persistence. Implementations live in the infra layer.
//! All duplicate suppression is enforced by storage-level uniqueness
//! constraints, never by application-level check-then-insert.

use crate::domain::entities::{CatalogItem, NewTransaction, Transaction};
use crate::error::PurchaseResult;
use kernel::id::{CatalogItemId, UserId};

/// Catalog lookup (read-only)
#[trait_variant::make(CatalogRepository: Send)]
pub trait LocalCatalogRepository {
    /// Resolve provider product ids to catalog items. Unknown ids are
    /// simply absent from the result, not an error.
    async fn find_by_product_ids(&self, product_ids: &[String]) -> PurchaseResult<Vec<CatalogItem>>;

    /// Fetch catalog items by id
    async fn find_by_ids(&self, ids: &[CatalogItemId]) -> PurchaseResult<Vec<CatalogItem>>;
}

/// Result of attempting to record a transaction
#[derive(Debug, Clone)]
pub struct LedgerInsert {
    /// True when this call inserted the row; false when a row for the
    /// same (provider, provider_transaction_id) already existed.
    pub created: bool,
    pub transaction: Transaction,
}

/// Append-only billing ledger
#[trait_variant::make(TransactionLedger: Send)]
pub trait LocalTransactionLedger {
    /// Record a transaction unless one already exists for the same
    /// (provider, provider_transaction_id). Never mutates an existing
    /// row; the loser of a concurrent duplicate insert observes
    /// `created: false` with the surviving row.
    async fn record_if_new(&self, new: &NewTransaction) -> PurchaseResult<LedgerInsert>;
}

/// Library entitlement writes and reads
#[trait_variant::make(EntitlementGranter: Send)]
pub trait LocalEntitlementGranter {
    /// Grant the given items to the user unless already owned. Returns
    /// the ids that were newly granted by this call; items absent from
    /// the result were already owned. Concurrent duplicate grants
    /// collapse to one logical grant.
    async fn grant_if_absent(
        &self,
        user_id: UserId,
        item_ids: &[CatalogItemId],
    ) -> PurchaseResult<Vec<CatalogItemId>>;

    /// All item ids the user is entitled to
    async fn owned_item_ids(&self, user_id: UserId) -> PurchaseResult<Vec<CatalogItemId>>;
}

/// One line of a purchase about to be applied
#[derive(Debug, Clone)]
pub struct PlannedLine {
    pub item_id: CatalogItemId,
    pub transaction: NewTransaction,
}

/// Everything to be written for one verified receipt
#[derive(Debug, Clone)]
pub struct PurchasePlan {
    pub user_id: UserId,
    pub lines: Vec<PlannedLine>,
}

/// What a committed purchase actually changed
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// One entry per plan line, in order
    pub ledger: Vec<LedgerInsert>,
    /// Item ids newly granted by this call
    pub granted: Vec<CatalogItemId>,
    /// Item ids the user already owned
    pub already_owned: Vec<CatalogItemId>,
}

/// Atomic application of a purchase plan
#[trait_variant::make(PurchaseUnitOfWork: Send)]
pub trait LocalPurchaseUnitOfWork {
    /// Record every plan line in the ledger and grant the entitlements,
    /// all inside one storage transaction: a mid-plan failure rolls back
    /// everything this call wrote. Ownership is decided by the grant
    /// insert itself, independent of ledger novelty.
    async fn commit_purchase(&self, plan: &PurchasePlan) -> PurchaseResult<PurchaseOutcome>;
}
