//! PostgreSQL Repository Implementations
//!
//! All idempotency here rests on two unique constraints:
//! `transactions (provider, provider_transaction_id)` and
//! `library_entitlements (user_id, item_id)`. Inserts use
//! `ON CONFLICT DO NOTHING`; the loser of a concurrent duplicate
//! observes the surviving row on re-read.

use kernel::id::{CatalogItemId, UserId};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::entities::{CatalogItem, NewTransaction, Transaction};
use crate::domain::repository::{
    CatalogRepository, EntitlementGranter, LedgerInsert, PurchaseOutcome, PurchasePlan,
    TransactionLedger,
};
use crate::domain::value_objects::{
    Provider, TransactionDirection, TransactionKind, TransactionStatus,
};
use crate::error::{PurchaseError, PurchaseResult};

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgPurchaseRepository {
    pool: PgPool,
}

impl PgPurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for PgPurchaseRepository {
    async fn find_by_product_ids(
        &self,
        product_ids: &[String],
    ) -> PurchaseResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, CatalogItemRow>(
            r#"
            SELECT item_id, product_id, title, price_minor, currency, created_at
            FROM catalog_items
            WHERE product_id = ANY($1)
            "#,
        )
        .bind(product_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CatalogItemRow::into_item).collect())
    }

    async fn find_by_ids(&self, ids: &[CatalogItemId]) -> PurchaseResult<Vec<CatalogItem>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();

        let rows = sqlx::query_as::<_, CatalogItemRow>(
            r#"
            SELECT item_id, product_id, title, price_minor, currency, created_at
            FROM catalog_items
            WHERE item_id = ANY($1)
            "#,
        )
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CatalogItemRow::into_item).collect())
    }
}

impl TransactionLedger for PgPurchaseRepository {
    async fn record_if_new(&self, new: &NewTransaction) -> PurchaseResult<LedgerInsert> {
        let mut conn = self.pool.acquire().await?;
        record_if_new_on(&mut conn, new).await
    }
}

impl EntitlementGranter for PgPurchaseRepository {
    async fn grant_if_absent(
        &self,
        user_id: UserId,
        item_ids: &[CatalogItemId],
    ) -> PurchaseResult<Vec<CatalogItemId>> {
        let mut conn = self.pool.acquire().await?;
        grant_if_absent_on(&mut conn, user_id, item_ids).await
    }

    async fn owned_item_ids(&self, user_id: UserId) -> PurchaseResult<Vec<CatalogItemId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT item_id FROM library_entitlements
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(CatalogItemId::from_uuid).collect())
    }
}

impl crate::domain::repository::PurchaseUnitOfWork for PgPurchaseRepository {
    async fn commit_purchase(&self, plan: &PurchasePlan) -> PurchaseResult<PurchaseOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut ledger = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            ledger.push(record_if_new_on(&mut tx, &line.transaction).await?);
        }

        let mut requested: Vec<CatalogItemId> = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            if !requested.contains(&line.item_id) {
                requested.push(line.item_id);
            }
        }

        let granted = grant_if_absent_on(&mut tx, plan.user_id, &requested).await?;

        tx.commit().await?;

        let already_owned: Vec<CatalogItemId> = requested
            .iter()
            .filter(|id| !granted.contains(id))
            .copied()
            .collect();

        tracing::info!(
            user_id = %plan.user_id,
            lines = plan.lines.len(),
            new_transactions = ledger.iter().filter(|l| l.created).count(),
            granted = granted.len(),
            already_owned = already_owned.len(),
            "Purchase committed"
        );

        Ok(PurchaseOutcome {
            ledger,
            granted,
            already_owned,
        })
    }
}

/// Insert a transaction unless (provider, provider_transaction_id)
/// already exists; on conflict, re-read the surviving row.
async fn record_if_new_on(
    conn: &mut PgConnection,
    new: &NewTransaction,
) -> PurchaseResult<LedgerInsert> {
    let inserted = sqlx::query_as::<_, TransactionRow>(
        r#"
        INSERT INTO transactions (
            transaction_id,
            user_id,
            provider,
            provider_transaction_id,
            amount_minor,
            currency,
            status,
            kind,
            direction,
            metadata
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (provider, provider_transaction_id) DO NOTHING
        RETURNING
            transaction_id,
            user_id,
            provider,
            provider_transaction_id,
            amount_minor,
            currency,
            status,
            kind,
            direction,
            metadata,
            created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id.into_uuid())
    .bind(new.provider.as_str())
    .bind(&new.provider_transaction_id)
    .bind(new.amount_minor)
    .bind(&new.currency)
    .bind(new.status.as_str())
    .bind(new.kind.as_str())
    .bind(new.direction.as_str())
    .bind(&new.metadata)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(row) => Ok(LedgerInsert {
            created: true,
            transaction: row.into_transaction()?,
        }),
        None => {
            let existing = sqlx::query_as::<_, TransactionRow>(
                r#"
                SELECT
                    transaction_id,
                    user_id,
                    provider,
                    provider_transaction_id,
                    amount_minor,
                    currency,
                    status,
                    kind,
                    direction,
                    metadata,
                    created_at
                FROM transactions
                WHERE provider = $1 AND provider_transaction_id = $2
                "#,
            )
            .bind(new.provider.as_str())
            .bind(&new.provider_transaction_id)
            .fetch_one(&mut *conn)
            .await?;

            tracing::debug!(
                provider = %new.provider,
                provider_transaction_id = %new.provider_transaction_id,
                "Duplicate provider transaction, keeping existing row"
            );

            Ok(LedgerInsert {
                created: false,
                transaction: existing.into_transaction()?,
            })
        }
    }
}

/// Batch-grant entitlements; the RETURNING clause yields exactly the
/// ids newly granted by this statement.
async fn grant_if_absent_on(
    conn: &mut PgConnection,
    user_id: UserId,
    item_ids: &[CatalogItemId],
) -> PurchaseResult<Vec<CatalogItemId>> {
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }

    let uuids: Vec<Uuid> = item_ids.iter().map(|id| id.into_uuid()).collect();

    let granted = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO library_entitlements (user_id, item_id)
        SELECT $1, item_id FROM UNNEST($2::uuid[]) AS t(item_id)
        ON CONFLICT (user_id, item_id) DO NOTHING
        RETURNING item_id
        "#,
    )
    .bind(user_id.into_uuid())
    .bind(uuids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(granted.into_iter().map(CatalogItemId::from_uuid).collect())
}

// Internal row types for sqlx mapping
#[derive(sqlx::FromRow)]
struct CatalogItemRow {
    item_id: Uuid,
    product_id: String,
    title: String,
    price_minor: i64,
    currency: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl CatalogItemRow {
    fn into_item(self) -> CatalogItem {
        CatalogItem {
            id: CatalogItemId::from_uuid(self.item_id),
            product_id: self.product_id,
            title: self.title,
            price_minor: self.price_minor,
            currency: self.currency,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    transaction_id: Uuid,
    user_id: Uuid,
    provider: String,
    provider_transaction_id: String,
    amount_minor: i64,
    currency: String,
    status: String,
    kind: String,
    direction: String,
    metadata: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> PurchaseResult<Transaction> {
        let provider = Provider::parse(&self.provider)
            .ok_or_else(|| PurchaseError::Internal(format!("unknown provider: {}", self.provider)))?;
        let status = TransactionStatus::parse(&self.status)
            .ok_or_else(|| PurchaseError::Internal(format!("unknown status: {}", self.status)))?;
        let kind = TransactionKind::parse(&self.kind)
            .ok_or_else(|| PurchaseError::Internal(format!("unknown kind: {}", self.kind)))?;
        let direction = TransactionDirection::parse(&self.direction).ok_or_else(|| {
            PurchaseError::Internal(format!("unknown direction: {}", self.direction))
        })?;

        Ok(Transaction {
            id: kernel::id::TransactionId::from_uuid(self.transaction_id),
            user_id: UserId::from_uuid(self.user_id),
            provider,
            provider_transaction_id: self.provider_transaction_id,
            amount_minor: self.amount_minor,
            currency: self.currency,
            status,
            kind,
            direction,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}
