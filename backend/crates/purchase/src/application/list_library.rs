//! List Library Use Case

use std::sync::Arc;

use kernel::id::UserId;

use crate::domain::entities::CatalogItem;
use crate::domain::repository::{CatalogRepository, EntitlementGranter};
use crate::error::PurchaseResult;

/// List Library Use Case - the user's entitled catalog items
pub struct ListLibraryUseCase<E, C>
where
    E: EntitlementGranter,
    C: CatalogRepository,
{
    entitlements: Arc<E>,
    catalog: Arc<C>,
}

impl<E, C> ListLibraryUseCase<E, C>
where
    E: EntitlementGranter,
    C: CatalogRepository,
{
    pub fn new(entitlements: Arc<E>, catalog: Arc<C>) -> Self {
        Self {
            entitlements,
            catalog,
        }
    }

    pub async fn execute(&self, user_id: UserId) -> PurchaseResult<Vec<CatalogItem>> {
        let item_ids = self.entitlements.owned_item_ids(user_id).await?;
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.catalog.find_by_ids(&item_ids).await
    }
}
