//! Domain Services
//!
//! Pure receipt-resolution logic, no I/O.

use std::collections::HashSet;

use crate::domain::entities::CatalogItem;
use crate::domain::value_objects::PurchaseLineItem;

/// A receipt line matched to its catalog item
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub item: CatalogItem,
    pub line: PurchaseLineItem,
}

/// Receipt lines split into resolvable and unknown
#[derive(Debug, Clone)]
pub struct ResolvedReceipt {
    pub resolved: Vec<ResolvedLine>,
    /// Product ids with no catalog item, in first-seen order, deduplicated
    pub skipped_product_ids: Vec<String>,
}

/// Match receipt line items against the catalog
///
/// Re-deliveries repeat original transaction ids (renewals, retried
/// webhooks), so lines are deduplicated by original_transaction_id
/// first, keeping the first occurrence. Unknown product ids are
/// collected, not rejected: partial receipts with test SKUs are
/// expected.
pub fn resolve_line_items(
    lines: Vec<PurchaseLineItem>,
    catalog: &[CatalogItem],
) -> ResolvedReceipt {
    let mut seen_tx = HashSet::new();
    let mut seen_skipped = HashSet::new();
    let mut resolved = Vec::new();
    let mut skipped_product_ids = Vec::new();

    for line in lines {
        if !seen_tx.insert(line.original_transaction_id.clone()) {
            continue;
        }
        match catalog.iter().find(|item| item.product_id == line.product_id) {
            Some(item) => resolved.push(ResolvedLine {
                item: item.clone(),
                line,
            }),
            None => {
                if seen_skipped.insert(line.product_id.clone()) {
                    skipped_product_ids.push(line.product_id);
                }
            }
        }
    }

    ResolvedReceipt {
        resolved,
        skipped_product_ids,
    }
}

/// Unique product ids of a batch of lines, in first-seen order
pub fn distinct_product_ids(lines: &[PurchaseLineItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter(|line| seen.insert(line.product_id.as_str()))
        .map(|line| line.product_id.clone())
        .collect()
}
