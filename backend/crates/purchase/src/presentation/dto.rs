//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::verify_and_grant::PurchaseSummary;
use crate::domain::entities::CatalogItem;

/// Request for POST /api/purchases/verify
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyReceiptRequest {
    /// Base64 of the vendor-issued receipt blob
    pub receipt_data: String,
}

/// One catalog item in a response
#[derive(Debug, Clone, Serialize)]
pub struct BookDto {
    pub id: Uuid,
    pub product_id: String,
    pub title: String,
}

impl BookDto {
    pub fn from_item(item: &CatalogItem) -> Self {
        Self {
            id: item.id.into_uuid(),
            product_id: item.product_id.clone(),
            title: item.title.clone(),
        }
    }
}

/// Response for POST /api/purchases/verify
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseSummaryResponse {
    pub status: String,
    /// Items newly granted by this call
    pub books: Vec<BookDto>,
    pub already_owned: Vec<BookDto>,
    pub skipped_product_ids: Vec<String>,
    pub message: String,
}

impl PurchaseSummaryResponse {
    pub fn from_summary(summary: &PurchaseSummary) -> Self {
        Self {
            status: "success".to_string(),
            books: summary.granted_items.iter().map(BookDto::from_item).collect(),
            already_owned: summary
                .already_owned_items
                .iter()
                .map(BookDto::from_item)
                .collect(),
            skipped_product_ids: summary.skipped_unknown_product_ids.clone(),
            message: summary_message(summary),
        }
    }
}

fn summary_message(summary: &PurchaseSummary) -> String {
    if summary.granted_items.is_empty() && summary.already_owned_items.is_empty() {
        "No purchasable items found in receipt".to_string()
    } else if summary.granted_items.is_empty() {
        "All purchased books are already in your library".to_string()
    } else {
        format!("{} book(s) added to your library", summary.granted_items.len())
    }
}

/// Response for GET /api/purchases/library
#[derive(Debug, Clone, Serialize)]
pub struct LibraryResponse {
    pub status: String,
    pub books: Vec<BookDto>,
}

impl LibraryResponse {
    pub fn from_items(items: &[CatalogItem]) -> Self {
        Self {
            status: "success".to_string(),
            books: items.iter().map(BookDto::from_item).collect(),
        }
    }
}
