//! Catalog and purchase records as seen by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProductId = i64;
pub type BuyerId = i64;

fn active_default() -> bool { true }

/// A catalog product. Immutable within a cache epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default = "active_default")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Text fed to the feature builder: all textual attributes, missing ones as "".
    pub fn document(&self) -> String {
        [
            self.name.as_str(),
            self.category.as_str(),
            self.subcategory.as_deref().unwrap_or(""),
            self.brand.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
        ]
        .join(" ")
    }
}

/// One purchased line item. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    #[serde(default)]
    pub order_id: Option<String>,
    pub quantity: u32,
    pub purchased_at: DateTime<Utc>,
}

/// Summed quantity per (buyer, product) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PurchaseAggregate {
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub quantity: f64,
}

/// Bulk payload: what the ingestion side hands over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub purchases: Vec<PurchaseEvent>,
}
