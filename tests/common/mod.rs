#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use shelfwise::error::{StoreError, StoreResult};
use shelfwise::{BuyerId, Dataset, InteractionStore, MemoryStore, Product, ProductId, PurchaseAggregate, PurchaseEvent};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn product(id: ProductId, name: &str, category: &str) -> Product {
    Product {
        id,
        name: name.into(),
        category: category.into(),
        subcategory: None,
        brand: None,
        description: None,
        price: 10.0 + id as f64,
        is_active: true,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(id),
    }
}

pub fn buy(buyer: BuyerId, product: ProductId, quantity: u32, minute: i64) -> PurchaseEvent {
    PurchaseEvent {
        buyer_id: buyer,
        product_id: product,
        order_id: Some(format!("{buyer}-{minute}")),
        quantity,
        purchased_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
    }
}

/// A: grains, B: grains, C: oils. Buyer 1 bought A×3, B×1; buyer 2 bought A×2, C×5.
pub fn grocer() -> Dataset {
    Dataset {
        products: vec![
            product(1, "Basmati Rice", "grains"),
            product(2, "Brown Rice", "grains"),
            product(3, "Mustard Oil", "oils"),
        ],
        purchases: vec![buy(1, 1, 3, 0), buy(1, 2, 1, 1), buy(2, 1, 2, 2), buy(2, 3, 5, 3)],
    }
}

/// A wider catalog for ranking tests.
pub fn pantry() -> Dataset {
    let mut products = vec![
        product(1, "Basmati Rice", "grains"),
        product(2, "Brown Rice", "grains"),
        product(3, "Mustard Oil", "oils"),
        product(4, "Sunflower Oil", "oils"),
        product(5, "Toor Dal", "pulses"),
        product(6, "Moong Dal", "pulses"),
        product(7, "Jasmine Rice", "grains"),
        product(8, "Groundnut Oil", "oils"),
    ];
    products[0].description = Some("long grain aromatic rice".into());
    products[6].description = Some("fragrant long grain rice".into());
    Dataset {
        products,
        purchases: vec![
            buy(1, 1, 3, 0), buy(1, 5, 1, 1),
            buy(2, 1, 2, 2), buy(2, 3, 5, 3), buy(2, 6, 1, 4),
            buy(3, 3, 1, 5), buy(3, 4, 2, 6),
            buy(4, 5, 4, 7), buy(4, 6, 2, 8), buy(4, 2, 1, 9),
        ],
    }
}

/// MemoryStore with switchable failures and call counters.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_products: AtomicBool,
    pub fail_purchases: AtomicBool,
    pub fail_popularity: AtomicBool,
    pub product_scans: AtomicUsize,
    pub aggregate_scans: AtomicUsize,
}

impl FlakyStore {
    pub fn new(data: Dataset) -> Self {
        Self {
            inner: MemoryStore::from_dataset(data),
            fail_products: AtomicBool::new(false),
            fail_purchases: AtomicBool::new(false),
            fail_popularity: AtomicBool::new(false),
            product_scans: AtomicUsize::new(0),
            aggregate_scans: AtomicUsize::new(0),
        }
    }

    fn check(flag: &AtomicBool, op: &'static str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) { Err(StoreError::query(op, "injected")) } else { Ok(()) }
    }
}

impl InteractionStore for FlakyStore {
    fn fetch_active_products(&self) -> StoreResult<Vec<Product>> {
        self.product_scans.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_products, "fetch_active_products")?;
        self.inner.fetch_active_products()
    }

    fn fetch_products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        Self::check(&self.fail_products, "fetch_products_by_ids")?;
        // reversed, so callers must restore order themselves
        let mut rows = self.inner.fetch_products_by_ids(ids)?;
        rows.reverse();
        Ok(rows)
    }

    fn fetch_purchase_aggregates(&self) -> StoreResult<Vec<PurchaseAggregate>> {
        self.aggregate_scans.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_purchases, "fetch_purchase_aggregates")?;
        self.inner.fetch_purchase_aggregates()
    }

    fn fetch_recent_purchases(&self, buyer: BuyerId, n: usize) -> StoreResult<Vec<ProductId>> {
        Self::check(&self.fail_purchases, "fetch_recent_purchases")?;
        self.inner.fetch_recent_purchases(buyer, n)
    }

    fn fetch_popularity_ranked(&self, limit: usize) -> StoreResult<Vec<ProductId>> {
        Self::check(&self.fail_popularity, "fetch_popularity_ranked")?;
        self.inner.fetch_popularity_ranked(limit)
    }

    fn fetch_bought_together(&self, product: ProductId, limit: usize) -> StoreResult<Vec<ProductId>> {
        Self::check(&self.fail_purchases, "fetch_bought_together")?;
        self.inner.fetch_bought_together(product, limit)
    }

    fn fetch_newest_in_category(&self, product: ProductId, limit: usize) -> StoreResult<Vec<ProductId>> {
        Self::check(&self.fail_products, "fetch_newest_in_category")?;
        self.inner.fetch_newest_in_category(product, limit)
    }

    fn fetch_restock_candidates(&self, buyer: BuyerId, limit: usize) -> StoreResult<Vec<ProductId>> {
        Self::check(&self.fail_purchases, "fetch_restock_candidates")?;
        self.inner.fetch_restock_candidates(buyer, limit)
    }
}

pub fn ids(products: &[Product]) -> Vec<ProductId> {
    products.iter().map(|p| p.id).collect()
}
