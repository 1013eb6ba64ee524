//! Interaction Store: read-only boundary to products and purchase history.
//!
//! The engine only reads through `InteractionStore`. `MemoryStore` is the
//! in-process implementation used by the binary and tests; bulk writes go
//! through `replace`/`extend` and must be followed by cache invalidation.

use crate::error::{StoreError, StoreResult};
use crate::model::{BuyerId, Dataset, Product, ProductId, PurchaseAggregate, PurchaseEvent};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

pub trait InteractionStore: Send + Sync {
    /// Every active product.
    fn fetch_active_products(&self) -> StoreResult<Vec<Product>>;

    /// Full rows for `ids`, any order. Unknown ids are skipped.
    fn fetch_products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;

    /// Summed quantity per (buyer, product).
    fn fetch_purchase_aggregates(&self) -> StoreResult<Vec<PurchaseAggregate>>;

    /// Up to `n` distinct products bought by `buyer`, most recent first.
    fn fetch_recent_purchases(&self, buyer: BuyerId, n: usize) -> StoreResult<Vec<ProductId>>;

    /// Active products by purchase count desc, newest first on ties.
    fn fetch_popularity_ranked(&self, limit: usize) -> StoreResult<Vec<ProductId>>;

    /// Active products sharing an order with `product`, most co-occurrences first.
    fn fetch_bought_together(&self, product: ProductId, limit: usize) -> StoreResult<Vec<ProductId>>;

    /// Other active products in the same category, newest first.
    fn fetch_newest_in_category(&self, product: ProductId, limit: usize) -> StoreResult<Vec<ProductId>>;

    /// Active products `buyer` keeps buying but has not bought lately: bought
    /// within `RESTOCK_LOOKBACK_DAYS`, last bought at least `RESTOCK_QUIET_DAYS`
    /// ago. Most purchases first, longest quiet first on ties.
    fn fetch_restock_candidates(&self, buyer: BuyerId, limit: usize) -> StoreResult<Vec<ProductId>>;
}

pub const RESTOCK_LOOKBACK_DAYS: i64 = 90;
pub const RESTOCK_QUIET_DAYS: i64 = 15;

#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    purchases: Vec<PurchaseEvent>,
}

impl Tables {
    fn load(&mut self, data: Dataset) {
        for p in data.products { self.products.insert(p.id, p); }
        self.purchases.extend(data.purchases);
    }

    fn active(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).filter(|p| p.is_active)
    }
}

/// In-memory store over a `Dataset`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_dataset(data: Dataset) -> Self {
        let store = Self::new();
        store.tables.write().load(data);
        store
    }

    /// Load a JSON dataset file (`{"products": [...], "purchases": [...]}`).
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::from_dataset(read_dataset(path)?))
    }

    /// Drop everything and load `data`.
    pub fn replace(&self, data: Dataset) {
        let mut t = self.tables.write();
        *t = Tables::default();
        t.load(data);
    }

    /// Upsert products and append purchases.
    pub fn extend(&self, data: Dataset) {
        self.tables.write().load(data);
    }

    pub fn counts(&self) -> (usize, usize) {
        let t = self.tables.read();
        (t.products.len(), t.purchases.len())
    }

    /// `fetch_restock_candidates` as of `now`.
    pub fn restock_candidates_at(&self, buyer: BuyerId, limit: usize, now: DateTime<Utc>) -> Vec<ProductId> {
        let t = self.tables.read();
        let since = now - Duration::days(RESTOCK_LOOKBACK_DAYS);
        let quiet_from = now - Duration::days(RESTOCK_QUIET_DAYS);
        let mut history: HashMap<ProductId, (usize, DateTime<Utc>)> = HashMap::new();
        for e in &t.purchases {
            if e.buyer_id != buyer || e.purchased_at < since || t.active(e.product_id).is_none() { continue; }
            let slot = history.entry(e.product_id).or_insert((0, e.purchased_at));
            slot.0 += 1;
            slot.1 = slot.1.max(e.purchased_at);
        }
        let ranked = history.into_iter()
            .filter(|(_, (_, last))| *last <= quiet_from)
            .map(|(id, (count, last))| (id, (count, Reverse(last))))
            .collect();
        take_ranked(ranked, limit)
    }
}

pub fn read_dataset(path: &Path) -> StoreResult<Dataset> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| StoreError::Parse(format!("{}: {e}", path.display())))
}

fn take_ranked(mut ranked: Vec<(ProductId, impl Ord)>, limit: usize) -> Vec<ProductId> {
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(id, _)| id).collect()
}

impl InteractionStore for MemoryStore {
    fn fetch_active_products(&self) -> StoreResult<Vec<Product>> {
        let t = self.tables.read();
        Ok(t.products.values().filter(|p| p.is_active).cloned().collect())
    }

    fn fetch_products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let t = self.tables.read();
        Ok(ids.iter().filter_map(|id| t.products.get(id).cloned()).collect())
    }

    fn fetch_purchase_aggregates(&self) -> StoreResult<Vec<PurchaseAggregate>> {
        let t = self.tables.read();
        let mut sums: BTreeMap<(BuyerId, ProductId), f64> = BTreeMap::new();
        for e in &t.purchases {
            *sums.entry((e.buyer_id, e.product_id)).or_insert(0.0) += e.quantity as f64;
        }
        Ok(sums.into_iter()
            .map(|((buyer_id, product_id), quantity)| PurchaseAggregate { buyer_id, product_id, quantity })
            .collect())
    }

    fn fetch_recent_purchases(&self, buyer: BuyerId, n: usize) -> StoreResult<Vec<ProductId>> {
        let t = self.tables.read();
        // stable sort keeps insertion order on equal timestamps; reverse = latest first
        let mut mine: Vec<&PurchaseEvent> = t.purchases.iter().filter(|e| e.buyer_id == buyer).collect();
        mine.sort_by_key(|e| e.purchased_at);
        let mut seen = HashSet::new();
        Ok(mine.into_iter().rev()
            .filter(|e| seen.insert(e.product_id))
            .map(|e| e.product_id)
            .take(n)
            .collect())
    }

    fn fetch_popularity_ranked(&self, limit: usize) -> StoreResult<Vec<ProductId>> {
        let t = self.tables.read();
        let mut counts: HashMap<ProductId, usize> = HashMap::new();
        for e in &t.purchases { *counts.entry(e.product_id).or_insert(0) += 1; }
        let ranked = t.products.values()
            .filter(|p| p.is_active)
            .map(|p| (p.id, (counts.get(&p.id).copied().unwrap_or(0), p.created_at)))
            .collect();
        Ok(take_ranked(ranked, limit))
    }

    fn fetch_bought_together(&self, product: ProductId, limit: usize) -> StoreResult<Vec<ProductId>> {
        let t = self.tables.read();
        let orders: HashSet<&str> = t.purchases.iter()
            .filter(|e| e.product_id == product)
            .filter_map(|e| e.order_id.as_deref())
            .collect();
        let mut counts: HashMap<ProductId, usize> = HashMap::new();
        for e in &t.purchases {
            if e.product_id == product { continue; }
            let Some(order) = e.order_id.as_deref() else { continue };
            if orders.contains(order) && t.active(e.product_id).is_some() {
                *counts.entry(e.product_id).or_insert(0) += 1;
            }
        }
        Ok(take_ranked(counts.into_iter().collect(), limit))
    }

    fn fetch_newest_in_category(&self, product: ProductId, limit: usize) -> StoreResult<Vec<ProductId>> {
        let t = self.tables.read();
        let Some(anchor) = t.products.get(&product) else { return Ok(Vec::new()) };
        let ranked = t.products.values()
            .filter(|p| p.is_active && p.id != product && p.category == anchor.category)
            .map(|p| (p.id, p.created_at))
            .collect();
        Ok(take_ranked(ranked, limit))
    }

    fn fetch_restock_candidates(&self, buyer: BuyerId, limit: usize) -> StoreResult<Vec<ProductId>> {
        Ok(self.restock_candidates_at(buyer, limit, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::io::Write;

    fn product(id: ProductId, category: &str, age_days: i64) -> Product {
        Product {
            id,
            name: format!("p{id}"),
            category: category.into(),
            subcategory: None,
            brand: None,
            description: None,
            price: 1.0,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() - Duration::days(age_days),
        }
    }

    fn buy(buyer: BuyerId, product: ProductId, qty: u32, order: &str, minute: i64) -> PurchaseEvent {
        PurchaseEvent {
            buyer_id: buyer,
            product_id: product,
            order_id: Some(order.into()),
            quantity: qty,
            purchased_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::from_dataset(Dataset {
            products: vec![product(1, "grains", 10), product(2, "grains", 5),
                           product(3, "oils", 1), product(4, "grains", 0)],
            purchases: vec![
                buy(1, 1, 3, "o1", 0), buy(1, 2, 1, "o1", 0),
                buy(2, 1, 2, "o2", 5), buy(2, 3, 5, "o2", 5),
                buy(1, 1, 1, "o3", 10),
            ],
        })
    }

    #[test]
    fn aggregates_sum_quantity() {
        let aggs = store().fetch_purchase_aggregates().unwrap();
        let a11 = aggs.iter().find(|a| a.buyer_id == 1 && a.product_id == 1).unwrap();
        assert_eq!(a11.quantity, 4.0);
        assert_eq!(aggs.len(), 4);
    }

    #[test]
    fn recent_purchases_are_distinct_latest_first() {
        assert_eq!(store().fetch_recent_purchases(1, 5).unwrap(), vec![1, 2]);
        assert!(store().fetch_recent_purchases(42, 5).unwrap().is_empty());
    }

    #[test]
    fn popularity_counts_records_then_recency() {
        // 1 has three records; 2 and 3 one each, 3 newer; 4 none
        assert_eq!(store().fetch_popularity_ranked(10).unwrap(), vec![1, 3, 2, 4]);
        assert_eq!(store().fetch_popularity_ranked(2).unwrap(), vec![1, 3]);
    }

    #[test]
    fn bought_together_uses_shared_orders() {
        let s = store();
        assert_eq!(s.fetch_bought_together(1, 5).unwrap(), vec![2, 3]);
        assert_eq!(s.fetch_bought_together(3, 5).unwrap(), vec![1]);
    }

    #[test]
    fn newest_in_category_excludes_anchor() {
        let s = store();
        assert_eq!(s.fetch_newest_in_category(1, 5).unwrap(), vec![4, 2]);
        assert!(s.fetch_newest_in_category(99, 5).unwrap().is_empty());
    }

    #[test]
    fn inactive_products_leave_listings() {
        let s = store();
        let mut gone = product(2, "grains", 5);
        gone.is_active = false;
        s.extend(Dataset { products: vec![gone], purchases: vec![] });
        let ids: Vec<_> = s.fetch_active_products().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(s.fetch_bought_together(1, 5).unwrap(), vec![3]);
    }

    #[test]
    fn restock_lists_regulars_gone_quiet() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let at = |product_id, days_ago| PurchaseEvent {
            buyer_id: 7,
            product_id,
            order_id: None,
            quantity: 1,
            purchased_at: now - Duration::days(days_ago),
        };
        let mut retired = product(5, "oils", 0);
        retired.is_active = false;
        let s = MemoryStore::from_dataset(Dataset {
            products: (1..=4).chain([6]).map(|id| product(id, "grains", 0)).chain([retired]).collect(),
            purchases: vec![
                at(1, 20), at(1, 30), at(1, 40),
                at(2, 16),
                at(3, 30), at(3, 5),
                at(4, 100),
                at(5, 20), at(5, 25),
                at(6, 50), at(6, 120),
                buy(8, 2, 1, "o9", 0),
            ],
        });
        // 3 was bought recently, 4 only outside the window, 5 is retired
        assert_eq!(s.restock_candidates_at(7, 10, now), vec![1, 6, 2]);
        assert_eq!(s.restock_candidates_at(7, 2, now), vec![1, 6]);
        assert!(s.restock_candidates_at(8, 10, now).is_empty());
        assert!(s.restock_candidates_at(42, 10, now).is_empty());
    }

    #[test]
    fn open_reads_json_dataset() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"products":[{{"id":1,"name":"Rice","category":"grains","price":2.0,
            "created_at":"2024-01-01T00:00:00Z"}}],"purchases":[]}}"#).unwrap();
        let s = MemoryStore::open(f.path()).unwrap();
        assert_eq!(s.counts(), (1, 0));
    }

    #[test]
    fn open_reports_parse_errors() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(matches!(MemoryStore::open(f.path()), Err(StoreError::Parse(_))));
    }
}
