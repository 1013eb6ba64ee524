//! Collaborative filtering on co-purchase behavior.
//!
//! Aggregated (buyer, product, quantity) rows form a sparse buyer×item
//! interaction matrix; item×item cosine similarity is taken over its columns.
//! A buyer's scores are `v · S` for interaction row `v`, with already
//! purchased and inactive items excluded.

use crate::index::IdIndex;
use crate::model::{BuyerId, ProductId, PurchaseAggregate};
use crate::outcome::Outcome;
use crate::score::{top_k, Scored};
use crate::sparse::{cosine, transpose, SparseRow};
use crate::store::InteractionStore;
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

/// Cache key of the co-purchase artifact.
pub const CACHE_KEY: &str = "cf:item_similarity";

#[derive(Debug, Clone)]
pub struct CoPurchaseModel {
    buyers: IdIndex<BuyerId>,
    items: IdIndex<ProductId>,
    /// One row per buyer, columns are item positions.
    interactions: Vec<SparseRow>,
    /// Dense, symmetric, row-major `items × items`. Diagonal is 0 and unused.
    similarity: Vec<f64>,
    /// Per item position. Inactive items still shape similarity but are never recommended.
    active: Vec<bool>,
}

impl CoPurchaseModel {
    /// `None` when no aggregate has a positive quantity.
    pub fn fit(aggregates: &[PurchaseAggregate]) -> Option<Self> {
        let valid: Vec<&PurchaseAggregate> = aggregates.iter()
            .filter(|a| a.quantity.is_finite() && a.quantity > 0.0)
            .collect();
        let items = IdIndex::new(valid.iter().map(|a| a.product_id));
        if items.is_empty() { return None; }
        let buyers = IdIndex::new(valid.iter().map(|a| a.buyer_id));

        let mut pairs: Vec<Vec<(u32, f64)>> = vec![Vec::new(); buyers.len()];
        for a in &valid {
            if let (Some(b), Some(i)) = (buyers.position(&a.buyer_id), items.position(&a.product_id)) {
                pairs[b].push((i as u32, a.quantity));
            }
        }
        let interactions: Vec<SparseRow> = pairs.into_iter().map(SparseRow::from_pairs).collect();

        let n = items.len();
        let columns = transpose(&interactions, n);
        let similarity: Vec<f64> = (0..n).into_par_iter()
            .flat_map_iter(|i| {
                let columns = &columns;
                (0..n).map(move |j| if i == j { 0.0 } else { cosine(&columns[i], &columns[j]) })
            })
            .collect();

        let active = vec![true; n];
        Some(Self { buyers, items, interactions, similarity, active })
    }

    /// Keep only `active` products as recommendation candidates.
    pub fn mask_inactive(mut self, active: &HashSet<ProductId>) -> Self {
        for (i, flag) in self.active.iter_mut().enumerate() {
            *flag = active.contains(&self.items.id(i));
        }
        self
    }

    pub fn n_buyers(&self) -> usize { self.buyers.len() }

    pub fn n_items(&self) -> usize { self.items.len() }

    /// Cosine similarity of two purchased items. `None` for unknown ids or a == b.
    pub fn similarity(&self, a: ProductId, b: ProductId) -> Option<f64> {
        if a == b { return None; }
        let (i, j) = (self.items.position(&a)?, self.items.position(&b)?);
        Some(self.similarity[i * self.items.len() + j])
    }

    /// Top `limit` unpurchased items for `buyer`. `UnknownAnchor` is the
    /// cold-start signal for buyers without history.
    pub fn recommend_for(&self, buyer: BuyerId, limit: usize) -> Outcome<Vec<Scored>> {
        let Some(b) = self.buyers.position(&buyer) else {
            return Outcome::UnknownAnchor;
        };
        let n = self.items.len();
        let row = &self.interactions[b];
        let mut scores = vec![0.0; n];
        for (i, q) in row.iter() {
            let sims = &self.similarity[i as usize * n..(i as usize + 1) * n];
            for (s, sim) in scores.iter_mut().zip(sims) { *s += q * sim; }
        }
        for (j, active) in self.active.iter().enumerate() {
            if !active { scores[j] = f64::NEG_INFINITY; }
        }
        for (i, _) in row.iter() { scores[i as usize] = f64::NEG_INFINITY; }
        let candidates = scores.into_iter().enumerate()
            .map(|(j, s)| Scored::new(self.items.id(j), s));
        Outcome::Ready(top_k(candidates, limit))
    }
}

/// Reads purchase aggregates and the active catalog, and fits a `CoPurchaseModel`.
pub struct CoPurchaseBuilder<'a> {
    store: &'a dyn InteractionStore,
}

impl<'a> CoPurchaseBuilder<'a> {
    pub fn new(store: &'a dyn InteractionStore) -> Self { Self { store } }

    pub fn build(&self) -> Outcome<CoPurchaseModel> {
        let start = Instant::now();
        debug!("building co-purchase model");
        let aggregates = match self.store.fetch_purchase_aggregates() {
            Ok(a) => a,
            Err(e) => return Outcome::Failed(e),
        };
        let active: HashSet<ProductId> = match self.store.fetch_active_products() {
            Ok(products) => products.into_iter().map(|p| p.id).collect(),
            Err(e) => return Outcome::Failed(e),
        };
        match CoPurchaseModel::fit(&aggregates) {
            Some(m) => {
                let m = m.mask_inactive(&active);
                info!(buyers = m.n_buyers(), items = m.n_items(), active = active.len(),
                      ms = start.elapsed().as_millis() as u64, "co-purchase model built");
                Outcome::Ready(m)
            }
            None => {
                debug!("no purchases, co-purchase model empty");
                Outcome::NoData
            }
        }
    }
}
