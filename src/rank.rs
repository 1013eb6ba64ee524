//! Recommendation ranker: content-based, collaborative and hybrid entry points.
//!
//! Artifacts come from the shared `ArtifactCache`, built on miss. Every entry
//! point returns hydrated products and never an error: store failures drop one
//! fallback tier (collaborative → popularity → empty).

use crate::cache::ArtifactCache;
use crate::config::EngineConfig;
use crate::content::{self, TermVectorMatrix, TextFeatureBuilder};
use crate::copurchase::{self, CoPurchaseModel, CoPurchaseBuilder};
use crate::model::{BuyerId, Product, ProductId};
use crate::outcome::Outcome;
use crate::score::{rank_score, top_k, Scored};
use crate::store::InteractionStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

pub struct Ranker {
    store: Arc<dyn InteractionStore>,
    cache: Arc<ArtifactCache>,
    config: EngineConfig,
}

impl Ranker {
    pub fn new(store: Arc<dyn InteractionStore>, cache: Arc<ArtifactCache>, config: EngineConfig) -> Self {
        Self { store, cache, config }
    }

    pub fn store(&self) -> &dyn InteractionStore { &*self.store }

    pub fn cache(&self) -> &Arc<ArtifactCache> { &self.cache }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Drop every cached artifact. Called after bulk writes to the store.
    pub fn invalidate_all(&self) { self.cache.clear(); }

    // --- artifacts ---

    pub fn term_vectors(&self) -> Outcome<Arc<TermVectorMatrix>> {
        let store = self.store();
        self.cache.get_or_build(content::CACHE_KEY, self.config.text_matrix_ttl(), || {
            match TextFeatureBuilder::new(store).build() {
                Outcome::Ready(m) => Ok(Some(m)),
                Outcome::Failed(e) => Err(e),
                _ => Ok(None),
            }
        }).into()
    }

    pub fn copurchase_model(&self) -> Outcome<Arc<CoPurchaseModel>> {
        let store = self.store();
        self.cache.get_or_build(copurchase::CACHE_KEY, self.config.similarity_ttl(), || {
            match CoPurchaseBuilder::new(store).build() {
                Outcome::Ready(m) => Ok(Some(m)),
                Outcome::Failed(e) => Err(e),
                _ => Ok(None),
            }
        }).into()
    }

    // --- scored rankings ---

    pub fn similar_scored(&self, product: ProductId, limit: usize) -> Outcome<Vec<Scored>> {
        self.term_vectors().and_then(|m| m.similar_to(product, limit))
    }

    pub fn collaborative_scored(&self, buyer: BuyerId, limit: usize) -> Outcome<Vec<Scored>> {
        self.copurchase_model().and_then(|m| m.recommend_for(buyer, limit))
    }

    /// Popularity tier. Empty when the store can't answer.
    pub fn popular_ids(&self, limit: usize) -> Vec<ProductId> {
        match self.store.fetch_popularity_ranked(limit) {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "popularity fallback failed");
                Vec::new()
            }
        }
    }

    /// Collaborative ids, popularity on cold start or failure.
    pub fn collaborative_ids(&self, buyer: BuyerId, limit: usize) -> Vec<ProductId> {
        match self.collaborative_scored(buyer, limit) {
            Outcome::Ready(scored) => scored.into_iter().map(|s| s.id).collect(),
            Outcome::Failed(e) => {
                warn!(buyer, error = %e, "co-purchase model unavailable, using popularity");
                self.popular_ids(limit)
            }
            cold => {
                debug!(buyer, outcome = cold.label(), "collaborative cold start, using popularity");
                self.popular_ids(limit)
            }
        }
    }

    /// Best content rank score per candidate across the buyer's recent purchases.
    fn seed_scores(&self, buyer: BuyerId) -> HashMap<ProductId, f64> {
        let pool = self.config.candidate_pool;
        let mut best: HashMap<ProductId, f64> = HashMap::new();
        let seeds = match self.store.fetch_recent_purchases(buyer, self.config.seed_count) {
            Ok(s) => s,
            Err(e) => {
                warn!(buyer, error = %e, "recent purchases unavailable, no content seeds");
                return best;
            }
        };
        if seeds.is_empty() { return best; }
        let matrix = match self.term_vectors() {
            Outcome::Ready(m) => m,
            Outcome::Failed(e) => {
                warn!(buyer, error = %e, "term vectors unavailable, no content seeds");
                return best;
            }
            other => {
                debug!(buyer, outcome = other.label(), "no term vectors for content seeds");
                return best;
            }
        };
        for seed in seeds {
            let Outcome::Ready(similar) = matrix.similar_to(seed, pool) else { continue };
            for (i, s) in similar.iter().enumerate() {
                // fixed denominator, independent of how many candidates came back
                let score = rank_score(i, pool);
                let slot = best.entry(s.id).or_insert(score);
                if score > *slot { *slot = score; }
            }
        }
        best
    }

    /// Blended scores over the union of both candidate sets, best first.
    /// Empty when neither source produced a candidate.
    pub fn hybrid_scored(&self, buyer: BuyerId, limit: usize, alpha: f64) -> Vec<Scored> {
        let alpha = self.clamp_alpha(alpha);
        let cf_ids = self.collaborative_ids(buyer, self.config.candidate_pool);
        let n = cf_ids.len();
        let mut blend: BTreeMap<ProductId, (f64, f64)> = BTreeMap::new();
        for (i, id) in cf_ids.into_iter().enumerate() {
            blend.entry(id).or_insert((rank_score(i, n), 0.0));
        }
        for (id, cbf) in self.seed_scores(buyer) {
            blend.entry(id).or_insert((0.0, 0.0)).1 = cbf;
        }
        let candidates = blend.into_iter()
            .map(|(id, (cf, cbf))| Scored::new(id, alpha * cf + (1.0 - alpha) * cbf));
        top_k(candidates, limit)
    }

    /// Hybrid ranking with the empty-union popularity fallback.
    pub fn hybrid_ids(&self, buyer: BuyerId, limit: usize, alpha: f64) -> Vec<ProductId> {
        let scored = self.hybrid_scored(buyer, limit, alpha);
        if scored.is_empty() && limit > 0 {
            debug!(buyer, "hybrid union empty, using popularity");
            return self.popular_ids(limit);
        }
        scored.into_iter().map(|s| s.id).collect()
    }

    fn clamp_alpha(&self, alpha: f64) -> f64 {
        if alpha.is_nan() {
            warn!("alpha is NaN, using default {}", self.config.default_alpha);
            return self.config.default_alpha;
        }
        if !(0.0..=1.0).contains(&alpha) { warn!(alpha, "alpha outside [0, 1], clamping"); }
        alpha.clamp(0.0, 1.0)
    }

    // --- hydrated entry points ---

    /// Full rows for `ids` in the given order. Unknown or inactive ids are dropped.
    pub fn hydrate(&self, ids: &[ProductId]) -> Vec<Product> {
        if ids.is_empty() { return Vec::new(); }
        match self.store.fetch_products_by_ids(ids) {
            Ok(rows) => {
                let mut by_id: HashMap<ProductId, Product> = rows.into_iter()
                    .filter(|p| p.is_active)
                    .map(|p| (p.id, p))
                    .collect();
                ids.iter().filter_map(|id| by_id.remove(id)).collect()
            }
            Err(e) => {
                error!(error = %e, n = ids.len(), "product hydration failed");
                Vec::new()
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn content_based(&self, product: ProductId, limit: usize) -> Vec<Product> {
        if limit == 0 { return Vec::new(); }
        match self.similar_scored(product, limit) {
            Outcome::Ready(scored) => {
                let ids: Vec<ProductId> = scored.iter().map(|s| s.id).collect();
                self.hydrate(&ids)
            }
            Outcome::Failed(e) => {
                warn!(error = %e, "term vectors unavailable");
                Vec::new()
            }
            other => {
                debug!(outcome = other.label(), "no content recommendations");
                Vec::new()
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn collaborative(&self, buyer: BuyerId, limit: usize) -> Vec<Product> {
        if limit == 0 { return Vec::new(); }
        self.hydrate(&self.collaborative_ids(buyer, limit))
    }

    /// `alpha = 1` is pure collaborative, `alpha = 0` pure content.
    #[instrument(level = "debug", skip(self))]
    pub fn hybrid(&self, buyer: BuyerId, limit: usize, alpha: f64) -> Vec<Product> {
        if limit == 0 { return Vec::new(); }
        self.hydrate(&self.hybrid_ids(buyer, limit, alpha))
    }

    pub fn popular(&self, limit: usize) -> Vec<Product> {
        if limit == 0 { return Vec::new(); }
        self.hydrate(&self.popular_ids(limit))
    }
}
