//! Outward facade: the three ranker entry points, page feeds and the
//! invalidation hook for the ingestion side.

use crate::assemble::{HomepageFeed, PageAssembler, ProductPageFeed};
use crate::cache::{spawn_sweeper, ArtifactCache, CacheStats};
use crate::config::EngineConfig;
use crate::model::{BuyerId, Dataset, Product, ProductId};
use crate::rank::Ranker;
use crate::store::{InteractionStore, MemoryStore};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

pub struct Engine {
    ranker: Ranker,
    _sweeper: Option<JoinHandle<()>>,
}

impl Engine {
    /// Own cache, plus a background sweeper when the config asks for one.
    pub fn new(store: Arc<dyn InteractionStore>, config: EngineConfig) -> Self {
        let cache = Arc::new(ArtifactCache::new());
        let sweeper = config.sweep_interval().map(|every| spawn_sweeper(&cache, every));
        Self { ranker: Ranker::new(store, cache, config), _sweeper: sweeper }
    }

    /// Share an existing cache with other engines. No sweeper is started.
    pub fn with_cache(store: Arc<dyn InteractionStore>, cache: Arc<ArtifactCache>, config: EngineConfig) -> Self {
        Self { ranker: Ranker::new(store, cache, config), _sweeper: None }
    }

    pub fn ranker(&self) -> &Ranker { &self.ranker }

    pub fn content_based(&self, product: ProductId, limit: usize) -> Vec<Product> {
        self.ranker.content_based(product, limit)
    }

    pub fn collaborative(&self, buyer: BuyerId, limit: usize) -> Vec<Product> {
        self.ranker.collaborative(buyer, limit)
    }

    pub fn hybrid(&self, buyer: BuyerId, limit: usize, alpha: f64) -> Vec<Product> {
        self.ranker.hybrid(buyer, limit, alpha)
    }

    pub fn popular(&self, limit: usize) -> Vec<Product> {
        self.ranker.popular(limit)
    }

    pub fn homepage(&self, buyer: BuyerId) -> Arc<HomepageFeed> {
        PageAssembler::new(&self.ranker).homepage(buyer)
    }

    pub fn product_page(&self, product: ProductId, buyer: BuyerId) -> Arc<ProductPageFeed> {
        PageAssembler::new(&self.ranker).product_page(product, buyer)
    }

    /// Drop every cached artifact and feed.
    pub fn invalidate_all(&self) { self.ranker.invalidate_all(); }

    /// Bulk load into `target`, then invalidate.
    pub fn ingest(&self, target: &MemoryStore, data: Dataset) {
        let (products, purchases) = (data.products.len(), data.purchases.len());
        target.extend(data);
        self.invalidate_all();
        info!(products, purchases, "bulk load applied, caches invalidated");
    }

    pub fn cache_stats(&self) -> CacheStats { self.ranker.cache().stats() }
}
