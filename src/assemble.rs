//! Composed page feeds, cached whole per request key.
//! Sections degrade independently: a failed section is empty.

use crate::model::{BuyerId, Product, ProductId};
use crate::rank::Ranker;
use serde::Serialize;
use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const HOMEPAGE_RECOMMENDED: usize = 8;
pub const HOMEPAGE_POPULAR: usize = 6;
pub const HOMEPAGE_RESTOCK: usize = 4;
pub const PAGE_SIMILAR: usize = 4;
pub const PAGE_BOUGHT_TOGETHER: usize = 2;
pub const PAGE_NEW_IN_CATEGORY: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomepageFeed {
    pub recommended: Vec<Product>,
    pub popular: Vec<Product>,
    /// Regular purchases the buyer has not reordered lately.
    pub restock: Vec<Product>,
}

impl HomepageFeed {
    fn is_empty(&self) -> bool {
        self.recommended.is_empty() && self.popular.is_empty() && self.restock.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPageFeed {
    pub similar: Vec<Product>,
    pub bought_together: Vec<Product>,
    pub new_in_category: Vec<Product>,
}

impl ProductPageFeed {
    fn is_empty(&self) -> bool {
        self.similar.is_empty() && self.bought_together.is_empty() && self.new_in_category.is_empty()
    }
}

pub fn homepage_key(buyer: BuyerId) -> String { format!("homepage:{buyer}") }

pub fn product_page_key(product: ProductId, buyer: BuyerId) -> String {
    format!("product_page:{product}:{buyer}")
}

pub struct PageAssembler<'a> {
    ranker: &'a Ranker,
}

impl<'a> PageAssembler<'a> {
    pub fn new(ranker: &'a Ranker) -> Self { Self { ranker } }

    pub fn homepage(&self, buyer: BuyerId) -> Arc<HomepageFeed> {
        let cfg = self.ranker.config();
        self.cached(&homepage_key(buyer), cfg.homepage_ttl(), HomepageFeed::is_empty, || HomepageFeed {
            recommended: self.ranker.hybrid(buyer, HOMEPAGE_RECOMMENDED, cfg.default_alpha),
            popular: self.ranker.popular(HOMEPAGE_POPULAR),
            restock: self.restock(buyer, HOMEPAGE_RESTOCK),
        })
    }

    pub fn product_page(&self, product: ProductId, buyer: BuyerId) -> Arc<ProductPageFeed> {
        let ttl = self.ranker.config().product_page_ttl();
        self.cached(&product_page_key(product, buyer), ttl, ProductPageFeed::is_empty, || ProductPageFeed {
            similar: self.ranker.content_based(product, PAGE_SIMILAR),
            bought_together: self.bought_together(product, PAGE_BOUGHT_TOGETHER),
            new_in_category: self.new_in_category(product, PAGE_NEW_IN_CATEGORY),
        })
    }

    /// Compose through the single-flight cache. An all-empty feed is usually a
    /// failing store: it is returned but not stored.
    fn cached<T, F>(&self, key: &str, ttl: Duration, is_empty: fn(&T) -> bool, compose: F) -> Arc<T>
    where
        T: Any + Default + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut unstored = None;
        let built = self.ranker.cache().get_or_build(key, ttl, || -> Result<Option<T>, Infallible> {
            let feed = compose();
            if is_empty(&feed) {
                debug!(key, "empty feed, not cached");
                unstored = Some(feed);
                return Ok(None);
            }
            Ok(Some(feed))
        });
        match built {
            Ok(Some(feed)) => feed,
            Ok(None) => Arc::new(unstored.unwrap_or_default()),
            Err(never) => match never {},
        }
    }

    /// Products the buyer buys regularly but has not reordered lately.
    pub fn restock(&self, buyer: BuyerId, limit: usize) -> Vec<Product> {
        match self.ranker.store().fetch_restock_candidates(buyer, limit) {
            Ok(ids) => self.ranker.hydrate(&ids),
            Err(e) => {
                warn!(buyer, error = %e, "restock lookup failed");
                Vec::new()
            }
        }
    }

    /// Products that shared an order with `product`.
    pub fn bought_together(&self, product: ProductId, limit: usize) -> Vec<Product> {
        match self.ranker.store().fetch_bought_together(product, limit) {
            Ok(ids) => self.ranker.hydrate(&ids),
            Err(e) => {
                warn!(product, error = %e, "bought-together lookup failed");
                Vec::new()
            }
        }
    }

    /// Newest products in the same category as `product`.
    pub fn new_in_category(&self, product: ProductId, limit: usize) -> Vec<Product> {
        match self.ranker.store().fetch_newest_in_category(product, limit) {
            Ok(ids) => {
                if ids.is_empty() { debug!(product, "no category neighbours"); }
                self.ranker.hydrate(&ids)
            }
            Err(e) => {
                warn!(product, error = %e, "category lookup failed");
                Vec::new()
            }
        }
    }
}
