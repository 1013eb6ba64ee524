//! Content-based filtering: TF-IDF term vectors over the active catalog.
//!
//! One row per active product, one column per distinct term. Rows are
//! L2-normalized at build time, so cosine similarity is a sparse dot product.

use crate::index::IdIndex;
use crate::model::{Product, ProductId};
use crate::outcome::Outcome;
use crate::score::{top_k, Scored};
use crate::sparse::SparseRow;
use crate::store::InteractionStore;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info};

/// Cache key of the term-vector artifact.
pub const CACHE_KEY: &str = "cbf:term_vectors";

#[derive(Debug, Clone)]
pub struct TermVectorMatrix {
    products: IdIndex<ProductId>,
    rows: Vec<SparseRow>,
    vocabulary: Vec<String>,
}

impl TermVectorMatrix {
    /// Fit vocabulary and idf on `products`. Inactive products are skipped;
    /// `None` when nothing active remains.
    pub fn fit(products: &[Product]) -> Option<Self> {
        // later rows for the same id replace earlier ones
        let docs: BTreeMap<ProductId, Vec<String>> = products.iter()
            .filter(|p| p.is_active)
            .map(|p| (p.id, crate::text::terms(&p.document())))
            .collect();
        if docs.is_empty() { return None; }

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in docs.values() {
            let mut seen: Vec<&str> = terms.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for t in seen { *df.entry(t).or_insert(0) += 1; }
        }

        let n = docs.len() as f64;
        let vocabulary: Vec<String> = df.keys().map(|t| t.to_string()).collect();
        let columns: HashMap<&str, u32> = df.keys().enumerate()
            .map(|(i, t)| (*t, i as u32)).collect();
        // smoothed idf: a term in every document still weighs 1.0
        let idf: Vec<f64> = df.values()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let rows = docs.values().map(|terms| {
            let pairs = terms.iter()
                .map(|t| {
                    let c = columns[t.as_str()];
                    (c, idf[c as usize])
                })
                .collect();
            // duplicates sum to tf * idf
            let mut row = SparseRow::from_pairs(pairs);
            row.normalize();
            row
        }).collect();

        Some(Self { products: IdIndex::new(docs.keys().copied()), rows, vocabulary })
    }

    pub fn n_products(&self) -> usize { self.rows.len() }

    pub fn n_terms(&self) -> usize { self.vocabulary.len() }

    pub fn vocabulary(&self) -> &[String] { &self.vocabulary }

    pub fn row(&self, id: ProductId) -> Option<&SparseRow> {
        self.products.position(&id).map(|i| &self.rows[i])
    }

    /// The `limit` products most similar to `id`, excluding `id` itself.
    pub fn similar_to(&self, id: ProductId, limit: usize) -> Outcome<Vec<Scored>> {
        let Some(anchor) = self.products.position(&id) else {
            return Outcome::UnknownAnchor;
        };
        let query = &self.rows[anchor];
        let candidates = self.rows.iter().enumerate()
            .filter(|(i, _)| *i != anchor)
            .map(|(i, row)| Scored::new(self.products.id(i), query.dot(row)));
        Outcome::Ready(top_k(candidates, limit))
    }
}

/// Reads the active catalog and fits a `TermVectorMatrix`.
pub struct TextFeatureBuilder<'a> {
    store: &'a dyn InteractionStore,
}

impl<'a> TextFeatureBuilder<'a> {
    pub fn new(store: &'a dyn InteractionStore) -> Self { Self { store } }

    pub fn build(&self) -> Outcome<TermVectorMatrix> {
        let start = Instant::now();
        debug!("building term vectors");
        let products = match self.store.fetch_active_products() {
            Ok(p) => p,
            Err(e) => return Outcome::Failed(e),
        };
        match TermVectorMatrix::fit(&products) {
            Some(m) => {
                info!(products = m.n_products(), terms = m.n_terms(),
                      ms = start.elapsed().as_millis() as u64, "term vectors built");
                Outcome::Ready(m)
            }
            None => {
                debug!("no active products, term vectors empty");
                Outcome::NoData
            }
        }
    }
}
