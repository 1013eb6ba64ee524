mod common;

use common::{buy, ids, product};
use proptest::prelude::*;
use shelfwise::{ArtifactCache, Dataset, EngineConfig, MemoryStore, Ranker};
use std::collections::HashSet;
use std::sync::Arc;

const WORDS: &[&str] = &["rice", "oil", "dal", "basmati", "mustard", "sugar", "salt", "wheat", "flour", "ghee"];
const CATEGORIES: &[&str] = &["grains", "oils", "pulses", "staples"];

fn dataset() -> impl Strategy<Value = Dataset> {
    let names = prop::collection::vec(
        (prop::collection::vec(0..WORDS.len(), 1..4), 0..CATEGORIES.len(), prop::bool::weighted(0.8)),
        1..12,
    );
    names.prop_flat_map(|names| {
        let n = names.len() as i64;
        let purchases = prop::collection::vec((1i64..7, 1..=n, 1u32..6), 0..30);
        (Just(names), purchases)
    })
    .prop_map(|(names, purchases)| Dataset {
        products: names.iter().enumerate()
            .map(|(i, (words, cat, active))| {
                let name: Vec<&str> = words.iter().map(|&w| WORDS[w]).collect();
                let mut p = product(i as i64 + 1, &name.join(" "), CATEGORIES[*cat]);
                p.is_active = *active;
                p
            })
            .collect(),
        purchases: purchases.into_iter().enumerate()
            .map(|(minute, (b, p, q))| buy(b, p, q, minute as i64))
            .collect(),
    })
}

fn ranker(data: Dataset) -> Ranker {
    Ranker::new(Arc::new(MemoryStore::from_dataset(data)), Arc::new(ArtifactCache::new()), EngineConfig::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn content_based_never_returns_anchor(data in dataset(), limit in 0usize..8) {
        let n = data.products.len() as i64;
        let r = ranker(data);
        for id in 1..=n {
            let out = r.content_based(id, limit);
            prop_assert!(out.len() <= limit);
            prop_assert!(out.iter().all(|p| p.id != id));
        }
    }

    #[test]
    fn collaborative_never_repeats_purchases(data in dataset(), limit in 1usize..8) {
        let history: Vec<(i64, i64)> = data.purchases.iter().map(|e| (e.buyer_id, e.product_id)).collect();
        let r = ranker(data);
        for buyer in 1..7 {
            let bought: HashSet<i64> = history.iter().filter(|(b, _)| *b == buyer).map(|(_, p)| *p).collect();
            if bought.is_empty() { continue; }
            let out = r.collaborative(buyer, limit);
            prop_assert!(out.len() <= limit);
            prop_assert!(out.iter().all(|p| !bought.contains(&p.id)));
        }
    }

    #[test]
    fn collaborative_fills_limit_from_active_candidates(data in dataset(), limit in 1usize..8) {
        let active: HashSet<i64> = data.products.iter().filter(|p| p.is_active).map(|p| p.id).collect();
        let history: Vec<(i64, i64)> = data.purchases.iter().map(|e| (e.buyer_id, e.product_id)).collect();
        let r = ranker(data);
        for buyer in 1..7 {
            let bought: HashSet<i64> = history.iter().filter(|(b, _)| *b == buyer).map(|(_, p)| *p).collect();
            if bought.is_empty() { continue; }
            let candidates = history.iter()
                .map(|(_, p)| *p)
                .filter(|p| active.contains(p) && !bought.contains(p))
                .collect::<HashSet<_>>()
                .len();
            let out = r.collaborative(buyer, limit);
            prop_assert_eq!(out.len(), limit.min(candidates));
            prop_assert!(out.iter().all(|p| p.is_active));
        }
    }

    #[test]
    fn hybrid_alpha_one_matches_collaborative(data in dataset(), limit in 1usize..8) {
        let r = ranker(data);
        for buyer in 1..8 {
            let cf = r.collaborative_ids(buyer, limit);
            let hy = r.hybrid_ids(buyer, limit, 1.0);
            prop_assert!(hy.len() <= limit);
            if cf.len() >= limit {
                prop_assert_eq!(&hy, &cf);
            } else {
                // short collaborative lists are topped up with zero-weight content candidates
                prop_assert_eq!(&hy[..cf.len().min(hy.len())], &cf[..cf.len().min(hy.len())]);
            }
        }
    }

    #[test]
    fn hybrid_is_deterministic(data in dataset(), alpha in 0.0f64..=1.0) {
        let r = ranker(data.clone());
        let fresh = ranker(data);
        for buyer in 1..7 {
            prop_assert_eq!(ids(&r.hybrid(buyer, 5, alpha)), ids(&r.hybrid(buyer, 5, alpha)));
            prop_assert_eq!(ids(&r.hybrid(buyer, 5, alpha)), ids(&fresh.hybrid(buyer, 5, alpha)));
        }
    }
}
