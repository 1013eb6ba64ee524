//! Ranking primitives shared by the builders and the ranker.
//! Ordering is always (score desc, id asc) so results never depend on map
//! iteration order.

use crate::model::ProductId;
use serde::Serialize;
use std::cmp::Ordering;

/// A candidate with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scored {
    pub id: ProductId,
    pub score: f64,
}

impl Scored {
    pub fn new(id: ProductId, score: f64) -> Self { Self { id, score } }
}

/// Score descending, id ascending.
#[inline]
pub fn by_rank(a: &Scored, b: &Scored) -> Ordering {
    b.score.total_cmp(&a.score).then(a.id.cmp(&b.id))
}

/// Keep the `limit` best candidates with finite scores, in rank order.
pub fn top_k(candidates: impl IntoIterator<Item = Scored>, limit: usize) -> Vec<Scored> {
    if limit == 0 { return Vec::new(); }
    let mut scored: Vec<Scored> = candidates.into_iter()
        .filter(|s| s.score.is_finite())
        .collect();
    if scored.len() > limit {
        scored.select_nth_unstable_by(limit - 1, by_rank);
        scored.truncate(limit);
    }
    scored.sort_unstable_by(by_rank);
    scored
}

/// Position-normalized score: `(n - index) / n`, in (0, 1] for index < n.
#[inline]
pub fn rank_score(index: usize, n: usize) -> f64 {
    if n == 0 { return 0.0; }
    (n as f64 - index as f64) / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_break_by_id() {
        let out = top_k(
            vec![Scored::new(9, 0.5), Scored::new(2, 0.5), Scored::new(5, 0.9), Scored::new(1, 0.1)],
            3,
        );
        let ids: Vec<_> = out.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[test]
    fn non_finite_scores_are_dropped() {
        let out = top_k(
            vec![Scored::new(1, f64::NEG_INFINITY), Scored::new(2, 0.0), Scored::new(3, f64::NAN)],
            10,
        );
        assert_eq!(out, vec![Scored::new(2, 0.0)]);
    }

    #[test]
    fn zero_limit_is_empty() {
        assert!(top_k(vec![Scored::new(1, 1.0)], 0).is_empty());
    }

    #[test]
    fn rank_score_range() {
        assert_eq!(rank_score(0, 4), 1.0);
        assert_eq!(rank_score(3, 4), 0.25);
        assert_eq!(rank_score(0, 0), 0.0);
        assert_eq!(rank_score(49, 50), 0.02);
    }
}
