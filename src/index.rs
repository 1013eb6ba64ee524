//! Bidirectional map between stable ids and dense matrix positions.
//! Rebuilt with every matrix; position never equals id.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct IdIndex<K> {
    ids: Vec<K>,
    pos: HashMap<K, usize>,
}

impl<K: Copy + Ord + Hash> IdIndex<K> {
    /// Build from any id sequence. Ids are sorted and deduplicated, so
    /// position order is id order.
    pub fn new(ids: impl IntoIterator<Item = K>) -> Self {
        let mut ids: Vec<K> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let pos = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { ids, pos }
    }

    #[inline]
    pub fn position(&self, id: &K) -> Option<usize> { self.pos.get(id).copied() }

    #[inline]
    pub fn id(&self, position: usize) -> K { self.ids[position] }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}
