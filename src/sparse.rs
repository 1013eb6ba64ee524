//! Sparse rows with sorted column indices. Dot products are a merge walk.

/// One sparse row: `cols` strictly increasing, `vals` parallel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRow {
    cols: Vec<u32>,
    vals: Vec<f64>,
}

impl SparseRow {
    /// Build from unordered (col, value) pairs. Duplicate columns are summed,
    /// zeros dropped.
    pub fn from_pairs(mut pairs: Vec<(u32, f64)>) -> Self {
        pairs.sort_unstable_by_key(|&(c, _)| c);
        let mut cols = Vec::with_capacity(pairs.len());
        let mut vals: Vec<f64> = Vec::with_capacity(pairs.len());
        for (c, v) in pairs {
            if cols.last() == Some(&c) {
                if let Some(last) = vals.last_mut() { *last += v; }
            } else {
                cols.push(c);
                vals.push(v);
            }
        }
        let mut row = Self { cols, vals };
        row.retain_nonzero();
        row
    }

    fn retain_nonzero(&mut self) {
        if self.vals.iter().all(|v| *v != 0.0) { return; }
        let (cols, vals) = self.cols.iter().zip(&self.vals)
            .filter(|(_, v)| **v != 0.0)
            .map(|(c, v)| (*c, *v))
            .unzip();
        self.cols = cols;
        self.vals = vals;
    }

    pub fn is_empty(&self) -> bool { self.cols.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.cols.iter().copied().zip(self.vals.iter().copied())
    }

    pub fn norm(&self) -> f64 {
        self.vals.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Scale to unit length. Zero rows stay zero.
    pub fn normalize(&mut self) {
        let n = self.norm();
        if n > 0.0 {
            for v in &mut self.vals { *v /= n; }
        }
    }

    pub fn dot(&self, other: &SparseRow) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.cols.len() && j < other.cols.len() {
            match self.cols[i].cmp(&other.cols[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.vals[i] * other.vals[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

/// Cosine of the angle between two rows. 0 when either is a zero vector.
pub fn cosine(a: &SparseRow, b: &SparseRow) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 { 0.0 } else { a.dot(b) / denom }
}

/// Columns of a row-major sparse matrix, as rows.
pub fn transpose(rows: &[SparseRow], n_cols: usize) -> Vec<SparseRow> {
    let mut out: Vec<Vec<(u32, f64)>> = vec![Vec::new(); n_cols];
    for (r, row) in rows.iter().enumerate() {
        for (c, v) in row.iter() {
            out[c as usize].push((r as u32, v));
        }
    }
    // rows are visited in order, so each column is already sorted
    out.into_iter()
        .map(|pairs| {
            let (cols, vals) = pairs.into_iter().unzip();
            SparseRow { cols, vals }
        })
        .collect()
}
