//! Banded MinHash LSH index (§4.4 Stage B): partitions each signature into
//! `bands` bands of `rows` rows; two signatures are candidate matches if any
//! band's rows match exactly. Band/row counts are chosen so the banded
//! AND-then-OR crossover approximates the configured Jaccard threshold.

use std::collections::{HashMap, HashSet};

use chunk_model::ChunkId;

fn fnv1a_u32s(values: &[u32]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for v in values {
        for b in v.to_le_bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    hash
}

/// Picks `(bands, rows)` with `bands * rows == num_perm` whose AND/OR
/// crossover similarity `(1/bands)^(1/rows)` is closest to `threshold`.
fn choose_bands(num_perm: usize, threshold: f32) -> (usize, usize) {
    let mut best = (1, num_perm);
    let mut best_diff = f32::MAX;
    for bands in 1..=num_perm {
        if num_perm % bands != 0 {
            continue;
        }
        let rows = num_perm / bands;
        let crossover = (1.0 / bands as f32).powf(1.0 / rows as f32);
        let diff = (crossover - threshold).abs();
        if diff < best_diff {
            best_diff = diff;
            best = (bands, rows);
        }
    }
    best
}

pub struct MinHashLsh {
    bands: usize,
    rows: usize,
    tables: Vec<HashMap<u64, Vec<ChunkId>>>,
}

impl MinHashLsh {
    pub fn new(threshold: f32, num_perm: usize) -> Self {
        let (bands, rows) = choose_bands(num_perm, threshold);
        Self {
            bands,
            rows,
            tables: (0..bands).map(|_| HashMap::new()).collect(),
        }
    }

    fn band_key(&self, signature: &[u32], band_index: usize) -> u64 {
        let start = band_index * self.rows;
        fnv1a_u32s(&signature[start..start + self.rows])
    }

    /// Returns ids of previously inserted signatures sharing at least one
    /// band with `signature`, deduplicated and in first-seen order.
    pub fn query(&self, signature: &[u32]) -> Vec<ChunkId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for band_index in 0..self.bands {
            let key = self.band_key(signature, band_index);
            if let Some(ids) = self.tables[band_index].get(&key) {
                for id in ids {
                    if seen.insert(id.clone()) {
                        out.push(id.clone());
                    }
                }
            }
        }
        out
    }

    pub fn insert(&mut self, id: ChunkId, signature: &[u32]) {
        for band_index in 0..self.bands {
            let key = self.band_key(signature, band_index);
            self.tables[band_index].entry(key).or_default().push(id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minhash::MinHasher;

    #[test]
    fn bands_times_rows_equals_num_perm() {
        let lsh = MinHashLsh::new(0.92, 128);
        assert_eq!(lsh.bands * lsh.rows, 128);
    }

    #[test]
    fn near_identical_signatures_collide() {
        let hasher = MinHasher::new(128, 3);
        let mut lsh = MinHashLsh::new(0.92, 128);
        let sig_a = hasher.signature("the quick brown fox jumps over the lazy dog");
        let sig_b = hasher.signature("the quick brown fox jumps over the lazy dog.");
        lsh.insert(ChunkId("a".into()), &sig_a);
        let hits = lsh.query(&sig_b);
        assert!(hits.contains(&ChunkId("a".into())));
    }

    #[test]
    fn unrelated_signatures_do_not_collide() {
        let hasher = MinHasher::new(128, 3);
        let mut lsh = MinHashLsh::new(0.92, 128);
        let sig_a = hasher.signature("completely unrelated sentence about astronomy and stars");
        let sig_b = hasher.signature("a recipe for sourdough bread with rye flour and water");
        lsh.insert(ChunkId("a".into()), &sig_a);
        let hits = lsh.query(&sig_b);
        assert!(!hits.contains(&ChunkId("a".into())));
    }
}
