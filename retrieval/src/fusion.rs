//! Normalization-then-weighted-average fusion (§4.6 step 2): min-max
//! normalize each ranked list independently, then combine by weighted
//! arithmetic mean. Grounded in `original_source`'s `OpenSearchSettings`
//! hybrid search pipeline (`norm-processor` + weighted `score-combination`).

use std::collections::HashMap;

use chunk_model::ChunkId;
use chunking_store::{TextMatch, VectorMatch};

#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub vector_weight: f32,
    pub keyword_weight: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            keyword_weight: 0.3,
        }
    }
}

/// Min-max normalizes scores to `[0, 1]`. When every score in the list is
/// equal (including the single-element case), every entry normalizes to
/// `1.0` rather than dividing by a zero range.
fn min_max_normalize(scored: impl Iterator<Item = (ChunkId, f32)>) -> HashMap<ChunkId, f32> {
    let pairs: Vec<(ChunkId, f32)> = scored.collect();
    if pairs.is_empty() {
        return HashMap::new();
    }
    let min = pairs.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = pairs.iter().map(|(_, s)| *s).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    pairs
        .into_iter()
        .map(|(id, s)| {
            let normalized = if range <= f32::EPSILON { 1.0 } else { (s - min) / range };
            (id, normalized)
        })
        .collect()
}

/// Fuses a lexical and a vector ranked list into one score per chunk id,
/// sorted descending (ties broken by id for determinism). Chunks appearing
/// in only one list are scored against a `0.0` contribution from the other.
pub fn fuse(text_matches: &[TextMatch], vector_matches: &[VectorMatch], weights: FusionWeights) -> Vec<(ChunkId, f32)> {
    let text_scores = min_max_normalize(text_matches.iter().map(|m| (m.chunk_id.clone(), m.score)));
    let vector_scores = min_max_normalize(vector_matches.iter().map(|m| (m.chunk_id.clone(), m.score)));

    let mut ids: Vec<ChunkId> = text_scores.keys().chain(vector_scores.keys()).cloned().collect();
    ids.sort();
    ids.dedup();

    let mut fused: Vec<(ChunkId, f32)> = ids
        .into_iter()
        .map(|id| {
            let t = text_scores.get(&id).copied().unwrap_or(0.0);
            let v = vector_scores.get(&id).copied().unwrap_or(0.0);
            let score = weights.vector_weight * v + weights.keyword_weight * t;
            (id, score)
        })
        .collect();

    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tm(id: &str, score: f32) -> TextMatch {
        TextMatch { chunk_id: ChunkId(id.to_string()), score }
    }
    fn vm(id: &str, score: f32) -> VectorMatch {
        VectorMatch { chunk_id: ChunkId(id.to_string()), score }
    }

    #[test]
    fn vector_only_hit_is_weighted_by_vector_weight_alone() {
        let fused = fuse(&[], &[vm("a", 0.5)], FusionWeights::default());
        assert_eq!(fused[0].0, ChunkId("a".into()));
        assert!((fused[0].1 - 0.7).abs() < 1e-6);
    }

    #[test]
    fn hit_present_in_both_lists_combines_both_weights() {
        let fused = fuse(&[tm("a", 1.0)], &[vm("a", 1.0)], FusionWeights::default());
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn single_element_list_normalizes_to_one_not_nan() {
        let fused = fuse(&[tm("a", 4.2)], &[], FusionWeights::default());
        assert!((fused[0].1 - 0.3).abs() < 1e-6);
    }

    #[test]
    fn ranking_prefers_higher_fused_score() {
        let text = vec![tm("a", 1.0), tm("b", 10.0)];
        let vector = vec![vm("a", 10.0), vm("b", 1.0)];
        let fused = fuse(&text, &vector, FusionWeights::default());
        assert_eq!(fused[0].0, ChunkId("a".into()));
    }
}
