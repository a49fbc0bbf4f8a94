//! Query-time dedup (§4.4 "Query-time dedup"): a lighter pass run over an
//! already score-ordered candidate list, dropping near-identical hits the
//! corpus-level dedup missed (e.g. the same paragraph surviving in two
//! source documents). Grounded in `original_source`'s
//! `dedup_manager.deduplicate_query_results(chunks, similarity_threshold=...,
//! max_chunks=top_k)`, implemented here via pairwise Jaccard over each
//! result's 3-shingle set against already-accepted results, in score order.
//! `O(k^2)` over the small `2*top_k` candidate window this runs on.

use std::collections::HashSet;

use crate::minhash::shingles;

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Returns the indices of `ordered_texts` to keep, in their original (score)
/// order, truncated to `top_k`. `ordered_texts` must already be sorted best
/// hit first; ties among near-duplicates always favor the earlier index.
pub fn dedup_query_results(ordered_texts: &[&str], similarity_threshold: f32, top_k: usize) -> Vec<usize> {
    let mut kept_indices = Vec::with_capacity(top_k);
    let mut kept_shingles: Vec<HashSet<String>> = Vec::with_capacity(top_k);

    for (index, text) in ordered_texts.iter().enumerate() {
        if kept_indices.len() >= top_k {
            break;
        }
        let candidate_shingles = shingles(text, 3);
        let is_near_duplicate = kept_shingles
            .iter()
            .any(|accepted| jaccard(&candidate_shingles, accepted) > similarity_threshold);
        if is_near_duplicate {
            continue;
        }
        kept_indices.push(index);
        kept_shingles.push(candidate_shingles);
    }

    kept_indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_near_duplicate_hit_and_keeps_the_higher_ranked_one() {
        let texts = vec![
            "Rust's borrow checker enforces memory safety without a garbage collector.",
            "Rust's borrow checker enforces memory safety without a garbage collector!",
            "An entirely different topic about baking sourdough bread.",
        ];
        let kept = dedup_query_results(&texts, 0.85, 10);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn truncates_to_top_k_after_dedup() {
        let texts = vec!["alpha result one", "beta result two", "gamma result three"];
        let kept = dedup_query_results(&texts, 0.85, 2);
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let texts: Vec<&str> = Vec::new();
        assert!(dedup_query_results(&texts, 0.85, 10).is_empty());
    }
}
