//! S4 (Deduplicator): two cascaded stages run in order on each ingest batch
//! (exact hash dedup, then MinHash/LSH near-duplicate dedup), plus a lighter
//! query-time dedup pass applied to scored retrieval results (§4.4).

mod hash_dedup;
mod lsh;
mod minhash;
mod query_dedup;
mod semantic_dedup;

pub use hash_dedup::{HashDeduplicationStats, HashDeduplicator};
pub use minhash::MinHasher;
pub use query_dedup::dedup_query_results;
pub use semantic_dedup::{SemanticDeduplicationStats, SemanticDeduplicator};

/// Defaults matching `original_source`'s `DedupSettings` (`semantic_threshold
/// = 0.92`, `minhash_num_perm = 128`) plus the query-time pass's own
/// `similarity_threshold = 0.85`.
pub struct DedupConfig {
    pub semantic_threshold: f32,
    pub minhash_num_perm: usize,
    pub minhash_ngram_size: usize,
    pub query_similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.92,
            minhash_num_perm: 128,
            minhash_ngram_size: 3,
            query_similarity_threshold: 0.85,
        }
    }
}
