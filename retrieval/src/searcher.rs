//! Hybrid retrieval (§4.6), grounded in `original_source`'s
//! `HybridSearcher.search` / `retrieve_content`: embed the query, run a
//! lexical and a vector search in parallel candidate lists, fuse them,
//! apply facet filters and query-time dedup, and return the top `top_k`
//! with citation metadata attached.

use chunk_dedup::dedup_query_results;
use chunk_model::Chunk;
use chunking_store::{ChunkStoreRead, FilterClause, SearchOptions, StoreError, TextSearcher, VectorSearcher};
use embedding_provider::{Embedder, EmbedderError};

use crate::citation::format_citation;
use crate::fusion::{fuse, FusionWeights};

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedderError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One fused, deduplicated, citation-ready result.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub chunk: Chunk,
    pub score: f32,
    pub citation: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub results: Vec<ScoredResult>,
}

impl SearchResponse {
    pub fn max_score(&self) -> f32 {
        self.results.iter().map(|r| r.score).fold(0.0, f32::max)
    }
}

pub struct HybridSearcher<'a> {
    store: &'a dyn ChunkStoreRead,
    text_searcher: &'a dyn TextSearcher,
    vector_searcher: &'a dyn VectorSearcher,
    embedder: &'a dyn Embedder,
    weights: FusionWeights,
    query_dedup_threshold: f32,
}

impl<'a> HybridSearcher<'a> {
    pub fn new(
        store: &'a dyn ChunkStoreRead,
        text_searcher: &'a dyn TextSearcher,
        vector_searcher: &'a dyn VectorSearcher,
        embedder: &'a dyn Embedder,
        weights: FusionWeights,
        query_dedup_threshold: f32,
    ) -> Self {
        Self {
            store,
            text_searcher,
            vector_searcher,
            embedder,
            weights,
            query_dedup_threshold,
        }
    }

    /// Runs the full hybrid search: embed, fuse, filter, dedup, cite.
    /// Requests `2 * top_k` candidates from each backend (§4.6 step 4) so
    /// query-time dedup (step 5) still has `top_k` survivors to return.
    pub fn search(&self, query: &str, filters: &[FilterClause], top_k: usize) -> Result<SearchResponse, RetrievalError> {
        let opts = SearchOptions { top_k, fetch_factor: 2 };

        let query_vector = self.embedder.embed(query)?;

        let text_matches = self.text_searcher.search_ids(self.store, query, filters, &opts);
        let vector_matches = self.vector_searcher.knn_ids(self.store, &query_vector, filters, &opts);

        let fused = fuse(&text_matches, &vector_matches, self.weights);
        let ids: Vec<_> = fused.iter().map(|(id, _)| id.clone()).collect();
        let chunks = self.store.get_chunks_by_ids(&ids)?;

        let mut by_score: Vec<(Chunk, f32)> = ids
            .iter()
            .zip(fused.iter().map(|(_, score)| *score))
            .filter_map(|(id, score)| chunks.iter().find(|c| &c.metadata.chunk_id == id).cloned().map(|c| (c, score)))
            .collect();
        by_score.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let texts: Vec<&str> = by_score.iter().map(|(c, _)| c.text.as_str()).collect();
        let keep = dedup_query_results(&texts, self.query_dedup_threshold, top_k);

        let results = keep
            .into_iter()
            .map(|i| {
                let (chunk, score) = by_score[i].clone();
                let citation = format_citation(&chunk.metadata);
                ScoredResult { chunk, score, citation }
            })
            .collect();

        Ok(SearchResponse { results })
    }
}
