//! Stage B: near-duplicate dedup via MinHash/LSH (§4.4), ported from
//! `original_source`'s `SemanticDeduplicator`/`SemanticDeduplicationStats`.

use std::collections::HashMap;

use chunk_model::{Chunk, ChunkId};

use crate::lsh::MinHashLsh;
use crate::minhash::MinHasher;

#[derive(Debug, Clone, Default)]
pub struct SemanticDeduplicationStats {
    pub total_chunks: usize,
    pub unique_chunks: usize,
    pub near_duplicate_chunks: usize,
    /// canonical chunk id -> ids of near-duplicates folded into it.
    pub clusters: HashMap<ChunkId, Vec<ChunkId>>,
}

/// Near-duplicate detector. Holds the LSH index across calls, so later
/// batches in the same session are checked against earlier ones too.
pub struct SemanticDeduplicator {
    hasher: MinHasher,
    lsh: MinHashLsh,
}

impl SemanticDeduplicator {
    pub fn new(threshold: f32, num_perm: usize, ngram_size: usize) -> Self {
        Self {
            hasher: MinHasher::new(num_perm, ngram_size),
            lsh: MinHashLsh::new(threshold, num_perm),
        }
    }

    /// Stamps `semantic_fingerprint` on every survivor and folds near-duplicates
    /// into the first LSH match found for each chunk, in input order. Expects
    /// Stage A survivors as input (exact duplicates already removed).
    pub fn deduplicate(&mut self, mut chunks: Vec<Chunk>) -> (Vec<Chunk>, SemanticDeduplicationStats) {
        let mut stats = SemanticDeduplicationStats {
            total_chunks: chunks.len(),
            ..Default::default()
        };
        let mut unique = Vec::with_capacity(chunks.len());

        for mut chunk in chunks.drain(..) {
            let signature = self.hasher.signature(&chunk.text);
            chunk.metadata.semantic_fingerprint = Some(MinHasher::fingerprint(&signature));

            let similar_ids = self.lsh.query(&signature);
            if let Some(canonical_id) = similar_ids.into_iter().next() {
                stats.near_duplicate_chunks += 1;
                stats
                    .clusters
                    .entry(canonical_id.clone())
                    .or_default()
                    .push(chunk.metadata.chunk_id.clone());
                chunk.metadata.canonical_chunk_id = Some(canonical_id);
                continue;
            }

            self.lsh.insert(chunk.metadata.chunk_id.clone(), &signature);
            unique.push(chunk);
        }

        stats.unique_chunks = unique.len();
        (unique, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_model::{
        ChunkMetadata, ContentType, DocumentId, DocumentIntent, DocumentType, ExtractionMethod,
        PositionInSection,
    };
    use chrono::Utc;

    fn sample_chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                chunk_id: ChunkId::new(),
                document_id: DocumentId("doc1".into()),
                filename: "doc.pdf".into(),
                file_type: DocumentType::Page,
                object_uri: "file:///doc.pdf".into(),
                module_name: "module".into(),
                folder_path: "/".into(),
                week_number: None,
                page_number: Some(1),
                slide_number: None,
                section_title: None,
                heading_hierarchy: Vec::new(),
                chunk_index: 0,
                position_in_section: PositionInSection::Only,
                content_type: ContentType::Body,
                keywords: Vec::new(),
                entities: Vec::new(),
                topic_tags: Vec::new(),
                document_intent: DocumentIntent::Unknown,
                content_hash: None,
                semantic_fingerprint: None,
                canonical_chunk_id: None,
                char_count: text.chars().count(),
                token_count: 0,
                extraction_method: ExtractionMethod::Native,
                extraction_confidence: 1.0,
                ingested_at: Utc::now(),
                extra: Default::default(),
            },
            embedding: None,
        }
    }

    #[test]
    fn near_duplicate_paragraph_is_folded_into_canonical() {
        let mut dedup = SemanticDeduplicator::new(0.92, 128, 3);
        let chunks = vec![
            sample_chunk("Rust's ownership model prevents data races at compile time."),
            sample_chunk("Rust's ownership model prevents data races at compile time!"),
            sample_chunk("A completely unrelated sentence about gardening and soil pH."),
        ];
        let (unique, stats) = dedup.deduplicate(chunks);
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(unique.len(), 2);
        assert_eq!(stats.near_duplicate_chunks, 1);
        assert_eq!(stats.clusters.values().map(|v| v.len()).sum::<usize>(), 1);
    }

    #[test]
    fn every_survivor_gets_a_fingerprint() {
        let mut dedup = SemanticDeduplicator::new(0.92, 128, 3);
        let (unique, _) = dedup.deduplicate(vec![sample_chunk("some unique enough text content")]);
        assert!(unique[0].metadata.semantic_fingerprint.is_some());
    }
}
