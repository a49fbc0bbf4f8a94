//! Stage A: exact hash dedup (§4.4). Ported from `original_source`'s
//! `HashDeduplicator`/`HashDeduplicationStats` one-to-one, since it's already
//! a plain stateful algorithm with no Python-specific behavior to translate.

use std::collections::{HashMap, HashSet};

use chunk_model::{compute_content_hash, Chunk, ChunkId};

#[derive(Debug, Clone, Default)]
pub struct HashDeduplicationStats {
    pub total_chunks: usize,
    pub unique_chunks: usize,
    pub duplicate_chunks: usize,
    /// content_hash -> ids of chunks discarded under that hash.
    pub duplicate_hashes: HashMap<String, Vec<ChunkId>>,
}

/// Exact-duplicate detector over a session's worth of ingest batches. Holds
/// the hashes it has seen across calls to `deduplicate`, so re-ingesting the
/// same file twice in one process is caught even across batches.
#[derive(Debug, Default)]
pub struct HashDeduplicator {
    seen_hashes: HashMap<String, ChunkId>,
}

impl HashDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps `content_hash` on every chunk, then discards exact duplicates:
    /// against `existing_hashes` (already in the store, identity unknown so no
    /// `canonical_chunk_id` is set), against this batch, and against hashes
    /// seen by earlier calls to this same deduplicator.
    pub fn deduplicate(
        &mut self,
        mut chunks: Vec<Chunk>,
        existing_hashes: &HashSet<String>,
    ) -> (Vec<Chunk>, HashDeduplicationStats) {
        let mut stats = HashDeduplicationStats {
            total_chunks: chunks.len(),
            ..Default::default()
        };

        let mut batch_hashes: HashMap<String, ChunkId> = HashMap::new();
        let mut unique = Vec::with_capacity(chunks.len());

        for mut chunk in chunks.drain(..) {
            let content_hash = compute_content_hash(&chunk.text);
            chunk.metadata.content_hash = Some(content_hash.clone());
            let chunk_id = chunk.metadata.chunk_id.clone();

            if existing_hashes.contains(&content_hash) {
                stats.duplicate_chunks += 1;
                stats.duplicate_hashes.entry(content_hash).or_default().push(chunk_id);
                continue;
            }

            if let Some(canonical) = batch_hashes.get(&content_hash) {
                stats.duplicate_chunks += 1;
                chunk.metadata.canonical_chunk_id = Some(canonical.clone());
                stats.duplicate_hashes.entry(content_hash).or_default().push(chunk_id);
                continue;
            }

            if let Some(canonical) = self.seen_hashes.get(&content_hash) {
                stats.duplicate_chunks += 1;
                chunk.metadata.canonical_chunk_id = Some(canonical.clone());
                stats.duplicate_hashes.entry(content_hash).or_default().push(chunk_id);
                continue;
            }

            batch_hashes.insert(content_hash.clone(), chunk_id.clone());
            self.seen_hashes.insert(content_hash, chunk_id);
            unique.push(chunk);
        }

        stats.unique_chunks = unique.len();
        (unique, stats)
    }

    pub fn clear(&mut self) {
        self.seen_hashes.clear();
    }

    pub fn seen_hashes(&self) -> HashSet<String> {
        self.seen_hashes.keys().cloned().collect()
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
    fn exact_duplicates_within_a_batch_are_discarded() {
        let mut dedup = HashDeduplicator::new();
        let chunks = vec![
            sample_chunk("The Quick Brown Fox."),
            sample_chunk("the   quick brown fox"),
            sample_chunk("A completely different sentence."),
        ];
        let (unique, stats) = dedup.deduplicate(chunks, &HashSet::new());
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(unique.len(), 2);
        assert_eq!(stats.duplicate_chunks, 1);
    }

    #[test]
    fn duplicates_against_existing_hashes_are_not_canonicalized() {
        let mut dedup = HashDeduplicator::new();
        let existing_hash = chunk_model::compute_content_hash("already indexed text");
        let mut existing = HashSet::new();
        existing.insert(existing_hash);

        let (unique, stats) = dedup.deduplicate(vec![sample_chunk("already indexed text")], &existing);
        assert!(unique.is_empty());
        assert_eq!(stats.duplicate_chunks, 1);
    }

    #[test]
    fn repeated_batches_catch_cross_batch_duplicates() {
        let mut dedup = HashDeduplicator::new();
        let (first, _) = dedup.deduplicate(vec![sample_chunk("hello world")], &HashSet::new());
        assert_eq!(first.len(), 1);

        let (second, stats) = dedup.deduplicate(vec![sample_chunk("hello world")], &HashSet::new());
        assert!(second.is_empty());
        assert_eq!(stats.duplicate_chunks, 1);
    }
}
