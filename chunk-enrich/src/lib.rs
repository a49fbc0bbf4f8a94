//! S3 (Enricher): attaches keywords, named entities, topic tags, and inferred
//! document intent to each chunk. Operates on an individual chunk's text;
//! idempotent; side-effect-free beyond the metadata it writes.

mod entities;
mod keywords;
mod topics;

pub use entities::EntityExtractor;
pub use keywords::KeywordExtractor;
pub use topics::{default_topic_keywords, infer_document_intent, TopicClassifier};

use chunk_model::Chunk;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Tuning knobs for the three extractors, mirroring `MetadataExtractor`'s
/// constructor defaults (`num_keywords=10, max_entities=15, max_topics=5,
/// max_workers=4`).
pub struct EnricherConfig {
    pub num_keywords: usize,
    pub max_entities: usize,
    pub max_ngram_size: usize,
    pub keyword_dedup_threshold: f32,
    pub topic_threshold: f32,
    pub max_topics: usize,
    pub max_workers: usize,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            num_keywords: 10,
            max_entities: 15,
            max_ngram_size: 3,
            keyword_dedup_threshold: 0.9,
            topic_threshold: 0.01,
            max_topics: 5,
            max_workers: 4,
        }
    }
}

/// Bundles the three extractors so a pool of worker threads can share one
/// instance (all are read-only after construction, so `Sync`).
pub struct Enricher {
    keyword_extractor: KeywordExtractor,
    entity_extractor: EntityExtractor,
    topic_classifier: TopicClassifier,
    max_entities: usize,
}

impl Enricher {
    pub fn new(config: &EnricherConfig) -> Self {
        Self {
            keyword_extractor: KeywordExtractor::new(
                config.max_ngram_size,
                config.keyword_dedup_threshold,
                config.num_keywords,
            ),
            entity_extractor: EntityExtractor::new(),
            topic_classifier: TopicClassifier::new(default_topic_keywords(), config.topic_threshold, config.max_topics),
            max_entities: config.max_entities,
        }
    }

    /// Enriches a single chunk in place.
    pub fn enrich_chunk(&self, chunk: &mut Chunk) {
        let text = &chunk.text;
        chunk.metadata.keywords = self.keyword_extractor.extract(text);
        chunk.metadata.entities = self.entity_extractor.extract(text, self.max_entities);
        chunk.metadata.topic_tags = self.topic_classifier.classify(text);
        chunk.metadata.document_intent = infer_document_intent(text);
    }
}

/// Enriches every chunk, parallelized across a bounded thread pool (default
/// width 4, the direct analog of `ThreadPoolExecutor(max_workers=4)`).
pub fn enrich_chunks(chunks: &mut [Chunk], config: &EnricherConfig) {
    let enricher = Enricher::new(config);
    let pool = build_pool(config.max_workers);
    pool.install(|| {
        use rayon::prelude::*;
        chunks.par_iter_mut().for_each(|chunk| enricher.enrich_chunk(chunk));
    });
}

fn build_pool(max_workers: usize) -> ThreadPool {
    ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()
        .expect("enrichment thread pool builds with a valid thread count")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_model::{
        ChunkId, ChunkMetadata, ContentType, DocumentId, DocumentIntent, DocumentType,
        ExtractionMethod, PositionInSection,
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
    fn enrich_chunk_populates_all_fields() {
        let enricher = Enricher::new(&EnricherConfig::default());
        let mut chunk = sample_chunk(
            "This tutorial walks through authentication and encryption best practices. \
             Step 1: configure the API. Published by Acme Corp on 2024-03-15.",
        );
        enricher.enrich_chunk(&mut chunk);

        assert!(!chunk.metadata.keywords.is_empty());
        assert!(chunk.metadata.topic_tags.contains(&"security".to_string()));
        assert_eq!(chunk.metadata.document_intent, DocumentIntent::Tutorial);
        assert!(chunk.metadata.entities.iter().any(|e| e.entity_type == "date"));
    }

    #[test]
    fn enrich_chunks_processes_every_chunk_in_parallel_pool() {
        let mut chunks = vec![
            sample_chunk("Getting started with the basics and fundamentals."),
            sample_chunk("Troubleshoot common errors and debug issues."),
        ];
        enrich_chunks(&mut chunks, &EnricherConfig::default());
        assert!(chunks[0].metadata.topic_tags.contains(&"introduction".to_string()));
        assert!(chunks[1].metadata.topic_tags.contains(&"troubleshooting".to_string()));
    }
}
