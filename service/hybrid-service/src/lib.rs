//! Wires the whole pipeline into one object a caller constructs once:
//! `IngestService` runs S1-S5 (parse -> chunk -> enrich -> dedup -> embed ->
//! index) per file; `RetrievalService` runs R (embed query -> fuse -> dedup
//! -> cite) plus the scope predicate. Grounded in `original_source`'s module
//! wiring (`ingestion/pipeline.py`, `vectorstore/hybrid_search.py`,
//! `agent/tools/{retrieval_tool,scope_checker}.py`).

use std::path::{Path, PathBuf};

use chunk_dedup::{DedupConfig, HashDeduplicator, SemanticDeduplicator};
use chunk_enrich::{enrich_chunks, EnricherConfig};
use chunk_model::{Chunk, ChunkId};
use chunking_store::fts5_index::Fts5Index;
use chunking_store::hnsw_index::HnswIndex;
use chunking_store::orchestrator::{delete_by_filter_orchestrated, ingest_chunks_orchestrated, DeleteReport};
use chunking_store::sqlite_repo::SqliteRepo;
use chunking_store::{ChunkStoreRead, FilterClause, StoreError, TextIndexMaintainer, VectorIndexMaintainer};
use embedding_provider::config::default_stdio_config;
use embedding_provider::{Embedder, OnnxStdIoConfig, OnnxStdIoEmbedder, RetryingEmbedder};
use retrieval::{check_scope, FusionWeights, HybridSearcher, RetrievalError, ScopeResult, SearchResponse};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("embedder error: {0}")]
    Embed(#[from] embedding_provider::EmbedderError),
    #[error("parser error: {0}")]
    Parse(#[from] file_chunker::ParserError),
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("index error: {0}")]
    Index(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    pub hnsw_dir: Option<PathBuf>,
    pub embedder: OnnxStdIoConfig,
    pub enricher: EnricherConfig,
    pub dedup: DedupConfig,
    pub fusion: FusionWeights,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("target/demo/chunks.db"),
            hnsw_dir: None,
            embedder: default_stdio_config(),
            enricher: EnricherConfig::default(),
            dedup: DedupConfig::default(),
            fusion: FusionWeights::default(),
        }
    }
}

fn derive_hnsw_dir(db_path: &Path) -> PathBuf {
    let mut s = db_path.as_os_str().to_string_lossy().to_string();
    s.push_str(".hnsw");
    PathBuf::from(s)
}

/// Holds every long-lived handle the pipeline needs: the primary store, both
/// search indexes, the retry-wrapped embedder, and the stateful dedup passes
/// (which must persist across ingest batches within a session, §4.4).
pub struct Services {
    cfg: ServiceConfig,
    embedder: RetryingEmbedder<OnnxStdIoEmbedder>,
    hash_dedup: HashDeduplicator,
    semantic_dedup: SemanticDeduplicator,
}

impl Services {
    pub fn new(cfg: ServiceConfig) -> Result<Self, ServiceError> {
        if let Some(dir) = cfg.db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let embedder = RetryingEmbedder::new(OnnxStdIoEmbedder::new(cfg.embedder.clone())?);
        let semantic_dedup =
            SemanticDeduplicator::new(cfg.dedup.semantic_threshold, cfg.dedup.minhash_num_perm, cfg.dedup.minhash_ngram_size);
        Ok(Self {
            cfg,
            embedder,
            hash_dedup: HashDeduplicator::new(),
            semantic_dedup,
        })
    }

    fn open_repo(&self) -> Result<SqliteRepo, ServiceError> {
        let repo = SqliteRepo::open(&self.cfg.db_path)?;
        let _ = repo.maybe_rebuild_fts();
        Ok(repo)
    }

    fn open_fts(&self) -> Result<Fts5Index, ServiceError> {
        Ok(Fts5Index::open(&self.cfg.db_path)?)
    }

    fn hnsw_dir(&self) -> PathBuf {
        self.cfg.hnsw_dir.clone().unwrap_or_else(|| derive_hnsw_dir(&self.cfg.db_path))
    }

    fn load_hnsw(&self) -> Result<HnswIndex, ServiceError> {
        let dir = self.hnsw_dir();
        let dim = self.embedder.info().dimension;
        if dir.join("map.tsv").exists() {
            Ok(HnswIndex::load(&dir, dim)?)
        } else {
            Ok(HnswIndex::new(dim, 10_000))
        }
    }

    /// Runs S1-S5 against a single file on disk: parse, chunk, enrich,
    /// dedup (hash then near-duplicate), embed, and write to every backend.
    /// Chunks folded into an existing duplicate never reach the embedder.
    pub fn ingest_file(&mut self, path: &str) -> Result<IngestReport, ServiceError> {
        tracing::info!(stage = "parse", path, "parsing and chunking file");
        let chunks = file_chunker::parse_and_chunk_file(path)?;
        self.ingest_chunks(chunks)
    }

    /// Runs S3-S5 against already-chunked input (S1/S2 already applied).
    pub fn ingest_chunks(&mut self, mut chunks: Vec<Chunk>) -> Result<IngestReport, ServiceError> {
        if chunks.is_empty() {
            return Ok(IngestReport::default());
        }
        let doc_id = chunks[0].metadata.document_id.0.clone();
        tracing::info!(stage = "enrich", %doc_id, chunks = chunks.len(), "enriching chunk batch");

        enrich_chunks(&mut chunks, &self.cfg.enricher);

        let repo = self.open_repo()?;
        let mut existing_hashes = std::collections::HashSet::new();
        for chunk in &chunks {
            let hash = chunk_model::compute_content_hash(&chunk.text);
            if repo.find_by_content_hash(&hash)?.is_some() {
                existing_hashes.insert(hash);
            }
        }
        let (chunks, hash_stats) = self.hash_dedup.deduplicate(chunks, &existing_hashes);
        let (mut chunks, semantic_stats) = self.semantic_dedup.deduplicate(chunks);
        tracing::info!(
            stage = "dedup",
            %doc_id,
            exact_duplicates = hash_stats.duplicate_chunks,
            near_duplicates = semantic_stats.near_duplicate_chunks,
            survivors = chunks.len(),
            "deduplication complete"
        );

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        let pairs: Vec<(ChunkId, Vec<f32>)> = chunks
            .iter()
            .zip(vectors.into_iter())
            .map(|(c, v)| (c.metadata.chunk_id.clone(), v))
            .collect();
        for (chunk, (_, vector)) in chunks.iter_mut().zip(pairs.iter()) {
            chunk.embedding = Some(vector.clone());
        }

        let mut repo = repo;
        let text_indexes: [&dyn TextIndexMaintainer; 0] = [];
        let mut hnsw = self.load_hnsw()?;
        let mut vector_indexes: [&mut dyn VectorIndexMaintainer; 1] = [&mut hnsw];
        ingest_chunks_orchestrated(&mut repo, &chunks, &text_indexes, &mut vector_indexes, Some(&pairs))
            .map_err(|e| ServiceError::Index(e.to_string()))?;
        hnsw.save(self.hnsw_dir())?;
        tracing::info!(stage = "index", %doc_id, chunks_written = chunks.len(), "batch indexed");

        Ok(IngestReport {
            chunks_written: chunks.len(),
            exact_duplicates: hash_stats.duplicate_chunks,
            near_duplicates: semantic_stats.near_duplicate_chunks,
            fallback_embeddings: self.embedder.fallback_count(),
        })
    }

    /// Runs the full hybrid retrieval pipeline (R, §4.6).
    pub fn search(&self, query: &str, filters: &[FilterClause], top_k: usize) -> Result<SearchResponse, ServiceError> {
        tracing::info!(stage = "retrieve", top_k, "executing hybrid search");
        let repo = self.open_repo()?;
        let fts = self.open_fts()?;
        let hnsw = self.load_hnsw()?;
        let searcher = HybridSearcher::new(&repo, &fts, &hnsw, &self.embedder, self.cfg.fusion, self.cfg.dedup.query_similarity_threshold);
        let response = searcher.search(query, filters, top_k)?;
        tracing::info!(stage = "retrieve", results = response.results.len(), "hybrid search complete");
        Ok(response)
    }

    /// Runs the scope predicate (§4.6 "Scope check") ahead of retrieval.
    pub fn check_scope(&self, question: &str) -> Result<ScopeResult, ServiceError> {
        let repo = self.open_repo()?;
        let fts = self.open_fts()?;
        let hnsw = self.load_hnsw()?;
        let searcher = HybridSearcher::new(&repo, &fts, &hnsw, &self.embedder, self.cfg.fusion, self.cfg.dedup.query_similarity_threshold);
        Ok(check_scope(question, &searcher))
    }

    /// Deletes by filter across the primary store and both indexes.
    pub fn delete_by_filter(&self, filters: &[FilterClause], batch_size: usize) -> Result<DeleteReport, ServiceError> {
        let mut repo = self.open_repo()?;
        let text_indexes: [&dyn TextIndexMaintainer; 0] = [];
        let mut hnsw = self.load_hnsw()?;
        let mut vector_indexes: [&mut dyn VectorIndexMaintainer; 1] = [&mut hnsw];
        let report = delete_by_filter_orchestrated(&mut repo, filters, batch_size, &text_indexes, &mut vector_indexes)
            .map_err(|e| ServiceError::Index(e.to_string()))?;
        hnsw.save(self.hnsw_dir())?;
        Ok(report)
    }

    pub fn repo_counts(&self) -> Result<(i64, i64), ServiceError> {
        Ok(self.open_repo()?.counts()?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub chunks_written: usize,
    pub exact_duplicates: usize,
    pub near_duplicates: usize,
    pub fallback_embeddings: u64,
}
