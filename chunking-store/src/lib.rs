//! S5 — Indexer: the hybrid chunk store. A SQLite primary store (`sqlite_repo`)
//! holds the authoritative chunk rows; a lexical index (`fts5_index`, with an
//! optional richer `tantivy_index` backend) and a vector index (`hnsw_index`)
//! are maintained alongside it. `orchestrator` wires writes through all three so
//! a caller only ever talks to one `upsert`/`delete` call.

pub mod fts5_index;
pub mod hnsw_index;
pub mod orchestrator;
pub mod sqlite_repo;
pub mod tantivy_index;

use chunk_model::{Chunk, ChunkId, DocumentType};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index error: {0}")]
    Index(String),
}

/// A single equality/range predicate that every backend (SQLite, FTS, HNSW via
/// the primary store lookup) is expected to honour when filtering candidates.
#[derive(Debug, Clone)]
pub enum FilterOp {
    DocumentIdEq(String),
    ModuleNameEq(String),
    WeekNumberEq(u32),
    FileTypeEq(DocumentType),
    ContentHashEq(String),
    ExcludeDuplicates,
}

#[derive(Debug, Clone)]
pub struct FilterClause {
    pub op: FilterOp,
}

impl FilterClause {
    pub fn document_id(id: impl Into<String>) -> Self {
        Self { op: FilterOp::DocumentIdEq(id.into()) }
    }
    pub fn module_name(name: impl Into<String>) -> Self {
        Self { op: FilterOp::ModuleNameEq(name.into()) }
    }
    pub fn week_number(week: u32) -> Self {
        Self { op: FilterOp::WeekNumberEq(week) }
    }
    pub fn file_type(ft: DocumentType) -> Self {
        Self { op: FilterOp::FileTypeEq(ft) }
    }
    pub fn content_hash(hash: impl Into<String>) -> Self {
        Self { op: FilterOp::ContentHashEq(hash.into()) }
    }
    pub fn exclude_duplicates() -> Self {
        Self { op: FilterOp::ExcludeDuplicates }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Candidate headroom multiplier: each backend is asked for
    /// `top_k * fetch_factor` candidates so that post-filtering and fusion
    /// still have enough to work with (§6 "2x top_k candidate headroom").
    pub fetch_factor: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { top_k: 10, fetch_factor: 2 }
    }
}

#[derive(Debug, Clone)]
pub struct TextMatch {
    pub chunk_id: ChunkId,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub chunk_id: ChunkId,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Read side of the primary store: every backend resolves candidate ids back
/// to full `Chunk`s (and applies non-text/non-vector filters) through this.
pub trait ChunkStoreRead {
    fn get_chunk(&self, id: &ChunkId) -> Result<Option<Chunk>, StoreError>;
    fn get_chunks_by_ids(&self, ids: &[ChunkId]) -> Result<Vec<Chunk>, StoreError>;
    fn list_chunk_ids_by_filter(
        &self,
        filters: &[FilterClause],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChunkId>, StoreError>;
    fn find_by_content_hash(&self, hash: &str) -> Result<Option<ChunkId>, StoreError>;
    fn count_chunks(&self) -> Result<i64, StoreError>;
}

/// Tests a chunk's metadata against every filter clause (AND semantics).
/// Shared by backends (`fts5_index`, `hnsw_index`) whose native query
/// language doesn't cover every `FilterOp`, so they can post-filter
/// candidates pulled back by id against the chunk the primary store holds.
pub fn chunk_matches_filters(chunk: &Chunk, filters: &[FilterClause]) -> bool {
    let m = &chunk.metadata;
    filters.iter().all(|fc| match &fc.op {
        FilterOp::DocumentIdEq(v) => &m.document_id.0 == v,
        FilterOp::ModuleNameEq(v) => &m.module_name == v,
        FilterOp::WeekNumberEq(v) => m.week_number == Some(*v),
        FilterOp::FileTypeEq(v) => &m.file_type == v,
        FilterOp::ContentHashEq(v) => m.content_hash.as_deref() == Some(v.as_str()),
        FilterOp::ExcludeDuplicates => m.canonical_chunk_id.is_none(),
    })
}

pub trait TextIndexMaintainer {
    fn upsert(&self, chunks: &[Chunk]) -> Result<(), StoreError>;
    fn delete_by_ids(&self, ids: &[ChunkId]) -> Result<(), StoreError>;
}

pub trait TextSearcher {
    fn name(&self) -> &'static str;
    fn search_ids(
        &self,
        store: &dyn ChunkStoreRead,
        query: &str,
        filters: &[FilterClause],
        opts: &SearchOptions,
    ) -> Vec<TextMatch>;
}

pub trait VectorIndexMaintainer {
    fn upsert_vectors(&mut self, vectors: &[(ChunkId, Vec<f32>)]) -> Result<(), StoreError>;
    fn delete_by_ids(&mut self, ids: &[ChunkId]) -> Result<(), StoreError>;
}

pub trait VectorSearcher {
    fn knn_ids(
        &self,
        store: &dyn ChunkStoreRead,
        query_vector: &[f32],
        filters: &[FilterClause],
        opts: &SearchOptions,
    ) -> Vec<VectorMatch>;
}
