//! Wires a single `upsert`/`delete` call through the primary store and every
//! registered text/vector index, so callers never have to remember to touch
//! all three backends themselves.

use chunk_model::{Chunk, ChunkId};

use crate::sqlite_repo::SqliteRepo;
use crate::{FilterClause, StoreError, TextIndexMaintainer, VectorIndexMaintainer};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("index error: {0}")]
    Index(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteReport {
    pub total_ids: usize,
    pub db_deleted: usize,
    pub text_delete_attempts: usize,
    pub vector_delete_attempts: usize,
    pub batches: usize,
}

/// Repeatedly fetches a batch of ids matching `filters`, deletes them from
/// the primary store, then from every text/vector index. Re-queries from
/// offset 0 each round since the previous batch's rows are already gone.
pub fn delete_by_filter_orchestrated(
    repo: &mut SqliteRepo,
    filters: &[FilterClause],
    batch_size: usize,
    text_indexes: &[&dyn TextIndexMaintainer],
    vector_indexes: &mut [&mut dyn VectorIndexMaintainer],
) -> Result<DeleteReport, OrchestratorError> {
    let mut report = DeleteReport::default();
    let batch = batch_size.max(1);

    loop {
        let ids = repo.list_chunk_ids_by_filter(filters, batch, 0)?;
        if ids.is_empty() {
            break;
        }
        report.total_ids += ids.len();
        report.batches += 1;

        let n = repo.delete_by_ids(&ids)?;
        report.db_deleted += n;

        for ti in text_indexes {
            ti.delete_by_ids(&ids).map_err(|e| OrchestratorError::Index(format!("{e}")))?;
            report.text_delete_attempts += ids.len();
        }
        for vi in vector_indexes.iter_mut() {
            vi.delete_by_ids(&ids).map_err(|e| OrchestratorError::Index(format!("{e}")))?;
            report.vector_delete_attempts += ids.len();
        }
    }
    Ok(report)
}

/// Upserts into the primary store, then every text index, then (if vectors
/// were supplied) every vector index. Vectors are supplied separately from
/// `chunks` because embedding happens after chunking, not as part of it.
pub fn ingest_chunks_orchestrated(
    repo: &mut SqliteRepo,
    chunks: &[Chunk],
    text_indexes: &[&dyn TextIndexMaintainer],
    vector_indexes: &mut [&mut dyn VectorIndexMaintainer],
    vectors: Option<&[(ChunkId, Vec<f32>)]>,
) -> Result<(), OrchestratorError> {
    if chunks.is_empty() {
        return Ok(());
    }
    repo.upsert_chunks(chunks)?;
    let _ = repo.maybe_rebuild_fts();
    for ti in text_indexes {
        ti.upsert(chunks).map_err(|e| OrchestratorError::Index(format!("{e}")))?;
    }
    if let Some(v) = vectors {
        for vi in vector_indexes.iter_mut() {
            vi.upsert_vectors(v).map_err(|e| OrchestratorError::Index(format!("{e}")))?;
        }
    }
    Ok(())
}
