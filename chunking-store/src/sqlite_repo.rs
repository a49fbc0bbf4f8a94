//! Primary store: one row per chunk in a SQLite table, with a mirrored FTS5
//! virtual table kept in sync by `upsert`/`delete_by_ids` (not SQL triggers,
//! so the only place that can drift is this file).

use std::path::Path;

use chunk_model::{Chunk, ChunkId, DocumentType};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::{ChunkStoreRead, FilterClause, FilterOp, StoreError};

pub struct SqliteRepo {
    conn: Connection,
}

impl SqliteRepo {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.init_schema()?;
        Ok(repo)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.init_schema()?;
        Ok(repo)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                module_name TEXT NOT NULL,
                week_number INTEGER,
                page_number INTEGER,
                slide_number INTEGER,
                chunk_index INTEGER NOT NULL,
                content_hash TEXT,
                canonical_chunk_id TEXT,
                text TEXT NOT NULL,
                metadata_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);
            CREATE INDEX IF NOT EXISTS idx_chunks_module_name ON chunks(module_name);
            CREATE INDEX IF NOT EXISTS idx_chunks_content_hash ON chunks(content_hash);
            CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(chunk_id UNINDEXED, text);
            ",
        )?;
        Ok(())
    }

    pub fn upsert_chunks(&mut self, chunks: &[Chunk]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for chunk in chunks {
            let m = &chunk.metadata;
            let metadata_json = serde_json::to_string(m)?;
            tx.execute(
                "INSERT INTO chunks (
                    chunk_id, document_id, filename, file_type, module_name, week_number,
                    page_number, slide_number, chunk_index, content_hash, canonical_chunk_id,
                    text, metadata_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    document_id = excluded.document_id,
                    filename = excluded.filename,
                    file_type = excluded.file_type,
                    module_name = excluded.module_name,
                    week_number = excluded.week_number,
                    page_number = excluded.page_number,
                    slide_number = excluded.slide_number,
                    chunk_index = excluded.chunk_index,
                    content_hash = excluded.content_hash,
                    canonical_chunk_id = excluded.canonical_chunk_id,
                    text = excluded.text,
                    metadata_json = excluded.metadata_json",
                params![
                    m.chunk_id.0,
                    m.document_id.0,
                    m.filename,
                    m.file_type.as_str(),
                    m.module_name,
                    m.week_number,
                    m.page_number,
                    m.slide_number,
                    m.chunk_index,
                    m.content_hash,
                    m.canonical_chunk_id.as_ref().map(|c| c.0.clone()),
                    chunk.text,
                    metadata_json,
                ],
            )?;
            tx.execute("DELETE FROM chunks_fts WHERE chunk_id = ?1", params![m.chunk_id.0])?;
            tx.execute(
                "INSERT INTO chunks_fts (chunk_id, text) VALUES (?1, ?2)",
                params![m.chunk_id.0, chunk.text],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_by_ids(&mut self, ids: &[ChunkId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut deleted = 0usize;
        for id in ids {
            deleted += tx.execute("DELETE FROM chunks WHERE chunk_id = ?1", params![id.0])?;
            tx.execute("DELETE FROM chunks_fts WHERE chunk_id = ?1", params![id.0])?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Rebuilds the FTS mirror from scratch. Defensive recovery path for the
    /// rare case where `chunks_fts` and `chunks` have drifted (e.g. a prior
    /// process crashed mid-upsert).
    pub fn maybe_rebuild_fts(&self) -> Result<(), StoreError> {
        let fts_count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM chunks_fts", [], |r| r.get(0))?;
        let chunk_count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM chunks", [], |r| r.get(0))?;
        if fts_count == chunk_count {
            return Ok(());
        }
        self.conn.execute("DELETE FROM chunks_fts", [])?;
        self.conn.execute(
            "INSERT INTO chunks_fts (chunk_id, text) SELECT chunk_id, text FROM chunks",
            [],
        )?;
        Ok(())
    }

    pub fn counts(&self) -> Result<(i64, i64), StoreError> {
        let chunks: i64 = self.conn.query_row("SELECT count(*) FROM chunks", [], |r| r.get(0))?;
        let fts: i64 = self.conn.query_row("SELECT count(*) FROM chunks_fts", [], |r| r.get(0))?;
        Ok((chunks, fts))
    }

    fn build_filter_sql(filters: &[FilterClause]) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        for f in filters {
            match &f.op {
                FilterOp::DocumentIdEq(v) => {
                    clauses.push("document_id = ?".to_string());
                    params.push(Box::new(v.clone()));
                }
                FilterOp::ModuleNameEq(v) => {
                    clauses.push("module_name = ?".to_string());
                    params.push(Box::new(v.clone()));
                }
                FilterOp::WeekNumberEq(v) => {
                    clauses.push("week_number = ?".to_string());
                    params.push(Box::new(*v));
                }
                FilterOp::FileTypeEq(ft) => {
                    clauses.push("file_type = ?".to_string());
                    params.push(Box::new(ft.as_str().to_string()));
                }
                FilterOp::ContentHashEq(v) => {
                    clauses.push("content_hash = ?".to_string());
                    params.push(Box::new(v.clone()));
                }
                FilterOp::ExcludeDuplicates => {
                    clauses.push("canonical_chunk_id IS NULL".to_string());
                }
            }
        }
        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        (sql, params)
    }
}

impl ChunkStoreRead for SqliteRepo {
    fn get_chunk(&self, id: &ChunkId) -> Result<Option<Chunk>, StoreError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT text, metadata_json FROM chunks WHERE chunk_id = ?1",
                params![id.0],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match row {
            Some((text, metadata_json)) => {
                let metadata = serde_json::from_str(&metadata_json)?;
                Ok(Some(Chunk { text, metadata, embedding: None }))
            }
            None => Ok(None),
        }
    }

    fn get_chunks_by_ids(&self, ids: &[ChunkId]) -> Result<Vec<Chunk>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(c) = self.get_chunk(id)? {
                out.push(c);
            }
        }
        Ok(out)
    }

    fn list_chunk_ids_by_filter(
        &self,
        filters: &[FilterClause],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChunkId>, StoreError> {
        let (where_sql, mut params) = Self::build_filter_sql(filters);
        let sql = format!(
            "SELECT chunk_id FROM chunks{where_sql} ORDER BY document_id, chunk_index LIMIT ? OFFSET ?"
        );
        params.push(Box::new(limit as i64));
        params.push(Box::new(offset as i64));
        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_from_iter(refs), |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(ChunkId(row?));
        }
        Ok(out)
    }

    fn find_by_content_hash(&self, hash: &str) -> Result<Option<ChunkId>, StoreError> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT chunk_id FROM chunks WHERE content_hash = ?1 LIMIT 1",
                params![hash],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id.map(ChunkId))
    }

    fn count_chunks(&self) -> Result<i64, StoreError> {
        Ok(self.conn.query_row("SELECT count(*) FROM chunks", [], |r| r.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chunk_model::{ChunkMetadata, ContentType, DocumentIntent, ExtractionMethod, PositionInSection};
    use std::collections::BTreeMap;

    fn sample_chunk(id: &str, document_id: &str, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                chunk_id: ChunkId(id.to_string()),
                document_id: chunk_model::DocumentId(document_id.to_string()),
                filename: "test.pptx".into(),
                file_type: DocumentType::Slide,
                object_uri: "file:///test.pptx".into(),
                module_name: "week 1".into(),
                folder_path: "/week 1".into(),
                week_number: Some(1),
                page_number: None,
                slide_number: Some(1),
                section_title: None,
                heading_hierarchy: vec![],
                chunk_index: 0,
                position_in_section: PositionInSection::Only,
                content_type: ContentType::Slide,
                keywords: vec![],
                entities: vec![],
                topic_tags: vec![],
                document_intent: DocumentIntent::Unknown,
                content_hash: Some(chunk_model::compute_content_hash(text)),
                semantic_fingerprint: None,
                canonical_chunk_id: None,
                char_count: text.chars().count(),
                token_count: 0,
                extraction_method: ExtractionMethod::Native,
                extraction_confidence: 1.0,
                ingested_at: Utc::now(),
                extra: BTreeMap::new(),
            },
            embedding: None,
        }
    }

    #[test]
    fn upsert_then_get_roundtrips() {
        let mut repo = SqliteRepo::open_in_memory().unwrap();
        let chunk = sample_chunk("c1", "d1", "hello world");
        repo.upsert_chunks(&[chunk.clone()]).unwrap();
        let fetched = repo.get_chunk(&ChunkId("c1".into())).unwrap().unwrap();
        assert_eq!(fetched.text, "hello world");
        assert_eq!(fetched.metadata.document_id.0, "d1");
    }

    #[test]
    fn upsert_is_idempotent_by_chunk_id() {
        let mut repo = SqliteRepo::open_in_memory().unwrap();
        let mut chunk = sample_chunk("c1", "d1", "first version");
        repo.upsert_chunks(&[chunk.clone()]).unwrap();
        chunk.text = "second version".into();
        repo.upsert_chunks(&[chunk]).unwrap();
        assert_eq!(repo.count_chunks().unwrap(), 1);
        let fetched = repo.get_chunk(&ChunkId("c1".into())).unwrap().unwrap();
        assert_eq!(fetched.text, "second version");
    }

    #[test]
    fn delete_removes_from_both_tables() {
        let mut repo = SqliteRepo::open_in_memory().unwrap();
        repo.upsert_chunks(&[sample_chunk("c1", "d1", "hello")]).unwrap();
        let deleted = repo.delete_by_ids(&[ChunkId("c1".into())]).unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.get_chunk(&ChunkId("c1".into())).unwrap().is_none());
        let (chunks, fts) = repo.counts().unwrap();
        assert_eq!(chunks, 0);
        assert_eq!(fts, 0);
    }

    #[test]
    fn filter_by_module_name() {
        let mut repo = SqliteRepo::open_in_memory().unwrap();
        repo.upsert_chunks(&[sample_chunk("c1", "d1", "a"), sample_chunk("c2", "d2", "b")])
            .unwrap();
        let ids = repo
            .list_chunk_ids_by_filter(&[FilterClause::module_name("week 1")], 10, 0)
            .unwrap();
        assert_eq!(ids.len(), 2);
    }
}
