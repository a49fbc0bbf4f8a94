//! Lexical backend: queries the `chunks_fts` virtual table the primary store
//! already maintains (§5). The default `TextSearcher` used when the richer
//! `tantivy-impl` feature isn't enabled.

use chunk_model::{Chunk, ChunkId};
use rusqlite::Connection;

use crate::{
    chunk_matches_filters, ChunkStoreRead, FilterClause, SearchOptions, StoreError, TextIndexMaintainer, TextMatch,
    TextSearcher,
};

/// Thin FTS5 wrapper. Holds its own connection to the same database file so it
/// can be handed around independently of the primary store's borrow.
pub struct Fts5Index {
    conn: Connection,
}

impl Fts5Index {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn open_in_memory_attached(conn: Connection) -> Self {
        Self { conn }
    }
}

impl TextIndexMaintainer for Fts5Index {
    fn upsert(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        for chunk in chunks {
            self.conn.execute(
                "DELETE FROM chunks_fts WHERE chunk_id = ?1",
                rusqlite::params![chunk.metadata.chunk_id.0],
            )?;
            self.conn.execute(
                "INSERT INTO chunks_fts (chunk_id, text) VALUES (?1, ?2)",
                rusqlite::params![chunk.metadata.chunk_id.0, chunk.text],
            )?;
        }
        Ok(())
    }

    fn delete_by_ids(&self, ids: &[ChunkId]) -> Result<(), StoreError> {
        for id in ids {
            self.conn
                .execute("DELETE FROM chunks_fts WHERE chunk_id = ?1", rusqlite::params![id.0])?;
        }
        Ok(())
    }
}

impl TextSearcher for Fts5Index {
    fn name(&self) -> &'static str {
        "fts5"
    }

    fn search_ids(
        &self,
        store: &dyn ChunkStoreRead,
        query: &str,
        filters: &[FilterClause],
        opts: &SearchOptions,
    ) -> Vec<TextMatch> {
        let trimmed = query.trim();
        if trimmed.is_empty() || opts.top_k == 0 {
            return Vec::new();
        }
        let fetch_n = (opts.top_k.saturating_mul(opts.fetch_factor)).max(opts.top_k);
        let escaped = escape_fts_query(trimmed);
        let mut stmt = match self.conn.prepare(
            "SELECT chunk_id, bm25(chunks_fts) AS rank FROM chunks_fts \
             WHERE chunks_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        let rows = stmt.query_map(rusqlite::params![escaped, fetch_n as i64], |r| {
            let id: String = r.get(0)?;
            let rank: f64 = r.get(1)?;
            Ok((id, rank))
        });
        let rows = match rows {
            Ok(r) => r,
            Err(_) => return Vec::new(),
        };
        let mut out = Vec::new();
        for row in rows.flatten() {
            let (id, rank) = row;
            let chunk_id = ChunkId(id);
            if !filters.is_empty() {
                match store.get_chunk(&chunk_id) {
                    Ok(Some(chunk)) if chunk_matches_filters(&chunk, filters) => {}
                    _ => continue,
                }
            }
            // bm25() in SQLite's FTS5 returns negative values for real
            // matches (more negative = better); negate before folding into
            // a bounded 0..1 similarity score via a logistic transform.
            let score = 1.0f32 / (1.0f32 + (-rank as f32).max(0.0));
            out.push(TextMatch { chunk_id, score });
        }
        out
    }
}

fn escape_fts_query(q: &str) -> String {
    let cleaned: String = q
        .chars()
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();
    format!("\"{cleaned}\"*")
}
