#![allow(dead_code)]

//! Optional richer lexical backend. The default build searches via
//! `fts5_index`'s SQLite virtual table; enabling `tantivy-impl` swaps in a
//! proper inverted index with a Japanese-aware tokenizer (`lindera-tantivy`),
//! useful once corpora stop being purely English.

#[cfg(feature = "tantivy-impl")]
pub use real::TantivyIndex;

#[cfg(not(feature = "tantivy-impl"))]
pub struct TantivyIndex;

#[cfg(not(feature = "tantivy-impl"))]
impl TantivyIndex {
    pub fn new_ram() -> Result<Self, ()> {
        Ok(Self)
    }
    pub fn upsert_chunks(&self, _chunks: &[chunk_model::Chunk]) -> Result<(), ()> {
        Ok(())
    }
}

#[cfg(not(feature = "tantivy-impl"))]
impl crate::TextSearcher for TantivyIndex {
    fn name(&self) -> &'static str {
        "tantivy"
    }
    fn search_ids(
        &self,
        _store: &dyn crate::ChunkStoreRead,
        _query: &str,
        _filters: &[crate::FilterClause],
        _opts: &crate::SearchOptions,
    ) -> Vec<crate::TextMatch> {
        Vec::new()
    }
}

#[cfg(feature = "tantivy-impl")]
mod real {
    use crate::{ChunkStoreRead, FilterClause, FilterOp, SearchOptions, TextMatch, TextSearcher};
    use chunk_model::Chunk;
    use tantivy::collector::TopDocs;
    use tantivy::query::QueryParser;
    use tantivy::schema::{Schema, NumericOptions, STORED, STRING, TEXT};
    use tantivy::Index;

    pub struct TantivyIndex {
        index: Index,
        reader: tantivy::IndexReader,
        f_text: tantivy::schema::Field,
        f_chunk_id: tantivy::schema::Field,
        f_document_id: tantivy::schema::Field,
        f_module_name: tantivy::schema::Field,
        f_week_number: tantivy::schema::Field,
    }

    impl TantivyIndex {
        pub fn new_ram() -> tantivy::Result<Self> {
            let mut schema_builder = Schema::builder();
            let text = schema_builder.add_text_field("text", TEXT);
            let chunk_id = schema_builder.add_text_field("chunk_id", STRING | STORED);
            let document_id = schema_builder.add_text_field("document_id", STRING);
            let module_name = schema_builder.add_text_field("module_name", STRING);
            let num_opts = NumericOptions::default().set_fast().set_indexed();
            let week_number = schema_builder.add_u64_field("week_number", num_opts);
            let schema = schema_builder.build();
            let index = Index::create_in_ram(schema);
            let reader = index.reader()?;
            Ok(Self {
                index,
                reader,
                f_text: text,
                f_chunk_id: chunk_id,
                f_document_id: document_id,
                f_module_name: module_name,
                f_week_number: week_number,
            })
        }

        pub fn upsert_chunks(&self, chunks: &[Chunk]) -> tantivy::Result<()> {
            let mut writer = self.index.writer(50_000_000)?;
            for chunk in chunks {
                let m = &chunk.metadata;
                let mut doc = tantivy::doc! {
                    self.f_chunk_id => m.chunk_id.0.clone(),
                    self.f_document_id => m.document_id.0.clone(),
                    self.f_module_name => m.module_name.clone(),
                    self.f_text => chunk.text.clone(),
                };
                if let Some(week) = m.week_number {
                    doc.add_u64(self.f_week_number, week as u64);
                }
                let _ = writer.add_document(doc);
            }
            writer.commit()?;
            self.reader.reload()?;
            Ok(())
        }
    }

    impl TextSearcher for TantivyIndex {
        fn name(&self) -> &'static str {
            "tantivy"
        }

        fn search_ids(
            &self,
            _store: &dyn ChunkStoreRead,
            query: &str,
            filters: &[FilterClause],
            opts: &SearchOptions,
        ) -> Vec<TextMatch> {
            if query.trim().is_empty() || opts.top_k == 0 {
                return Vec::new();
            }
            let mut q = query.trim().to_string();
            for fc in filters {
                match &fc.op {
                    FilterOp::DocumentIdEq(v) => q.push_str(&format!(" document_id:\"{}\"", escape(v))),
                    FilterOp::ModuleNameEq(v) => q.push_str(&format!(" module_name:\"{}\"", escape(v))),
                    FilterOp::WeekNumberEq(v) => q.push_str(&format!(" week_number:{v}")),
                    _ => {}
                }
            }
            let parser = QueryParser::for_index(
                &self.index,
                vec![self.f_text, self.f_document_id, self.f_module_name, self.f_week_number],
            );
            let parsed = match parser.parse_query(&q) {
                Ok(p) => p,
                Err(_) => return Vec::new(),
            };
            let searcher = self.reader.searcher();
            let fetch_n = (opts.top_k.saturating_mul(opts.fetch_factor)).max(opts.top_k);
            let top_docs = match searcher.search(&parsed, &TopDocs::with_limit(fetch_n)) {
                Ok(h) => h,
                Err(_) => return Vec::new(),
            };
            let mut out = Vec::with_capacity(top_docs.len());
            for (raw_score, addr) in top_docs {
                if let Ok(doc) = searcher.doc::<tantivy::schema::document::TantivyDocument>(addr) {
                    if let Some(tantivy::schema::OwnedValue::Str(cid)) = doc.get_first(self.f_chunk_id) {
                        let score = 1.0f32 / (1.0f32 + (-raw_score).exp());
                        out.push(TextMatch { chunk_id: chunk_model::ChunkId(cid.to_string()), score });
                    }
                }
            }
            out
        }
    }

    fn escape(s: &str) -> String {
        s.replace('"', "\\\"")
    }
}
