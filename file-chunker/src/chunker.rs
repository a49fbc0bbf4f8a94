//! S2 — Chunker: turns a `ParsedDocument` into bounded-size `Chunk`s with full
//! provenance, per the per-variant strategies in §4.2.

use chrono::Utc;
use chunk_model::{
    Chunk, ChunkId, ChunkMetadata, ContentType, DocumentIntent, DocumentMetadata, Entity,
    ExtractionMethod, ParsedDocument, PositionInSection, StructuralUnit,
};
use std::collections::BTreeMap;

use crate::token_splitter::{count_tokens, split_text_by_tokens, SplitParams};

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub split: SplitParams,
    pub include_speaker_notes: bool,
    pub include_tables: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            split: SplitParams::default(),
            include_speaker_notes: true,
            include_tables: true,
        }
    }
}

fn base_metadata(
    doc: &DocumentMetadata,
    document_id: &chunk_model::DocumentId,
    chunk_index: u32,
) -> ChunkMetadata {
    ChunkMetadata {
        chunk_id: ChunkId::new(),
        document_id: document_id.clone(),
        filename: doc.filename.clone(),
        file_type: doc.file_type,
        object_uri: doc.object_uri.clone(),
        module_name: doc.module_name.clone(),
        folder_path: doc.folder_path.clone(),
        week_number: doc.week_number,
        page_number: None,
        slide_number: None,
        section_title: None,
        heading_hierarchy: Vec::new(),
        chunk_index,
        position_in_section: PositionInSection::Only,
        content_type: ContentType::Body,
        keywords: Vec::new(),
        entities: Vec::<Entity>::new(),
        topic_tags: Vec::new(),
        document_intent: DocumentIntent::Unknown,
        content_hash: None,
        semantic_fingerprint: None,
        canonical_chunk_id: None,
        char_count: 0,
        token_count: 0,
        extraction_method: ExtractionMethod::Native,
        extraction_confidence: 1.0,
        ingested_at: Utc::now(),
        extra: BTreeMap::new(),
    }
}

fn finalize(mut meta: ChunkMetadata, text: String) -> Chunk {
    meta.char_count = text.chars().count();
    meta.token_count = count_tokens(&text);
    meta.content_hash = Some(chunk_model::compute_content_hash(&text));
    Chunk {
        text,
        metadata: meta,
        embedding: None,
    }
}

fn format_table(table_text: &str) -> String {
    let mut out = String::from("[Table]\n");
    for line in table_text.lines() {
        let cells: Vec<&str> = line.split('\t').collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }
    out.push_str("[/Table]");
    out
}

pub fn chunk_document(doc: &ParsedDocument, config: &ChunkerConfig) -> Vec<Chunk> {
    if doc.content.is_empty() {
        return Vec::new();
    }
    let document_id = doc.document_id();
    let mut chunks = Vec::new();
    let mut chunk_index = 0u32;

    for unit in &doc.content {
        match unit {
            StructuralUnit::Slide {
                slide_number,
                title,
                text_blocks,
                tables: _,
                speaker_notes,
            } => {
                let mut text = String::new();
                if !title.is_empty() {
                    text.push_str(&format!("# {title}\n"));
                }
                for b in text_blocks {
                    if b.level > 0 {
                        text.push_str(&"  ".repeat(b.level as usize));
                        text.push_str("\u{2022} ");
                    }
                    if config.include_tables && looks_like_wrapped_table(&b.text) {
                        text.push_str(&format_table(&strip_table_fence(&b.text)));
                    } else {
                        text.push_str(&b.text);
                    }
                    text.push('\n');
                }
                if config.include_speaker_notes && !speaker_notes.is_empty() {
                    text.push_str(&format!("\n[Speaker Notes: {speaker_notes}]"));
                }

                let pieces = split_or_whole(&text, config);
                let total = pieces.len();
                for (i, piece) in pieces.into_iter().enumerate() {
                    let mut meta = base_metadata(&doc.metadata, &document_id, chunk_index);
                    meta.slide_number = Some(*slide_number);
                    meta.section_title = if title.is_empty() { None } else { Some(title.clone()) };
                    meta.heading_hierarchy = if title.is_empty() { Vec::new() } else { vec![title.clone()] };
                    meta.position_in_section = PositionInSection::determine(i, total);
                    meta.content_type = ContentType::Slide;
                    chunks.push(finalize(meta, piece));
                    chunk_index += 1;
                }
            }
            StructuralUnit::Page {
                page_number,
                text_blocks,
                tables: _,
                extraction_method,
                extraction_confidence,
            } => {
                let mut text = String::new();
                let mut heading_hierarchy = Vec::new();
                for b in text_blocks {
                    if b.is_heading {
                        heading_hierarchy = vec![b.text.clone()];
                    }
                    text.push_str(&b.text);
                    text.push('\n');
                }
                let pieces = split_or_whole(&text, config);
                let total = pieces.len();
                for (i, piece) in pieces.into_iter().enumerate() {
                    let mut meta = base_metadata(&doc.metadata, &document_id, chunk_index);
                    meta.page_number = Some(*page_number);
                    meta.heading_hierarchy = heading_hierarchy.clone();
                    meta.position_in_section = PositionInSection::determine(i, total);
                    meta.content_type = ContentType::Body;
                    meta.extraction_method = *extraction_method;
                    meta.extraction_confidence = *extraction_confidence;
                    chunks.push(finalize(meta, piece));
                    chunk_index += 1;
                }
            }
            StructuralUnit::Section {
                index: _,
                heading,
                heading_level,
                text_blocks,
                tables: _,
                hyperlinks: _,
            } => {
                let mut text = String::new();
                if !heading.is_empty() {
                    text.push_str(heading);
                    text.push('\n');
                }
                for b in text_blocks {
                    if config.include_tables && looks_like_wrapped_table(&b.text) {
                        text.push_str(&format_table(&strip_table_fence(&b.text)));
                    } else {
                        text.push_str(&b.text);
                    }
                    text.push('\n');
                }
                let hierarchy = if heading.is_empty() {
                    Vec::new()
                } else {
                    vec![heading.clone()]
                };
                let pieces = split_or_whole(&text, config);
                let total = pieces.len();
                for (i, piece) in pieces.into_iter().enumerate() {
                    let mut meta = base_metadata(&doc.metadata, &document_id, chunk_index);
                    meta.section_title = if heading.is_empty() { None } else { Some(heading.clone()) };
                    meta.heading_hierarchy = hierarchy.clone();
                    let _ = heading_level;
                    meta.position_in_section = PositionInSection::determine(i, total);
                    meta.content_type = ContentType::Body;
                    chunks.push(finalize(meta, piece));
                    chunk_index += 1;
                }
            }
        }
    }

    chunks
}

fn split_or_whole(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![String::new()];
    }
    if count_tokens(trimmed) <= config.split.max_tokens {
        return vec![trimmed.to_string()];
    }
    split_text_by_tokens(trimmed, config.split.max_tokens, config.split.overlap_tokens)
}

fn looks_like_wrapped_table(text: &str) -> bool {
    text.trim_start().starts_with("<table ")
}

fn strip_table_fence(text: &str) -> String {
    text.trim()
        .trim_start_matches(|c| c != '\n')
        .trim_start_matches('\n')
        .trim_end_matches("</table>")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_model::{DocumentType, TextBlock};

    fn doc_meta() -> DocumentMetadata {
        DocumentMetadata {
            source_path: "/root/week 1/test_presentation.pptx".into(),
            object_uri: "file:///root/week 1/test_presentation.pptx".into(),
            filename: "test_presentation.pptx".into(),
            file_type: DocumentType::Slide,
            file_size_bytes: 0,
            created_at: Utc::now(),
            modified_at: Utc::now(),
            total_units: 3,
            is_scanned: false,
            extraction_method: ExtractionMethod::Native,
            module_name: "week 1".into(),
            folder_path: "/root/week 1".into(),
            week_number: Some(1),
        }
    }

    #[test]
    fn slide_deck_yields_one_chunk_per_slide() {
        let content = vec![
            StructuralUnit::Slide {
                slide_number: 1,
                title: "Introduction to ML".into(),
                text_blocks: vec![TextBlock::paragraph("basics")],
                tables: vec![],
                speaker_notes: "Speaker notes for slide 1".into(),
            },
            StructuralUnit::Slide {
                slide_number: 2,
                title: "Supervised Learning".into(),
                text_blocks: vec![TextBlock::paragraph("labels")],
                tables: vec![],
                speaker_notes: String::new(),
            },
            StructuralUnit::Slide {
                slide_number: 3,
                title: "Unsupervised Learning".into(),
                text_blocks: vec![TextBlock::paragraph("clusters")],
                tables: vec![],
                speaker_notes: String::new(),
            },
        ];
        let doc = ParsedDocument {
            metadata: doc_meta(),
            content,
            processing_errors: vec![],
        };
        let chunks = chunk_document(&doc, &ChunkerConfig::default());
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.contains("Introduction to ML"));
        assert!(chunks[0].text.contains("Speaker notes for slide 1"));
        for c in &chunks {
            assert_eq!(c.metadata.week_number, Some(1));
            assert!(matches!(c.metadata.slide_number, Some(1..=3)));
        }
        assert_eq!(chunks[0].metadata.heading_hierarchy, vec!["Introduction to ML".to_string()]);
    }

    #[test]
    fn oversized_page_splits_into_multiple_chunks_sharing_page_number() {
        let sentence = "This is a test sentence. ".repeat(500);
        let content = vec![StructuralUnit::Page {
            page_number: 1,
            text_blocks: vec![TextBlock::paragraph(sentence)],
            tables: vec![],
            extraction_method: ExtractionMethod::Native,
            extraction_confidence: 1.0,
        }];
        let mut doc_metadata = doc_meta();
        doc_metadata.file_type = DocumentType::Page;
        let doc = ParsedDocument {
            metadata: doc_metadata,
            content,
            processing_errors: vec![],
        };
        let mut config = ChunkerConfig::default();
        config.split.max_tokens = 300;
        let chunks = chunk_document(&doc, &config);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.metadata.page_number, Some(1));
            assert!(c.metadata.token_count <= 300);
        }
    }

    #[test]
    fn empty_document_yields_zero_chunks() {
        let doc = ParsedDocument {
            metadata: doc_meta(),
            content: vec![],
            processing_errors: vec![],
        };
        assert!(chunk_document(&doc, &ChunkerConfig::default()).is_empty());
    }
}
