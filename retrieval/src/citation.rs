//! Citation formatting, grounded in `original_source`'s
//! `retrieval_tool.py::_format_search_results`: `"module_name | Week N |
//! Slide N (or Page N) | filename"` plus an optional `"Section: ..."` line.

use chunk_model::ChunkMetadata;

/// Builds the `"module_name | Week N | Slide N (or Page N) | filename"` part
/// of a citation. Falls back to `"Unknown source"` when every component is
/// absent.
pub fn format_source(meta: &ChunkMetadata) -> String {
    let mut parts = Vec::with_capacity(4);
    if !meta.module_name.is_empty() {
        parts.push(meta.module_name.clone());
    }
    if let Some(week) = meta.week_number {
        parts.push(format!("Week {week}"));
    }
    if let Some(slide) = meta.slide_number {
        parts.push(format!("Slide {slide}"));
    } else if let Some(page) = meta.page_number {
        parts.push(format!("Page {page}"));
    }
    if !meta.filename.is_empty() {
        parts.push(meta.filename.clone());
    }

    if parts.is_empty() {
        "Unknown source".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Full citation block: `"[source]"` plus an optional `"\nSection: ..."`
/// line when the chunk carries a section title.
pub fn format_citation(meta: &ChunkMetadata) -> String {
    let source = format_source(meta);
    match &meta.section_title {
        Some(title) if !title.is_empty() => format!("[{source}]\nSection: {title}"),
        _ => format!("[{source}]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chunk_model::{ChunkId, ContentType, DocumentId, DocumentIntent, DocumentType, ExtractionMethod, PositionInSection};

    fn base_meta() -> ChunkMetadata {
        ChunkMetadata {
            chunk_id: ChunkId::new(),
            document_id: DocumentId("doc1".into()),
            filename: "lecture.pdf".into(),
            file_type: DocumentType::Page,
            object_uri: "file:///lecture.pdf".into(),
            module_name: "Neural Networks".into(),
            folder_path: "/".into(),
            week_number: Some(3),
            page_number: Some(12),
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
            char_count: 0,
            token_count: 0,
            extraction_method: ExtractionMethod::Native,
            extraction_confidence: 1.0,
            ingested_at: Utc::now(),
            extra: Default::default(),
        }
    }

    #[test]
    fn prefers_slide_number_over_page_number() {
        let mut meta = base_meta();
        meta.slide_number = Some(7);
        assert_eq!(format_source(&meta), "Neural Networks | Week 3 | Slide 7 | lecture.pdf");
    }

    #[test]
    fn falls_back_to_page_number_without_slide() {
        let meta = base_meta();
        assert_eq!(format_source(&meta), "Neural Networks | Week 3 | Page 12 | lecture.pdf");
    }

    #[test]
    fn section_title_adds_a_second_line() {
        let mut meta = base_meta();
        meta.section_title = Some("Backpropagation".into());
        assert_eq!(format_citation(&meta), "[Neural Networks | Week 3 | Page 12 | lecture.pdf]\nSection: Backpropagation");
    }

    #[test]
    fn empty_metadata_falls_back_to_unknown_source() {
        let mut meta = base_meta();
        meta.module_name.clear();
        meta.week_number = None;
        meta.page_number = None;
        meta.filename.clear();
        assert_eq!(format_source(&meta), "Unknown source");
    }
}
