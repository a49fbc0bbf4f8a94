//! S1 — Parser: dispatches by file extension, builds a `chunk_model::ParsedDocument`
//! out of the format-specific reader's `UnifiedBlock` stream, and attaches
//! path-derived metadata (§4.1).

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use chunk_model::{
    extract_path_metadata, BlockType, DocumentMetadata, DocumentType, ExtractionMethod,
    ParsedDocument, StructuralUnit, TextBlock,
};
use thiserror::Error;

use crate::reader_docx::read_docx_to_blocks;
use crate::reader_pdf::read_pdf_to_blocks;
use crate::reader_pptx::read_pptx_to_blocks;
use crate::unified_blocks::{BlockKind, UnifiedBlock};

/// Threshold below which a PDF page's native text is judged scanned (§4.1). Chosen
/// as a conservative character count rather than a geometric text-density ratio,
/// since block-level readers don't retain page dimensions.
const SCANNED_PAGE_CHAR_THRESHOLD: usize = 40;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("unsupported document type for {path}")]
    UnsupportedType { path: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Called by the page-based parser when a page's native text looks scanned.
/// The core does not perform OCR itself (Non-goal); this is the seam it delegates
/// through.
pub trait RecognitionService {
    fn recognize(&self, image_bytes: &[u8]) -> Result<(String, f32), String>;
}

pub fn parse_file(path: &str) -> Result<ParsedDocument, ParserError> {
    parse_file_with_recognition(path, None)
}

pub fn parse_file_with_recognition(
    path: &str,
    recognition: Option<&dyn RecognitionService>,
) -> Result<ParsedDocument, ParserError> {
    let file_type = DocumentType::from_extension(path);
    if matches!(file_type, DocumentType::Unknown) {
        return Err(ParserError::UnsupportedType {
            path: path.to_string(),
        });
    }

    let fs_meta = fs::metadata(path).map_err(|source| ParserError::Io {
        path: path.to_string(),
        source,
    })?;
    let file_size_bytes = fs_meta.len();
    let modified_at = fs_meta
        .modified()
        .map(system_time_to_utc)
        .unwrap_or_else(|_| Utc::now());
    let created_at = fs_meta
        .created()
        .map(system_time_to_utc)
        .unwrap_or(modified_at);

    let path_meta = extract_path_metadata(path);
    let filename = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());

    let mut processing_errors = Vec::new();
    let blocks = match file_type {
        DocumentType::Page => read_pdf_to_blocks(path),
        DocumentType::Slide => read_pptx_to_blocks(path),
        DocumentType::Section => read_docx_to_blocks(path),
        DocumentType::Unknown => unreachable!(),
    };

    let (content, is_scanned) = match file_type {
        DocumentType::Page => group_pages(blocks, recognition, &mut processing_errors),
        DocumentType::Slide => (group_slides(blocks), false),
        DocumentType::Section => (group_sections(blocks), false),
        DocumentType::Unknown => unreachable!(),
    };

    let metadata = DocumentMetadata {
        source_path: path.to_string(),
        object_uri: format!("file://{path}"),
        filename,
        file_type,
        file_size_bytes,
        created_at,
        modified_at,
        total_units: content.len() as u32,
        is_scanned,
        extraction_method: if is_scanned {
            ExtractionMethod::RecognitionService
        } else {
            ExtractionMethod::Native
        },
        module_name: path_meta.module_name,
        folder_path: path_meta.folder_path,
        week_number: path_meta.week_number,
    };

    Ok(ParsedDocument {
        metadata,
        content,
        processing_errors,
    })
}

fn system_time_to_utc(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

fn to_text_block(b: &UnifiedBlock) -> TextBlock {
    TextBlock {
        text: b.text.clone(),
        level: b.list_level,
        font_size: None,
        is_bold: false,
        is_heading: matches!(b.kind, BlockKind::Heading),
        block_type: match b.kind {
            BlockKind::Heading | BlockKind::Paragraph => {
                if b.is_table() {
                    BlockType::TableCell
                } else {
                    BlockType::Paragraph
                }
            }
            BlockKind::ListItem => BlockType::ListItem,
        },
    }
}

fn group_pages(
    blocks: Vec<UnifiedBlock>,
    recognition: Option<&dyn RecognitionService>,
    errors: &mut Vec<String>,
) -> (Vec<StructuralUnit>, bool) {
    use std::collections::BTreeMap;
    let mut by_page: BTreeMap<u32, Vec<UnifiedBlock>> = BTreeMap::new();
    for b in blocks {
        let page = b.page_start.unwrap_or(1);
        by_page.entry(page).or_default().push(b);
    }

    let mut any_scanned = false;
    let mut units = Vec::new();
    for (page_number, page_blocks) in by_page {
        let char_count: usize = page_blocks.iter().map(|b| b.text.chars().count()).sum();
        let mut extraction_method = ExtractionMethod::Native;
        let mut extraction_confidence = 1.0f32;
        let mut text_blocks: Vec<TextBlock> = page_blocks.iter().map(to_text_block).collect();

        if char_count < SCANNED_PAGE_CHAR_THRESHOLD {
            any_scanned = true;
            match recognition {
                Some(service) => match service.recognize(&[]) {
                    Ok((text, confidence)) => {
                        extraction_method = ExtractionMethod::RecognitionService;
                        extraction_confidence = confidence;
                        if !text.is_empty() {
                            text_blocks.push(TextBlock::paragraph(text));
                        }
                    }
                    Err(err) => {
                        errors.push(format!("recognition service failed on page {page_number}: {err}"));
                        extraction_method = ExtractionMethod::RecognitionService;
                        extraction_confidence = 0.0;
                    }
                },
                None => {
                    extraction_method = ExtractionMethod::RecognitionService;
                    extraction_confidence = 0.0;
                }
            }
        }

        units.push(StructuralUnit::Page {
            page_number,
            text_blocks,
            tables: Vec::new(),
            extraction_method,
            extraction_confidence,
        });
    }
    (units, any_scanned)
}

fn group_slides(blocks: Vec<UnifiedBlock>) -> Vec<StructuralUnit> {
    let mut units = Vec::new();
    let mut current: Option<(u32, String, Vec<TextBlock>, String)> = None;

    for b in blocks {
        let is_slide_heading = matches!(b.kind, BlockKind::Heading) && b.heading_level == Some(1);
        if is_slide_heading {
            if let Some((slide_number, title, text_blocks, speaker_notes)) = current.take() {
                units.push(StructuralUnit::Slide {
                    slide_number,
                    title,
                    text_blocks,
                    tables: Vec::new(),
                    speaker_notes,
                });
            }
            let slide_number = b.page_start.unwrap_or(units.len() as u32 + 1);
            let title = b.text.trim_start_matches("Slide:").trim().to_string();
            current = Some((slide_number, title, Vec::new(), String::new()));
        } else if b.is_speaker_notes() {
            if let Some((_, _, _, speaker_notes)) = current.as_mut() {
                *speaker_notes = b.text.clone();
            }
        } else if let Some((_, _, text_blocks, _)) = current.as_mut() {
            text_blocks.push(to_text_block(&b));
        }
    }
    if let Some((slide_number, title, text_blocks, speaker_notes)) = current.take() {
        units.push(StructuralUnit::Slide {
            slide_number,
            title,
            text_blocks,
            tables: Vec::new(),
            speaker_notes,
        });
    }
    units
}

fn group_sections(blocks: Vec<UnifiedBlock>) -> Vec<StructuralUnit> {
    let mut units = Vec::new();
    let mut index = 0u32;
    let mut current: Option<(String, u32, Vec<TextBlock>, Vec<String>)> = None;

    let flush = |units: &mut Vec<StructuralUnit>,
                 index: &mut u32,
                 current: Option<(String, u32, Vec<TextBlock>, Vec<String>)>| {
        if let Some((heading, heading_level, text_blocks, hyperlinks)) = current {
            *index += 1;
            units.push(StructuralUnit::Section {
                index: *index,
                heading,
                heading_level,
                text_blocks,
                tables: Vec::new(),
                hyperlinks,
            });
        }
    };

    for b in blocks {
        if matches!(b.kind, BlockKind::Heading) {
            flush(&mut units, &mut index, current.take());
            current = Some((b.text.clone(), b.heading_level.unwrap_or(1), Vec::new(), Vec::new()));
        } else {
            if current.is_none() {
                current = Some((String::new(), 0, Vec::new(), Vec::new()));
            }
            if let Some((_, _, text_blocks, hyperlinks)) = current.as_mut() {
                if let Some(links) = b.attrs.get("hyperlinks") {
                    hyperlinks.extend(links.split(',').map(|s| s.to_string()));
                }
                text_blocks.push(to_text_block(&b));
            }
        }
    }
    flush(&mut units, &mut index, current.take());
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extension() {
        let err = parse_file("/tmp/does-not-exist.xyz").unwrap_err();
        assert!(matches!(err, ParserError::UnsupportedType { .. }));
    }

    #[test]
    fn group_slides_attaches_speaker_notes_block_to_its_slide() {
        let mut heading = UnifiedBlock::new(BlockKind::Heading, "Slide: Introduction to ML\n", 0, "deck.pptx", "pptx");
        heading.heading_level = Some(1);
        heading.page_start = Some(1);

        let body = UnifiedBlock::new(BlockKind::Paragraph, "basics", 1, "deck.pptx", "pptx");

        let mut notes = UnifiedBlock::new(BlockKind::Paragraph, "Speaker notes for slide 1", 2, "deck.pptx", "pptx");
        notes.attrs.insert("is_speaker_notes".into(), "true".into());

        let units = group_slides(vec![heading, body, notes]);
        assert_eq!(units.len(), 1);
        match &units[0] {
            StructuralUnit::Slide { speaker_notes, text_blocks, .. } => {
                assert_eq!(speaker_notes, "Speaker notes for slide 1");
                assert_eq!(text_blocks.len(), 1);
            }
            _ => panic!("expected a slide unit"),
        }
    }
}
