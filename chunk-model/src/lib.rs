//! Shared data model for the ingestion/retrieval pipeline: document types,
//! parsed-document structural units, and the chunk record that flows through
//! enrichment, deduplication and indexing.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Unique identifier for a chunk. Assigned fresh (UUID v4) at chunking time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub String);

impl ChunkId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable 16-hex-digit identifier for a source document: `SHA256(path:modified_at)[:16]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Deterministic from `(file_path, modified_at)`; re-ingesting the same file at the
    /// same modification time always yields the same id (invariant §3/§8.5).
    pub fn derive(file_path: &str, modified_at: DateTime<Utc>) -> Self {
        use sha2::{Digest, Sha256};
        let input = format!("{file_path}:{}", modified_at.to_rfc3339());
        let digest = Sha256::digest(input.as_bytes());
        Self(hex::encode(digest)[..16].to_string())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document variant, selected from the file extension. `Unknown` is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Page,
    Slide,
    Section,
    Unknown,
}

impl DocumentType {
    pub fn from_extension(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => DocumentType::Page,
            "pptx" | "ppt" => DocumentType::Slide,
            "docx" | "doc" => DocumentType::Section,
            _ => DocumentType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Page => "pdf",
            DocumentType::Slide => "pptx",
            DocumentType::Section => "docx",
            DocumentType::Unknown => "unknown",
        }
    }
}

/// How a structural unit (or part of it) had its text extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    Native,
    RecognitionService,
}

impl Default for ExtractionMethod {
    fn default() -> Self {
        ExtractionMethod::Native
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    Paragraph,
    ListItem,
    TableCell,
}

/// A single run of text within a structural unit, with light layout metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub level: u32,
    pub font_size: Option<f32>,
    pub is_bold: bool,
    pub is_heading: bool,
    pub block_type: BlockType,
}

impl TextBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: 0,
            font_size: None,
            is_bold: false,
            is_heading: false,
            block_type: BlockType::Paragraph,
        }
    }
}

/// A rectangular table of strings, rows then cells.
pub type Table = Vec<Vec<String>>;

/// One structural unit of a parsed document: a page, a slide, or a section.
/// Represented as a tagged variant (Design Note: "dynamic typing -> tagged variants"),
/// not an inheritance hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructuralUnit {
    Page {
        page_number: u32,
        text_blocks: Vec<TextBlock>,
        tables: Vec<Table>,
        extraction_method: ExtractionMethod,
        extraction_confidence: f32,
    },
    Slide {
        slide_number: u32,
        title: String,
        text_blocks: Vec<TextBlock>,
        tables: Vec<Table>,
        speaker_notes: String,
    },
    Section {
        index: u32,
        heading: String,
        heading_level: u32,
        text_blocks: Vec<TextBlock>,
        tables: Vec<Table>,
        hyperlinks: Vec<String>,
    },
}

impl StructuralUnit {
    pub fn full_text(&self) -> String {
        match self {
            StructuralUnit::Page { text_blocks, .. } => join_blocks(text_blocks),
            StructuralUnit::Slide {
                title,
                text_blocks,
                speaker_notes,
                ..
            } => {
                let mut out = String::new();
                if !title.is_empty() {
                    out.push_str(title);
                    out.push('\n');
                }
                out.push_str(&join_blocks(text_blocks));
                if !speaker_notes.is_empty() {
                    out.push_str("\n[Speaker Notes: ");
                    out.push_str(speaker_notes);
                    out.push(']');
                }
                out
            }
            StructuralUnit::Section {
                heading,
                text_blocks,
                ..
            } => {
                let mut out = String::new();
                if !heading.is_empty() {
                    out.push_str(heading);
                    out.push('\n');
                }
                out.push_str(&join_blocks(text_blocks));
                out
            }
        }
    }
}

fn join_blocks(blocks: &[TextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Metadata derived from the file's path and filesystem attributes, attached once
/// before content parsing (§4.1 "Path metadata extraction").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_path: String,
    pub object_uri: String,
    pub filename: String,
    pub file_type: DocumentType,
    pub file_size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub total_units: u32,
    pub is_scanned: bool,
    pub extraction_method: ExtractionMethod,
    pub module_name: String,
    pub folder_path: String,
    pub week_number: Option<u32>,
}

/// Result of `extract_metadata_from_path`: week number and module name inferred from
/// folder structure, independent of file content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMetadata {
    pub module_name: String,
    pub folder_path: String,
    pub week_number: Option<u32>,
}

const SKIP_FOLDERS: [&str; 4] = ["data", "documents", "files", "content"];

/// Locate the first path component matching `week\s*(\d+)` case-insensitively; absent
/// otherwise that component becomes `module_name`. Otherwise, the first non-root
/// component (excluding the filename) not in the skip-set becomes `module_name`.
pub fn extract_path_metadata(file_path: &str) -> PathMetadata {
    use std::sync::OnceLock;
    static WEEK_RE: OnceLock<regex::Regex> = OnceLock::new();
    let week_re = WEEK_RE.get_or_init(|| regex::Regex::new(r"(?i)week\s*(\d+)").unwrap());

    let path = Path::new(file_path);
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    let folder_path = path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut out = PathMetadata {
        module_name: String::new(),
        folder_path,
        week_number: None,
    };

    for part in &parts {
        if let Some(caps) = week_re.captures(part) {
            if let Ok(n) = caps[1].parse::<u32>() {
                out.week_number = Some(n);
                out.module_name = part.clone();
                return out;
            }
        }
    }

    if parts.len() > 1 {
        for part in &parts[..parts.len() - 1] {
            if !SKIP_FOLDERS.contains(&part.to_ascii_lowercase().as_str()) {
                out.module_name = part.clone();
                break;
            }
        }
    }

    out
}

/// Output of S1: a format-neutral parsed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub metadata: DocumentMetadata,
    pub content: Vec<StructuralUnit>,
    pub processing_errors: Vec<String>,
}

impl ParsedDocument {
    pub fn document_id(&self) -> DocumentId {
        DocumentId::derive(&self.metadata.source_path, self.metadata.modified_at)
    }

    pub fn is_successful(&self) -> bool {
        !self.content.is_empty() || self.processing_errors.is_empty()
    }

    pub fn total_text(&self) -> String {
        self.content
            .iter()
            .map(|u| u.full_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionInSection {
    Only,
    Beginning,
    Middle,
    End,
}

impl PositionInSection {
    pub fn determine(index: usize, total: usize) -> Self {
        if total <= 1 {
            PositionInSection::Only
        } else if index == 0 {
            PositionInSection::Beginning
        } else if index == total - 1 {
            PositionInSection::End
        } else {
            PositionInSection::Middle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Title,
    Body,
    Table,
    List,
    Note,
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentIntent {
    Overview,
    Tutorial,
    Reference,
    Unknown,
}

impl DocumentIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentIntent::Overview => "overview",
            DocumentIntent::Tutorial => "tutorial",
            DocumentIntent::Reference => "reference",
            DocumentIntent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub entity_type: String,
}

/// The per-chunk metadata bundle: provenance, position, semantic enrichment,
/// dedup bookkeeping, and technical fields. See spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,

    pub filename: String,
    pub file_type: DocumentType,
    pub object_uri: String,
    pub module_name: String,
    pub folder_path: String,
    pub week_number: Option<u32>,

    pub page_number: Option<u32>,
    pub slide_number: Option<u32>,
    pub section_title: Option<String>,
    pub heading_hierarchy: Vec<String>,
    pub chunk_index: u32,
    pub position_in_section: PositionInSection,
    pub content_type: ContentType,

    pub keywords: Vec<String>,
    pub entities: Vec<Entity>,
    pub topic_tags: Vec<String>,
    pub document_intent: DocumentIntent,

    pub content_hash: Option<String>,
    pub semantic_fingerprint: Option<String>,
    pub canonical_chunk_id: Option<ChunkId>,

    pub char_count: usize,
    pub token_count: usize,
    pub extraction_method: ExtractionMethod,
    pub extraction_confidence: f32,
    pub ingested_at: DateTime<Utc>,

    /// Free-form facets not promoted to a first-class field; kept for forward
    /// compatibility with store schemas that carry extra keyword facets.
    pub extra: BTreeMap<String, String>,
}

/// An indexable text unit: the output of S2, mutated through S3-S5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn is_duplicate(&self) -> bool {
        self.metadata.canonical_chunk_id.is_some()
    }
}

/// Aggregate metadata over every chunk belonging to one document (supplemented from
/// `MetadataExtractor.get_document_summary_metadata`): top keywords, entities by type,
/// dominant topics, and the most frequent intent. Computed on demand, not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSummaryMetadata {
    pub top_keywords: Vec<String>,
    pub entities_by_type: BTreeMap<String, Vec<String>>,
    pub top_topics: Vec<String>,
    pub primary_intent: Option<DocumentIntent>,
}

pub fn summarize_document(chunks: &[Chunk]) -> DocumentSummaryMetadata {
    use std::collections::HashMap;

    let mut keyword_counts: HashMap<&str, u32> = HashMap::new();
    let mut topic_counts: HashMap<&str, u32> = HashMap::new();
    let mut intent_counts: HashMap<&'static str, u32> = HashMap::new();
    let mut entities_by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for chunk in chunks {
        for kw in &chunk.metadata.keywords {
            *keyword_counts.entry(kw.as_str()).or_insert(0) += 1;
        }
        for topic in &chunk.metadata.topic_tags {
            *topic_counts.entry(topic.as_str()).or_insert(0) += 1;
        }
        *intent_counts
            .entry(chunk.metadata.document_intent.as_str())
            .or_insert(0) += 1;
        for ent in &chunk.metadata.entities {
            let bucket = entities_by_type.entry(ent.entity_type.clone()).or_default();
            if !bucket.contains(&ent.text) {
                bucket.push(ent.text.clone());
            }
        }
    }

    let mut keywords: Vec<(&str, u32)> = keyword_counts.into_iter().collect();
    keywords.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let top_keywords = keywords.into_iter().take(10).map(|(k, _)| k.to_string()).collect();

    let mut topics: Vec<(&str, u32)> = topic_counts.into_iter().collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let top_topics = topics.into_iter().take(5).map(|(k, _)| k.to_string()).collect();

    let primary_intent = intent_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(intent, _)| match intent {
            "overview" => DocumentIntent::Overview,
            "tutorial" => DocumentIntent::Tutorial,
            "reference" => DocumentIntent::Reference,
            _ => DocumentIntent::Unknown,
        });

    DocumentSummaryMetadata {
        top_keywords,
        entities_by_type,
        top_topics,
        primary_intent,
    }
}

/// Normalizes text for exact-dedup hashing (§4.4 Stage A): lowercase, collapse
/// whitespace runs to a single space, strip non-alphanumeric-non-space characters,
/// trim. Shared by the chunker (which stamps `content_hash` at creation time) and
/// the deduplicator (which recomputes it to verify/dedup against the store).
pub fn normalize_for_hash(text: &str) -> String {
    use std::sync::OnceLock;
    static WS_RE: OnceLock<regex::Regex> = OnceLock::new();
    static STRIP_RE: OnceLock<regex::Regex> = OnceLock::new();
    let ws_re = WS_RE.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    // Non-alphanumeric, non-whitespace characters (punctuation, hyphens) become a
    // word boundary rather than being deleted in place, so "machine-learning" and
    // "machine learning" normalize identically.
    let strip_re = STRIP_RE.get_or_init(|| regex::Regex::new(r"[^\w\s]").unwrap());

    let lower = text.to_lowercase();
    let despunctuated = strip_re.replace_all(&lower, " ");
    let collapsed = ws_re.replace_all(&despunctuated, " ");
    collapsed.trim().to_string()
}

pub fn compute_content_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let normalized = normalize_for_hash(text);
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_number_extracted_case_insensitively() {
        let meta = extract_path_metadata("/x/Week 2/content/neural.pdf");
        assert_eq!(meta.week_number, Some(2));
        assert_eq!(meta.module_name, "Week 2");
    }

    #[test]
    fn module_name_falls_back_to_first_non_skip_folder() {
        let meta = extract_path_metadata("/x/APAC Schedule/doc.docx");
        assert_eq!(meta.week_number, None);
        assert_eq!(meta.module_name, "APAC Schedule");
    }

    #[test]
    fn document_id_is_pure_function_of_path_and_modified_at() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let a = DocumentId::derive("/a/b.pdf", ts);
        let b = DocumentId::derive("/a/b.pdf", ts);
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 16);
    }

    #[test]
    fn normalized_hash_collapses_equivalent_text() {
        let a = compute_content_hash("Machine learning is a subset of AI.");
        let b = compute_content_hash("  machine-learning   is a SUBSET of AI!!! ");
        assert_eq!(a, b);
    }

    #[test]
    fn position_in_section_policy() {
        assert_eq!(PositionInSection::determine(0, 1), PositionInSection::Only);
        assert_eq!(PositionInSection::determine(0, 3), PositionInSection::Beginning);
        assert_eq!(PositionInSection::determine(2, 3), PositionInSection::End);
        assert_eq!(PositionInSection::determine(1, 3), PositionInSection::Middle);
    }
}
