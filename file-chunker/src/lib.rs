//! S1 (Parser) + S2 (Chunker): reads a supported office document from disk and
//! produces the bounded-size, metadata-tagged chunks the rest of the pipeline
//! (enrichment, dedup, indexing) operates on.

pub mod chunker;
pub mod parser;
pub mod reader_docx;
pub mod reader_pdf;
#[cfg(feature = "pdfium")]
pub mod reader_pdf_pdfium;
#[cfg(feature = "pure-pdf")]
pub mod reader_pdf_pure;
pub mod reader_pptx;
pub mod token_splitter;
pub mod unified_blocks;

pub use chunker::{chunk_document, ChunkerConfig};
pub use parser::{parse_file, parse_file_with_recognition, ParserError, RecognitionService};

use chunk_model::Chunk;

/// Runs S1 then S2 against a single file on disk: parse it into a
/// `ParsedDocument`, then split it into chunks per the default chunker
/// configuration.
pub fn parse_and_chunk_file(path: &str) -> Result<Vec<Chunk>, ParserError> {
    let doc = parse_file(path)?;
    Ok(chunk_document(&doc, &ChunkerConfig::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_extension() {
        let err = parse_and_chunk_file("/tmp/not-a-real-file.xyz").unwrap_err();
        assert!(matches!(err, ParserError::UnsupportedType { .. }));
    }
}
