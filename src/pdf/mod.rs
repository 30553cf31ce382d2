//! PDF page extraction and rebuilding.

mod backend;
mod extract;
mod rebuild;

pub use backend::{
    decode_text_simple, ContentOp, GlyphRun, LopdfBackend, PageBox, PageId, PdfBackend, PdfValue,
    ResourceScope, XObject,
};
pub use extract::{extract_all, normalize_text, PageExtractor};
pub use rebuild::rebuild_document;

use crate::detect::{detect_pdf_header, DocumentFormat};
use crate::error::Result;
use crate::format::Deck;
use crate::model::ContentSignature;
use crate::options::DedupOptions;

/// A loaded PDF document.
///
/// Keeps the source bytes so an unchanged document can be written back
/// byte for byte.
pub struct PdfDeck {
    backend: LopdfBackend,
    source: Vec<u8>,
    pages: Vec<PageId>,
}

impl PdfDeck {
    /// Load a PDF from memory.
    ///
    /// Fails on a missing `%PDF-` header, a broken container, or encryption.
    pub fn from_bytes(source: Vec<u8>) -> Result<Self> {
        let header = detect_pdf_header(&source)?;
        let backend = LopdfBackend::load_bytes(&source)?;
        let pages = backend.pages();
        log::debug!(
            "Loaded PDF {} with {} pages (header at offset {})",
            header.version,
            pages.len(),
            header.offset
        );
        Ok(Self {
            backend,
            source,
            pages,
        })
    }
}

impl Deck for PdfDeck {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_pages(&self, options: &DedupOptions) -> Result<Vec<Result<ContentSignature>>> {
        let ignore = options.ignore_regex()?;
        Ok(extract_all(
            &self.backend,
            &self.pages,
            ignore.as_ref(),
            options.parallel,
        ))
    }

    fn rebuild(&mut self, kept: &[usize], options: &DedupOptions) -> Result<Vec<u8>> {
        rebuild_document(
            self.backend.raw_doc_mut(),
            &self.source,
            self.pages.len(),
            kept,
            options.compress,
        )
    }
}
