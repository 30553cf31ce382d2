//! PDF deck format handler.

use crate::error::Result;
use crate::pdf::PdfDeck;
use std::path::Path;

use super::{Deck, DeckFormat};

/// PDF deck format.
///
/// Opens PDF files with lopdf; encrypted documents are refused.
#[derive(Debug, Clone, Default)]
pub struct PdfDeckFormat {
    _private: (),
}

impl PdfDeckFormat {
    /// Create a new PDF handler.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DeckFormat for PdfDeckFormat {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Deck>> {
        let bytes = std::fs::read(path)?;
        self.open_bytes(bytes)
    }

    fn open_bytes(&self, bytes: Vec<u8>) -> Result<Box<dyn Deck>> {
        Ok(Box::new(PdfDeck::from_bytes(bytes)?))
    }
}
