//! Document format handlers providing a plugin architecture for decks.
//!
//! A [`DeckFormat`] opens documents of one format into a [`Deck`]: an
//! ordered set of pages that can be turned into signatures and rebuilt
//! with a subset of its pages. The [`FormatRegistry`] dispatches on file
//! extension.
//!
//! # Example
//!
//! ```no_run
//! use unbuild::format::FormatRegistry;
//! use unbuild::DedupOptions;
//! use std::path::Path;
//!
//! fn main() -> unbuild::Result<()> {
//!     let registry = FormatRegistry::with_defaults();
//!     let format = registry.for_path(Path::new("slides.pdf"))?;
//!     let deck = format.open(Path::new("slides.pdf"))?;
//!     let signatures = deck.extract_pages(&DedupOptions::default())?;
//!     println!("{} pages", signatures.len());
//!     Ok(())
//! }
//! ```

mod pdf;

pub use pdf::PdfDeckFormat;

use crate::detect::DocumentFormat;
use crate::error::{Error, Result};
use crate::model::ContentSignature;
use crate::options::DedupOptions;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A loaded document whose pages can be compared and selectively kept.
pub trait Deck: Send {
    /// Format of the loaded document.
    fn format(&self) -> DocumentFormat;

    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Decode every page, one result per page in order.
    ///
    /// A failed page does not stop the others; the outer error is reserved
    /// for invalid options.
    fn extract_pages(&self, options: &DedupOptions) -> Result<Vec<Result<ContentSignature>>>;

    /// Serialize a document holding only the pages at `kept`.
    fn rebuild(&mut self, kept: &[usize], options: &DedupOptions) -> Result<Vec<u8>>;
}

/// Trait for document format handlers.
///
/// Implement this trait to add support for a new document format.
pub trait DeckFormat: Send + Sync {
    /// Get the supported file extensions for this format.
    ///
    /// Extensions should be lowercase without the leading dot (e.g., `["pdf"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this format handler.
    fn name(&self) -> &str;

    /// Open a file at the given path.
    fn open(&self, path: &Path) -> Result<Box<dyn Deck>>;

    /// Open from bytes.
    fn open_bytes(&self, bytes: Vec<u8>) -> Result<Box<dyn Deck>>;

    /// Check if this handler supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry for deck format handlers.
pub struct FormatRegistry {
    formats: HashMap<String, Arc<dyn DeckFormat>>,
    by_name: HashMap<String, Arc<dyn DeckFormat>>,
}

impl FormatRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            formats: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with default handlers (PDF).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfDeckFormat::new()));
        registry
    }

    /// Register a handler for all its supported extensions.
    pub fn register(&mut self, format: Arc<dyn DeckFormat>) {
        for ext in format.supported_extensions() {
            self.formats.insert(ext.to_lowercase(), format.clone());
        }
        self.by_name.insert(format.name().to_lowercase(), format);
    }

    /// Get a handler by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DeckFormat>> {
        self.formats.get(&ext.to_lowercase()).cloned()
    }

    /// Get a handler by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DeckFormat>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.formats.contains_key(&ext.to_lowercase())
    }

    /// Check if a path has a supported extension.
    pub fn supports_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.supports(e))
    }

    /// Get all supported extensions.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.formats.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Get the handler for a path based on its extension.
    pub fn for_path(&self, path: &Path) -> Result<Arc<dyn DeckFormat>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(format!("{} has no extension", path.display())))?;

        self.get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(ext.to_string()))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
