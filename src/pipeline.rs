//! Per-document processing: open, extract, collapse, rebuild, write.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::collapse::{Collapse, Collapser};
use crate::detect::{is_pdf_bytes, DocumentFormat};
use crate::error::{Error, Result};
use crate::format::{Deck, FormatRegistry};
use crate::model::{ContentSignature, DocumentReport, Page, PageIssue};
use crate::options::{DedupOptions, ErrorMode};

/// Signatures and run partition of one document, before anything is written.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Container format
    pub format: DocumentFormat,
    /// Pages with their signatures, in order
    pub pages: Vec<Page>,
    /// Pages that degraded to unreadable signatures
    pub page_issues: Vec<PageIssue>,
    /// Runs and surviving pages
    pub collapse: Collapse,
}

impl Analysis {
    /// Number of pages in the source document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Turn into a report.
    pub fn into_report(self, source: Option<PathBuf>, destination: Option<PathBuf>) -> DocumentReport {
        DocumentReport {
            source,
            destination,
            format: self.format,
            page_count: self.pages.len(),
            runs: self.collapse.runs,
            kept: self.collapse.kept,
            page_issues: self.page_issues,
        }
    }
}

/// Processes single documents with fixed options.
///
/// A pipeline is `Sync` and is shared between batch workers.
pub struct Pipeline {
    registry: Arc<FormatRegistry>,
    options: DedupOptions,
    collapser: Collapser,
}

impl Pipeline {
    /// Create a pipeline with the default format registry.
    pub fn new(options: DedupOptions) -> Result<Self> {
        Self::with_registry(Arc::new(FormatRegistry::with_defaults()), options)
    }

    /// Create a pipeline with a custom format registry.
    pub fn with_registry(registry: Arc<FormatRegistry>, options: DedupOptions) -> Result<Self> {
        options.validate()?;
        let collapser = Collapser::new(&options);
        Ok(Self {
            registry,
            options,
            collapser,
        })
    }

    /// Options in use.
    pub fn options(&self) -> &DedupOptions {
        &self.options
    }

    /// Format registry in use.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Check if `path` would be processed rather than copied.
    pub fn supports(&self, path: &Path) -> bool {
        self.registry.supports_path(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Deck>> {
        let format = self
            .registry
            .for_path(path)
            .map_err(|e| Error::unreadable(path, e))?;
        format.open(path).map_err(|e| Error::unreadable(path, e))
    }

    /// Extract and collapse a loaded deck.
    ///
    /// Under [`ErrorMode::Lenient`] an undecodable page becomes an unreadable
    /// signature and is recorded as an issue; under [`ErrorMode::Strict`] it
    /// fails with the page error.
    pub fn analyze_deck(&self, deck: &dyn Deck) -> Result<Analysis> {
        let results = deck.extract_pages(&self.options)?;

        let mut signatures = Vec::with_capacity(results.len());
        let mut page_issues = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(signature) => signatures.push(signature),
                Err(e) if self.options.error_mode == ErrorMode::Strict => return Err(e),
                Err(e) => {
                    log::warn!("Page {} kept as-is: {}", index + 1, e);
                    page_issues.push(PageIssue {
                        page: index,
                        reason: e.to_string(),
                    });
                    signatures.push(ContentSignature::unreadable());
                }
            }
        }

        let collapse = self.collapser.collapse(&signatures);
        for run in collapse.runs.iter().filter(|r| !r.is_singleton()) {
            log::debug!(
                "Run {}..={} keeps page {}",
                run.start,
                run.end,
                run.representative
            );
        }

        let pages = signatures
            .into_iter()
            .enumerate()
            .map(|(i, s)| Page::new(i, s))
            .collect();

        Ok(Analysis {
            format: deck.format(),
            pages,
            page_issues,
            collapse,
        })
    }

    /// Analyze a file without writing anything.
    pub fn analyze_path(&self, path: &Path) -> Result<Analysis> {
        let deck = self.open(path)?;
        self.analyze_deck(deck.as_ref())
            .map_err(|e| Error::unreadable(path, e))
    }

    /// Collapse `src` and write the result to `dst`.
    ///
    /// Parent directories of `dst` are created.
    pub fn process_path(&self, src: &Path, dst: &Path) -> Result<DocumentReport> {
        let mut deck = self.open(src)?;
        let analysis = self
            .analyze_deck(deck.as_ref())
            .map_err(|e| Error::unreadable(src, e))?;

        let bytes = deck
            .rebuild(&analysis.collapse.kept, &self.options)
            .map_err(|e| Error::write(dst, e))?;

        if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::write(dst, e))?;
        }
        fs::write(dst, &bytes).map_err(|e| Error::write(dst, e))?;

        log::info!(
            "{}: {} -> {} pages",
            src.display(),
            analysis.page_count(),
            analysis.collapse.kept.len()
        );
        Ok(analysis.into_report(Some(src.to_path_buf()), Some(dst.to_path_buf())))
    }

    /// Collapse an in-memory document.
    ///
    /// The format is detected from the content.
    pub fn process_bytes(&self, bytes: Vec<u8>) -> Result<(Vec<u8>, DocumentReport)> {
        if !is_pdf_bytes(&bytes) {
            return Err(Error::UnknownFormat);
        }
        let format = self
            .registry
            .get_by_extension(DocumentFormat::Pdf.extension())
            .ok_or_else(|| Error::UnsupportedFormat(DocumentFormat::Pdf.to_string()))?;

        let mut deck = format.open_bytes(bytes)?;
        let analysis = self.analyze_deck(deck.as_ref())?;
        let out = deck.rebuild(&analysis.collapse.kept, &self.options)?;
        Ok((out, analysis.into_report(None, None)))
    }
}
