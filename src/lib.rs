//! # unbuild
//!
//! Removes incremental-build pages from slide deck PDFs.
//!
//! Presentation tools export every animation step of a slide as its own
//! page: a bullet list revealed one item at a time becomes several pages
//! where each one holds everything the previous one did, plus a little
//! more. This library detects those runs of builds and keeps only the
//! complete page of each run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unbuild::dedup_file;
//!
//! fn main() -> unbuild::Result<()> {
//!     let report = dedup_file("lecture.pdf", "lecture-handout.pdf")?;
//!     println!(
//!         "{} pages -> {} pages",
//!         report.page_count,
//!         report.kept.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Content-level comparison**: pages are compared by what they draw
//!   (text, paths, images, shadings) and where, not by pixels
//! - **Lossless output**: kept pages are carried over structurally
//! - **Failure isolation**: a bad page stays in the output; a bad document
//!   fails alone in a batch
//! - **Parallel processing**: uses Rayon for pages and documents

pub mod batch;
pub mod collapse;
pub mod detect;
pub mod error;
pub mod format;
pub mod model;
pub mod options;
pub mod pdf;
pub mod pipeline;

// Re-export commonly used types
pub use batch::{BatchOptions, BatchPlan, BatchRunner};
pub use collapse::{Collapse, Collapser, SignatureComparator};
pub use detect::{detect_pdf_header, is_pdf_bytes, DocumentFormat, PdfHeader};
pub use error::{Error, Result};
pub use format::{Deck, DeckFormat, FormatRegistry, PdfDeckFormat};
pub use model::{
    BatchReport, ContentSignature, DocumentFailure, DocumentOutcome, DocumentReport, FailureKind,
    Page, PageIssue, Primitive, PrimitiveKind, Run,
};
pub use options::{BuildDirection, CompareStrategy, DedupOptions, DuplicateKeep, ErrorMode};
pub use pipeline::{Analysis, Pipeline};

use std::path::Path;
use std::sync::Arc;

/// Collapse one PDF file with default options.
///
/// # Example
///
/// ```no_run
/// use unbuild::dedup_file;
///
/// let report = dedup_file("talk.pdf", "out/talk.pdf").unwrap();
/// println!("removed {} pages", report.removed_count());
/// ```
pub fn dedup_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<DocumentReport> {
    Unbuild::new().process_file(src, dst)
}

/// Collapse an in-memory PDF with default options.
///
/// Returns the new document bytes and the report.
pub fn dedup_bytes(data: &[u8]) -> Result<(Vec<u8>, DocumentReport)> {
    Unbuild::new().process_bytes(data)
}

/// Collapse every PDF under `src` into the mirrored tree under `dst`.
///
/// Other files are copied verbatim. Per-document failures are recorded in
/// the report rather than returned.
pub fn dedup_dir<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<BatchReport> {
    Unbuild::new().process_dir(src, dst)
}

/// Compute runs and kept pages of a PDF without writing anything.
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<DocumentReport> {
    let path = path.as_ref();
    let analysis = Unbuild::new().analyze(path)?;
    Ok(analysis.into_report(Some(path.to_path_buf()), None))
}

/// Builder for collapsing documents with custom options.
///
/// # Example
///
/// ```no_run
/// use unbuild::{BuildDirection, Unbuild};
///
/// let report = Unbuild::new()
///     .with_tolerance(1.0)
///     .with_direction(BuildDirection::Either)
///     .with_ignore_text(r"^\d+\s*/\s*\d+$")
///     .with_jobs(4)
///     .process_dir("slides", "handouts")?;
/// println!("{} pages removed", report.total_removed());
/// # Ok::<(), unbuild::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unbuild {
    options: DedupOptions,
    batch: BatchOptions,
}

impl Unbuild {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing options.
    pub fn with_options(mut self, options: DedupOptions) -> Self {
        self.options = options;
        self
    }

    /// Start from existing batch options.
    pub fn with_batch_options(mut self, batch: BatchOptions) -> Self {
        self.batch = batch;
        self
    }

    /// Fail a document when any of its pages cannot be decoded.
    pub fn strict(mut self) -> Self {
        self.options = self.options.strict();
        self
    }

    /// Disable parallel page decoding.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Set position tolerance in points.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.options = self.options.with_tolerance(tolerance);
        self
    }

    /// Set build direction.
    pub fn with_direction(mut self, direction: BuildDirection) -> Self {
        self.options = self.options.with_direction(direction);
        self
    }

    /// Set duplicate keep policy.
    pub fn with_keep(mut self, keep: DuplicateKeep) -> Self {
        self.options = self.options.with_keep(keep);
        self
    }

    /// Compare only the top band of each page.
    pub fn header_band(mut self, fraction: f32) -> Self {
        self.options = self.options.header_band(fraction);
        self
    }

    /// Ignore text runs matching `pattern`.
    pub fn with_ignore_text(mut self, pattern: impl Into<String>) -> Self {
        self.options = self.options.with_ignore_text(pattern);
        self
    }

    /// Compress streams in written documents.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.options = self.options.with_compress(compress);
        self
    }

    /// Number of documents processed concurrently in a batch.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.batch = self.batch.with_jobs(jobs);
        self
    }

    /// Copy unsupported files in a batch.
    pub fn copy_unsupported(mut self, copy: bool) -> Self {
        self.batch = self.batch.with_copy_unsupported(copy);
        self
    }

    /// Analyze batches without writing.
    pub fn dry_run(mut self) -> Self {
        self.batch = self.batch.dry_run();
        self
    }

    /// Document options in effect.
    pub fn options(&self) -> &DedupOptions {
        &self.options
    }

    /// Build the document pipeline.
    pub fn pipeline(&self) -> Result<Pipeline> {
        Pipeline::new(self.options.clone())
    }

    /// Build a batch runner.
    pub fn runner(&self) -> Result<BatchRunner> {
        BatchRunner::new(Arc::new(self.pipeline()?), self.batch.clone())
    }

    /// Collapse one file.
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(self, src: P, dst: Q) -> Result<DocumentReport> {
        self.pipeline()?.process_path(src.as_ref(), dst.as_ref())
    }

    /// Collapse an in-memory document.
    pub fn process_bytes(self, data: &[u8]) -> Result<(Vec<u8>, DocumentReport)> {
        self.pipeline()?.process_bytes(data.to_vec())
    }

    /// Collapse a directory tree.
    pub fn process_dir<P: AsRef<Path>, Q: AsRef<Path>>(self, src: P, dst: Q) -> Result<BatchReport> {
        self.runner()?.run(src.as_ref(), dst.as_ref())
    }

    /// Analyze one file without writing.
    pub fn analyze<P: AsRef<Path>>(self, path: P) -> Result<Analysis> {
        self.pipeline()?.analyze_path(path.as_ref())
    }
}
