//! Error types for unbuild library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unbuild operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while collapsing slide decks.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// No deck handler is registered for this file extension.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The document cannot be opened or parsed at all.
    #[error("Cannot read {}: {reason}", path.display())]
    DocumentUnreadable {
        /// Source document path
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// A single page could not be decoded.
    #[error("Page {page} could not be decoded: {reason}")]
    PageRender {
        /// 0-based page index
        page: usize,
        /// Underlying cause
        reason: String,
    },

    /// The output document cannot be materialized.
    #[error("Cannot write {}: {reason}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// The batch source directory does not exist.
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// An option value is invalid.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap any error as a document-level read failure for `path`.
    pub fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::DocumentUnreadable {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Wrap any error as a write failure for `path`.
    pub fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::Write {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Whether this error only degrades a single page.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PageRender { .. })
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
