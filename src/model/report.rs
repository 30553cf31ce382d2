//! Per-document and per-batch outcome reports.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Run;
use crate::detect::DocumentFormat;
use crate::error::Error;

/// A page that degraded to an unreadable signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIssue {
    /// 0-based page index
    pub page: usize,
    /// Why the page could not be decoded
    pub reason: String,
}

/// Result of collapsing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Source path (None when processed from memory)
    pub source: Option<PathBuf>,
    /// Destination path (None when nothing was written)
    pub destination: Option<PathBuf>,
    /// Container format
    pub format: DocumentFormat,
    /// Pages in the source document
    pub page_count: usize,
    /// Run partition of the source pages
    pub runs: Vec<Run>,
    /// Surviving page indices, strictly increasing
    pub kept: Vec<usize>,
    /// Pages that could not be decoded
    pub page_issues: Vec<PageIssue>,
}

impl DocumentReport {
    /// Number of pages dropped.
    pub fn removed_count(&self) -> usize {
        self.page_count - self.kept.len()
    }

    /// Check if the collapse kept every page.
    pub fn is_unchanged(&self) -> bool {
        self.kept.len() == self.page_count
    }

    /// Display name for logs and summaries.
    pub fn display_name(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}

/// Why a document failed outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The document could not be opened or parsed
    Unreadable,
    /// The output could not be written
    Write,
}

impl FailureKind {
    /// Classify an error that crossed the document boundary.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Write { .. } => FailureKind::Write,
            _ => FailureKind::Unreadable,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Unreadable => write!(f, "unreadable"),
            FailureKind::Write => write!(f, "write error"),
        }
    }
}

/// A document or file that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Source path
    pub source: PathBuf,
    /// Failure class
    pub kind: FailureKind,
    /// Error message
    pub message: String,
}

impl DocumentFailure {
    /// Build a failure record from an error.
    pub fn from_error(source: impl Into<PathBuf>, err: &Error) -> Self {
        Self {
            source: source.into(),
            kind: FailureKind::classify(err),
            message: err.to_string(),
        }
    }
}

/// Outcome of one document in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// The document was collapsed (and written unless dry-run)
    Processed(DocumentReport),
    /// The document failed and was skipped
    Failed(DocumentFailure),
}

impl DocumentOutcome {
    /// Source path of the document.
    pub fn source(&self) -> Option<&PathBuf> {
        match self {
            DocumentOutcome::Processed(r) => r.source.as_ref(),
            DocumentOutcome::Failed(f) => Some(&f.source),
        }
    }

    /// Check if the document succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, DocumentOutcome::Processed(_))
    }
}

/// Summary of a whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Source directory
    pub source_root: PathBuf,
    /// Destination directory
    pub destination_root: PathBuf,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the batch finished
    pub finished_at: DateTime<Utc>,
    /// Per-document outcomes, sorted by source path
    pub outcomes: Vec<DocumentOutcome>,
    /// Unsupported files copied verbatim
    pub copied: Vec<PathBuf>,
    /// Unsupported files that could not be copied
    pub copy_failures: Vec<DocumentFailure>,
}

impl BatchReport {
    /// Successfully processed documents.
    pub fn succeeded(&self) -> impl Iterator<Item = &DocumentReport> {
        self.outcomes.iter().filter_map(|o| match o {
            DocumentOutcome::Processed(r) => Some(r),
            DocumentOutcome::Failed(_) => None,
        })
    }

    /// Documents that failed outright.
    pub fn failed(&self) -> impl Iterator<Item = &DocumentFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            DocumentOutcome::Failed(f) => Some(f),
            DocumentOutcome::Processed(_) => None,
        })
    }

    /// Total pages removed across all documents.
    pub fn total_removed(&self) -> usize {
        self.succeeded().map(DocumentReport::removed_count).sum()
    }

    /// Check if any document or copy failed.
    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some() || !self.copy_failures.is_empty()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }
}
