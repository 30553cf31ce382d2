//! Collapse options and configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default position tolerance in points (one pixel at 150 DPI).
pub const DEFAULT_TOLERANCE: f32 = 0.5;

/// Default height fraction compared by [`CompareStrategy::HeaderBand`].
pub const DEFAULT_HEADER_FRACTION: f32 = 0.10;

/// Options for collapsing incremental-build pages in one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupOptions {
    /// Error handling mode for individual pages
    pub error_mode: ErrorMode,

    /// How two page signatures are compared
    pub strategy: CompareStrategy,

    /// Position tolerance in points
    pub tolerance: f32,

    /// Which way a build adds content
    pub direction: BuildDirection,

    /// Which of several identical complete pages survives
    pub keep: DuplicateKeep,

    /// Whether to decode pages in parallel
    pub parallel: bool,

    /// Whether to Flate-compress uncompressed streams on output
    pub compress: bool,

    /// Text runs matching this pattern are left out of signatures
    pub ignore_text: Option<String>,
}

impl DedupOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail the whole document when a page cannot be decoded.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Set comparison strategy.
    pub fn with_strategy(mut self, strategy: CompareStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Compare only the top band of each page.
    pub fn header_band(mut self, fraction: f32) -> Self {
        self.strategy = CompareStrategy::HeaderBand { fraction };
        self
    }

    /// Set position tolerance in points.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set build direction.
    pub fn with_direction(mut self, direction: BuildDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set duplicate keep policy.
    pub fn with_keep(mut self, keep: DuplicateKeep) -> Self {
        self.keep = keep;
        self
    }

    /// Enable or disable parallel page decoding.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel page decoding.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enable or disable stream compression on output.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Ignore text runs matching `pattern` (e.g. slide counters).
    pub fn with_ignore_text(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_text = Some(pattern.into());
        self
    }

    /// Check option values.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidOption(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if let CompareStrategy::HeaderBand { fraction } = self.strategy {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(Error::InvalidOption(format!(
                    "header fraction must be in (0, 1], got {}",
                    fraction
                )));
            }
        }
        self.ignore_regex()?;
        Ok(())
    }

    /// Compile the ignore pattern, if any.
    pub fn ignore_regex(&self) -> Result<Option<Regex>> {
        self.ignore_text
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| Error::InvalidOption(format!("ignore pattern: {}", e)))
            })
            .transpose()
    }
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            strategy: CompareStrategy::Containment,
            tolerance: DEFAULT_TOLERANCE,
            direction: BuildDirection::Forward,
            keep: DuplicateKeep::Earliest,
            parallel: true,
            compress: false,
            ignore_text: None,
        }
    }
}

/// Error handling mode for pages that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Fail the document
    Strict,
    /// Keep the page as its own run and continue
    #[default]
    Lenient,
}

/// How page signatures are compared.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompareStrategy {
    /// Every primitive of the earlier build appears in the later one
    #[default]
    Containment,
    /// The top `fraction` of both pages holds the same primitives
    HeaderBand {
        /// Height fraction measured from the top edge
        fraction: f32,
    },
}

/// Direction in which builds add content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildDirection {
    /// Each page adds to the previous one; the last page is complete
    #[default]
    Forward,
    /// Each page removes from the previous one; the first page is complete
    Reverse,
    /// Either way; the page with the most content is complete
    Either,
}

/// Which page survives when several complete pages are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeep {
    /// Keep the first identical copy
    #[default]
    Earliest,
    /// Keep the last identical copy
    Latest,
}
