//! Page-level types.

use super::ContentSignature;
use serde::{Deserialize, Serialize};

/// A single page of a document with its content signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Original position (0-indexed)
    pub index: usize,

    /// Comparable representation of the page's visible content
    pub signature: ContentSignature,
}

impl Page {
    /// Create a page.
    pub fn new(index: usize, signature: ContentSignature) -> Self {
        Self { index, signature }
    }

    /// Page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.signature.width, self.signature.height)
    }

    /// Check if the page failed to decode.
    pub fn is_unreadable(&self) -> bool {
        self.signature.is_unreadable()
    }
}

