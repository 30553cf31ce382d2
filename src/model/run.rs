//! Runs of pages that belong to one logical slide.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// A maximal contiguous page range holding one logical slide's builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// First page index (0-based, inclusive)
    pub start: usize,
    /// Last page index (inclusive)
    pub end: usize,
    /// Page that survives the collapse
    pub representative: usize,
}

impl Run {
    /// Create a run; the representative must lie inside `start..=end`.
    pub fn new(start: usize, end: usize, representative: usize) -> Self {
        debug_assert!(start <= end);
        debug_assert!((start..=end).contains(&representative));
        Self {
            start,
            end,
            representative,
        }
    }

    /// A one-page run.
    pub fn singleton(index: usize) -> Self {
        Self::new(index, index, index)
    }

    /// Number of pages in the run.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Runs are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if the run is a single page.
    pub fn is_singleton(&self) -> bool {
        self.start == self.end
    }

    /// Page indices covered by the run.
    pub fn pages(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Page indices dropped by the collapse.
    pub fn removed(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages().filter(move |&i| i != self.representative)
    }
}

/// Check that `runs` partition `0..page_count` in order, without gaps or overlaps.
pub fn is_partition(runs: &[Run], page_count: usize) -> bool {
    let mut next = 0;
    for run in runs {
        if run.start != next || run.end < run.start || !run.pages().contains(&run.representative)
        {
            return false;
        }
        next = run.end + 1;
    }
    next == page_count
}
