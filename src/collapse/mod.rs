//! Duplicate-run collapsing.
//!
//! Pages are scanned left to right. A page extends the current run when the
//! comparator relates it to the previous page in the configured build
//! direction; otherwise the run closes and a new one starts. Each run keeps
//! one representative page.
//!
//! # Example
//!
//! ```
//! use unbuild::collapse::Collapser;
//! use unbuild::model::{ContentSignature, Primitive, PrimitiveKind};
//! use unbuild::DedupOptions;
//!
//! let title = Primitive::keyed(PrimitiveKind::Text, &[b"Title".as_slice()], 40.0, 500.0);
//! let point = Primitive::keyed(PrimitiveKind::Text, &[b"- point".as_slice()], 40.0, 400.0);
//! let pages = vec![
//!     ContentSignature::new(720.0, 540.0, vec![title.clone()]),
//!     ContentSignature::new(720.0, 540.0, vec![title, point]),
//! ];
//!
//! let collapse = Collapser::new(&DedupOptions::default()).collapse(&pages);
//! assert_eq!(collapse.kept, vec![1]);
//! ```

mod compare;

pub use compare::{
    comparator_for, ContainmentComparator, HeaderBandComparator, SignatureComparator,
};

use serde::{Deserialize, Serialize};

use crate::model::{ContentSignature, Run};
use crate::options::{BuildDirection, DedupOptions, DuplicateKeep};

/// Run partition and surviving pages of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collapse {
    /// Runs in page order, covering every page exactly once
    pub runs: Vec<Run>,
    /// Representative of each run, strictly increasing
    pub kept: Vec<usize>,
}

impl Collapse {
    /// Number of pages dropped.
    pub fn removed_count(&self) -> usize {
        self.runs.iter().map(|r| r.len() - 1).sum()
    }

    /// Check if every page is its own run.
    pub fn is_identity(&self) -> bool {
        self.runs.iter().all(Run::is_singleton)
    }
}

/// Partitions page signatures into build runs.
pub struct Collapser {
    comparator: Box<dyn SignatureComparator>,
    direction: BuildDirection,
    keep: DuplicateKeep,
    tolerance: f32,
}

impl Collapser {
    /// Create a collapser from options.
    pub fn new(options: &DedupOptions) -> Self {
        Self {
            comparator: comparator_for(options),
            direction: options.direction,
            keep: options.keep,
            tolerance: options.tolerance,
        }
    }

    /// Create a collapser with a custom comparator.
    pub fn with_comparator(
        comparator: Box<dyn SignatureComparator>,
        direction: BuildDirection,
        keep: DuplicateKeep,
        tolerance: f32,
    ) -> Self {
        Self {
            comparator,
            direction,
            keep,
            tolerance,
        }
    }

    /// Partition pages into runs and pick each run's representative.
    pub fn collapse(&self, signatures: &[ContentSignature]) -> Collapse {
        let runs = self.partition(signatures);
        let kept = runs.iter().map(|r| r.representative).collect();
        Collapse { runs, kept }
    }

    /// Partition pages into maximal runs.
    pub fn partition(&self, signatures: &[ContentSignature]) -> Vec<Run> {
        let mut runs = Vec::new();
        if signatures.is_empty() {
            return runs;
        }

        let mut start = 0;
        // Most complete page of the current run, used by `Either`.
        let mut anchor = 0;
        for next in 1..signatures.len() {
            match self.step(signatures, next, anchor) {
                Some(new_anchor) => anchor = new_anchor,
                None => {
                    runs.push(self.close_run(signatures, start, next - 1, anchor));
                    start = next;
                    anchor = next;
                }
            }
        }
        runs.push(self.close_run(signatures, start, signatures.len() - 1, anchor));

        log::debug!(
            "{} comparator: {} pages -> {} runs",
            self.comparator.name(),
            signatures.len(),
            runs.len()
        );
        runs
    }

    /// Decide whether page `next` extends the current run.
    ///
    /// Returns the run's new anchor when it does. In `Either` mode the new
    /// page must be related to the anchor itself, so the anchor always
    /// contains every page of its run.
    fn step(&self, signatures: &[ContentSignature], next: usize, anchor: usize) -> Option<usize> {
        let prev = &signatures[next - 1];
        let page = &signatures[next];
        match self.direction {
            BuildDirection::Forward => self.comparator.contains(prev, page).then_some(next),
            BuildDirection::Reverse => self.comparator.contains(page, prev).then_some(anchor),
            BuildDirection::Either => {
                let best = &signatures[anchor];
                if self.comparator.contains(best, page) {
                    let grows = page.len() > best.len()
                        || (page.len() == best.len() && self.keep == DuplicateKeep::Latest);
                    Some(if grows { next } else { anchor })
                } else if self.comparator.contains(page, best) {
                    Some(anchor)
                } else {
                    None
                }
            }
        }
    }

    fn close_run(
        &self,
        signatures: &[ContentSignature],
        start: usize,
        end: usize,
        anchor: usize,
    ) -> Run {
        Run::new(start, end, self.representative(signatures, start, end, anchor))
    }

    fn representative(
        &self,
        signatures: &[ContentSignature],
        start: usize,
        end: usize,
        anchor: usize,
    ) -> usize {
        let same = |a: usize, b: usize| signatures[a].is_equivalent(&signatures[b], self.tolerance);

        match (self.direction, self.keep) {
            (BuildDirection::Forward, DuplicateKeep::Latest) => end,
            (BuildDirection::Forward, DuplicateKeep::Earliest) => {
                let mut rep = end;
                while rep > start && same(rep - 1, rep) {
                    rep -= 1;
                }
                rep
            }
            (BuildDirection::Reverse, DuplicateKeep::Earliest) => start,
            (BuildDirection::Reverse, DuplicateKeep::Latest) => {
                let mut rep = start;
                while rep < end && same(rep + 1, rep) {
                    rep += 1;
                }
                rep
            }
            (BuildDirection::Either, _) => anchor,
        }
    }
}

impl Default for Collapser {
    fn default() -> Self {
        Self::new(&DedupOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{is_partition, Primitive, PrimitiveKind};

    fn item(name: &str) -> Primitive {
        // Spread items vertically by name so they never collide.
        let y = 50.0 + (name.bytes().map(u32::from).sum::<u32>() % 400) as f32;
        Primitive::keyed(PrimitiveKind::Text, &[name.as_bytes()], 40.0, y)
    }

    fn page(items: &[&str]) -> ContentSignature {
        ContentSignature::new(720.0, 540.0, items.iter().map(|s| item(s)).collect())
    }

    fn kept(options: &DedupOptions, pages: &[ContentSignature]) -> Vec<usize> {
        Collapser::new(options).collapse(pages).kept
    }

    #[test]
    fn test_empty_document() {
        let collapse = Collapser::default().collapse(&[]);
        assert!(collapse.runs.is_empty());
        assert!(collapse.kept.is_empty());
    }

    #[test]
    fn test_single_page() {
        let collapse = Collapser::default().collapse(&[page(&["a"])]);
        assert_eq!(collapse.runs, vec![Run::singleton(0)]);
        assert_eq!(collapse.kept, vec![0]);
    }

    #[test]
    fn test_unrelated_pages_are_kept() {
        let pages = vec![page(&["a"]), page(&["b"]), page(&["c"]), page(&["d"])];
        let collapse = Collapser::default().collapse(&pages);
        assert!(collapse.is_identity());
        assert_eq!(collapse.kept, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_full_collapse_keeps_last() {
        let pages = vec![
            page(&["t"]),
            page(&["t", "1"]),
            page(&["t", "1", "2"]),
            page(&["t", "1", "2", "3"]),
            page(&["t", "1", "2", "3", "4"]),
        ];
        let collapse = Collapser::default().collapse(&pages);
        assert_eq!(collapse.runs, vec![Run::new(0, 4, 4)]);
        assert_eq!(collapse.kept, vec![4]);
        assert_eq!(collapse.removed_count(), 4);
    }

    #[test]
    fn test_mixed_runs() {
        // A, A+extra, B (unrelated), C (unrelated)
        let pages = vec![
            page(&["a"]),
            page(&["a", "a2"]),
            page(&["b"]),
            page(&["c"]),
        ];
        let collapse = Collapser::default().collapse(&pages);
        assert_eq!(
            collapse.runs,
            vec![Run::new(0, 1, 1), Run::singleton(2), Run::singleton(3)]
        );
        assert_eq!(collapse.kept, vec![1, 2, 3]);
    }

    #[test]
    fn test_unreadable_page_is_singleton() {
        let pages = vec![
            page(&["t", "1"]),
            page(&["t", "1", "2"]),
            ContentSignature::unreadable(),
            page(&["t", "1", "2", "3"]),
        ];
        let collapse = Collapser::default().collapse(&pages);
        assert_eq!(
            collapse.runs,
            vec![Run::new(0, 1, 1), Run::singleton(2), Run::singleton(3)]
        );
        assert_eq!(collapse.kept, vec![1, 2, 3]);
    }

    #[test]
    fn test_blank_repeat_collapses_but_splits_builds() {
        let pages = vec![
            page(&["t"]),
            page(&[]),
            page(&[]),
            page(&["t", "1"]),
        ];
        let collapse = Collapser::default().collapse(&pages);
        assert_eq!(
            collapse.runs,
            vec![Run::singleton(0), Run::new(1, 2, 1), Run::singleton(3)]
        );
        assert_eq!(collapse.kept, vec![0, 1, 3]);
    }

    #[test]
    fn test_exact_repeat_keeps_earliest_by_default() {
        let pages = vec![page(&["t"]), page(&["t", "1"]), page(&["t", "1"])];
        assert_eq!(kept(&DedupOptions::default(), &pages), vec![1]);
        assert_eq!(
            kept(&DedupOptions::new().with_keep(DuplicateKeep::Latest), &pages),
            vec![2]
        );
    }

    #[test]
    fn test_reverse_builds() {
        let pages = vec![
            page(&["t", "1", "2"]),
            page(&["t", "1"]),
            page(&["t"]),
            page(&["x"]),
        ];
        // Forward direction sees no containment at all.
        assert_eq!(kept(&DedupOptions::default(), &pages), vec![0, 1, 2, 3]);

        let reverse = DedupOptions::new().with_direction(BuildDirection::Reverse);
        assert_eq!(kept(&reverse, &pages), vec![0, 3]);
    }

    #[test]
    fn test_reverse_keep_latest() {
        let pages = vec![page(&["t", "1"]), page(&["t", "1"]), page(&["t"])];
        let options = DedupOptions::new()
            .with_direction(BuildDirection::Reverse)
            .with_keep(DuplicateKeep::Latest);
        assert_eq!(kept(&options, &pages), vec![1]);
    }

    #[test]
    fn test_either_direction_keeps_largest() {
        let pages = vec![page(&["t"]), page(&["t", "1", "2"]), page(&["t", "1"])];
        let options = DedupOptions::new().with_direction(BuildDirection::Either);
        let collapse = Collapser::new(&options).collapse(&pages);
        assert_eq!(collapse.runs, vec![Run::new(0, 2, 1)]);
    }

    #[test]
    fn test_either_run_never_loses_content() {
        // A+B, then A (reverse step), then A+C (unrelated to A+B)
        let pages = vec![page(&["a", "b"]), page(&["a"]), page(&["a", "c"])];
        let options = DedupOptions::new().with_direction(BuildDirection::Either);
        let collapse = Collapser::new(&options).collapse(&pages);
        assert_eq!(collapse.runs, vec![Run::new(0, 1, 0), Run::singleton(2)]);
        assert_eq!(collapse.kept, vec![0, 2]);
    }

    #[test]
    fn test_either_representative_contains_run() {
        let pages = vec![
            page(&["t", "1"]),
            page(&["t"]),
            page(&["t", "1", "2"]),
            page(&["t", "1"]),
            page(&["t", "1", "2"]),
        ];
        for keep in [DuplicateKeep::Earliest, DuplicateKeep::Latest] {
            let options = DedupOptions::new()
                .with_direction(BuildDirection::Either)
                .with_keep(keep);
            let collapse = Collapser::new(&options).collapse(&pages);
            assert_eq!(collapse.runs.len(), 1);
            let rep = &pages[collapse.kept[0]];
            assert!(pages.iter().all(|p| p.is_contained_in(rep, 0.5)));
            let expected = if keep == DuplicateKeep::Earliest { 2 } else { 4 };
            assert_eq!(collapse.kept, vec![expected]);
        }
    }

    #[test]
    fn test_header_band_strategy() {
        let title = Primitive::keyed(PrimitiveKind::Text, &[b"Title".as_slice()], 40.0, 510.0);
        let other = Primitive::keyed(PrimitiveKind::Text, &[b"Other".as_slice()], 40.0, 510.0);
        let body = |s: &str| Primitive::keyed(PrimitiveKind::Text, &[s.as_bytes()], 40.0, 200.0);
        let pages = vec![
            ContentSignature::new(720.0, 540.0, vec![title.clone(), body("x")]),
            ContentSignature::new(720.0, 540.0, vec![title, body("y")]),
            ContentSignature::new(720.0, 540.0, vec![other, body("y")]),
        ];

        assert_eq!(kept(&DedupOptions::default(), &pages), vec![0, 1, 2]);
        assert_eq!(kept(&DedupOptions::new().header_band(0.1), &pages), vec![1, 2]);
    }

    #[test]
    fn test_partition_is_total_and_kept_increasing() {
        let pages = vec![
            page(&["a"]),
            page(&["a", "b"]),
            ContentSignature::unreadable(),
            page(&["c"]),
            page(&["c"]),
            page(&[]),
            page(&["d"]),
            page(&["d", "e"]),
        ];
        for direction in [
            BuildDirection::Forward,
            BuildDirection::Reverse,
            BuildDirection::Either,
        ] {
            for keep in [DuplicateKeep::Earliest, DuplicateKeep::Latest] {
                let options = DedupOptions::new().with_direction(direction).with_keep(keep);
                let collapse = Collapser::new(&options).collapse(&pages);
                assert!(is_partition(&collapse.runs, pages.len()));
                assert!(collapse.kept.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let pages = vec![
            page(&["t"]),
            page(&["t", "1"]),
            page(&["t", "1", "2"]),
            page(&["u"]),
            page(&["u", "1"]),
            page(&["v"]),
        ];
        let collapser = Collapser::default();
        let first = collapser.collapse(&pages);
        assert_eq!(first.kept, vec![2, 4, 5]);

        let survivors: Vec<ContentSignature> =
            first.kept.iter().map(|&i| pages[i].clone()).collect();
        let second = collapser.collapse(&survivors);
        assert!(second.is_identity());
        assert_eq!(second.kept, vec![0, 1, 2]);
    }
}
