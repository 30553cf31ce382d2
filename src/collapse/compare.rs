//! Signature comparison strategies.

use crate::model::ContentSignature;
use crate::options::{CompareStrategy, DedupOptions};

/// Decides whether one page is an earlier build of another.
///
/// Run detection only ever asks this question, so strategies can be
/// swapped without touching the collapser.
pub trait SignatureComparator: Send + Sync {
    /// Check if `inner` is contained in `outer`.
    fn contains(&self, inner: &ContentSignature, outer: &ContentSignature) -> bool;

    /// Name for logs.
    fn name(&self) -> &str;
}

/// Multiset containment of all primitives within a position tolerance.
#[derive(Debug, Clone, Copy)]
pub struct ContainmentComparator {
    tolerance: f32,
}

impl ContainmentComparator {
    /// Create a comparator with the given tolerance in points.
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }
}

impl SignatureComparator for ContainmentComparator {
    fn contains(&self, inner: &ContentSignature, outer: &ContentSignature) -> bool {
        inner.is_contained_in(outer, self.tolerance)
    }

    fn name(&self) -> &str {
        "containment"
    }
}

/// Same logical slide iff the top band of both pages matches.
///
/// Symmetric: builds that only change the body of a slide keep the title
/// area untouched. An empty band never matches unless both pages are
/// blank, in which case they compare as plain signatures.
#[derive(Debug, Clone, Copy)]
pub struct HeaderBandComparator {
    fraction: f32,
    tolerance: f32,
}

impl HeaderBandComparator {
    /// Create a comparator over the top `fraction` of the page height.
    pub fn new(fraction: f32, tolerance: f32) -> Self {
        Self {
            fraction,
            tolerance,
        }
    }
}

impl SignatureComparator for HeaderBandComparator {
    fn contains(&self, inner: &ContentSignature, outer: &ContentSignature) -> bool {
        if inner.is_blank() && outer.is_blank() {
            return inner.is_equivalent(outer, self.tolerance);
        }
        if !inner.is_comparable() || !outer.is_comparable() {
            return false;
        }
        let a = inner.top_band(self.fraction);
        let b = outer.top_band(self.fraction);
        !a.is_empty() && a.is_equivalent(&b, self.tolerance)
    }

    fn name(&self) -> &str {
        "header-band"
    }
}

/// Build the comparator selected by `options`.
pub fn comparator_for(options: &DedupOptions) -> Box<dyn SignatureComparator> {
    match options.strategy {
        CompareStrategy::Containment => Box::new(ContainmentComparator::new(options.tolerance)),
        CompareStrategy::HeaderBand { fraction } => {
            Box::new(HeaderBandComparator::new(fraction, options.tolerance))
        }
    }
}
