//! Comparable page content signatures.
//!
//! A [`ContentSignature`] is the multiset of visible content primitives on a
//! page, each carrying a value key and a user-space position. Two pages are
//! builds of the same logical slide when one signature is contained in the
//! other.

use std::collections::HashMap;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Positions are rounded to this grid before fingerprinting.
const FINGERPRINT_QUANTUM: f32 = 0.01;

/// Kind of content primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// A shown text run
    Text,
    /// A painted path (stroke and/or fill)
    Path,
    /// An image XObject or inline image
    Image,
    /// A shading fill (`sh`)
    Shading,
}

/// A single visible element on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primitive {
    /// Element kind
    pub kind: PrimitiveKind,
    /// Digest of the element's value (text, font, colour, size, image bytes)
    pub key: u64,
    /// X position on the displayed page
    pub x: f32,
    /// Y position on the displayed page
    pub y: f32,
    /// Short human-readable description
    pub label: String,
}

impl Primitive {
    /// Create a primitive whose key is the digest of `parts`.
    pub fn keyed(kind: PrimitiveKind, parts: &[&[u8]], x: f32, y: f32) -> Self {
        Self {
            kind,
            key: digest64(kind, parts),
            x,
            y,
            label: String::new(),
        }
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn quantized_hash(&self) -> u64 {
        let qx = (self.x / FINGERPRINT_QUANTUM).round() as i64;
        let qy = (self.y / FINGERPRINT_QUANTUM).round() as i64;
        digest64(
            self.kind,
            &[
                self.key.to_le_bytes().as_slice(),
                qx.to_le_bytes().as_slice(),
                qy.to_le_bytes().as_slice(),
            ],
        )
    }
}

/// Whether a signature reflects the page's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureState {
    /// The page was decoded
    Complete,
    /// The page could not be decoded
    Unreadable,
}

/// Comparable representation of a page's visible content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSignature {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    primitives: Vec<Primitive>,
    fingerprint: u64,
    state: SignatureState,
}

impl ContentSignature {
    /// Build a signature from decoded primitives.
    pub fn new(width: f32, height: f32, primitives: Vec<Primitive>) -> Self {
        let fingerprint = fingerprint(&primitives);
        Self {
            width,
            height,
            primitives,
            fingerprint,
            state: SignatureState::Complete,
        }
    }

    /// Signature of a page that failed to decode.
    ///
    /// Never contained in anything and never containing anything.
    pub fn unreadable() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            primitives: Vec::new(),
            fingerprint: 0,
            state: SignatureState::Unreadable,
        }
    }

    /// Decode state.
    pub fn state(&self) -> SignatureState {
        self.state
    }

    /// Check if the page failed to decode.
    pub fn is_unreadable(&self) -> bool {
        self.state == SignatureState::Unreadable
    }

    /// Primitives in content-stream order.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Check if the page has no visible primitives.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Order-independent hash of the quantized primitives.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Whether this signature has content to compare.
    ///
    /// Unreadable and blank pages are not comparable.
    pub fn is_comparable(&self) -> bool {
        self.state == SignatureState::Complete && !self.primitives.is_empty()
    }

    /// Check if the page decoded cleanly and shows nothing.
    pub fn is_blank(&self) -> bool {
        self.state == SignatureState::Complete && self.primitives.is_empty()
    }

    /// Check if both pages share the same size within `tolerance`.
    pub fn same_page_size(&self, other: &ContentSignature, tolerance: f32) -> bool {
        (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }

    /// Check if every primitive here matches a distinct primitive in `outer`.
    ///
    /// Unreadable pages are never contained. A blank page is only
    /// contained in another blank page of the same size.
    pub fn is_contained_in(&self, outer: &ContentSignature, tolerance: f32) -> bool {
        if self.is_blank() && outer.is_blank() {
            return self.same_page_size(outer, tolerance);
        }
        if !self.is_comparable() || !outer.is_comparable() {
            return false;
        }
        if !self.same_page_size(outer, tolerance) || self.len() > outer.len() {
            return false;
        }
        if self.len() == outer.len()
            && self.fingerprint == outer.fingerprint
            && tolerance >= FINGERPRINT_QUANTUM
        {
            return true;
        }

        let mut buckets: HashMap<(PrimitiveKind, u64), Vec<(f32, f32)>> = HashMap::new();
        for p in &outer.primitives {
            buckets.entry((p.kind, p.key)).or_default().push((p.x, p.y));
        }

        for p in &self.primitives {
            let Some(candidates) = buckets.get_mut(&(p.kind, p.key)) else {
                return false;
            };
            let found = candidates
                .iter()
                .position(|(x, y)| (p.x - x).abs() <= tolerance && (p.y - y).abs() <= tolerance);
            match found {
                Some(i) => {
                    candidates.swap_remove(i);
                }
                None => return false,
            }
        }

        true
    }

    /// Check if both signatures hold the same primitives within `tolerance`.
    pub fn is_equivalent(&self, other: &ContentSignature, tolerance: f32) -> bool {
        self.len() == other.len() && self.is_contained_in(other, tolerance)
    }

    /// Restrict to primitives in the top `fraction` of the page.
    ///
    /// Positions grow upwards from the bottom of the displayed page, so the
    /// top band starts at `height * (1 - fraction)`.
    pub fn top_band(&self, fraction: f32) -> ContentSignature {
        if self.is_unreadable() {
            return ContentSignature::unreadable();
        }
        let threshold = self.height * (1.0 - fraction.clamp(0.0, 1.0));
        let primitives = self
            .primitives
            .iter()
            .filter(|p| p.y >= threshold)
            .cloned()
            .collect();
        ContentSignature::new(self.width, self.height, primitives)
    }
}

/// First eight bytes of an MD5 digest over `kind` and `parts`.
pub fn digest64(kind: PrimitiveKind, parts: &[&[u8]]) -> u64 {
    let mut hasher = Md5::new();
    hasher.update([kind as u8]);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

fn fingerprint(primitives: &[Primitive]) -> u64 {
    let mut hashes: Vec<u64> = primitives.iter().map(Primitive::quantized_hash).collect();
    hashes.sort_unstable();
    let mut hasher = Md5::new();
    for h in hashes {
        hasher.update(h.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str, x: f32, y: f32) -> Primitive {
        Primitive::keyed(PrimitiveKind::Text, &[s.as_bytes()], x, y).with_label(s)
    }

    fn page(items: Vec<Primitive>) -> ContentSignature {
        ContentSignature::new(720.0, 540.0, items)
    }

    #[test]
    fn test_subset_is_contained() {
        let a = page(vec![text("Title", 50.0, 500.0)]);
        let b = page(vec![text("Title", 50.0, 500.0), text("- point", 60.0, 400.0)]);
        assert!(a.is_contained_in(&b, 0.5));
        assert!(!b.is_contained_in(&a, 0.5));
    }

    #[test]
    fn test_position_tolerance() {
        let a = page(vec![text("Title", 50.0, 500.0)]);
        let b = page(vec![text("Title", 50.3, 499.8)]);
        assert!(a.is_contained_in(&b, 0.5));
        assert!(!a.is_contained_in(&b, 0.1));
    }

    #[test]
    fn test_multiset_needs_distinct_matches() {
        let twice = page(vec![text("x", 1.0, 1.0), text("x", 1.0, 1.0)]);
        let once = page(vec![text("x", 1.0, 1.0), text("y", 5.0, 5.0)]);
        assert!(!twice.is_contained_in(&once, 0.5));
    }

    #[test]
    fn test_equal_signatures_are_equivalent() {
        let a = page(vec![text("Title", 50.0, 500.0), text("body", 50.0, 300.0)]);
        let b = page(vec![text("body", 50.0, 300.0), text("Title", 50.0, 500.0)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.is_equivalent(&b, 0.5));
        assert!(b.is_contained_in(&a, 0.5));
    }

    #[test]
    fn test_page_size_mismatch_never_contained() {
        let a = ContentSignature::new(720.0, 540.0, vec![text("T", 1.0, 1.0)]);
        let b = ContentSignature::new(612.0, 792.0, vec![text("T", 1.0, 1.0)]);
        assert!(!a.is_contained_in(&b, 0.5));
    }

    #[test]
    fn test_unreadable_and_blank_never_relate_to_content() {
        let bad = ContentSignature::unreadable();
        let blank = page(vec![]);
        let full = page(vec![text("T", 1.0, 1.0)]);

        assert!(bad.is_unreadable());
        assert!(!bad.is_contained_in(&full, 0.5));
        assert!(!full.is_contained_in(&bad, 0.5));
        assert!(!bad.is_contained_in(&bad, 0.5));
        assert!(!blank.is_contained_in(&full, 0.5));
        assert!(!full.is_contained_in(&blank, 0.5));
        assert!(!bad.is_contained_in(&blank, 0.5));
        assert!(!blank.is_contained_in(&bad, 0.5));
    }

    #[test]
    fn test_blank_pages_of_same_size_are_equivalent() {
        let a = page(vec![]);
        let b = page(vec![]);
        assert!(a.is_blank());
        assert!(a.is_equivalent(&b, 0.5));

        let portrait = ContentSignature::new(612.0, 792.0, vec![]);
        assert!(!a.is_contained_in(&portrait, 0.5));
        assert!(!ContentSignature::unreadable().is_blank());
    }

    #[test]
    fn test_top_band() {
        let sig = page(vec![text("Title", 50.0, 500.0), text("body", 50.0, 200.0)]);
        let band = sig.top_band(0.10);
        assert_eq!(band.len(), 1);
        assert_eq!(band.primitives()[0].label, "Title");
    }

    #[test]
    fn test_digest_depends_on_kind() {
        let t = digest64(PrimitiveKind::Text, &[b"abc".as_slice()]);
        let p = digest64(PrimitiveKind::Path, &[b"abc".as_slice()]);
        assert_ne!(t, p);
        assert_eq!(t, digest64(PrimitiveKind::Text, &[b"abc".as_slice()]));
    }
}
