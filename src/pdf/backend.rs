//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the PDF operations the extractor
//! needs, isolating the concrete PDF library (lopdf) from content-stream
//! interpretation.

use md5::{Digest, Md5};

use crate::error::{Error, Result};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Where named resources (fonts, XObjects) are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceScope {
    /// Page being extracted
    pub page: PageId,
    /// Form XObject currently being drawn, if any
    pub form: Option<PageId>,
}

impl ResourceScope {
    /// Top-level scope of a page.
    pub fn page(page: PageId) -> Self {
        Self { page, form: None }
    }

    /// Nested scope of a form XObject drawn on the same page.
    pub fn form(self, form: PageId) -> Self {
        Self {
            page: self.page,
            form: Some(form),
        }
    }
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    /// Raw bytes of an inline image
    Inline(Vec<u8>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// A resolved XObject resource.
#[derive(Debug, Clone)]
pub enum XObject {
    /// Raster image, identified by a digest of its raw stream bytes
    Image { digest: [u8; 16] },
    /// Form XObject with its own content stream
    Form {
        id: PageId,
        matrix: [f32; 6],
        content: Vec<u8>,
    },
    /// Anything else (PostScript XObjects, broken references)
    Other,
}

/// Visible page area from the MediaBox, with its display rotation.
///
/// Extracted positions are mapped into the displayed page: origin at the
/// bottom-left of what a viewer shows, after applying `/Rotate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Clockwise rotation: 0, 90, 180 or 270
    pub rotate: u16,
}

impl PageBox {
    /// Build from raw box corners and a `/Rotate` value.
    ///
    /// Corners may come in any order. Rotation snaps to a multiple of 90.
    pub fn new(corners: [f32; 4], rotate: i64) -> Self {
        let quarter = ((rotate as f64 / 90.0).round() as i64).rem_euclid(4);
        Self {
            x0: corners[0].min(corners[2]),
            y0: corners[1].min(corners[3]),
            x1: corners[0].max(corners[2]),
            y1: corners[1].max(corners[3]),
            rotate: (quarter * 90) as u16,
        }
    }

    fn box_width(&self) -> f32 {
        self.x1 - self.x0
    }

    fn box_height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Displayed width in points.
    pub fn width(&self) -> f32 {
        match self.rotate {
            90 | 270 => self.box_height(),
            _ => self.box_width(),
        }
    }

    /// Displayed height in points.
    pub fn height(&self) -> f32 {
        match self.rotate {
            90 | 270 => self.box_width(),
            _ => self.box_height(),
        }
    }

    /// Matrix from default user space to displayed page space.
    pub fn display_matrix(&self) -> [f32; 6] {
        let (w, h) = (self.box_width(), self.box_height());
        let [a, b, c, d, e, f] = match self.rotate {
            90 => [0.0, -1.0, 1.0, 0.0, 0.0, w],
            180 => [-1.0, 0.0, 0.0, -1.0, w, h],
            270 => [0.0, 1.0, -1.0, 0.0, h, 0.0],
            _ => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        };
        // Shift the box origin to (0, 0) first.
        let (x0, y0) = (-self.x0, -self.y0);
        [a, b, c, d, x0 * a + y0 * c + e, x0 * b + y0 * d + f]
    }
}

impl Default for PageBox {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_BOX, 0)
    }
}

/// US Letter, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Horizontal extent of one shown string.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphRun {
    /// Sum of glyph widths in thousandths of text space
    pub width: f32,
    /// Number of glyphs shown (character spacing applies to each)
    pub glyphs: usize,
    /// Number of single-byte spaces (word spacing applies to each)
    pub spaces: usize,
}

impl GlyphRun {
    /// Average-width guess when the font carries no metrics.
    pub fn estimate(bytes: &[u8]) -> Self {
        Self {
            width: ESTIMATED_GLYPH_WIDTH * bytes.len() as f32,
            glyphs: bytes.len(),
            spaces: bytes.iter().filter(|&&b| b == b' ').count(),
        }
    }
}

/// Glyph width assumed for fonts without metrics, in thousandths of an em.
pub const ESTIMATED_GLYPH_WIDTH: f32 = 500.0;

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, content stream decoding,
/// and resource lookup without exposing concrete PDF library types.
pub trait PdfBackend: Sync {
    /// Pages in document order.
    fn pages(&self) -> Vec<PageId>;

    /// Visible area and rotation from the (possibly inherited) MediaBox.
    fn page_box(&self, page: PageId) -> PageBox;

    /// Raw (decompressed) content stream bytes for a page.
    ///
    /// A page without `/Contents` is blank and yields no bytes.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence with the encoding of `font_name` in `scope`.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, scope: ResourceScope, font_name: &[u8], bytes: &[u8]) -> String;

    /// Advance of `bytes` shown in `font_name`, from the font's widths.
    ///
    /// Defaults to an average-width estimate.
    fn text_advance(&self, _scope: ResourceScope, _font_name: &[u8], bytes: &[u8]) -> GlyphRun {
        GlyphRun::estimate(bytes)
    }

    /// Base font name of `font_name` in `scope` (e.g. "Helvetica-Bold").
    fn base_font(&self, scope: ResourceScope, font_name: &[u8]) -> String;

    /// Resolve the XObject called `name` in `scope`.
    fn xobject(&self, scope: ResourceScope, name: &[u8]) -> XObject;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

use lopdf::{Dictionary, Document as LopdfDocument, Object};

/// Inherited page attributes are looked up at most this many levels up.
const MAX_TREE_DEPTH: usize = 32;

/// Default `/DW` of CIDFonts.
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc })
    }

    /// Mutable access for structural edits (page deletion).
    pub fn raw_doc_mut(&mut self) -> &mut LopdfDocument {
        &mut self.doc
    }

    /// Follow a reference to its target object.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking up `/Parent` for inherited keys.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut node = self.doc.get_dictionary(page).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return self.resolve(value);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resources(&self, scope: ResourceScope) -> Option<&Dictionary> {
        if let Some(form) = scope.form {
            let own = self
                .doc
                .get_object(form)
                .ok()
                .and_then(|o| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"Resources").ok())
                .and_then(|r| self.resolve_dict(r));
            if own.is_some() {
                return own;
            }
        }
        self.inherited(scope.page, b"Resources")
            .and_then(|r| self.resolve_dict(r))
    }

    fn named_resource(&self, scope: ResourceScope, category: &[u8], name: &[u8]) -> Option<&Object> {
        let resources = self.resources(scope)?;
        let category = self.resolve_dict(resources.get(category).ok()?)?;
        category.get(name).ok()
    }

    fn font_dict(&self, scope: ResourceScope, font_name: &[u8]) -> Option<&Dictionary> {
        let font = self.named_resource(scope, b"Font", font_name)?;
        self.resolve_dict(font)
    }

    fn number(&self, dict: &Dictionary, key: &[u8]) -> Option<f32> {
        self.resolve(dict.get(key).ok()?)?.as_float().ok()
    }

    fn array<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Vec<Object>> {
        self.resolve(dict.get(key).ok()?)?.as_array().ok()
    }

    /// Widths of a simple font: one byte per glyph, `/Widths` from `/FirstChar`.
    fn simple_advance(&self, font: &Dictionary, bytes: &[u8]) -> GlyphRun {
        let Some(widths) = self.array(font, b"Widths") else {
            // Standard 14 fonts may omit metrics entirely.
            return GlyphRun::estimate(bytes);
        };
        let first = self.number(font, b"FirstChar").unwrap_or(0.0) as i64;
        let missing = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| self.resolve_dict(d))
            .and_then(|d| self.number(d, b"MissingWidth"))
            .unwrap_or(ESTIMATED_GLYPH_WIDTH);

        let width: f32 = bytes
            .iter()
            .map(|&b| {
                usize::try_from(i64::from(b) - first)
                    .ok()
                    .and_then(|i| widths.get(i))
                    .and_then(|w| self.resolve(w))
                    .and_then(|w| w.as_float().ok())
                    .unwrap_or(missing)
            })
            .sum();
        GlyphRun {
            width,
            glyphs: bytes.len(),
            spaces: bytes.iter().filter(|&&b| b == b' ').count(),
        }
    }

    /// Widths of a Type0 font with two-byte codes, from the descendant's `/W`.
    fn composite_advance(&self, font: &Dictionary, bytes: &[u8]) -> GlyphRun {
        let descendant = self
            .array(font, b"DescendantFonts")
            .and_then(|a| a.first())
            .and_then(|d| self.resolve_dict(d));
        let default = descendant
            .and_then(|d| self.number(d, b"DW"))
            .unwrap_or(DEFAULT_CID_WIDTH);
        let table = descendant.and_then(|d| self.array(d, b"W"));

        let cids: Vec<u32> = bytes
            .chunks(2)
            .map(|c| c.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
            .collect();
        let width: f32 = cids
            .iter()
            .map(|&cid| {
                table
                    .and_then(|t| self.cid_width(t, cid))
                    .unwrap_or(default)
            })
            .sum();
        GlyphRun {
            width,
            glyphs: cids.len(),
            spaces: 0,
        }
    }

    /// Look up `cid` in a `/W` array of `c [w...]` and `c_first c_last w` entries.
    fn cid_width(&self, table: &[Object], cid: u32) -> Option<f32> {
        let value = |o: &Object| self.resolve(o).and_then(|o| o.as_float().ok());
        let mut i = 0;
        while i < table.len() {
            let first = value(&table[i])? as u32;
            match table.get(i + 1).and_then(|o| self.resolve(o)) {
                Some(Object::Array(widths)) => {
                    if cid >= first && ((cid - first) as usize) < widths.len() {
                        return widths.get((cid - first) as usize).and_then(value);
                    }
                    i += 2;
                }
                Some(_) => {
                    let last = value(table.get(i + 1)?)? as u32;
                    if (first..=last).contains(&cid) {
                        return table.get(i + 2).and_then(value);
                    }
                    i += 3;
                }
                None => return None,
            }
        }
        None
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> Vec<PageId> {
        self.doc.get_pages().into_values().collect()
    }

    fn page_box(&self, page: PageId) -> PageBox {
        let corners = self
            .inherited(page, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .filter(|a| a.len() >= 4)
            .map(|a| {
                let mut n = [0.0; 4];
                for (slot, v) in n.iter_mut().zip(a.iter()) {
                    *slot = self.resolve(v).and_then(|o| o.as_float().ok()).unwrap_or(0.0);
                }
                n
            });
        let rotate = self
            .inherited(page, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);

        match corners {
            Some(c) if (c[2] - c[0]).abs() > 0.0 && (c[3] - c[1]).abs() > 0.0 => {
                PageBox::new(c, rotate)
            }
            _ => PageBox::new(DEFAULT_MEDIA_BOX, rotate),
        }
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let streams: Vec<&Object> = match self.resolve(contents) {
            Some(Object::Array(arr)) => arr.iter().collect(),
            Some(obj @ Object::Stream(_)) => vec![obj],
            _ => return Err(Error::PdfParse("Invalid content stream".to_string())),
        };

        let mut content = Vec::new();
        for obj in streams {
            match self.resolve(obj) {
                Some(Object::Stream(s)) => {
                    let data = s
                        .decompressed_content()
                        .or_else(|e| {
                            // Uncompressed streams report an error from decompression.
                            if s.dict.get(b"Filter").is_err() {
                                Ok(s.content.clone())
                            } else {
                                Err(e)
                            }
                        })
                        .map_err(|e| Error::PdfParse(e.to_string()))?;
                    content.extend_from_slice(&data);
                    content.push(b'\n');
                }
                _ => return Err(Error::PdfParse("Invalid content stream".to_string())),
            }
        }
        Ok(content)
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(convert_object).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, scope: ResourceScope, font_name: &[u8], bytes: &[u8]) -> String {
        if let Some(font_dict) = self.font_dict(scope, font_name) {
            if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn text_advance(&self, scope: ResourceScope, font_name: &[u8], bytes: &[u8]) -> GlyphRun {
        let Some(font) = self.font_dict(scope, font_name) else {
            return GlyphRun::estimate(bytes);
        };
        match font.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Type0") => self.composite_advance(font, bytes),
            _ => self.simple_advance(font, bytes),
        }
    }

    fn base_font(&self, scope: ResourceScope, font_name: &[u8]) -> String {
        self.font_dict(scope, font_name)
            .and_then(|d| d.get(b"BaseFont").ok())
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| String::from_utf8_lossy(font_name).to_string())
    }

    fn xobject(&self, scope: ResourceScope, name: &[u8]) -> XObject {
        let Some(entry) = self.named_resource(scope, b"XObject", name) else {
            return XObject::Other;
        };
        let id = entry.as_reference().ok();
        let Some(Object::Stream(stream)) = self.resolve(entry) else {
            return XObject::Other;
        };

        match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Image") => {
                let digest: [u8; 16] = Md5::digest(&stream.content).into();
                XObject::Image { digest }
            }
            Ok(b"Form") => {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let mut matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                if let Ok(arr) = stream.dict.get(b"Matrix").and_then(|m| m.as_array()) {
                    for (slot, v) in matrix.iter_mut().zip(arr.iter()) {
                        if let Ok(n) = v.as_float() {
                            *slot = n;
                        }
                    }
                }
                match id {
                    Some(id) => XObject::Form {
                        id,
                        matrix,
                        content,
                    },
                    // Inline form dictionaries cannot carry their own resources.
                    None => XObject::Form {
                        id: scope.form.unwrap_or(scope.page),
                        matrix,
                        content,
                    },
                }
            }
            _ => XObject::Other,
        }
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        Object::Stream(s) => PdfValue::Inline(s.content.clone()),
        _ => PdfValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_get_number_from_value() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Other), None);
    }

    #[test]
    fn test_resource_scope_nesting() {
        let scope = ResourceScope::page((4, 0));
        let nested = scope.form((9, 0));
        assert_eq!(nested.page, (4, 0));
        assert_eq!(nested.form, Some((9, 0)));
    }

    #[test]
    fn test_page_box_rotation() {
        let upright = PageBox::new([0.0, 0.0, 720.0, 540.0], 0);
        assert_eq!((upright.width(), upright.height()), (720.0, 540.0));

        let turned = PageBox::new([0.0, 0.0, 540.0, 720.0], -270);
        assert_eq!(turned.rotate, 90);
        assert_eq!((turned.width(), turned.height()), (720.0, 540.0));
        // The top-left of the box becomes the top-right of the display.
        let m = turned.display_matrix();
        let (x, y) = (0.0 * m[0] + 720.0 * m[2] + m[4], 0.0 * m[1] + 720.0 * m[3] + m[5]);
        assert_eq!((x, y), (720.0, 540.0));
    }

    #[test]
    fn test_page_box_offset_origin() {
        let shifted = PageBox::new([0.0, 740.0, 720.0, 200.0], 0);
        assert_eq!((shifted.width(), shifted.height()), (720.0, 540.0));
        let m = shifted.display_matrix();
        assert_eq!((m[4], m[5]), (0.0, -200.0));

        let flipped = PageBox::new([10.0, 20.0, 110.0, 220.0], 180);
        let m = flipped.display_matrix();
        // Lower-left corner of the box maps to the upper-right of the display.
        let (x, y) = (10.0 * m[0] + 20.0 * m[2] + m[4], 10.0 * m[1] + 20.0 * m[3] + m[5]);
        assert_eq!((x, y), (100.0, 200.0));
    }

    #[test]
    fn test_glyph_run_estimate() {
        let run = GlyphRun::estimate(b"a b");
        assert_eq!(run.width, 1500.0);
        assert_eq!(run.glyphs, 3);
        assert_eq!(run.spaces, 1);
    }

    fn font_backend(font: Dictionary) -> (LopdfBackend, PageId) {
        use lopdf::dictionary;
        let mut doc = LopdfDocument::with_version("1.5");
        let font_id = doc.add_object(font);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        (LopdfBackend { doc }, page_id)
    }

    #[test]
    fn test_simple_font_widths() {
        use lopdf::dictionary;
        let (backend, page) = font_backend(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "FirstChar" => 65,
            "Widths" => vec![600.into(), 700.into()],
        });
        let run = backend.text_advance(ResourceScope::page(page), b"F1", b"ABZ");
        // Z is outside /Widths and takes the estimate.
        assert_eq!(run.width, 600.0 + 700.0 + ESTIMATED_GLYPH_WIDTH);
        assert_eq!(run.glyphs, 3);

        let unknown = backend.text_advance(ResourceScope::page(page), b"F9", b"AB");
        assert_eq!(unknown, GlyphRun::estimate(b"AB"));
    }

    #[test]
    fn test_composite_font_widths() {
        use lopdf::dictionary;
        let descendant = dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 800,
            "W" => vec![
                Object::Integer(1),
                Object::Array(vec![250.into(), 300.into()]),
                Object::Integer(10),
                Object::Integer(20),
                Object::Integer(400),
            ],
        };
        let (backend, page) = font_backend(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Dictionary(descendant)],
        });
        let run = backend.text_advance(
            ResourceScope::page(page),
            b"F1",
            &[0x00, 0x02, 0x00, 0x0F, 0x00, 0x63],
        );
        assert_eq!(run.width, 300.0 + 400.0 + 800.0);
        assert_eq!(run.glyphs, 3);
        assert_eq!(run.spaces, 0);
    }

    #[test]
    fn test_load_bytes_rejects_garbage() {
        assert!(LopdfBackend::load_bytes(b"not a pdf at all").is_err());
    }
}
