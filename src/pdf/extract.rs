//! Content-stream interpretation into page signatures.
//!
//! Walks a page's content stream tracking the graphics state, and records
//! every visible element (shown text, painted paths, images, shadings) as a
//! [`Primitive`] positioned on the displayed page: MediaBox origin moved to
//! (0, 0) and `/Rotate` applied.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::backend::{
    get_number_from_value, ContentOp, GlyphRun, PageId, PdfBackend, PdfValue, ResourceScope,
    XObject,
};
use crate::error::{Error, Result};
use crate::model::{ContentSignature, Primitive, PrimitiveKind};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// TJ adjustments beyond this (thousandths of text space) read as a word break.
const SPACE_THRESHOLD: f32 = 200.0;

/// Affine transformation `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_array(m: [f32; 6]) -> Self {
        Self {
            a: m[0],
            b: m[1],
            c: m[2],
            d: m[3],
            e: m[4],
            f: m[5],
        }
    }

    fn from_operands(operands: &[PdfValue]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, v) in m.iter_mut().zip(operands) {
            *slot = get_number_from_value(v)?;
        }
        Some(Self::from_array(m))
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn x_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn y_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Graphics state saved and restored by `q`/`Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: String,
    stroke: String,
    font_name: Vec<u8>,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Horizontal scaling in percent
    h_scale: f32,
    line_width: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: colour_key("g", &[PdfValue::Integer(0)]),
            stroke: colour_key("G", &[PdfValue::Integer(0)]),
            font_name: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 100.0,
            line_width: 1.0,
        }
    }
}

/// Bounding box of the path under construction, in page space.
#[derive(Debug, Clone, Copy)]
struct PathBounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl PathBounds {
    fn at(x: f32, y: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Mutable interpretation state of one content stream.
struct Walk<'s> {
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Option<PathBounds>,
    out: &'s mut Vec<Primitive>,
}

impl<'s> Walk<'s> {
    fn new(state: GraphicsState, out: &'s mut Vec<Primitive>) -> Self {
        Self {
            state,
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: None,
            out,
        }
    }

    fn move_text(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_text(0.0, -leading);
    }

    /// Move past shown glyphs. `adjust` is the sum of `TJ` numbers.
    fn advance(&mut self, run: GlyphRun, adjust: f32) {
        let s = &self.state;
        let tx = ((run.width - adjust) / 1000.0 * s.font_size
            + run.glyphs as f32 * s.char_spacing
            + run.spaces as f32 * s.word_spacing)
            * s.h_scale
            / 100.0;
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    fn path_point(&mut self, x: f32, y: f32) {
        let (ux, uy) = self.state.ctm.apply(x, y);
        match self.path.as_mut() {
            Some(bounds) => bounds.include(ux, uy),
            None => self.path = Some(PathBounds::at(ux, uy)),
        }
    }
}

/// Turns page content into [`ContentSignature`]s.
pub struct PageExtractor<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    ignore: Option<&'a Regex>,
}

impl<'a, B: PdfBackend + ?Sized> PageExtractor<'a, B> {
    /// Create an extractor over `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            ignore: None,
        }
    }

    /// Leave out text runs matching `pattern`.
    pub fn with_ignore(mut self, pattern: Option<&'a Regex>) -> Self {
        self.ignore = pattern;
        self
    }

    /// Decode one page into its signature.
    pub fn extract_page(&self, index: usize, page: PageId) -> Result<ContentSignature> {
        let page_box = self.backend.page_box(page);
        let content = self
            .backend
            .page_content(page)
            .map_err(|e| page_error(index, e))?;
        let ops = self
            .backend
            .decode_content(&content)
            .map_err(|e| page_error(index, e))?;

        let initial = GraphicsState {
            ctm: Matrix::from_array(page_box.display_matrix()),
            ..GraphicsState::default()
        };
        let mut primitives = Vec::new();
        self.walk(&ops, ResourceScope::page(page), initial, &mut primitives, 0);
        Ok(ContentSignature::new(
            page_box.width(),
            page_box.height(),
            primitives,
        ))
    }

    fn walk(
        &self,
        ops: &[ContentOp],
        scope: ResourceScope,
        initial: GraphicsState,
        out: &mut Vec<Primitive>,
        depth: usize,
    ) {
        let mut w = Walk::new(initial, out);

        for op in ops {
            let nums: Vec<f32> = op
                .operands
                .iter()
                .filter_map(get_number_from_value)
                .collect();

            match op.operator.as_str() {
                // Graphics state
                "q" => w.stack.push(w.state.clone()),
                "Q" => {
                    if let Some(saved) = w.stack.pop() {
                        w.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        w.state.ctm = m.then(&w.state.ctm);
                    }
                }
                "w" => {
                    if let Some(&lw) = nums.first() {
                        w.state.line_width = lw;
                    }
                }

                // Colour
                "g" | "rg" | "k" | "sc" | "scn" | "cs" => {
                    w.state.fill = colour_key(&op.operator, &op.operands);
                }
                "G" | "RG" | "K" | "SC" | "SCN" | "CS" => {
                    w.state.stroke = colour_key(&op.operator, &op.operands);
                }

                // Text objects
                "BT" => {
                    w.text_matrix = Matrix::IDENTITY;
                    w.line_matrix = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        w.state.font_name = name.clone();
                    }
                    if let Some(size) = op.operands.get(1).and_then(get_number_from_value) {
                        w.state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(&l) = nums.first() {
                        w.state.leading = l;
                    }
                }
                "Tc" => {
                    if let Some(&c) = nums.first() {
                        w.state.char_spacing = c;
                    }
                }
                "Tw" => {
                    if let Some(&ws) = nums.first() {
                        w.state.word_spacing = ws;
                    }
                }
                "Tz" => {
                    if let Some(&z) = nums.first() {
                        w.state.h_scale = z;
                    }
                }
                "Td" => {
                    if nums.len() >= 2 {
                        w.move_text(nums[0], nums[1]);
                    }
                }
                "TD" => {
                    if nums.len() >= 2 {
                        w.state.leading = -nums[1];
                        w.move_text(nums[0], nums[1]);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        w.text_matrix = m;
                        w.line_matrix = m;
                    }
                }
                "T*" => w.next_line(),
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        self.show_string(&mut w, scope, bytes);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(items)) = op.operands.first() {
                        let text = self.combine_tj(scope, &w.state.font_name, items);
                        self.show_text(&mut w, scope, &text);
                        let (run, adjust) = self.measure_tj(scope, &w.state.font_name, items);
                        w.advance(run, adjust);
                    }
                }
                "'" => {
                    w.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        self.show_string(&mut w, scope, bytes);
                    }
                }
                "\"" => {
                    if nums.len() >= 2 {
                        w.state.word_spacing = nums[0];
                        w.state.char_spacing = nums[1];
                    }
                    w.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                        self.show_string(&mut w, scope, bytes);
                    }
                }

                // Path construction
                "m" | "l" => {
                    if nums.len() >= 2 {
                        w.path_point(nums[0], nums[1]);
                    }
                }
                "c" => {
                    for pair in nums.chunks_exact(2).take(3) {
                        w.path_point(pair[0], pair[1]);
                    }
                }
                "v" | "y" => {
                    for pair in nums.chunks_exact(2).take(2) {
                        w.path_point(pair[0], pair[1]);
                    }
                }
                "re" => {
                    if nums.len() >= 4 {
                        let (x, y, width, height) = (nums[0], nums[1], nums[2], nums[3]);
                        w.path_point(x, y);
                        w.path_point(x + width, y);
                        w.path_point(x, y + height);
                        w.path_point(x + width, y + height);
                    }
                }
                "h" => {}

                // Path painting
                "S" | "s" => paint_path(&mut w, "stroke"),
                "f" | "F" | "f*" => paint_path(&mut w, "fill"),
                "B" | "B*" | "b" | "b*" => paint_path(&mut w, "fill-stroke"),
                "n" => w.path = None,

                // External objects
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.draw_xobject(&mut w, scope, name, depth);
                    }
                }
                "sh" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        let (x, y) = w.state.ctm.apply(0.0, 0.0);
                        w.out.push(
                            Primitive::keyed(PrimitiveKind::Shading, &[name.as_slice()], x, y)
                                .with_label(format!("sh /{}", String::from_utf8_lossy(name))),
                        );
                    }
                }
                "BI" | "EI" => {
                    for operand in &op.operands {
                        if let PdfValue::Inline(data) = operand {
                            push_image(&mut w, data, "inline image");
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn combine_tj(&self, scope: ResourceScope, font: &[u8], items: &[PdfValue]) -> String {
        let mut combined = String::new();
        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    combined.push_str(&self.backend.decode_text(scope, font, bytes));
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = -get_number_from_value(item).unwrap_or(0.0);
                    if adjustment > SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }
        combined
    }

    /// Total advance of a `TJ` array and the sum of its adjustments.
    fn measure_tj(&self, scope: ResourceScope, font: &[u8], items: &[PdfValue]) -> (GlyphRun, f32) {
        let mut total = GlyphRun::default();
        let mut adjust = 0.0;
        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let run = self.backend.text_advance(scope, font, bytes);
                    total.width += run.width;
                    total.glyphs += run.glyphs;
                    total.spaces += run.spaces;
                }
                other => adjust += get_number_from_value(other).unwrap_or(0.0),
            }
        }
        (total, adjust)
    }

    fn show_string(&self, w: &mut Walk<'_>, scope: ResourceScope, bytes: &[u8]) {
        let text = self.backend.decode_text(scope, &w.state.font_name, bytes);
        self.show_text(w, scope, &text);
        let run = self.backend.text_advance(scope, &w.state.font_name, bytes);
        w.advance(run, 0.0);
    }

    fn show_text(&self, w: &mut Walk<'_>, scope: ResourceScope, raw: &str) {
        let text = normalize_text(raw);
        if text.is_empty() {
            return;
        }
        if let Some(re) = self.ignore {
            if re.is_match(&text) {
                return;
            }
        }

        let render = w.text_matrix.then(&w.state.ctm);
        let (x, y) = render.apply(0.0, 0.0);
        let size = w.state.font_size * render.y_scale();
        let font = self.backend.base_font(scope, &w.state.font_name);
        let size_key = format!("{:.1}", size);

        w.out.push(
            Primitive::keyed(
                PrimitiveKind::Text,
                &[
                    text.as_bytes(),
                    font.as_bytes(),
                    size_key.as_bytes(),
                    w.state.fill.as_bytes(),
                ],
                x,
                y,
            )
            .with_label(text),
        );
    }

    fn draw_xobject(&self, w: &mut Walk<'_>, scope: ResourceScope, name: &[u8], depth: usize) {
        match self.backend.xobject(scope, name) {
            XObject::Image { digest } => {
                let label = format!("image /{}", String::from_utf8_lossy(name));
                push_image(w, &digest, &label);
            }
            XObject::Form {
                id,
                matrix,
                content,
            } => {
                if depth >= MAX_FORM_DEPTH {
                    log::debug!("Form XObject nesting exceeds {}, skipping", MAX_FORM_DEPTH);
                    return;
                }
                let ops = match self.backend.decode_content(&content) {
                    Ok(ops) => ops,
                    Err(e) => {
                        log::debug!("Skipping undecodable form XObject: {}", e);
                        return;
                    }
                };
                let mut inner = w.state.clone();
                inner.ctm = Matrix::from_array(matrix).then(&w.state.ctm);
                self.walk(&ops, scope.form(id), inner, w.out, depth + 1);
            }
            XObject::Other => {}
        }
    }
}

/// Decode every page of `backend`, in parallel when requested.
///
/// Returns one result per page in document order.
pub fn extract_all<B: PdfBackend + ?Sized>(
    backend: &B,
    pages: &[PageId],
    ignore: Option<&Regex>,
    parallel: bool,
) -> Vec<Result<ContentSignature>> {
    let extractor = PageExtractor::new(backend).with_ignore(ignore);

    if parallel && pages.len() > 1 {
        use rayon::prelude::*;
        pages
            .par_iter()
            .enumerate()
            .map(|(i, &page)| extractor.extract_page(i, page))
            .collect()
    } else {
        pages
            .iter()
            .enumerate()
            .map(|(i, &page)| extractor.extract_page(i, page))
            .collect()
    }
}

fn page_error(index: usize, err: Error) -> Error {
    Error::PageRender {
        page: index,
        reason: err.to_string(),
    }
}

fn paint_path(w: &mut Walk<'_>, paint: &str) {
    let Some(bounds) = w.path.take() else {
        return;
    };
    let width = format!("{:.1}", bounds.max_x - bounds.min_x);
    let height = format!("{:.1}", bounds.max_y - bounds.min_y);
    let colour = match paint {
        "stroke" => w.state.stroke.clone(),
        "fill" => w.state.fill.clone(),
        _ => format!("{} {}", w.state.fill, w.state.stroke),
    };
    let line = if paint == "fill" {
        String::new()
    } else {
        format!("{:.2}", w.state.line_width * w.state.ctm.x_scale())
    };

    w.out.push(
        Primitive::keyed(
            PrimitiveKind::Path,
            &[
                paint.as_bytes(),
                width.as_bytes(),
                height.as_bytes(),
                colour.as_bytes(),
                line.as_bytes(),
            ],
            bounds.min_x,
            bounds.min_y,
        )
        .with_label(format!("{} {}x{}", paint, width, height)),
    );
}

fn push_image(w: &mut Walk<'_>, data: &[u8], label: &str) {
    let ctm = w.state.ctm;
    let (x, y) = ctm.apply(0.0, 0.0);
    let extent = format!("{:.1}x{:.1}", ctm.x_scale(), ctm.y_scale());
    w.out.push(
        Primitive::keyed(PrimitiveKind::Image, &[data, extent.as_bytes()], x, y)
            .with_label(label.to_string()),
    );
}

/// Canonical colour description from a colour operator and its operands.
fn colour_key(operator: &str, operands: &[PdfValue]) -> String {
    let mut key = operator.to_string();
    for operand in operands {
        match operand {
            PdfValue::Name(n) => {
                key.push_str(" /");
                key.push_str(&String::from_utf8_lossy(n));
            }
            other => {
                if let Some(v) = get_number_from_value(other) {
                    key.push_str(&format!(" {:.3}", v));
                }
            }
        }
    }
    key
}

/// NFC-normalize and collapse whitespace runs.
pub fn normalize_text(text: &str) -> String {
    let nfc: String = text.nfc().collect();
    nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}
