//! Synthetic slide decks for integration tests.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Slide size used by most decks (10in x 7.5in).
pub const SLIDE: (f32, f32) = (720.0, 540.0);

/// One element drawn on a synthetic page.
#[derive(Debug, Clone)]
pub enum Element {
    /// Text at (x, y) in 24pt Helvetica
    Text(String, f32, f32),
    /// Strings shown one after another in a single text object
    TextRun(Vec<String>, f32, f32),
    /// Filled rectangle
    Rect(f32, f32, f32, f32),
    /// The shared test image scaled to (w, h) at (x, y)
    Image(f32, f32, f32, f32),
}

/// Description of one page.
#[derive(Debug, Clone)]
pub struct PageSpec {
    elements: Vec<Element>,
    media_box: Option<[f32; 4]>,
    rotate: Option<i64>,
    broken: bool,
}

impl PageSpec {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            media_box: None,
            rotate: None,
            broken: false,
        }
    }

    /// A page whose content cannot be decoded.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new()
        }
    }

    pub fn text(mut self, text: &str, x: f32, y: f32) -> Self {
        self.elements.push(Element::Text(text.to_string(), x, y));
        self
    }

    pub fn text_run(mut self, parts: &[&str], x: f32, y: f32) -> Self {
        let parts = parts.iter().map(|p| p.to_string()).collect();
        self.elements.push(Element::TextRun(parts, x, y));
        self
    }

    pub fn rect(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.elements.push(Element::Rect(x, y, w, h));
        self
    }

    pub fn image(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.elements.push(Element::Image(x, y, w, h));
        self
    }

    /// Override the inherited MediaBox.
    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.media_box = Some([0.0, 0.0, width, height]);
        self
    }

    /// Override the inherited MediaBox with explicit corners.
    pub fn media_box(mut self, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        self.media_box = Some([x0, y0, x1, y1]);
        self
    }

    pub fn rotate(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        for element in &self.elements {
            match element {
                Element::Text(text, x, y) => {
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new("Tf", vec!["F1".into(), 24.into()]));
                    ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    ops.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(text.as_str())],
                    ));
                    ops.push(Operation::new("ET", vec![]));
                }
                Element::TextRun(parts, x, y) => {
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new("Tf", vec!["F1".into(), 24.into()]));
                    ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    for part in parts {
                        ops.push(Operation::new(
                            "Tj",
                            vec![Object::string_literal(part.as_str())],
                        ));
                    }
                    ops.push(Operation::new("ET", vec![]));
                }
                Element::Rect(x, y, w, h) => {
                    ops.push(Operation::new(
                        "rg",
                        vec![0.2.into(), 0.4.into(), 0.8.into()],
                    ));
                    ops.push(Operation::new(
                        "re",
                        vec![(*x).into(), (*y).into(), (*w).into(), (*h).into()],
                    ));
                    ops.push(Operation::new("f", vec![]));
                }
                Element::Image(x, y, w, h) => {
                    ops.push(Operation::new("q", vec![]));
                    ops.push(Operation::new(
                        "cm",
                        vec![
                            (*w).into(),
                            0.into(),
                            0.into(),
                            (*h).into(),
                            (*x).into(),
                            (*y).into(),
                        ],
                    ));
                    ops.push(Operation::new("Do", vec!["Im1".into()]));
                    ops.push(Operation::new("Q", vec![]));
                }
            }
        }
        ops
    }
}

/// Title at the top of the slide followed by bullet lines.
pub fn slide(title: &str, bullets: &[&str]) -> PageSpec {
    let mut page = PageSpec::new().text(title, 40.0, 490.0);
    for (i, bullet) in bullets.iter().enumerate() {
        page = page.text(bullet, 60.0, 400.0 - 40.0 * i as f32);
    }
    page
}

/// Every incremental build of a bulleted slide, one page per bullet.
pub fn builds(title: &str, bullets: &[&str]) -> Vec<PageSpec> {
    (1..=bullets.len())
        .map(|n| slide(title, &bullets[..n]))
        .collect()
}

/// Serialize pages into a PDF document.
///
/// Fonts, the image XObject and the slide MediaBox live on the page tree
/// root and are inherited by every page.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0x00, 0x40, 0x80, 0xFF],
    ));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };
        if page.broken {
            page_dict.set("Contents", 42);
        } else {
            let content = Content {
                operations: page.operations(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            page_dict.set("Contents", content_id);
        }
        if let Some(corners) = page.media_box {
            let corners: Vec<Object> = corners.iter().map(|&c| c.into()).collect();
            page_dict.set("MediaBox", corners);
        }
        if let Some(degrees) = page.rotate {
            page_dict.set("Rotate", degrees);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), SLIDE.0.into(), SLIDE.1.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Write a deck to `path`, creating parent directories.
pub fn write_pdf(path: &std::path::Path, pages: &[PageSpec]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, build_pdf(pages)).unwrap();
}

/// Number of pages in a serialized PDF.
pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).unwrap().get_pages().len()
}
