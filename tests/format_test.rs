//! Integration tests for pluggable formats and comparators.

use std::path::Path;
use std::sync::{Arc, Mutex};

use unbuild::collapse::{Collapser, ContainmentComparator, SignatureComparator};
use unbuild::error::Result;
use unbuild::format::{Deck, DeckFormat, FormatRegistry, PdfDeckFormat};
use unbuild::model::{is_partition, ContentSignature, Primitive, PrimitiveKind};
use unbuild::{
    BuildDirection, DedupOptions, DocumentFormat, DuplicateKeep, Error, Pipeline,
};

/// Deck whose pages are lists of words, one word per line.
struct WordDeck {
    pages: Vec<Vec<String>>,
    written: Arc<Mutex<Vec<usize>>>,
}

impl Deck for WordDeck {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_pages(&self, _options: &DedupOptions) -> Result<Vec<Result<ContentSignature>>> {
        Ok(self
            .pages
            .iter()
            .map(|words| {
                let primitives = words
                    .iter()
                    .enumerate()
                    .map(|(line, w)| {
                        Primitive::keyed(
                            PrimitiveKind::Text,
                            &[w.as_bytes()],
                            10.0,
                            500.0 - 20.0 * line as f32,
                        )
                    })
                    .collect();
                Ok(ContentSignature::new(720.0, 540.0, primitives))
            })
            .collect())
    }

    fn rebuild(&mut self, kept: &[usize], _options: &DedupOptions) -> Result<Vec<u8>> {
        self.written.lock().unwrap().extend_from_slice(kept);
        let text: Vec<String> = kept.iter().map(|&i| self.pages[i].join(" ")).collect();
        Ok(text.join("\n").into_bytes())
    }
}

/// Format reading `.words` files: pages separated by blank lines.
struct WordFormat {
    written: Arc<Mutex<Vec<usize>>>,
}

impl DeckFormat for WordFormat {
    fn supported_extensions(&self) -> &[&str] {
        &["words", "wds"]
    }

    fn name(&self) -> &str {
        "words"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Deck>> {
        self.open_bytes(std::fs::read(path)?)
    }

    fn open_bytes(&self, bytes: Vec<u8>) -> Result<Box<dyn Deck>> {
        let text = String::from_utf8(bytes).map_err(|e| Error::Other(e.to_string()))?;
        let pages = text
            .split("\n\n")
            .map(|page| page.lines().map(str::to_string).collect())
            .collect();
        Ok(Box::new(WordDeck {
            pages,
            written: Arc::clone(&self.written),
        }))
    }
}

/// Relates pages whose first line matches.
struct FirstLineComparator;

impl SignatureComparator for FirstLineComparator {
    fn contains(&self, inner: &ContentSignature, outer: &ContentSignature) -> bool {
        match (inner.primitives().first(), outer.primitives().first()) {
            (Some(a), Some(b)) => a.key == b.key,
            _ => false,
        }
    }

    fn name(&self) -> &str {
        "first-line"
    }
}

fn words_page(words: &[&str]) -> ContentSignature {
    let primitives = words
        .iter()
        .enumerate()
        .map(|(line, w)| {
            Primitive::keyed(PrimitiveKind::Text, &[w.as_bytes()], 10.0, 500.0 - 20.0 * line as f32)
        })
        .collect();
    ContentSignature::new(720.0, 540.0, primitives)
}

#[test]
fn test_registry_register_custom_format() {
    let mut registry = FormatRegistry::with_defaults();
    registry.register(Arc::new(WordFormat {
        written: Arc::new(Mutex::new(Vec::new())),
    }));

    assert!(registry.supports("pdf"));
    assert!(registry.supports("words"));
    assert!(registry.supports("WDS"));
    assert_eq!(registry.get_by_name("words").unwrap().name(), "words");
    assert_eq!(registry.supported_extensions(), vec!["pdf", "wds", "words"]);
}

#[test]
fn test_registry_replaces_handler_for_extension() {
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(PdfDeckFormat::new()));
    assert_eq!(registry.get_by_extension("pdf").unwrap().name(), "pdf");
    assert!(registry.get_by_extension("words").is_none());
}

#[test]
fn test_pipeline_with_custom_format() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("talk.words");
    let dst = dir.path().join("out/talk.words");
    std::fs::write(&src, "Intro\n\nIntro\nmore\n\nOutro").unwrap();

    let written = Arc::new(Mutex::new(Vec::new()));
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(WordFormat {
        written: Arc::clone(&written),
    }));
    let pipeline = Pipeline::with_registry(Arc::new(registry), DedupOptions::default()).unwrap();

    assert!(pipeline.supports(&src));
    let report = pipeline.process_path(&src, &dst).unwrap();

    assert_eq!(report.kept, vec![1, 2]);
    assert_eq!(*written.lock().unwrap(), vec![1, 2]);
    assert_eq!(
        std::fs::read_to_string(&dst).unwrap(),
        "Intro more\nOutro"
    );
}

#[test]
fn test_pipeline_rejects_unregistered_extension() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("talk.words");
    std::fs::write(&src, "Intro").unwrap();

    let pipeline = Pipeline::new(DedupOptions::default()).unwrap();
    assert!(!pipeline.supports(&src));
    let result = pipeline.process_path(&src, &dir.path().join("out.words"));
    assert!(matches!(result, Err(Error::DocumentUnreadable { .. })));
}

#[test]
fn test_collapser_with_custom_comparator() {
    let pages = vec![
        words_page(&["Topic", "old"]),
        words_page(&["Topic", "new"]),
        words_page(&["Next", "x"]),
    ];

    let collapser = Collapser::with_comparator(
        Box::new(FirstLineComparator),
        BuildDirection::Forward,
        DuplicateKeep::Earliest,
        0.5,
    );
    let collapse = collapser.collapse(&pages);
    assert_eq!(collapse.kept, vec![1, 2]);
    assert_eq!(collapse.removed_count(), 1);

    let default = Collapser::with_comparator(
        Box::new(ContainmentComparator::new(0.5)),
        BuildDirection::Forward,
        DuplicateKeep::Earliest,
        0.5,
    );
    assert!(default.collapse(&pages).is_identity());
}

#[test]
fn test_partition_over_generated_decks() {
    // Every deck built from a small alphabet of slides must partition cleanly.
    let alphabet: [&[&str]; 5] = [
        &["A"],
        &["A", "a1"],
        &["A", "a1", "a2"],
        &["B"],
        &["B", "b1"],
    ];

    let option_sets = [
        DedupOptions::default(),
        DedupOptions::new().with_direction(BuildDirection::Reverse),
        DedupOptions::new()
            .with_direction(BuildDirection::Either)
            .with_keep(DuplicateKeep::Latest),
        DedupOptions::new().header_band(0.1),
    ];

    for seed in 0u32..200 {
        let mut state = seed.wrapping_mul(2654435761).wrapping_add(12345);
        let len = (seed % 9) as usize;
        let deck: Vec<ContentSignature> = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                words_page(alphabet[(state % 5) as usize])
            })
            .collect();

        for options in &option_sets {
            let collapse = Collapser::new(options).collapse(&deck);
            assert!(is_partition(&collapse.runs, deck.len()));
            assert!(collapse.kept.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(collapse.kept.is_empty(), deck.is_empty());
            for run in &collapse.runs {
                assert!(run.pages().contains(&run.representative));
            }
        }
    }
}
