//! Shared fixtures: in-memory PDFs and fake summarization models.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use synopsis::services::beam::GenerationParams;
use synopsis::services::{ModelLoader, TextGenerator};

/// Builds a PDF with one page per entry. Empty entries become pages with
/// no text operators, like a scanned page.
pub fn build_pdf(pages: &[&str], title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Author" => Object::string_literal("Jane Analyst"),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("pdf serializes");
    buffer
}

/// `count` distinct words: `{prefix}0 {prefix}1 ...`.
pub fn words(prefix: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Answers with the first word of each window; fails on windows that
/// contain `FAIL`.
pub struct EchoGenerator;

impl TextGenerator for EchoGenerator {
    fn generate(&self, text: &str, _params: &GenerationParams) -> anyhow::Result<String> {
        if text.contains("FAIL") {
            anyhow::bail!("generation exploded");
        }
        let first = text.split_whitespace().next().unwrap_or_default();
        Ok(format!("  summary of {}  ", first))
    }
}

/// Always fails.
pub struct BrokenGenerator;

impl TextGenerator for BrokenGenerator {
    fn generate(&self, _text: &str, _params: &GenerationParams) -> anyhow::Result<String> {
        anyhow::bail!("out of memory")
    }
}

/// Counts how often the model is actually built.
#[derive(Clone, Default)]
pub struct CountingLoader {
    pub loads: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingLoader {
    pub fn failing() -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for CountingLoader {
    fn model_id(&self) -> &str {
        "test/echo"
    }

    fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("weights not found");
        }
        Ok(Arc::new(EchoGenerator))
    }
}
