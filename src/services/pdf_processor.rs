use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use lopdf::Document;
use pdf_extract::{output_doc_page, OutputError, PlainTextOutput};

use crate::error::{AppError, AppResult};
use crate::models::{PdfMetadata, ProcessedFile};

pub struct PdfProcessor;

#[derive(Debug)]
pub struct ExtractionResult {
    pub text: String,
    pub pages: usize,
    pub metadata: PdfMetadata,
}

impl ExtractionResult {
    /// True when no page yielded anything but whitespace.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the text of every page, in page order.
    ///
    /// Image-only pages contribute nothing. An empty result is not an error
    /// here; callers decide whether that ends the request.
    pub fn extract_text(&self, file: &ProcessedFile) -> AppResult<ExtractionResult> {
        let start = Instant::now();

        tracing::info!(
            "Starting PDF text extraction for file: {} ({} bytes)",
            file.name,
            file.size
        );

        if !file.is_pdf() {
            return Err(AppError::InvalidFile {
                message: "File is not a valid PDF".to_string(),
            });
        }

        let mut doc = Document::load_mem(&file.content)
            .map_err(|e| AppError::processing(format!("Failed to read PDF: {}", e)))?;
        if doc.is_encrypted() {
            // owner-password-only files open with the empty user password
            doc.decrypt("")
                .map_err(|e| AppError::processing(format!("PDF is encrypted: {}", e)))?;
        }

        let page_texts = doc
            .get_pages()
            .into_keys()
            .map(|page_number| page_text(&doc, page_number))
            .collect::<Vec<_>>();
        let pages = page_texts.len();
        let metadata = PdfMetadata::new(file.size)
            .with_title(info_string(&doc, b"Title"))
            .with_author(info_string(&doc, b"Author"));
        let text = join_pages(page_texts);

        tracing::info!(
            pages = pages,
            text_length = text.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "PDF text extraction finished"
        );

        Ok(ExtractionResult {
            text,
            pages,
            metadata,
        })
    }
}

/// Text of one page through pdf-extract, which understands font encodings
/// and ToUnicode maps. pdf-extract panics on some malformed pages; those,
/// and pages it rejects, go through lopdf's simpler extractor instead.
fn page_text(doc: &Document, page_number: u32) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| render_page(doc, page_number))) {
        Ok(Ok(text)) => return Some(text),
        Ok(Err(e)) => {
            tracing::debug!(page = page_number, error = %e, "pdf-extract failed, trying lopdf");
        }
        Err(_) => {
            tracing::warn!(page = page_number, "pdf-extract crashed, trying lopdf");
        }
    }

    match doc.extract_text(&[page_number]) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!(page = page_number, error = %e, "Page yielded no text");
            None
        }
    }
}

fn render_page(doc: &Document, page_number: u32) -> Result<String, OutputError> {
    let mut text = String::new();
    {
        let mut output = PlainTextOutput::new(&mut text);
        output_doc_page(doc, &mut output, page_number)?;
    }
    Ok(text)
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenates page texts, each trimmed and followed by a newline. Pages
/// without text are left out entirely.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut text = String::new();
    for page in pages.into_iter().flatten() {
        let page = page.trim();
        if page.is_empty() {
            continue;
        }
        text.push_str(page);
        text.push('\n');
    }
    text
}

/// First `limit` characters of the text followed by an ellipsis marker.
pub fn make_preview(text: &str, limit: usize) -> String {
    let mut preview: String = text.chars().take(limit).collect();
    preview.push_str("...");
    preview
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_ref = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_object(info_ref).ok()?.as_dict().ok()?;
    let raw = info.get(key).ok()?.as_str().ok()?;
    let decoded = decode_pdf_string(raw);
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decodes a PDF text string: UTF-16 with a byte order mark, or bytes that
/// look like BOM-less UTF-16BE, otherwise lossy UTF-8.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        decode_utf16(rest, u16::from_be_bytes)
    } else if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        decode_utf16(rest, u16::from_le_bytes)
    } else if looks_like_utf16(bytes) {
        decode_utf16(bytes, u16::from_be_bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn looks_like_utf16(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }
    // more than a third of the bytes null
    let null_count = bytes.iter().filter(|&&b| b == 0).count();
    null_count > bytes.len() / 3
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .filter_map(Result::ok)
        .filter(|&ch| ch != '\0')
        .collect()
}
