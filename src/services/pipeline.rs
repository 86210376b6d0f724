use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{PdfMetadata, ProcessedFile};
use crate::services::model::ModelCache;
use crate::services::pdf_processor::{make_preview, PdfProcessor};
use crate::services::summarizer::{ChunkedSummarizer, SummaryReport};

#[derive(Debug)]
pub struct DocumentSummary {
    pub file_name: String,
    pub pages: usize,
    pub metadata: PdfMetadata,
    pub preview: String,
    pub report: SummaryReport,
}

/// Extracts the document, then summarizes it. Blocking; run it off the
/// async executor.
///
/// Extraction finishes before the model is touched, and an empty
/// extraction ends the request without loading or calling the model.
pub fn process_document(
    file: ProcessedFile,
    config: &Config,
    models: &ModelCache,
) -> AppResult<DocumentSummary> {
    let start = Instant::now();

    let extraction = PdfProcessor::new().extract_text(&file)?;
    if extraction.is_empty() {
        return Err(AppError::ExtractionFailed);
    }
    let preview = make_preview(&extraction.text, config.preview_chars);

    let generator = models.get_or_load()?;
    let summarizer = ChunkedSummarizer::new(
        generator.as_ref(),
        config.chunking(),
        config.generation(),
    );
    let report = summarizer.summarize(&extraction.text);

    info!(
        file_name = %file.name,
        pages = extraction.pages,
        summarized = report.summarized_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Document summarized"
    );

    Ok(DocumentSummary {
        file_name: file.name,
        pages: extraction.pages,
        metadata: extraction.metadata,
        preview,
        report,
    })
}
