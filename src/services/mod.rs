pub mod beam;
pub mod chunker;
pub mod model;
pub mod pdf_processor;
pub mod pipeline;
pub mod summarizer;
pub mod t5;

pub use model::{ModelCache, ModelLoader, TextGenerator};
pub use pdf_processor::PdfProcessor;
pub use pipeline::{process_document, DocumentSummary};
pub use summarizer::{ChunkedSummarizer, SummaryReport, FALLBACK_SUMMARY};
pub use t5::T5Loader;
