use serde::{Deserialize, Serialize};

use crate::services::summarizer::{ChunkReport, SummaryReport};

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub data: SummarizeData,
    pub processing_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeData {
    pub file_name: String,
    pub pages: usize,
    pub metadata: PdfMetadata,
    pub preview: String,
    pub summary: String,
    pub chunks: ChunkCounts,
    pub chunk_reports: Vec<ChunkReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub file_size_bytes: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkCounts {
    pub total: usize,
    pub summarized: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SummarizeResponse {
    pub fn new(data: SummarizeData, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            data,
            processing_time_ms,
        }
    }
}

impl PdfMetadata {
    pub fn new(file_size_bytes: usize) -> Self {
        Self {
            title: None,
            author: None,
            file_size_bytes,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }
}

impl From<&SummaryReport> for ChunkCounts {
    fn from(report: &SummaryReport) -> Self {
        Self {
            total: report.chunks.len(),
            summarized: report.summarized_count(),
            skipped: report.skipped_count(),
            failed: report.failed_count(),
        }
    }
}
