use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::services::beam::GenerationParams;
use crate::services::chunker::{split_into_chunks, ChunkingSettings};
use crate::services::model::TextGenerator;

/// Shown instead of a summary when no window produced any text.
pub const FALLBACK_SUMMARY: &str = "Unable to generate a summary.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Summarized { text: String },
    Skipped { word_count: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub index: usize,
    pub word_count: usize,
    #[serde(flatten)]
    pub outcome: ChunkOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Every window was summarized.
    Complete,
    /// Some windows were skipped or failed, at least one was summarized.
    Partial,
    /// Nothing was summarized.
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub chunks: Vec<ChunkReport>,
}

impl SummaryReport {
    pub fn summarized_count(&self) -> usize {
        self.count(|o| matches!(o, ChunkOutcome::Summarized { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ChunkOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ChunkOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ChunkOutcome) -> bool) -> usize {
        self.chunks.iter().filter(|c| pred(&c.outcome)).count()
    }

    pub fn status(&self) -> ReportStatus {
        let summarized = self.summarized_count();
        if summarized == 0 {
            ReportStatus::Empty
        } else if summarized == self.chunks.len() {
            ReportStatus::Complete
        } else {
            ReportStatus::Partial
        }
    }

    /// Generated segments in chunk order, separated by single spaces.
    pub fn summary_text(&self) -> Option<String> {
        let segments: Vec<&str> = self
            .chunks
            .iter()
            .filter_map(|c| match &c.outcome {
                ChunkOutcome::Summarized { text } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join(" "))
        }
    }

    pub fn display_text(&self) -> String {
        self.summary_text()
            .unwrap_or_else(|| FALLBACK_SUMMARY.to_string())
    }
}

/// Summarizes a document window by window with an already loaded model.
pub struct ChunkedSummarizer<'a> {
    generator: &'a dyn TextGenerator,
    chunking: ChunkingSettings,
    generation: GenerationParams,
}

impl<'a> ChunkedSummarizer<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        chunking: ChunkingSettings,
        generation: GenerationParams,
    ) -> Self {
        Self {
            generator,
            chunking,
            generation,
        }
    }

    /// Windows are processed one after another. A window that fails is
    /// recorded in the report and does not stop the rest.
    pub fn summarize(&self, text: &str) -> SummaryReport {
        let chunks = split_into_chunks(text, &self.chunking);
        info!(chunks = chunks.len(), "Summarizing document");

        let reports = chunks
            .into_iter()
            .map(|chunk| {
                let outcome = if chunk.is_too_short(&self.chunking) {
                    debug!(chunk = chunk.index, word_count = chunk.word_count, "Skipping short chunk");
                    ChunkOutcome::Skipped {
                        word_count: chunk.word_count,
                    }
                } else {
                    match self.generator.generate(&chunk.text, &self.generation) {
                        Ok(summary) => {
                            debug!(chunk = chunk.index, summary_length = summary.len(), "Chunk summarized");
                            ChunkOutcome::Summarized {
                                text: summary.trim().to_string(),
                            }
                        }
                        Err(e) => {
                            warn!(chunk = chunk.index, error = %e, "Chunk summarization failed");
                            ChunkOutcome::Failed {
                                reason: format!("{:#}", e),
                            }
                        }
                    }
                };
                ChunkReport {
                    index: chunk.index,
                    word_count: chunk.word_count,
                    outcome,
                }
            })
            .collect();

        SummaryReport { chunks: reports }
    }
}
