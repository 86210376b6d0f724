use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingSettings {
    /// Words per window; the last window may be shorter.
    pub max_words: usize,
    /// Windows with this many words or fewer are not summarized.
    pub min_words: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_words: 200,
            min_words: 50,
        }
    }
}

/// A contiguous run of words from the extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordChunk {
    pub index: usize,
    pub word_count: usize,
    pub text: String,
}

impl WordChunk {
    pub fn is_too_short(&self, settings: &ChunkingSettings) -> bool {
        self.word_count <= settings.min_words
    }
}

/// Splits text on whitespace and groups the words into consecutive windows
/// of `settings.max_words`.
pub fn split_into_chunks(text: &str, settings: &ChunkingSettings) -> Vec<WordChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if settings.max_words == 0 {
        return Vec::new();
    }

    words
        .chunks(settings.max_words)
        .enumerate()
        .map(|(index, window)| WordChunk {
            index,
            word_count: window.len(),
            text: window.join(" "),
        })
        .collect()
}
