use std::env;
use anyhow::{Result, Context};
use tracing::{info, warn};

use crate::services::beam::GenerationParams;
use crate::services::chunker::ChunkingSettings;

/// Positional limit of the default T5 checkpoints, used when no explicit
/// output cap is configured.
pub const DEFAULT_MAX_SUMMARY_TOKENS: usize = 512;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub model_id: String,
    pub model_revision: String,
    pub task_prefix: String,
    pub chunk_max_words: usize,
    pub chunk_min_words: usize,
    pub max_input_tokens: usize,
    pub min_summary_tokens: usize,
    pub max_summary_tokens: Option<usize>,
    pub num_beams: usize,
    pub length_penalty: f64,
    pub early_stopping: bool,
    pub preview_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            max_file_size_mb: 20,
            model_id: "google-t5/t5-small".to_string(),
            model_revision: "main".to_string(),
            task_prefix: "summarize: ".to_string(),
            chunk_max_words: 200,
            chunk_min_words: 50,
            max_input_tokens: 1024,
            min_summary_tokens: 100,
            max_summary_tokens: None,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
            preview_chars: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let defaults = Config::default();

        let config = Config {
            server_host: Self::string_env_var("SERVER_HOST", &defaults.server_host),
            server_port: Self::parse_env_var("SERVER_PORT", defaults.server_port)
                .context("Failed to parse SERVER_PORT")?,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            model_id: Self::string_env_var("SUMMARY_MODEL_ID", &defaults.model_id),
            model_revision: Self::string_env_var("SUMMARY_MODEL_REVISION", &defaults.model_revision),
            task_prefix: Self::string_env_var("SUMMARY_TASK_PREFIX", &defaults.task_prefix),
            chunk_max_words: Self::parse_env_var("CHUNK_MAX_WORDS", defaults.chunk_max_words)
                .context("Failed to parse CHUNK_MAX_WORDS")?,
            chunk_min_words: Self::parse_env_var("CHUNK_MIN_WORDS", defaults.chunk_min_words)
                .context("Failed to parse CHUNK_MIN_WORDS")?,
            max_input_tokens: Self::parse_env_var("MAX_INPUT_TOKENS", defaults.max_input_tokens)
                .context("Failed to parse MAX_INPUT_TOKENS")?,
            min_summary_tokens: Self::parse_env_var("SUMMARY_MIN_TOKENS", defaults.min_summary_tokens)
                .context("Failed to parse SUMMARY_MIN_TOKENS")?,
            max_summary_tokens: Self::optional_env_var("SUMMARY_MAX_TOKENS"),
            num_beams: Self::parse_env_var("NUM_BEAMS", defaults.num_beams)
                .context("Failed to parse NUM_BEAMS")?,
            length_penalty: Self::parse_env_var("LENGTH_PENALTY", defaults.length_penalty)
                .context("Failed to parse LENGTH_PENALTY")?,
            early_stopping: Self::parse_env_var("EARLY_STOPPING", defaults.early_stopping)
                .context("Failed to parse EARLY_STOPPING")?,
            preview_chars: Self::parse_env_var("PREVIEW_CHARS", defaults.preview_chars)
                .context("Failed to parse PREVIEW_CHARS")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    /// Settings for splitting extracted text into word windows.
    pub fn chunking(&self) -> ChunkingSettings {
        ChunkingSettings {
            max_words: self.chunk_max_words,
            min_words: self.chunk_min_words,
        }
    }

    /// Decoding parameters handed to the model for every window.
    pub fn generation(&self) -> GenerationParams {
        GenerationParams {
            min_length: self.min_summary_tokens,
            max_length: self.max_summary_tokens.unwrap_or(DEFAULT_MAX_SUMMARY_TOKENS),
            num_beams: self.num_beams,
            length_penalty: self.length_penalty,
            early_stopping: self.early_stopping,
        }
    }

    fn string_env_var(var_name: &str, default: &str) -> String {
        env::var(var_name).unwrap_or_else(|_| {
            info!("{} not set, using default: {:?}", var_name, default);
            default.to_string()
        })
    }

    fn optional_env_var(var_name: &str) -> Option<usize> {
        match env::var(var_name) {
            Ok(val) => match val.parse() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (leaving unset)", var_name, e);
                    None
                }
            },
            Err(_) => None,
        }
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.chunk_max_words == 0 {
            return Err(anyhow::anyhow!("CHUNK_MAX_WORDS must be greater than 0"));
        }
        if self.chunk_min_words >= self.chunk_max_words {
            return Err(anyhow::anyhow!(
                "CHUNK_MIN_WORDS ({}) must be smaller than CHUNK_MAX_WORDS ({})",
                self.chunk_min_words,
                self.chunk_max_words
            ));
        }
        if self.max_input_tokens == 0 {
            return Err(anyhow::anyhow!("MAX_INPUT_TOKENS must be greater than 0"));
        }
        if self.num_beams == 0 {
            return Err(anyhow::anyhow!("NUM_BEAMS must be greater than 0"));
        }
        // an unset SUMMARY_MAX_TOKENS still caps generation
        let max_length = self.generation().max_length;
        if max_length <= self.min_summary_tokens {
            return Err(anyhow::anyhow!(
                "SUMMARY_MAX_TOKENS ({}) must exceed SUMMARY_MIN_TOKENS ({})",
                max_length,
                self.min_summary_tokens
            ));
        }
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}
