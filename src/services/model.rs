use std::sync::Arc;
use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::services::beam::GenerationParams;

/// A loaded tokenizer + sequence-to-sequence model pair.
pub trait TextGenerator: Send + Sync {
    /// Tokenizes `text`, runs generation and decodes the result without
    /// special tokens.
    fn generate(&self, text: &str, params: &GenerationParams) -> anyhow::Result<String>;
}

/// Builds a [`TextGenerator`]. May download weights and block for a while.
pub trait ModelLoader: Send + Sync {
    fn model_id(&self) -> &str;

    fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>>;
}

/// Holds the process-wide model pair, loading it on first use.
///
/// A failed load leaves the cache empty so that a later request can try
/// again; a successful one is kept until the process exits.
pub struct ModelCache {
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn TextGenerator>>,
}

impl ModelCache {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.loader.model_id()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn get_or_load(&self) -> AppResult<Arc<dyn TextGenerator>> {
        self.model
            .get_or_try_init(|| {
                info!(model_id = self.loader.model_id(), "Loading summarization model");
                self.loader.load().map_err(|e| {
                    error!(model_id = self.loader.model_id(), error = %e, "Model loading failed");
                    AppError::summarization(format!("{:#}", e))
                })
            })
            .map(Arc::clone)
    }
}
