//! T5 summarization backend on candle, with weights fetched from the
//! Hugging Face Hub.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{self, T5ForConditionalGeneration};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::Config;
use crate::services::beam::{beam_search, DecoderStep, GenerationParams};
use crate::services::model::{ModelLoader, TextGenerator};

pub struct T5Loader {
    model_id: String,
    revision: String,
    task_prefix: String,
    max_input_tokens: usize,
}

impl T5Loader {
    pub fn new(
        model_id: impl Into<String>,
        revision: impl Into<String>,
        task_prefix: impl Into<String>,
        max_input_tokens: usize,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            revision: revision.into(),
            task_prefix: task_prefix.into(),
            max_input_tokens,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.model_id.clone(),
            config.model_revision.clone(),
            config.task_prefix.clone(),
            config.max_input_tokens,
        )
    }
}

impl ModelLoader for T5Loader {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        let device = Device::Cpu;

        let api = Api::new().context("Failed to create Hugging Face Hub client")?;
        let repo = api.repo(Repo::with_revision(
            self.model_id.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        let config_path = repo.get("config.json").context("Failed to download config.json")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model.safetensors")?;
        debug!(config = %config_path.display(), weights = %weights_path.display(), "Model files resolved");

        let config_str = std::fs::read_to_string(&config_path).context("Failed to read config.json")?;
        let mut config: t5::Config =
            serde_json::from_str(&config_str).context("Failed to parse config.json")?;
        // beams are re-decoded from their full prefix on every step
        config.use_cache = false;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: self.max_input_tokens,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to set truncation: {}", e))?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)? };
        let model = T5ForConditionalGeneration::load(vb, &config).context("Failed to build T5 model")?;

        info!(model_id = %self.model_id, revision = %self.revision, "Summarization model loaded");

        Ok(Arc::new(T5Summarizer {
            model: Mutex::new(model),
            tokenizer,
            device,
            start_token: config.decoder_start_token_id.unwrap_or(config.pad_token_id) as u32,
            eos_token: config.eos_token_id as u32,
            task_prefix: self.task_prefix.clone(),
        }))
    }
}

pub struct T5Summarizer {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    start_token: u32,
    eos_token: u32,
    task_prefix: String,
}

impl TextGenerator for T5Summarizer {
    fn generate(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let prompt = format!("{}{}", self.task_prefix, text);
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;

        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("model lock poisoned by an earlier panic"))?;
        model.clear_kv_cache();
        let encoder_output = model.encode(&input_ids)?;

        let mut step = T5Step {
            model: &mut *model,
            encoder_output: &encoder_output,
            device: &self.device,
        };
        let ids = beam_search(&mut step, params, self.start_token, self.eos_token)?;
        debug!(input_tokens = encoding.get_ids().len(), output_tokens = ids.len(), "Generation finished");

        self.tokenizer
            .decode(&ids, true)
            .map_err(|e| anyhow!("Decoding failed: {}", e))
    }
}

struct T5Step<'a> {
    model: &'a mut T5ForConditionalGeneration,
    encoder_output: &'a Tensor,
    device: &'a Device,
}

impl DecoderStep for T5Step<'_> {
    fn next_token_logits(&mut self, prefix: &[u32]) -> Result<Vec<f32>> {
        let decoder_ids = Tensor::new(prefix, self.device)?.unsqueeze(0)?;
        let logits = self
            .model
            .decode(&decoder_ids, self.encoder_output)?
            .squeeze(0)?
            .to_dtype(DType::F32)?;
        Ok(logits.to_vec1::<f32>()?)
    }
}
