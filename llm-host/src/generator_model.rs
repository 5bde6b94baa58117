use std::path::PathBuf;
use std::sync::Mutex;

use ndarray::Array2;
use ort::{session::Session, value::Tensor};
use tokenizers::Tokenizer;

use crate::errors::{HostError, Result};
use crate::onnx_support::{ensure_ort_initialized, resolve_existing_path};

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub model_path: PathBuf,
    pub runtime_library_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub max_input_length: usize,
    pub max_new_tokens: usize,
    pub model_id: String,
}

/// Small causal-LM used for query expansion. Generation is greedy,
/// re-running the full prefix through the session on every step rather
/// than reusing past key/value state — the model and prompts this host
/// targets are small enough that the quadratic-in-length cost doesn't
/// matter, and it avoids plumbing past_key_values through the ONNX
/// graph's I/O contract.
pub struct GeneratorModel {
    model_id: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_input_length: usize,
    max_new_tokens: usize,
    eos_id: Option<i64>,
}

impl GeneratorModel {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let runtime_library_path = resolve_existing_path(&config.runtime_library_path, "ONNX Runtime shared library")?;
        ensure_ort_initialized(&runtime_library_path)?;

        let model_path = resolve_existing_path(&config.model_path, "generator ONNX model")?;
        let tokenizer_path = resolve_existing_path(&config.tokenizer_path, "generator tokenizer config")?;

        let session = Session::builder()
            .map_err(|e| HostError::InferenceFailure(format!("create generator session builder: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| HostError::InferenceFailure(format!("load generator model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| HostError::InferenceFailure(format!("load generator tokenizer: {e}")))?;

        let eos_id = tokenizer.token_to_id("</s>").map(|id| id as i64);

        Ok(Self {
            model_id: config.model_id,
            session: Mutex::new(session),
            tokenizer,
            max_input_length: config.max_input_length,
            max_new_tokens: config.max_new_tokens,
            eos_id,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Greedy-decode a completion for `prompt`.
    pub fn generate(&self, prompt: &str) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| HostError::InferenceFailure(format!("tokenize generation prompt: {e}")))?;

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        if ids.len() > self.max_input_length {
            let cut = ids.len() - self.max_input_length;
            ids.drain(0..cut);
        }
        let prompt_len = ids.len();

        for _ in 0..self.max_new_tokens {
            let next = self.forward_last_token(&ids)?;
            ids.push(next);
            if Some(next) == self.eos_id {
                break;
            }
        }

        let generated = &ids[prompt_len..];
        let generated_u32: Vec<u32> = generated.iter().map(|&id| id as u32).collect();
        self.tokenizer
            .decode(&generated_u32, true)
            .map_err(|e| HostError::InferenceFailure(format!("decode generation output: {e}")))
    }

    fn forward_last_token(&self, ids: &[i64]) -> Result<i64> {
        let seq_len = ids.len();
        let input_ids = Array2::from_shape_vec((1, seq_len), ids.to_vec())
            .map_err(|e| HostError::InferenceFailure(format!("shape input_ids: {e}")))?;
        let attention_mask = Array2::from_shape_vec((1, seq_len), vec![1i64; seq_len])
            .map_err(|e| HostError::InferenceFailure(format!("shape attention_mask: {e}")))?;

        let input_ids = Tensor::from_array(input_ids)
            .map_err(|e| HostError::InferenceFailure(format!("prepare input_ids tensor: {e}")))?;
        let attention_mask = Tensor::from_array(attention_mask)
            .map_err(|e| HostError::InferenceFailure(format!("prepare attention_mask tensor: {e}")))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![input_ids, attention_mask])
            .map_err(|e| HostError::InferenceFailure(format!("execute generator session: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| HostError::InferenceFailure(format!("extract generator logits: {e}")))?;

        if shape.len() != 3 {
            return Err(HostError::InferenceFailure(format!(
                "generator output must be rank-3 [batch, seq_len, vocab], got shape {shape:?}"
            )));
        }
        let vocab: usize = shape[2] as usize;
        let last_row_start = data.len() - vocab;
        let last_logits = &data[last_row_start..];

        let (best_id, _) = last_logits
            .iter()
            .enumerate()
            .fold((0usize, f32::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });

        Ok(best_id as i64)
    }
}
