use std::path::PathBuf;
use std::sync::Mutex;

use ndarray::Array2;
use ort::{session::Session, value::Tensor};
use tokenizers::Tokenizer;

use crate::errors::{HostError, Result};
use crate::onnx_support::{ensure_ort_initialized, resolve_existing_path};

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    pub model_path: PathBuf,
    pub runtime_library_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub max_input_length: usize,
    pub model_id: String,
}

/// Cross-encoder reranker: scores a (query, excerpt) pair with a single
/// forward pass, reading a 2-logit `[no, yes]` classification head off
/// the model's output and converting it to a probability via softmax.
pub struct RerankerModel {
    model_id: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_input_length: usize,
}

impl RerankerModel {
    pub fn new(config: RerankerConfig) -> Result<Self> {
        let runtime_library_path = resolve_existing_path(&config.runtime_library_path, "ONNX Runtime shared library")?;
        ensure_ort_initialized(&runtime_library_path)?;

        let model_path = resolve_existing_path(&config.model_path, "reranker ONNX model")?;
        let tokenizer_path = resolve_existing_path(&config.tokenizer_path, "reranker tokenizer config")?;

        let session = Session::builder()
            .map_err(|e| HostError::InferenceFailure(format!("create reranker session builder: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| HostError::InferenceFailure(format!("load reranker model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| HostError::InferenceFailure(format!("load reranker tokenizer: {e}")))?;

        Ok(Self {
            model_id: config.model_id,
            session: Mutex::new(session),
            tokenizer,
            max_input_length: config.max_input_length,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Score one (query, excerpt) pair in `[0, 1]`, the probability the
    /// model assigns to "yes, relevant".
    pub fn score_pair(&self, query: &str, excerpt: &str) -> Result<f32> {
        let text = format!("query: {query} document: {excerpt} relevant:");
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| HostError::InferenceFailure(format!("tokenize rerank input: {e}")))?;

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
        if ids.len() > self.max_input_length {
            ids.truncate(self.max_input_length);
            mask.truncate(self.max_input_length);
        }
        let seq_len = ids.len();

        let input_ids = Array2::from_shape_vec((1, seq_len), ids)
            .map_err(|e| HostError::InferenceFailure(format!("shape input_ids: {e}")))?;
        let attention_mask = Array2::from_shape_vec((1, seq_len), mask)
            .map_err(|e| HostError::InferenceFailure(format!("shape attention_mask: {e}")))?;

        let input_ids = Tensor::from_array(input_ids)
            .map_err(|e| HostError::InferenceFailure(format!("prepare input_ids tensor: {e}")))?;
        let attention_mask = Tensor::from_array(attention_mask)
            .map_err(|e| HostError::InferenceFailure(format!("prepare attention_mask tensor: {e}")))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![input_ids, attention_mask])
            .map_err(|e| HostError::InferenceFailure(format!("execute reranker session: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| HostError::InferenceFailure(format!("extract reranker logits: {e}")))?;

        let logits: &[f32] = match shape.last() {
            Some(2) => &data[data.len() - 2..],
            _ => {
                return Err(HostError::InferenceFailure(format!(
                    "reranker output must end in a 2-logit [no, yes] head, got shape {shape:?}"
                )))
            }
        };

        Ok(softmax_yes(logits[0], logits[1]))
    }
}

fn softmax_yes(no_logit: f32, yes_logit: f32) -> f32 {
    let m = no_logit.max(yes_logit);
    let no_exp = (no_logit - m).exp();
    let yes_exp = (yes_logit - m).exp();
    (yes_exp / (no_exp + yes_exp)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_yes_is_bounded_and_monotone() {
        assert!((softmax_yes(0.0, 0.0) - 0.5).abs() < 1e-6);
        assert!(softmax_yes(0.0, 5.0) > 0.9);
        assert!(softmax_yes(5.0, 0.0) < 0.1);
    }
}
