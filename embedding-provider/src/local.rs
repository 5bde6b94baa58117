use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use ndarray::Array2;
use ort::{session::Session, value::Tensor, Error as OrtError};
use tokenizers::{Encoding, Tokenizer};

use crate::errors::{EmbedderError, Result};
use crate::provider::EmbeddingProvider;

/// Default dimension of the bundled local embedding model.
pub const DEFAULT_LOCAL_DIMENSION: usize = 768;

#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub model_path: PathBuf,
    pub runtime_library_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub dimension: usize,
    pub max_input_length: usize,
    pub model_id: String,
}

static ORT_RUNTIME_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Runs a local ONNX embedding model through the bundled ONNX Runtime
/// shared library, mean-pooling token states over the attention mask.
#[derive(Debug)]
pub struct LocalEmbedder {
    model_id: String,
    dimension: usize,
    max_input_length: usize,
    session: Mutex<Session>,
    tokenizer: Arc<Tokenizer>,
    pad_id: i64,
}

struct PreparedBatch {
    input_ids: Tensor<i64>,
    attention_mask: Tensor<i64>,
    attention_rows: Vec<Vec<i64>>,
}

impl LocalEmbedder {
    pub fn new(config: LocalConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(EmbedderError::InvalidConfiguration {
                message: "dimension must be greater than zero".into(),
            });
        }
        if config.max_input_length == 0 {
            return Err(EmbedderError::InvalidConfiguration {
                message: "max_input_length must be greater than zero".into(),
            });
        }

        let runtime_library_path =
            resolve_existing_path(&config.runtime_library_path, "ONNX Runtime shared library")?;
        ensure_ort_initialized(&runtime_library_path)?;

        let model_path = resolve_existing_path(&config.model_path, "ONNX model")?;
        let tokenizer_path = resolve_existing_path(&config.tokenizer_path, "tokenizer config")?;

        let session = Session::builder()
            .map_err(|err| map_ort_error("create session builder", err))?
            .commit_from_file(&model_path)
            .map_err(|err| map_ort_error("load ONNX model", err))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|err| map_tokenizer_error("load tokenizer", err))?;

        let pad_id = tokenizer
            .token_to_id("<pad>")
            .ok_or_else(|| EmbedderError::InvalidConfiguration {
                message: format!("tokenizer `{}` does not declare a `<pad>` token", tokenizer_path.display()),
            })? as i64;

        Ok(Self {
            model_id: config.model_id,
            dimension: config.dimension,
            max_input_length: config.max_input_length,
            session: Mutex::new(session),
            tokenizer: Arc::new(tokenizer),
            pad_id,
        })
    }

    /// Expose the tokenizer's token count for a piece of text, used by
    /// `doc-chunker`'s token-based policy.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.encode(text, false).map(|e| e.len()).unwrap_or(0)
    }

    fn prepare_encodings(&self, texts: &[&str]) -> Result<Vec<Encoding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = texts
            .iter()
            .map(|t| self.tokenizer.encode(*t, true))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| map_tokenizer_error("tokenize inputs", err))?;

        let max_len = encodings.iter().map(Encoding::len).max().unwrap_or(0);
        if max_len > self.max_input_length {
            return Err(EmbedderError::InputTooLong {
                max_length: self.max_input_length,
                actual_length: max_len,
            });
        }
        Ok(encodings)
    }

    fn build_input_tensors(&self, encodings: &[Encoding]) -> Result<PreparedBatch> {
        let batch = encodings.len();
        let seq_len = encodings.iter().map(Encoding::len).max().unwrap_or(0);

        let mut input_ids = Array2::<i64>::zeros((batch, seq_len));
        let mut attention_mask = Array2::<i64>::zeros((batch, seq_len));
        let mut attention_rows = Vec::with_capacity(batch);

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            for (col, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[(row, col)] = id as i64;
                attention_mask[(row, col)] = m as i64;
            }
            for col in ids.len()..seq_len {
                input_ids[(row, col)] = self.pad_id;
                attention_mask[(row, col)] = 0;
            }
            attention_rows.push((0..seq_len).map(|i| attention_mask[(row, i)]).collect::<Vec<i64>>());
        }

        let input_ids = Tensor::from_array(input_ids).map_err(|err| map_ort_error("prepare input_ids", err))?;
        let attention_mask =
            Tensor::from_array(attention_mask).map_err(|err| map_ort_error("prepare attention_mask", err))?;

        Ok(PreparedBatch { input_ids, attention_mask, attention_rows })
    }

    fn run_session(&self, input_ids: Tensor<i64>, attention_mask: Tensor<i64>) -> Result<(Vec<f32>, usize, usize, usize)> {
        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![input_ids, attention_mask])
            .map_err(|err| map_ort_error("execute ONNX session", err))?;

        let output = &outputs[0];
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(|err| map_ort_error("extract output tensor", err))?;

        if shape.len() != 3 {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return Err(EmbedderError::ProviderFailure {
                message: format!("model output must be rank-3 [batch, seq_len, hidden], got shape {dims:?}"),
            });
        }

        let batch: usize = shape[0].try_into().unwrap();
        let seq_len: usize = shape[1].try_into().unwrap();
        let hidden: usize = shape[2].try_into().unwrap();
        Ok((data.to_vec(), batch, seq_len, hidden))
    }

    fn mean_pool(&self, data: &[f32], attention_rows: &[Vec<i64>], seq_len: usize, hidden: usize) -> Vec<Vec<f32>> {
        let batch = attention_rows.len();
        let mut results = Vec::with_capacity(batch);
        for b in 0..batch {
            let mut sum = vec![0f32; hidden];
            let mut count = 0f32;
            for t in 0..seq_len {
                if attention_rows[b][t] == 1 {
                    let base = (b * seq_len + t) * hidden;
                    for h in 0..hidden {
                        sum[h] += data[base + h];
                    }
                    count += 1.0;
                }
            }
            if count > 0.0 {
                for v in sum.iter_mut() {
                    *v /= count;
                }
            }
            results.push(sum);
        }
        results
    }

    fn embed_raw(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self.prepare_encodings(texts)?;
        let prepared = self.build_input_tensors(&encodings)?;
        let expected_seq_len = encodings.iter().map(Encoding::len).max().unwrap_or(0);

        let (raw_data, batch, seq_len_from_model, hidden) = self.run_session(prepared.input_ids, prepared.attention_mask)?;

        if batch != prepared.attention_rows.len() {
            return Err(EmbedderError::ProviderFailure {
                message: format!("model returned batch size {batch}, but prepared {} attention masks", prepared.attention_rows.len()),
            });
        }
        if seq_len_from_model != expected_seq_len {
            return Err(EmbedderError::ProviderFailure {
                message: format!("model returned sequence length {seq_len_from_model}, expected {expected_seq_len}"),
            });
        }

        Ok(self.mean_pool(&raw_data, &prepared.attention_rows, expected_seq_len, hidden))
    }
}

impl EmbeddingProvider for LocalEmbedder {
    fn name(&self) -> &str {
        "local"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn has_tokenizer(&self) -> bool {
        true
    }

    fn format_query(&self, query: &str) -> String {
        format!("task: search result | query: {query}")
    }

    fn format_document(&self, title: Option<&str>, body: &str) -> String {
        format!("title: {} | text: {body}", title.unwrap_or("none"))
    }

    fn embed(&self, text: &str, is_query: bool) -> Result<Option<Vec<f32>>> {
        let formatted = if is_query { self.format_query(text) } else { self.format_document(None, text) };
        match self.embed_raw(&[&formatted]) {
            Ok(mut vectors) => Ok(vectors.pop()),
            Err(EmbedderError::InputTooLong { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn embed_batch(&self, texts: &[&str], is_query: bool) -> Result<Vec<Option<Vec<f32>>>> {
        let formatted: Vec<String> = texts
            .iter()
            .map(|t| if is_query { self.format_query(t) } else { self.format_document(None, t) })
            .collect();
        let refs: Vec<&str> = formatted.iter().map(String::as_str).collect();
        // One padded batch through the ONNX session per call.
        match self.embed_raw(&refs) {
            Ok(vectors) => Ok(vectors.into_iter().map(Some).collect()),
            Err(EmbedderError::InputTooLong { .. }) => Ok(vec![None; texts.len()]),
            Err(err) => Err(err),
        }
    }

    fn embed_documents(&self, documents: &[(Option<&str>, &str)]) -> Result<Vec<Option<Vec<f32>>>> {
        let formatted: Vec<String> = documents
            .iter()
            .map(|(title, body)| self.format_document(*title, body))
            .collect();
        let refs: Vec<&str> = formatted.iter().map(String::as_str).collect();
        // Bypass embed_batch here: it re-applies format_document with a
        // hardcoded `None` title, which would both double-format and
        // drop the real title.
        match self.embed_raw(&refs) {
            Ok(vectors) => Ok(vectors.into_iter().map(Some).collect()),
            Err(EmbedderError::InputTooLong { .. }) => Ok(vec![None; documents.len()]),
            Err(err) => Err(err),
        }
    }
}

fn ensure_ort_initialized(runtime_library_path: &Path) -> Result<()> {
    if let Some(existing) = ORT_RUNTIME_PATH.get() {
        if !paths_equal(existing, runtime_library_path) {
            return Err(EmbedderError::InvalidConfiguration {
                message: format!(
                    "ONNX Runtime already initialized with library `{}`; cannot reinitialize with `{}`",
                    existing.display(),
                    runtime_library_path.display()
                ),
            });
        }
    } else {
        let _ = ORT_RUNTIME_PATH.set(runtime_library_path.to_path_buf());
    }

    ort::init_from(runtime_library_path.to_string_lossy().to_string())
        .with_name("doc-search")
        .commit()
        .map_err(|err| map_ort_error("initialize ONNX Runtime environment", err))?;
    Ok(())
}

fn resolve_existing_path(path: &Path, description: &str) -> Result<PathBuf> {
    fs::metadata(path).map_err(|_| EmbedderError::InvalidConfiguration {
        message: format!("{description} `{}` does not exist", path.display()),
    })?;
    path.canonicalize().map_err(|err| EmbedderError::ProviderFailure {
        message: format!("failed to canonicalize {description} `{}`: {err}", path.display()),
    })
}

fn paths_equal(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn map_ort_error(context: &str, err: OrtError) -> EmbedderError {
    EmbedderError::ProviderFailure { message: format!("{context} failed: {err}") }
}

fn map_tokenizer_error(context: &str, err: tokenizers::Error) -> EmbedderError {
    EmbedderError::ProviderFailure { message: format!("{context} failed: {err}") }
}
