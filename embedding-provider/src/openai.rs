use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::errors::{EmbedderError, Result};
use crate::http::with_retry;
use crate::provider::EmbeddingProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_BATCH: usize = 100;

/// Known dimensions for OpenAI's published embedding models, used so a
/// dimension doesn't have to be learned from a live call before the
/// first embed. Models absent from this table fall back to
/// auto-detection from the first response.
fn known_dimension(model_id: &str) -> Option<usize> {
    match model_id {
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
}

pub struct OpenAiEmbedder {
    config: OpenAiConfig,
    client: reqwest::blocking::Client,
    dimension: OnceLock<usize>,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EmbedderError::InvalidConfiguration {
                message: "OpenAI-compatible provider requires an API key".into(),
            });
        }
        let dimension = OnceLock::new();
        if let Some(d) = known_dimension(&config.model_id) {
            let _ = dimension.set(d);
        }
        let client = reqwest::blocking::Client::new();
        Ok(Self { config, client, dimension })
    }

    fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Option<Vec<f32>>>> {
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let body = EmbeddingsRequest { model: &self.config.model_id, input: texts };

        let response = with_retry(|| {
            self.client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
        });

        let response = match response {
            Ok(r) => r,
            Err(_) => return Ok(vec![None; texts.len()]),
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "openai embeddings request failed");
            return Ok(vec![None; texts.len()]);
        }

        let parsed: EmbeddingsResponse = match response.json() {
            Ok(p) => p,
            Err(err) => {
                return Err(EmbedderError::ProviderFailure {
                    message: format!("unexpected response shape from OpenAI-compatible embeddings endpoint: {err}"),
                })
            }
        };

        if let Some(first) = parsed.data.first() {
            let _ = self.dimension.set(first.embedding.len());
        }

        let mut out = vec![None; texts.len()];
        for datum in parsed.data {
            if let Some(slot) = out.get_mut(datum.index) {
                *slot = Some(datum.embedding);
            }
        }
        Ok(out)
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimension.get().copied().unwrap_or(0)
    }

    fn has_tokenizer(&self) -> bool {
        false
    }

    fn embed(&self, text: &str, _is_query: bool) -> Result<Option<Vec<f32>>> {
        Ok(self.embed_chunk(&[text])?.pop().flatten())
    }

    fn embed_batch(&self, texts: &[&str], _is_query: bool) -> Result<Vec<Option<Vec<f32>>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            out.extend(self.embed_chunk(chunk)?);
        }
        Ok(out)
    }
}
