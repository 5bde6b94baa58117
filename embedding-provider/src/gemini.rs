use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::errors::{EmbedderError, Result};
use crate::http::with_retry;
use crate::provider::EmbeddingProvider;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
}

pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: reqwest::blocking::Client,
    dimension: OnceLock<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EmbedderError::InvalidConfiguration {
                message: "Gemini provider requires an API key".into(),
            });
        }
        let client = reqwest::blocking::Client::new();
        Ok(Self { config, client, dimension: OnceLock::new() })
    }

    fn embed_chunk(&self, texts: &[&str], task_type: &'static str) -> Result<Vec<Option<Vec<f32>>>> {
        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_id,
            self.config.api_key
        );

        let requests = texts
            .iter()
            .map(|t| EmbedContentRequest {
                model: format!("models/{}", self.config.model_id),
                content: Content { parts: vec![Part { text: t.to_string() }] },
                task_type,
            })
            .collect();
        let body = BatchEmbedRequest { requests };

        let response = with_retry(|| self.client.post(&url).json(&body).send());
        let response = match response {
            Ok(r) => r,
            Err(_) => return Ok(vec![None; texts.len()]),
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "gemini batchEmbedContents request failed");
            return Ok(vec![None; texts.len()]);
        }

        let parsed: BatchEmbedResponse = match response.json() {
            Ok(p) => p,
            Err(err) => {
                return Err(EmbedderError::ProviderFailure {
                    message: format!("unexpected response shape from Gemini batchEmbedContents: {err}"),
                })
            }
        };

        if let Some(first) = parsed.embeddings.first() {
            let _ = self.dimension.set(first.values.len());
        }

        Ok(parsed.embeddings.into_iter().map(|e| Some(e.values)).collect())
    }
}

impl EmbeddingProvider for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini"
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

    fn embed(&self, text: &str, is_query: bool) -> Result<Option<Vec<f32>>> {
        let task_type = if is_query { "RETRIEVAL_QUERY" } else { "RETRIEVAL_DOCUMENT" };
        Ok(self.embed_chunk(&[text], task_type)?.pop().flatten())
    }

    fn embed_batch(&self, texts: &[&str], is_query: bool) -> Result<Vec<Option<Vec<f32>>>> {
        let task_type = if is_query { "RETRIEVAL_QUERY" } else { "RETRIEVAL_DOCUMENT" };
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            out.extend(self.embed_chunk(chunk, task_type)?);
        }
        Ok(out)
    }
}
