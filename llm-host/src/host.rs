use std::time::Duration;

use embedding_provider::{EmbeddingProvider, LocalConfig, LocalEmbedder};

use crate::errors::Result;
use crate::generator_model::{GeneratorConfig, GeneratorModel};
use crate::reranker_model::{RerankerConfig, RerankerModel};
use crate::slot::ModelSlot;

/// How long a model's context may sit idle before the next call rebuilds
/// it from the still-loaded weights.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct HostConfig {
    pub embedding: LocalConfig,
    pub reranker: RerankerConfig,
    pub generator: GeneratorConfig,
    pub idle_timeout: Duration,
}

/// Single process-wide owner of the three local model instances
/// (embedding, reranker, generator). Each is built on first use and kept
/// warm until `idle_timeout` passes without a call; the next call after
/// that rebuilds it transparently. Callers never see a raw model
/// reference, only the scoped methods below, so release-on-exit (even on
/// failure) is automatic.
pub struct Host {
    embedding: ModelSlot<LocalEmbedder>,
    reranker: ModelSlot<RerankerModel>,
    generator: ModelSlot<GeneratorModel>,
}

impl Host {
    pub fn new(config: HostConfig) -> Self {
        let idle_timeout = config.idle_timeout;
        let embedding_cfg = config.embedding;
        let reranker_cfg = config.reranker;
        let generator_cfg = config.generator;

        Host {
            embedding: ModelSlot::new(idle_timeout, move || {
                LocalEmbedder::new(embedding_cfg.clone()).map_err(|e| crate::errors::HostError::InferenceFailure(e.to_string()))
            }),
            reranker: ModelSlot::new(idle_timeout, move || RerankerModel::new(reranker_cfg.clone())),
            generator: ModelSlot::new(idle_timeout, move || GeneratorModel::new(generator_cfg.clone())),
        }
    }

    pub fn embed(&self, text: &str, is_query: bool) -> Result<Option<Vec<f32>>> {
        self.embedding
            .with(|embedder| embedder.embed(text, is_query).map_err(|e| crate::errors::HostError::InferenceFailure(e.to_string())))
    }

    pub fn embed_batch(&self, texts: &[&str], is_query: bool) -> Result<Vec<Option<Vec<f32>>>> {
        self.embedding.with(|embedder| {
            embedder
                .embed_batch(texts, is_query)
                .map_err(|e| crate::errors::HostError::InferenceFailure(e.to_string()))
        })
    }

    pub fn embedding_model_id(&self) -> Result<String> {
        self.embedding.with(|e| Ok(e.model_id().to_string()))
    }

    pub fn rerank_pair(&self, query: &str, excerpt: &str) -> Result<f32> {
        self.reranker.with(|model| model.score_pair(query, excerpt))
    }

    pub fn reranker_model_id(&self) -> Result<String> {
        self.reranker.with(|m| Ok(m.model_id().to_string()))
    }

    pub fn generate(&self, prompt: &str) -> Result<String> {
        self.generator.with(|model| model.generate(prompt))
    }

    pub fn generator_model_id(&self) -> Result<String> {
        self.generator.with(|m| Ok(m.model_id().to_string()))
    }

    pub fn reranker_is_warm(&self) -> bool {
        self.reranker.is_warm()
    }

    pub fn generator_is_warm(&self) -> bool {
        self.generator.is_warm()
    }
}
