//! Process-wide manager of the three local models the hybrid pipeline
//! needs (embedding, reranker, generator), plus the query-expansion and
//! reranking components built on top of it.

mod errors;
mod expander;
mod generator_model;
mod host;
mod onnx_support;
mod reranker;
mod reranker_model;
mod slot;

pub use errors::{HostError, Result};
pub use expander::expand;
pub use generator_model::{GeneratorConfig, GeneratorModel};
pub use host::{Host, HostConfig, DEFAULT_IDLE_TIMEOUT};
pub use reranker::rerank;
pub use reranker_model::{RerankerConfig, RerankerModel};
