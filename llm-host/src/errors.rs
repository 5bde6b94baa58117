use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid model configuration: {0}")]
    InvalidConfiguration(String),

    #[error("inference failure: {0}")]
    InferenceFailure(String),

    #[error("store error: {0}")]
    Store(#[from] doc_store::StoreError),
}

pub type Result<T> = std::result::Result<T, HostError>;
