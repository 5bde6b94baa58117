use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] doc_store::StoreError),

    #[error(transparent)]
    Embedder(#[from] embedding_provider::EmbedderError),

    #[error(transparent)]
    Host(#[from] llm_host::HostError),

    #[error("no active embedding provider is configured")]
    NoActiveProvider,

    #[error("invalid collection root: {0}")]
    InvalidCollectionRoot(String),

    #[error("unknown embedding provider: {0}")]
    UnknownProvider(String),

    #[error("missing API key for provider `{0}`")]
    MissingApiKey(String),

    #[error("local provider requires model, tokenizer, and runtime library paths")]
    MissingLocalPaths,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
