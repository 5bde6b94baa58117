use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("invalid embedder configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("input text exceeds max length of {max_length} tokens, actual length: {actual_length}")]
    InputTooLong { max_length: usize, actual_length: usize },

    #[error("provider failure: {message}")]
    ProviderFailure { message: String },
}

pub type Result<T> = std::result::Result<T, EmbedderError>;
