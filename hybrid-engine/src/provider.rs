use std::path::PathBuf;

use embedding_provider::{
    GeminiConfig, GeminiEmbedder, LocalConfig, LocalEmbedder, OpenAiConfig, OpenAiEmbedder, Provider, GEMINI_DEFAULT_BASE_URL,
};

use crate::config::Env;
use crate::errors::{EngineError, Result};

/// Construct the local ONNX-backed provider from explicit model paths.
/// Model download/placement under `Env::models_dir()` is the caller's
/// responsibility; this only wires paths the caller already resolved
/// into a running embedder.
pub fn build_local(model_id: &str, model_path: PathBuf, tokenizer_path: PathBuf, runtime_library_path: PathBuf) -> Result<Provider> {
    let config = LocalConfig {
        model_path,
        runtime_library_path,
        tokenizer_path,
        dimension: embedding_provider::DEFAULT_LOCAL_DIMENSION,
        max_input_length: 512,
        model_id: model_id.to_string(),
    };
    Ok(Provider::Local(LocalEmbedder::new(config)?))
}

/// Construct the OpenAI-compatible provider, reading the API key and
/// base URL from the environment (`OPENAI_API_KEY`, `OPENAI_BASE_URL`).
pub fn build_openai(model_id: &str) -> Result<Provider> {
    let api_key = Env::openai_api_key().ok_or_else(|| EngineError::MissingApiKey("openai".to_string()))?;
    let config = OpenAiConfig {
        api_key,
        base_url: Env::openai_base_url(),
        model_id: model_id.to_string(),
    };
    Ok(Provider::OpenAi(OpenAiEmbedder::new(config)?))
}

/// Construct the Gemini provider, reading the API key from `GEMINI_API_KEY`.
pub fn build_gemini(model_id: &str) -> Result<Provider> {
    let api_key = Env::gemini_api_key().ok_or_else(|| EngineError::MissingApiKey("gemini".to_string()))?;
    let config = GeminiConfig {
        api_key,
        base_url: GEMINI_DEFAULT_BASE_URL.to_string(),
        model_id: model_id.to_string(),
    };
    Ok(Provider::Gemini(GeminiEmbedder::new(config)?))
}

/// Paths a `local` provider needs that have no equivalent for the two
/// HTTP-backed providers.
pub struct LocalPaths {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub runtime_library_path: PathBuf,
}

/// Construct whichever provider `name` names (`local`, `openai`, or
/// `gemini`), the single entry point the `provider [name]` CLI verb's
/// underlying engine call goes through. Unrecognized names are a
/// surfaced error rather than a silent fallback to whatever was active
/// before.
pub fn build_by_name(name: &str, model_id: &str, local_paths: Option<&LocalPaths>) -> Result<Provider> {
    match name {
        "local" => {
            let paths = local_paths.ok_or(EngineError::MissingLocalPaths)?;
            build_local(model_id, paths.model_path.clone(), paths.tokenizer_path.clone(), paths.runtime_library_path.clone())
        }
        "openai" => build_openai(model_id),
        "gemini" => build_gemini(model_id),
        other => Err(EngineError::UnknownProvider(other.to_string())),
    }
}

pub fn set_active(store: &doc_store::Store, name: &str, model_id: &str) -> Result<()> {
    store.set_active_provider(name, model_id)?;
    Ok(())
}

pub fn active(store: &doc_store::Store) -> Result<Option<(String, String)>> {
    Ok(store.active_provider()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_without_an_api_key_is_a_missing_api_key_error() {
        std::env::remove_var("OPENAI_API_KEY");
        let err = build_openai("text-embedding-3-small").unwrap_err();
        assert!(matches!(err, EngineError::MissingApiKey(name) if name == "openai"));
    }

    #[test]
    fn gemini_without_an_api_key_is_a_missing_api_key_error() {
        std::env::remove_var("GEMINI_API_KEY");
        let err = build_gemini("text-embedding-004").unwrap_err();
        assert!(matches!(err, EngineError::MissingApiKey(name) if name == "gemini"));
    }

    #[test]
    fn set_and_read_back_active_provider() {
        let store = doc_store::Store::open_in_memory().unwrap();
        assert_eq!(active(&store).unwrap(), None);
        set_active(&store, "local", "ruri-v3-onnx").unwrap();
        assert_eq!(active(&store).unwrap(), Some(("local".to_string(), "ruri-v3-onnx".to_string())));
    }

    #[test]
    fn build_by_name_rejects_an_unknown_provider() {
        let err = build_by_name("anthropic", "claude", None).unwrap_err();
        assert!(matches!(err, EngineError::UnknownProvider(name) if name == "anthropic"));
    }

    #[test]
    fn build_by_name_requires_local_paths_for_the_local_provider() {
        let err = build_by_name("local", "ruri-v3-onnx", None).unwrap_err();
        assert!(matches!(err, EngineError::MissingLocalPaths));
    }
}
