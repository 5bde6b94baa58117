use std::path::PathBuf;

/// Static, runtime-immutable configuration read from the environment.
/// Everything the engine can change at runtime (active provider/model)
/// lives in `doc_store::Store`'s settings table instead — this is only
/// for values that precede opening the store at all.
pub struct Env;

impl Env {
    fn cache_home() -> PathBuf {
        std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
                home.join(".cache")
            })
    }

    pub fn index_db_path() -> PathBuf {
        Self::cache_home().join("qmd").join("index.sqlite")
    }

    pub fn models_dir() -> PathBuf {
        Self::cache_home().join("qmd").join("models")
    }

    pub fn openai_api_key() -> Option<String> {
        std::env::var("OPENAI_API_KEY").ok()
    }

    pub fn openai_base_url() -> String {
        std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| embedding_provider::OPENAI_DEFAULT_BASE_URL.to_string())
    }

    pub fn gemini_api_key() -> Option<String> {
        std::env::var("GEMINI_API_KEY").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_db_path_lands_under_qmd() {
        let path = Env::index_db_path();
        assert!(path.ends_with("qmd/index.sqlite") || path.ends_with("qmd\\index.sqlite"));
    }
}
