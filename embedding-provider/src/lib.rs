//! Embedding providers behind one capability set: a local ONNX model and
//! two HTTP-backed remote APIs. See [`provider::EmbeddingProvider`].

mod errors;
mod gemini;
mod http;
mod local;
mod openai;
mod provider;

pub use errors::{EmbedderError, Result};
pub use gemini::{GeminiConfig, GeminiEmbedder, DEFAULT_BASE_URL as GEMINI_DEFAULT_BASE_URL};
pub use local::{LocalConfig, LocalEmbedder, DEFAULT_LOCAL_DIMENSION};
pub use openai::{OpenAiConfig, OpenAiEmbedder, DEFAULT_BASE_URL as OPENAI_DEFAULT_BASE_URL};
pub use provider::EmbeddingProvider;

/// A concrete embedding backend. Dispatch is a tagged enum rather than a
/// trait object so construction-time configuration errors are caught in
/// one place per variant.
pub enum Provider {
    Local(LocalEmbedder),
    OpenAi(OpenAiEmbedder),
    Gemini(GeminiEmbedder),
}

impl EmbeddingProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::Local(p) => p.name(),
            Provider::OpenAi(p) => p.name(),
            Provider::Gemini(p) => p.name(),
        }
    }

    fn model_id(&self) -> &str {
        match self {
            Provider::Local(p) => p.model_id(),
            Provider::OpenAi(p) => p.model_id(),
            Provider::Gemini(p) => p.model_id(),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Provider::Local(p) => p.dimensions(),
            Provider::OpenAi(p) => p.dimensions(),
            Provider::Gemini(p) => p.dimensions(),
        }
    }

    fn has_tokenizer(&self) -> bool {
        match self {
            Provider::Local(p) => p.has_tokenizer(),
            Provider::OpenAi(p) => p.has_tokenizer(),
            Provider::Gemini(p) => p.has_tokenizer(),
        }
    }

    fn format_query(&self, query: &str) -> String {
        match self {
            Provider::Local(p) => p.format_query(query),
            Provider::OpenAi(p) => p.format_query(query),
            Provider::Gemini(p) => p.format_query(query),
        }
    }

    fn format_document(&self, title: Option<&str>, body: &str) -> String {
        match self {
            Provider::Local(p) => p.format_document(title, body),
            Provider::OpenAi(p) => p.format_document(title, body),
            Provider::Gemini(p) => p.format_document(title, body),
        }
    }

    fn embed(&self, text: &str, is_query: bool) -> Result<Option<Vec<f32>>> {
        match self {
            Provider::Local(p) => p.embed(text, is_query),
            Provider::OpenAi(p) => p.embed(text, is_query),
            Provider::Gemini(p) => p.embed(text, is_query),
        }
    }

    fn embed_batch(&self, texts: &[&str], is_query: bool) -> Result<Vec<Option<Vec<f32>>>> {
        match self {
            Provider::Local(p) => p.embed_batch(texts, is_query),
            Provider::OpenAi(p) => p.embed_batch(texts, is_query),
            Provider::Gemini(p) => p.embed_batch(texts, is_query),
        }
    }

    fn embed_documents(&self, documents: &[(Option<&str>, &str)]) -> Result<Vec<Option<Vec<f32>>>> {
        match self {
            Provider::Local(p) => p.embed_documents(documents),
            Provider::OpenAi(p) => p.embed_documents(documents),
            Provider::Gemini(p) => p.embed_documents(documents),
        }
    }
}

impl Provider {
    /// `true` for the local variant, the only one whose tokenizer can
    /// also drive `doc-chunker`'s token-based policy.
    pub fn as_local(&self) -> Option<&LocalEmbedder> {
        match self {
            Provider::Local(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        dim: usize,
    }

    impl EmbeddingProvider for Fake {
        fn name(&self) -> &str {
            "fake"
        }
        fn model_id(&self) -> &str {
            "fake-1"
        }
        fn dimensions(&self) -> usize {
            self.dim
        }
        fn has_tokenizer(&self) -> bool {
            false
        }
        fn embed(&self, text: &str, _is_query: bool) -> Result<Option<Vec<f32>>> {
            Ok(Some(vec![text.len() as f32; self.dim]))
        }
    }

    #[test]
    fn default_embed_batch_calls_embed_per_text() {
        let provider = Fake { dim: 3 };
        let out = provider.embed_batch(&["a", "bb"], false).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Some(vec![1.0, 1.0, 1.0]));
        assert_eq!(out[1], Some(vec![2.0, 2.0, 2.0]));
    }

    struct Templated {
        dim: usize,
    }

    impl EmbeddingProvider for Templated {
        fn name(&self) -> &str {
            "templated"
        }
        fn model_id(&self) -> &str {
            "templated-1"
        }
        fn dimensions(&self) -> usize {
            self.dim
        }
        fn has_tokenizer(&self) -> bool {
            false
        }
        fn format_document(&self, title: Option<&str>, body: &str) -> String {
            format!("title: {} | text: {body}", title.unwrap_or("none"))
        }
        // `embed`'s reported length is what a caller can inspect to prove
        // the template was applied exactly once rather than twice.
        fn embed(&self, text: &str, _is_query: bool) -> Result<Option<Vec<f32>>> {
            Ok(Some(vec![text.len() as f32; self.dim]))
        }
    }

    #[test]
    fn embed_documents_applies_the_template_exactly_once_and_keeps_the_title() {
        let provider = Templated { dim: 1 };
        let expected = provider.format_document(Some("My Title"), "body text");
        let out = provider.embed_documents(&[(Some("My Title"), "body text")]).unwrap();
        assert_eq!(out[0], Some(vec![expected.len() as f32]));
        assert!(expected.starts_with("title: My Title |"));
    }

    #[test]
    fn namespace_combines_provider_and_model() {
        let provider = Fake { dim: 3 };
        assert_eq!(provider.namespace(), "fake/fake-1");
    }
}
