use crate::errors::Result;

/// Shared capability set every embedding backend exposes. Provider name
/// and model id together form the storage namespace key
/// (`doc_model::namespace_key`).
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn has_tokenizer(&self) -> bool;

    /// Format a user query for this provider. Local models need an
    /// explicit instruction prefix; remote APIs take raw text.
    fn format_query(&self, query: &str) -> String {
        query.to_string()
    }

    /// Format a document body (with optional title) for this provider.
    fn format_document(&self, _title: Option<&str>, body: &str) -> String {
        body.to_string()
    }

    /// Embed one text. `Ok(None)` signals a transient per-item failure
    /// (network error, provider overload after retries); callers record
    /// it as a missing embedding and continue rather than aborting a
    /// bulk job. `Err` is reserved for failures that make the whole
    /// provider instance unusable.
    fn embed(&self, text: &str, is_query: bool) -> Result<Option<Vec<f32>>>;

    /// Embed a batch. The default implementation calls `embed` once per
    /// text; providers with a native batch endpoint override this.
    fn embed_batch(&self, texts: &[&str], is_query: bool) -> Result<Vec<Option<Vec<f32>>>> {
        texts.iter().map(|t| self.embed(t, is_query)).collect()
    }

    /// Embed a batch of documents, each carrying its own optional title.
    /// Formats every `(title, body)` pair through `format_document`
    /// exactly once, so this is the entry point ingestion should use
    /// instead of pre-formatting and calling `embed_batch`: a provider
    /// that formats internally (the local model) would apply its
    /// template twice on top of an already-formatted string. The default
    /// suits providers whose `format_document` is the identity (OpenAI,
    /// Gemini); `Local` overrides it to avoid `embed_batch`'s own
    /// internal formatting.
    fn embed_documents(&self, documents: &[(Option<&str>, &str)]) -> Result<Vec<Option<Vec<f32>>>> {
        let formatted: Vec<String> = documents
            .iter()
            .map(|(title, body)| self.format_document(*title, body))
            .collect();
        let refs: Vec<&str> = formatted.iter().map(String::as_str).collect();
        self.embed_batch(&refs, false)
    }

    fn namespace(&self) -> String {
        doc_model::namespace_key(self.name(), self.model_id())
    }
}
