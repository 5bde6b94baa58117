//! Shared value types for the document store, chunker, embedding and
//! hybrid-retrieval crates.
//!
//! Nothing in this crate talks to SQLite, a tokenizer, or the network;
//! it only defines the shapes everyone else agrees on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest;

/// Number of leading hex characters of `content_hash` used as the short
/// display identifier (`#xxxxxx`).
pub const DOCID_LEN: usize = 6;

/// SHA-256 hex digest of a document body, used as `Document::content_hash`.
pub fn content_hash(body: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive the short docid from a full content hash.
pub fn docid_from_hash(hash: &str) -> String {
    hash.chars().take(DOCID_LEN).collect()
}

/// A named, rooted set of files under a glob mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub path: String,
    pub mask: String,
}

impl Collection {
    pub const DEFAULT_MASK: &'static str = "**/*.md";

    pub fn new(name: impl Into<String>, path: impl Into<String>, mask: Option<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mask: mask.unwrap_or_else(|| Self::DEFAULT_MASK.to_string()),
        }
    }
}

/// A markdown file's indexed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Row id, `None` before the first insert.
    pub id: Option<i64>,
    pub collection: String,
    pub filepath: String,
    pub title: String,
    pub body: String,
    pub content_hash: String,
    pub docid: String,
    pub active: bool,
}

impl Document {
    /// Build a fresh, not-yet-persisted document from file contents.
    /// `title` falls back to the filename stem when no top-level heading
    /// is present.
    pub fn from_body(collection: impl Into<String>, filepath: impl Into<String>, body: String) -> Self {
        let filepath = filepath.into();
        let hash = content_hash(&body);
        let docid = docid_from_hash(&hash);
        let title = extract_title(&body).unwrap_or_else(|| filename_stem(&filepath));
        Self {
            id: None,
            collection: collection.into(),
            filepath,
            title,
            body,
            content_hash: hash,
            docid,
            active: true,
        }
    }
}

/// First top-level markdown heading (`# Title`), if any.
pub fn extract_title(body: &str) -> Option<String> {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("# ") {
            let t = rest.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        } else if trimmed == "#" {
            continue;
        }
    }
    None
}

/// Filename without its extension, used as a title fallback.
pub fn filename_stem(filepath: &str) -> String {
    let name = filepath.rsplit('/').next().unwrap_or(filepath);
    match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Fold punctuation in a provider/model pair into a storage-safe namespace
/// key, e.g. `"openai" , "text-embedding-3-small"` ->
/// `"openai/text-embedding-3-small"`, further folded to
/// `openai_text_embedding_3_small` for use as a SQL identifier suffix.
pub fn namespace_key(provider: &str, model_id: &str) -> String {
    format!("{provider}/{model_id}")
}

/// Fold `namespace_key`'s punctuation into characters safe for a SQL
/// identifier: `vectors_vec_<provider>_<model>`.
pub fn fold_identifier(namespace: &str) -> String {
    namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// A substring of a document body used as one embedding input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content_hash: String,
    /// 0-based order within the document.
    pub seq: u32,
    /// Character offset of the chunk start within the original body.
    pub pos: usize,
    /// `"<provider>/<model-id>"`, also the chunking policy identifier.
    pub model: String,
    pub text: String,
}

/// A fixed-length embedding vector tied to one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub content_hash: String,
    pub seq: u32,
    pub model: String,
    pub embedding: Vec<f32>,
}

/// Free-text description attached to a virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathContext {
    /// `qmd://<collection>[/subpath]` or `/` for global context.
    pub vpath: String,
    pub text: String,
}

/// Purposes an `LLMCache` row can be written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CachePurpose {
    Expand,
    Rerank,
}

impl CachePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            CachePurpose::Expand => "expand",
            CachePurpose::Rerank => "rerank",
        }
    }
}

/// Result of `add_or_update_document`: what happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    Added,
    Unchanged,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub outcome: IngestOutcome,
    pub content_hash: String,
    pub docid: String,
}

/// A document search hit with collection-level metadata attached, shared
/// by BM25 and vector search result shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHit {
    pub docid: String,
    pub collection: String,
    pub filepath: String,
    pub title: String,
    pub score: f32,
    pub snippet: Option<String>,
}

/// Counts reported by `Store::status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStatus {
    pub collections: BTreeMap<String, CollectionStatus>,
    pub total_documents: i64,
    pub total_chunks: i64,
    /// Vector row counts keyed by `"<provider>/<model>"`.
    pub vectors_by_model: BTreeMap<String, i64>,
    pub active_provider: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStatus {
    pub document_count: i64,
}

/// Timestamp helper so callers don't each pick their own format.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub type Timestamp = DateTime<Utc>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_first_top_level_heading() {
        let body = "# Hello World\nsome body text\n# Not This One";
        assert_eq!(extract_title(body).as_deref(), Some("Hello World"));
    }

    #[test]
    fn title_falls_back_to_filename_stem() {
        assert_eq!(extract_title("no heading here"), None);
        assert_eq!(filename_stem("notes/a.md"), "a");
        assert_eq!(filename_stem("a"), "a");
    }

    #[test]
    fn docid_is_six_hex_chars_of_content_hash() {
        let doc = Document::from_body("notes", "a.md", "# Title\nhello world".to_string());
        assert_eq!(doc.docid.len(), DOCID_LEN);
        assert_eq!(doc.docid, &doc.content_hash[..DOCID_LEN]);
        assert_eq!(doc.title, "Title");
    }

    #[test]
    fn unchanged_body_produces_stable_hash() {
        let a = content_hash("same body");
        let b = content_hash("same body");
        assert_eq!(a, b);
    }

    #[test]
    fn namespace_key_folds_to_safe_identifier() {
        let ns = namespace_key("openai", "text-embedding-3-small");
        assert_eq!(ns, "openai/text-embedding-3-small");
        assert_eq!(fold_identifier(&ns), "openai_text_embedding_3_small");
    }
}
