use doc_model::{content_hash, CachePurpose};
use rusqlite::{params, OptionalExtension};

use crate::errors::Result;
use crate::Store;

impl Store {
    /// Look up a cached LLM response for `(model, purpose, input)`. The
    /// input is hashed rather than stored verbatim so cache keys stay
    /// small regardless of prompt length.
    pub fn get_cached_response(&self, model: &str, purpose: CachePurpose, input: &str) -> Result<Option<String>> {
        let input_hash = content_hash(input);
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT response FROM llm_cache WHERE model = ?1 AND purpose = ?2 AND input_hash = ?3",
            params![model, purpose.as_str(), input_hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn put_cached_response(&self, model: &str, purpose: CachePurpose, input: &str, response: &str) -> Result<()> {
        let input_hash = content_hash(input);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO llm_cache (model, purpose, input_hash, response) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(model, purpose, input_hash) DO UPDATE SET response = excluded.response",
            params![model, purpose.as_str(), input_hash, response],
        )?;
        Ok(())
    }

    /// Drop every cached response. Used when a reranker or expansion
    /// model is swapped out, since cached entries are keyed by model id
    /// but not by the model's weights.
    pub fn delete_llm_cache(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM llm_cache", [])?;
        tracing::info!(removed = n, "cleared llm cache");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_roundtrips_by_model_purpose_and_input() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_cached_response("m", CachePurpose::Expand, "q").unwrap(), None);
        store.put_cached_response("m", CachePurpose::Expand, "q", "[\"a\",\"b\"]").unwrap();
        assert_eq!(
            store.get_cached_response("m", CachePurpose::Expand, "q").unwrap(),
            Some("[\"a\",\"b\"]".to_string())
        );
        // Different purpose, same input: distinct cache entry.
        assert_eq!(store.get_cached_response("m", CachePurpose::Rerank, "q").unwrap(), None);
    }

    #[test]
    fn delete_llm_cache_clears_everything() {
        let store = Store::open_in_memory().unwrap();
        store.put_cached_response("m", CachePurpose::Expand, "q", "r").unwrap();
        assert_eq!(store.delete_llm_cache().unwrap(), 1);
        assert_eq!(store.get_cached_response("m", CachePurpose::Expand, "q").unwrap(), None);
    }
}
