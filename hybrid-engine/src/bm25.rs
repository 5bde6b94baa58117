use doc_model::DocumentHit;
use doc_store::Store;

use crate::errors::Result;

/// Component E: plain keyword search. Thin pass-through to the FTS5
/// BM25 ranking already built into the store; the hybrid pipeline is
/// what turns this into one signal among several.
pub fn search(store: &Store, query: &str, limit: usize, collection: Option<&str>) -> Result<Vec<DocumentHit>> {
    Ok(store.fts_search(query, limit, collection)?)
}
