use std::collections::BTreeMap;

use doc_model::DocumentHit;
use doc_store::Store;
use embedding_provider::{EmbeddingProvider, Provider};

use crate::errors::{EngineError, Result};

/// Component F: semantic search over chunk embeddings, collapsed back
/// to one hit per document.
///
/// Queries the namespaced vector table for `provider` with a wide
/// oversample (`limit * 4` chunks) since several chunks of the same
/// document can appear among the nearest neighbors; only the
/// best-scoring chunk per document survives the collapse.
pub fn search(
    store: &Store,
    provider: &Provider,
    query: &str,
    limit: usize,
    collection: Option<&str>,
) -> Result<Vec<DocumentHit>> {
    let embedding = provider
        .embed(query, true)?
        .ok_or(EngineError::NoActiveProvider)?;

    let namespace = provider.namespace();
    let oversample = limit.saturating_mul(4).max(limit);
    let chunk_hits = store.knn(&namespace, &embedding, oversample)?;

    let mut best_per_doc: BTreeMap<String, f32> = BTreeMap::new();
    for hit in &chunk_hits {
        best_per_doc
            .entry(hit.content_hash.clone())
            .and_modify(|s| *s = s.max(hit.similarity))
            .or_insert(hit.similarity);
    }

    let hashes: Vec<String> = best_per_doc.keys().cloned().collect();
    let docs = store.documents_by_hash(&hashes)?;

    let mut hits: Vec<DocumentHit> = best_per_doc
        .into_iter()
        .filter_map(|(hash, score)| {
            let (filepath, doc_collection, docid, title) = docs.get(&hash)?.clone();
            if let Some(wanted) = collection {
                if doc_collection != wanted {
                    return None;
                }
            }
            Some(DocumentHit {
                docid,
                collection: doc_collection,
                filepath,
                title,
                score,
                snippet: None,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Chunk, VectorRecord};

    // `search` needs a live `Provider` to format and embed the query text,
    // which in turn needs a real ONNX session or network access; these
    // tests exercise the collapse-to-best-chunk-per-document logic that
    // `search` layers on top of `Store::knn` directly instead.

    fn fake_namespace() -> String {
        doc_model::namespace_key("local", "test-model")
    }

    #[test]
    fn knn_surfaces_the_best_scoring_chunk_among_several_for_one_document() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "hello world").unwrap();
        let hash = doc_model::content_hash("hello world");
        let namespace = fake_namespace();

        let c0 = Chunk { content_hash: hash.clone(), seq: 0, pos: 0, model: namespace.clone(), text: "hello".into() };
        let c1 = Chunk { content_hash: hash.clone(), seq: 1, pos: 5, model: namespace.clone(), text: "world".into() };
        let v0 = VectorRecord { content_hash: hash.clone(), seq: 0, model: namespace.clone(), embedding: vec![0.2, 0.0] };
        let v1 = VectorRecord { content_hash: hash.clone(), seq: 1, model: namespace.clone(), embedding: vec![1.0, 0.0] };
        store.upsert_chunks_and_vectors(&[c0, c1], &[Some(v0), Some(v1)]).unwrap();

        let chunk_hits = store.knn(&namespace, &[1.0, 0.0], 10).unwrap();
        assert_eq!(chunk_hits.len(), 2);
        let best = chunk_hits.iter().map(|h| h.similarity).fold(0.0_f32, f32::max);
        assert!(best > 0.9);

        let docs = store.documents_by_hash(&[hash.clone()]).unwrap();
        assert_eq!(docs.get(&hash).map(|(_, c, ..)| c.as_str()), Some("notes"));
    }
}
