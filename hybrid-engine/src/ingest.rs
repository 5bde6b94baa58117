use doc_model::{Chunk, IngestOutcome, VectorRecord};
use doc_store::Store;
use doc_chunker::ChunkPolicy;
use embedding_provider::{EmbeddingProvider, Provider};

use crate::errors::Result;

/// Outcome of re-scanning one collection's directory against the store.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub errors: Vec<(String, String)>,
}

/// Walk a collection's root directory for files matching its mask,
/// reindexing any that are new or changed, and retiring any previously
/// active file that has disappeared from disk.
pub fn update_collection(store: &Store, collection_name: &str) -> Result<UpdateReport> {
    let mut report = UpdateReport::default();
    let Some(collection) = store.get_collection(collection_name)? else {
        report.errors.push((collection_name.to_string(), "no such collection".to_string()));
        return Ok(report);
    };

    let pattern = format!("{}/{}", collection.path.trim_end_matches('/'), collection.mask);
    let mut seen = std::collections::BTreeSet::new();

    let entries = glob::glob(&pattern)
        .map_err(|e| crate::errors::EngineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())))?;

    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                report.errors.push((pattern.clone(), e.to_string()));
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let relative = path
            .strip_prefix(&collection.path)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.to_string_lossy().to_string());

        let body = match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                report.errors.push((relative.clone(), e.to_string()));
                continue;
            }
        };

        seen.insert(relative.clone());
        match store.add_or_update_document(&collection.name, &relative, &body) {
            Ok(result) => match result.outcome {
                IngestOutcome::Added => report.added += 1,
                IngestOutcome::Updated => report.updated += 1,
                IngestOutcome::Unchanged => report.unchanged += 1,
            },
            Err(e) => report.errors.push((relative, e.to_string())),
        }
    }

    for existing in store.active_filepaths(&collection.name)? {
        if !seen.contains(&existing) {
            if store.deactivate_document(&collection.name, &existing)? {
                report.removed += 1;
            }
        }
    }

    Ok(report)
}

/// Chunk and embed every active document in a collection under
/// `provider`'s namespace. Documents already embedded under that
/// namespace are skipped unless `force` is set.
#[derive(Debug, Clone, Default)]
pub struct EmbedReport {
    pub documents_embedded: usize,
    pub documents_skipped: usize,
    pub chunks_embedded: usize,
    pub chunks_failed: usize,
}

pub fn embed_collection(store: &Store, provider: &Provider, collection_name: &str, force: bool) -> Result<EmbedReport> {
    let mut report = EmbedReport::default();
    let namespace = provider.namespace();
    let local_counter = provider.as_local().map(|l| move |t: &str| l.count_tokens(t));

    for doc in store.active_documents(collection_name)? {
        if !force && store.has_vectors_for(&doc.content_hash, &namespace)? {
            report.documents_skipped += 1;
            continue;
        }

        let policy = match &local_counter {
            Some(counter) => ChunkPolicy::token_based(counter),
            None => ChunkPolicy::character_based(),
        };
        let pieces = doc_chunker::chunk(&doc.body, &policy);
        if pieces.is_empty() {
            continue;
        }

        let chunks: Vec<Chunk> = pieces
            .iter()
            .enumerate()
            .map(|(seq, piece)| Chunk {
                content_hash: doc.content_hash.clone(),
                seq: seq as u32,
                pos: piece.pos,
                model: namespace.clone(),
                text: piece.text.clone(),
            })
            .collect();

        let documents: Vec<(Option<&str>, &str)> =
            chunks.iter().map(|c| (Some(doc.title.as_str()), c.text.as_str())).collect();
        let embeddings = provider.embed_documents(&documents)?;

        let vectors: Vec<Option<VectorRecord>> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                embedding.as_ref().map(|e| VectorRecord {
                    content_hash: chunk.content_hash.clone(),
                    seq: chunk.seq,
                    model: namespace.clone(),
                    embedding: e.clone(),
                })
            })
            .collect();

        report.chunks_embedded += vectors.iter().filter(|v| v.is_some()).count();
        report.chunks_failed += vectors.iter().filter(|v| v.is_none()).count();

        store.upsert_chunks_and_vectors(&chunks, &vectors)?;
        report.documents_embedded += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_collection_scans_files_and_retires_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A\nhello").unwrap();
        std::fs::write(dir.path().join("b.md"), "# B\nworld").unwrap();

        let store = Store::open_in_memory().unwrap();
        store
            .add_collection("notes", dir.path().to_str().unwrap(), "*.md")
            .unwrap();

        let report = update_collection(&store, "notes").unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.removed, 0);

        std::fs::remove_file(dir.path().join("b.md")).unwrap();
        let report2 = update_collection(&store, "notes").unwrap();
        assert_eq!(report2.unchanged, 1);
        assert_eq!(report2.removed, 1);

        let paths = store.active_filepaths("notes").unwrap();
        assert_eq!(paths, vec!["a.md".to_string()]);
    }

    #[test]
    fn update_collection_reports_unknown_collections_as_errors() {
        let store = Store::open_in_memory().unwrap();
        let report = update_collection(&store, "missing").unwrap();
        assert_eq!(report.errors.len(), 1);
    }
}
