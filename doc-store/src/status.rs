use doc_model::{CollectionStatus, StoreStatus};

use crate::errors::Result;
use crate::Store;

impl Store {
    /// Aggregate counts across collections, documents, chunks, and vectors
    /// per embedding model, plus whichever provider/model is currently
    /// active.
    pub fn status(&self) -> Result<StoreStatus> {
        let conn = self.conn.lock().unwrap();

        let mut collections = std::collections::BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT c.name, COUNT(d.id) FROM collections c
                 LEFT JOIN documents d ON d.collection = c.name AND d.active = 1
                 GROUP BY c.name",
            )?;
            let rows = stmt.query_map([], |row| {
                let name: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((name, count))
            })?;
            for r in rows {
                let (name, count) = r?;
                collections.insert(name, CollectionStatus { document_count: count });
            }
        }

        let total_documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents WHERE active = 1", [], |r| r.get(0))?;

        let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM content_vectors", [], |r| r.get(0))?;

        let mut vectors_by_model = std::collections::BTreeMap::new();
        {
            let mut stmt = conn.prepare("SELECT model, COUNT(*) FROM content_vectors GROUP BY model")?;
            let rows = stmt.query_map([], |row| {
                let model: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((model, count))
            })?;
            for r in rows {
                let (model, count) = r?;
                vectors_by_model.insert(model, count);
            }
        }

        drop(conn);
        let active_provider = self.active_provider()?.map(|(p, m)| doc_model::namespace_key(&p, &m));

        Ok(StoreStatus {
            collections,
            total_documents,
            total_chunks,
            vectors_by_model,
            active_provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_documents_and_collections() {
        let store = Store::open_in_memory().unwrap();
        store.add_collection("notes", "/tmp/notes", "**/*.md").unwrap();
        store.add_or_update_document("notes", "a.md", "hello").unwrap();
        store.add_or_update_document("notes", "b.md", "world").unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.total_documents, 2);
        assert_eq!(status.collections.get("notes").unwrap().document_count, 2);
        assert_eq!(status.active_provider, None);
    }

    #[test]
    fn status_reports_active_provider_and_vector_counts() {
        let store = Store::open_in_memory().unwrap();
        store.set_active_provider("local", "ruri-v3-onnx").unwrap();
        let chunk = doc_model::Chunk {
            content_hash: "h".into(),
            seq: 0,
            pos: 0,
            model: "local/ruri-v3-onnx".into(),
            text: "x".into(),
        };
        store.upsert_chunks_and_vectors(&[chunk], &[None]).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.active_provider.as_deref(), Some("local/ruri-v3-onnx"));
        assert_eq!(status.vectors_by_model.get("local/ruri-v3-onnx").copied(), Some(1));
    }
}
