use std::collections::BTreeMap;

use doc_model::{fold_identifier, Chunk, VectorRecord};
use rusqlite::{params, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::Store;

/// One chunk-level vector hit before collapsing to a document score.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub content_hash: String,
    pub seq: u32,
    /// Cosine similarity in (0, 1], already converted from distance.
    pub similarity: f32,
}

fn table_name(namespace: &str) -> String {
    format!("vectors_vec_{}", fold_identifier(namespace))
}

fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(v).to_vec()
}

fn blob_to_vec(b: &[u8]) -> Vec<f32> {
    bytemuck::cast_slice(b).to_vec()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
    // Map cosine distance d = 1 - cos to similarity 1/(1+d).
    let distance = (1.0 - cos).max(0.0);
    1.0 / (1.0 + distance)
}

impl Store {
    /// Create the namespaced vector table if it doesn't exist yet.
    pub fn ensure_vector_table(&self, namespace: &str, dims: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        ensure_vector_table_locked(&conn, namespace, dims)
    }

    /// Record chunk metadata (`content_vectors`) and, when supplied, the
    /// matching embedding in the namespaced vector table. `vectors` may be
    /// shorter than `chunks` when some embeddings failed transiently
    /// (a provider yields `null` for a single text rather than failing
    /// the whole batch).
    pub fn upsert_chunks_and_vectors(&self, chunks: &[Chunk], vectors: &[Option<VectorRecord>]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for chunk in chunks {
            tx.execute(
                "INSERT INTO content_vectors (content_hash, seq, pos, model) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(content_hash, seq, model) DO UPDATE SET pos = excluded.pos",
                params![chunk.content_hash, chunk.seq, chunk.pos as i64, chunk.model],
            )?;
        }
        for v in vectors.iter().flatten() {
            let table = table_name(&v.model);
            ensure_vector_table_locked(&tx, &v.model, v.embedding.len())?;
            let hash_seq = format!("{}#{}", v.content_hash, v.seq);
            tx.execute(
                &format!(
                    "INSERT INTO {table} (hash_seq, embedding) VALUES (?1, ?2)
                     ON CONFLICT(hash_seq) DO UPDATE SET embedding = excluded.embedding"
                ),
                params![hash_seq, vec_to_blob(&v.embedding)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Brute-force k-NN: scan every row of the namespaced vector table and
    /// return the top `k` by cosine similarity. Corpora this engine
    /// targets (personal notes) run to low tens of thousands of chunks at
    /// most, where a linear scan is simpler and fast enough than standing
    /// up a dedicated ANN index.
    pub fn knn(&self, namespace: &str, query: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        let conn = self.conn.lock().unwrap();
        let table = table_name(namespace);
        if !table_exists(&conn, &table)? {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!("SELECT hash_seq, embedding FROM {table}"))?;
        let rows = stmt.query_map([], |row| {
            let hash_seq: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((hash_seq, blob))
        })?;

        let mut scored: Vec<ChunkHit> = Vec::new();
        for row in rows {
            let (hash_seq, blob) = row?;
            let Some((hash, seq)) = hash_seq.rsplit_once('#') else { continue };
            let Ok(seq) = seq.parse::<u32>() else { continue };
            let embedding = blob_to_vec(&blob);
            if embedding.len() != query.len() {
                continue;
            }
            let similarity = cosine_similarity(query, &embedding);
            scored.push(ChunkHit {
                content_hash: hash.to_string(),
                seq,
                similarity,
            });
        }
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Look up `(filepath, collection, docid, title)` for a set of active
    /// documents by content hash, used by vector search to hydrate
    /// chunk-level hits back into document hits.
    pub fn documents_by_hash(
        &self,
        hashes: &[String],
    ) -> Result<BTreeMap<String, (String, String, String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut out = BTreeMap::new();
        for hash in hashes {
            if out.contains_key(hash) {
                continue;
            }
            let row: Option<(String, String, String, String)> = conn
                .query_row(
                    "SELECT filepath, collection, docid, title FROM documents
                     WHERE content_hash = ?1 AND active = 1",
                    params![hash],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
                )
                .optional()?;
            if let Some(v) = row {
                out.insert(hash.clone(), v);
            }
        }
        Ok(out)
    }

    /// Delete vector rows (in every namespaced table) and `content_vectors`
    /// rows whose parent document is gone or inactive. Returns the number
    /// of `content_vectors` rows removed.
    pub fn cleanup_orphaned_vectors(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let orphaned_hashes: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT cv.content_hash FROM content_vectors cv
                 WHERE NOT EXISTS (
                     SELECT 1 FROM documents d WHERE d.content_hash = cv.content_hash AND d.active = 1
                 )",
            )?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            let mut v = Vec::new();
            for r in rows {
                v.push(r?);
            }
            v
        };

        if orphaned_hashes.is_empty() {
            return Ok(0);
        }

        let vector_tables = list_vector_tables(&conn)?;
        let mut removed = 0usize;
        for hash in &orphaned_hashes {
            removed += conn.execute("DELETE FROM content_vectors WHERE content_hash = ?1", params![hash])?;
            for table in &vector_tables {
                conn.execute(
                    &format!("DELETE FROM {table} WHERE hash_seq LIKE ?1"),
                    params![format!("{hash}#%")],
                )?;
            }
        }
        tracing::info!(removed, "cleaned up orphaned vectors");
        Ok(removed)
    }

    /// Whether a document's content already has chunk rows recorded
    /// under `model` (the namespace string), used to skip re-chunking
    /// and re-embedding unless the caller asks to force it.
    pub fn has_vectors_for(&self, content_hash: &str, model: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM content_vectors WHERE content_hash = ?1 AND model = ?2",
            params![content_hash, model],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Row counts per vector namespace, keyed by `"<provider>/<model>"`
    /// reconstructed from the folded table name is not attempted here —
    /// callers that need the pretty name should track it themselves;
    /// this returns counts keyed by the raw table suffix.
    pub fn vector_counts(&self) -> Result<BTreeMap<String, i64>> {
        let conn = self.conn.lock().unwrap();
        let tables = list_vector_tables(&conn)?;
        let mut out = BTreeMap::new();
        for table in tables {
            let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            let suffix = table.strip_prefix("vectors_vec_").unwrap_or(&table).to_string();
            out.insert(suffix, count);
        }
        Ok(out)
    }

    pub fn chunk_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM content_vectors", [], |r| r.get(0))
            .map_err(StoreError::from)
    }
}

fn ensure_vector_table_locked(conn: &rusqlite::Connection, namespace: &str, dims: usize) -> Result<()> {
    let table = table_name(namespace);
    conn.execute(
        &format!("CREATE TABLE IF NOT EXISTS {table} (hash_seq TEXT PRIMARY KEY, embedding BLOB NOT NULL)"),
        [],
    )?;
    // Dimension is implicit in blob length; validate against the first
    // existing row rather than storing it separately.
    let existing_len: Option<i64> = conn
        .query_row(&format!("SELECT LENGTH(embedding) FROM {table} LIMIT 1"), [], |r| r.get(0))
        .optional()?;
    if let Some(bytes) = existing_len {
        let existing_dims = (bytes as usize) / std::mem::size_of::<f32>();
        if existing_dims != dims {
            return Err(StoreError::DimensionMismatch {
                expected: existing_dims,
                actual: dims,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &rusqlite::Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?1",
            params![table],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn list_vector_tables(conn: &rusqlite::Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name LIKE 'vectors_vec_%'",
    )?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(xs: &[f32]) -> Vec<f32> {
        xs.to_vec()
    }

    #[test]
    fn knn_collapses_to_nearest_chunk() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "hello").unwrap();
        let chunk = Chunk { content_hash: doc_model::content_hash("hello"), seq: 0, pos: 0, model: "local/m".into(), text: "hello".into() };
        let vector = VectorRecord { content_hash: chunk.content_hash.clone(), seq: 0, model: "local/m".into(), embedding: v(&[1.0, 0.0]) };
        store.upsert_chunks_and_vectors(&[chunk], &[Some(vector)]).unwrap();

        let hits = store.knn("local/m", &[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].similarity > 0.9);
    }

    #[test]
    fn provider_isolation_keeps_tables_independent() {
        let store = Store::open_in_memory().unwrap();
        let c1 = Chunk { content_hash: "h1".into(), seq: 0, pos: 0, model: "local/m".into(), text: "x".into() };
        let v1 = VectorRecord { content_hash: "h1".into(), seq: 0, model: "local/m".into(), embedding: v(&[1.0, 0.0]) };
        store.upsert_chunks_and_vectors(&[c1], &[Some(v1)]).unwrap();

        let c2 = Chunk { content_hash: "h2".into(), seq: 0, pos: 0, model: "openai/text-embedding-3-small".into(), text: "y".into() };
        let v2 = VectorRecord { content_hash: "h2".into(), seq: 0, model: "openai/text-embedding-3-small".into(), embedding: v(&[0.0, 1.0, 0.0]) };
        store.upsert_chunks_and_vectors(&[c2], &[Some(v2)]).unwrap();

        let counts = store.vector_counts().unwrap();
        assert_eq!(counts.get("local_m").copied(), Some(1));
        assert_eq!(counts.get("openai_text_embedding_3_small").copied(), Some(1));
    }

    #[test]
    fn has_vectors_for_reflects_what_was_upserted() {
        let store = Store::open_in_memory().unwrap();
        let hash = doc_model::content_hash("hello");
        assert!(!store.has_vectors_for(&hash, "local/m").unwrap());
        let chunk = Chunk { content_hash: hash.clone(), seq: 0, pos: 0, model: "local/m".into(), text: "hello".into() };
        let vector = VectorRecord { content_hash: hash.clone(), seq: 0, model: "local/m".into(), embedding: v(&[1.0, 0.0]) };
        store.upsert_chunks_and_vectors(&[chunk], &[Some(vector)]).unwrap();
        assert!(store.has_vectors_for(&hash, "local/m").unwrap());
        assert!(!store.has_vectors_for(&hash, "openai/other").unwrap());
    }

    #[test]
    fn cleanup_removes_vectors_for_inactive_documents() {
        let store = Store::open_in_memory().unwrap();
        let hash = doc_model::content_hash("hello");
        store.add_or_update_document("notes", "a.md", "hello").unwrap();
        let chunk = Chunk { content_hash: hash.clone(), seq: 0, pos: 0, model: "local/m".into(), text: "hello".into() };
        let vector = VectorRecord { content_hash: hash.clone(), seq: 0, model: "local/m".into(), embedding: v(&[1.0, 0.0]) };
        store.upsert_chunks_and_vectors(&[chunk], &[Some(vector)]).unwrap();

        // Replacing the body marks the old content_hash's document row inactive.
        store.add_or_update_document("notes", "a.md", "goodbye").unwrap();
        let removed = store.cleanup_orphaned_vectors().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.knn("local/m", &[1.0, 0.0], 5).unwrap().len(), 0);
    }
}
