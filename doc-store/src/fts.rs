use doc_model::DocumentHit;
use rusqlite::params;

use crate::errors::Result;
use crate::Store;

impl Store {
    /// Raw FTS5 BM25 query, collection-scoped when `collection` is
    /// `Some`. SQLite's `bm25()` ranker returns increasingly negative
    /// scores for better matches; callers see the positive magnitude.
    pub fn fts_search(&self, query: &str, limit: usize, collection: Option<&str>) -> Result<Vec<DocumentHit>> {
        let conn = self.conn.lock().unwrap();

        let sql = match collection {
            Some(_) => {
                "SELECT d.docid, d.collection, d.filepath, d.title, bm25(documents_fts) AS rank,
                        snippet(documents_fts, 1, '[', ']', '...', 12)
                 FROM documents_fts
                 JOIN documents d ON d.id = documents_fts.rowid
                 WHERE documents_fts MATCH ?1 AND d.active = 1 AND d.collection = ?2
                 ORDER BY rank
                 LIMIT ?3"
            }
            None => {
                "SELECT d.docid, d.collection, d.filepath, d.title, bm25(documents_fts) AS rank,
                        snippet(documents_fts, 1, '[', ']', '...', 12)
                 FROM documents_fts
                 JOIN documents d ON d.id = documents_fts.rowid
                 WHERE documents_fts MATCH ?1 AND d.active = 1
                 ORDER BY rank
                 LIMIT ?2"
            }
        };

        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<DocumentHit> {
            let raw_rank: f64 = row.get(4)?;
            Ok(DocumentHit {
                docid: row.get(0)?,
                collection: row.get(1)?,
                filepath: row.get(2)?,
                title: row.get(3)?,
                score: raw_rank.abs() as f32,
                snippet: row.get(5)?,
            })
        };

        let rows = match collection {
            Some(c) => stmt.query_map(params![query, c, limit as i64], map_row)?,
            None => stmt.query_map(params![query, limit as i64], map_row)?,
        };

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_scores_are_non_negative_after_conversion() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();
        let hits = store.fts_search("hello", 10, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score >= 0.0);
    }

    #[test]
    fn search_is_scoped_to_collection() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("a", "x.md", "shared term").unwrap();
        store.add_or_update_document("b", "y.md", "shared term").unwrap();
        let hits = store.fts_search("shared", 10, Some("a")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].collection, "a");
    }

    #[test]
    fn stale_content_drops_out_of_search() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\ngoodbye world").unwrap();
        assert!(store.fts_search("hello", 10, None).unwrap().is_empty());
        assert_eq!(store.fts_search("goodbye", 10, None).unwrap().len(), 1);
    }
}
