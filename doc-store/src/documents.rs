use doc_model::{content_hash, docid_from_hash, Document, IngestOutcome, IngestResult};
use rusqlite::{params, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::fuzzy;
use crate::Store;

/// `find_document` result: either a hit, or a miss carrying fuzzy
/// suggestions (spec: 3-5 nearest paths by edit distance).
#[derive(Debug, Clone)]
pub enum FindOutcome {
    Found(Document),
    NotFound {
        query: String,
        suggestions: Vec<String>,
    },
}

/// One failure entry in a `find_documents` batch.
#[derive(Debug, Clone)]
pub struct MultiGetError {
    pub query: String,
    pub kind: MultiGetErrorKind,
}

#[derive(Debug, Clone)]
pub enum MultiGetErrorKind {
    NotFound,
    Oversize { size: usize, max_bytes: usize },
    AmbiguousDocId { count: usize },
}

#[derive(Debug, Clone, Default)]
pub struct MultiGetResult {
    pub docs: Vec<Document>,
    pub errors: Vec<MultiGetError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub include_body: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiGetOptions {
    pub include_body: bool,
    pub max_bytes: Option<usize>,
}

const SUGGESTION_MAX_DISTANCE: usize = 4;
const SUGGESTION_LIMIT: usize = 5;

impl Store {
    /// Insert or update one document's indexed snapshot.
    ///
    /// If `body`'s hash matches the current active row for
    /// `(collection, filepath)` this is a no-op (`Unchanged`). Otherwise
    /// the previous active row (if any) is marked inactive and a fresh
    /// active row is inserted (`Added` or `Updated`).
    pub fn add_or_update_document(
        &self,
        collection: &str,
        filepath: &str,
        body: &str,
    ) -> Result<IngestResult> {
        let hash = content_hash(body);
        let docid = docid_from_hash(&hash);
        let conn = self.conn.lock().unwrap();

        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, content_hash FROM documents
                 WHERE collection = ?1 AND filepath = ?2 AND active = 1",
                params![collection, filepath],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let outcome = match existing {
            Some((_, existing_hash)) if existing_hash == hash => IngestOutcome::Unchanged,
            Some((existing_id, _)) => {
                conn.execute(
                    "UPDATE documents SET active = 0 WHERE id = ?1",
                    params![existing_id],
                )?;
                insert_active(&conn, collection, filepath, body, &hash, &docid)?;
                IngestOutcome::Updated
            }
            None => {
                insert_active(&conn, collection, filepath, body, &hash, &docid)?;
                IngestOutcome::Added
            }
        };

        tracing::debug!(%collection, %filepath, ?outcome, "indexed document");
        Ok(IngestResult {
            outcome,
            content_hash: hash,
            docid,
        })
    }

    /// Resolve a query string: exact filepath, exact `#docid`, else the
    /// nearest path by edit distance.
    pub fn find_document(&self, query: &str, opts: FindOptions) -> Result<FindOutcome> {
        let conn = self.conn.lock().unwrap();

        if let Some(prefix) = query.strip_prefix('#') {
            return find_by_docid_prefix(&conn, prefix, opts).map(|r| match r {
                Some(doc) => FindOutcome::Found(doc),
                None => FindOutcome::NotFound {
                    query: query.to_string(),
                    suggestions: Vec::new(),
                },
            });
        }

        if let Some(doc) = select_by_path(&conn, query, opts)? {
            return Ok(FindOutcome::Found(doc));
        }

        let all_paths = all_active_filepaths(&conn)?;
        let suggestions = fuzzy::nearest(query, &all_paths, SUGGESTION_MAX_DISTANCE, SUGGESTION_LIMIT);
        Ok(FindOutcome::NotFound {
            query: query.to_string(),
            suggestions,
        })
    }

    /// Resolve a comma-separated list of paths/`#docid`s, or a single
    /// glob pattern, into documents. Oversized bodies are reported as
    /// errors rather than returned.
    pub fn find_documents(&self, pattern: &str, opts: MultiGetOptions) -> Result<MultiGetResult> {
        let conn = self.conn.lock().unwrap();
        let mut result = MultiGetResult::default();

        let tokens: Vec<&str> = if pattern.contains(',') {
            pattern.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect()
        } else {
            vec![pattern.trim()]
        };

        let is_glob = tokens.len() == 1 && is_glob_pattern(tokens[0]);

        if is_glob {
            let glob_pattern = glob::Pattern::new(tokens[0])
                .map_err(|e| StoreError::Internal(format!("invalid glob `{}`: {e}", tokens[0])))?;
            let match_opts = glob::MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: false,
            };
            let all_paths = all_active_filepaths(&conn)?;
            for path in all_paths {
                if glob_pattern.matches_with(&path, match_opts) {
                    push_resolved(&conn, &path, opts, &mut result)?;
                }
            }
            return Ok(result);
        }

        for token in tokens {
            if let Some(prefix) = token.strip_prefix('#') {
                match find_by_docid_prefix(&conn, prefix, FindOptions { include_body: true })? {
                    Some(doc) => push_checked(doc, opts, &mut result),
                    None => result.errors.push(MultiGetError {
                        query: token.to_string(),
                        kind: MultiGetErrorKind::NotFound,
                    }),
                }
                continue;
            }
            match select_by_path(&conn, token, FindOptions { include_body: true })? {
                Some(doc) => push_checked(doc, opts, &mut result),
                None => result.errors.push(MultiGetError {
                    query: token.to_string(),
                    kind: MultiGetErrorKind::NotFound,
                }),
            }
        }

        Ok(result)
    }

    /// Permanently delete rows already marked inactive. Returns the
    /// number of rows removed.
    pub fn delete_inactive(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM documents WHERE active = 0", [])?;
        tracing::info!(removed = n, "deleted inactive documents");
        Ok(n)
    }

    /// Mark one document inactive by path, used when a re-scan no
    /// longer finds the file on disk. Returns `false` if there was no
    /// active row to retire.
    pub fn deactivate_document(&self, collection: &str, filepath: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE documents SET active = 0 WHERE collection = ?1 AND filepath = ?2 AND active = 1",
            params![collection, filepath],
        )?;
        Ok(n > 0)
    }

    /// All active filepaths within one collection, used to detect files
    /// that have disappeared from disk between re-scans.
    pub fn active_filepaths(&self, collection: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT filepath FROM documents WHERE collection = ?1 AND active = 1")?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Every active document in one collection, bodies included. Used
    /// when (re-)embedding a collection's chunks.
    pub fn active_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ?1 AND active = 1"
        ))?;
        let rows = stmt.query_map(params![collection], row_to_document)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn insert_active(
    conn: &rusqlite::Connection,
    collection: &str,
    filepath: &str,
    body: &str,
    hash: &str,
    docid: &str,
) -> Result<()> {
    let title = doc_model::extract_title(body).unwrap_or_else(|| doc_model::filename_stem(filepath));
    conn.execute(
        "INSERT INTO documents (collection, filepath, title, content_hash, docid, body, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![collection, filepath, title, hash, docid, body],
    )?;
    Ok(())
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        collection: row.get(1)?,
        filepath: row.get(2)?,
        title: row.get(3)?,
        content_hash: row.get(4)?,
        docid: row.get(5)?,
        body: row.get(6)?,
        active: row.get::<_, i64>(7)? != 0,
    })
}

const DOCUMENT_COLUMNS: &str = "id, collection, filepath, title, content_hash, docid, body, active";

fn select_by_path(conn: &rusqlite::Connection, path: &str, opts: FindOptions) -> Result<Option<Document>> {
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE filepath = ?1 AND active = 1
         UNION ALL
         SELECT {DOCUMENT_COLUMNS} FROM documents
         WHERE (collection || '/' || filepath) = ?1 AND active = 1
         LIMIT 1"
    );
    let mut doc = conn
        .prepare(&sql)?
        .query_row(params![path], row_to_document)
        .optional()?;
    if !opts.include_body {
        if let Some(d) = doc.as_mut() {
            d.body.clear();
        }
    }
    Ok(doc)
}

fn find_by_docid_prefix(
    conn: &rusqlite::Connection,
    prefix: &str,
    opts: FindOptions,
) -> Result<Option<Document>> {
    let like = format!("{prefix}%");
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE content_hash LIKE ?1 AND active = 1"
    ))?;
    let mut rows = stmt.query(params![like])?;
    let mut matches = Vec::new();
    while let Some(row) = rows.next()? {
        matches.push(row_to_document(row)?);
    }
    match matches.len() {
        0 => Ok(None),
        1 => {
            let mut doc = matches.pop().unwrap();
            if !opts.include_body {
                doc.body.clear();
            }
            Ok(Some(doc))
        }
        count => Err(StoreError::AmbiguousDocId {
            prefix: prefix.to_string(),
            count,
        }),
    }
}

fn all_active_filepaths(conn: &rusqlite::Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT filepath FROM documents WHERE active = 1")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn is_glob_pattern(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

fn push_checked(doc: Document, opts: MultiGetOptions, result: &mut MultiGetResult) {
    if let Some(max) = opts.max_bytes {
        if doc.body.len() > max {
            result.errors.push(MultiGetError {
                query: doc.filepath.clone(),
                kind: MultiGetErrorKind::Oversize {
                    size: doc.body.len(),
                    max_bytes: max,
                },
            });
            return;
        }
    }
    let mut doc = doc;
    if !opts.include_body {
        doc.body.clear();
    }
    result.docs.push(doc);
}

fn push_resolved(
    conn: &rusqlite::Connection,
    path: &str,
    opts: MultiGetOptions,
    result: &mut MultiGetResult,
) -> Result<()> {
    if let Some(doc) = select_by_path(conn, path, FindOptions { include_body: true })? {
        push_checked(doc, opts, result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reindexing_unchanged_body_is_a_noop() {
        let store = Store::open_in_memory().unwrap();
        let r1 = store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();
        assert_eq!(r1.outcome, IngestOutcome::Added);
        let r2 = store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();
        assert_eq!(r2.outcome, IngestOutcome::Unchanged);
        assert_eq!(r1.content_hash, r2.content_hash);
    }

    #[test]
    fn changing_body_marks_previous_row_inactive() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();
        let r2 = store.add_or_update_document("notes", "a.md", "# Title\ngoodbye world").unwrap();
        assert_eq!(r2.outcome, IngestOutcome::Updated);

        let conn = store.conn.lock().unwrap();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents WHERE collection='notes' AND filepath='a.md'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 2);
        let active: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE collection='notes' AND filepath='a.md' AND active=1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(active, 1);
    }

    #[test]
    fn find_document_resolves_by_docid_and_path() {
        let store = Store::open_in_memory().unwrap();
        let r = store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();

        match store.find_document("a.md", FindOptions::default()).unwrap() {
            FindOutcome::Found(d) => assert_eq!(d.docid, r.docid),
            FindOutcome::NotFound { .. } => panic!("expected a match"),
        }

        let query = format!("#{}", r.docid);
        match store.find_document(&query, FindOptions::default()).unwrap() {
            FindOutcome::Found(d) => assert_eq!(d.filepath, "a.md"),
            FindOutcome::NotFound { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn find_document_missing_returns_suggestions() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "alpha.md", "body").unwrap();
        match store.find_document("alpah.md", FindOptions::default()).unwrap() {
            FindOutcome::NotFound { suggestions, .. } => {
                assert!(suggestions.contains(&"alpha.md".to_string()));
            }
            FindOutcome::Found(_) => panic!("did not expect an exact match"),
        }
    }

    #[test]
    fn find_documents_reports_oversize_under_errors() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "big.md", "0123456789").unwrap();
        let result = store
            .find_documents("notes/big.md", MultiGetOptions { include_body: true, max_bytes: Some(5) })
            .unwrap();
        assert!(result.docs.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0].kind, MultiGetErrorKind::Oversize { .. }));
    }

    #[test]
    fn deactivate_document_removes_it_from_active_filepaths() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "a").unwrap();
        store.add_or_update_document("notes", "b.md", "b").unwrap();
        assert!(store.deactivate_document("notes", "a.md").unwrap());
        let paths = store.active_filepaths("notes").unwrap();
        assert_eq!(paths, vec!["b.md".to_string()]);
        assert!(!store.deactivate_document("notes", "a.md").unwrap());
    }

    #[test]
    fn active_documents_excludes_inactive_rows() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "first").unwrap();
        store.add_or_update_document("notes", "a.md", "second").unwrap();
        store.add_or_update_document("notes", "b.md", "third").unwrap();
        let docs = store.active_documents("notes").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.filepath == "a.md" && d.body == "second"));
    }

    #[test]
    fn find_documents_glob_matches_multiple() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "a").unwrap();
        store.add_or_update_document("notes", "b.md", "b").unwrap();
        store.add_or_update_document("notes", "sub/c.md", "c").unwrap();
        let result = store.find_documents("*.md", MultiGetOptions::default()).unwrap();
        assert_eq!(result.docs.len(), 2);
    }
}
