use doc_model::Collection;
use rusqlite::{params, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::Store;

impl Store {
    pub fn add_collection(&self, name: &str, path: &str, mask: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<String> = conn
            .query_row("SELECT name FROM collections WHERE name = ?1", params![name], |r| r.get(0))
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!("collection `{name}` already exists")));
        }
        conn.execute(
            "INSERT INTO collections (name, path, mask) VALUES (?1, ?2, ?3)",
            params![name, path, mask],
        )?;
        tracing::info!(%name, %path, %mask, "collection added");
        Ok(())
    }

    pub fn remove_collection(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        if n == 0 {
            return Err(StoreError::NotFound(format!("collection `{name}`")));
        }
        conn.execute(
            "UPDATE documents SET active = 0 WHERE collection = ?1 AND active = 1",
            params![name],
        )?;
        tracing::info!(%name, "collection removed");
        Ok(())
    }

    /// Rename a collection, preserving document identity (spec: rename
    /// preserves identity).
    pub fn rename_collection(&self, old_name: &str, new_name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<String> = conn
            .query_row("SELECT name FROM collections WHERE name = ?1", params![new_name], |r| r.get(0))
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!("collection `{new_name}` already exists")));
        }
        let n = conn.execute(
            "UPDATE collections SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound(format!("collection `{old_name}`")));
        }
        conn.execute(
            "UPDATE documents SET collection = ?1 WHERE collection = ?2",
            params![new_name, old_name],
        )?;
        tracing::info!(%old_name, %new_name, "collection renamed");
        Ok(())
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name, path, mask FROM collections ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Collection {
                name: row.get(0)?,
                path: row.get(1)?,
                mask: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn get_collection(&self, name: &str) -> Result<Option<Collection>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT name, path, mask FROM collections WHERE name = ?1",
            params![name],
            |row| {
                Ok(Collection {
                    name: row.get(0)?,
                    path: row.get(1)?,
                    mask: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_preserves_document_identity() {
        let store = Store::open_in_memory().unwrap();
        store.add_collection("notes", "/tmp/notes", Collection::DEFAULT_MASK).unwrap();
        let r = store.add_or_update_document("notes", "a.md", "hello").unwrap();
        store.rename_collection("notes", "journal").unwrap();

        let docs = store.find_documents("journal/a.md", Default::default()).unwrap();
        assert_eq!(docs.docs.len(), 1);
        assert_eq!(docs.docs[0].docid, r.docid);
    }

    #[test]
    fn duplicate_collection_name_is_a_conflict() {
        let store = Store::open_in_memory().unwrap();
        store.add_collection("notes", "/tmp/a", "**/*.md").unwrap();
        let err = store.add_collection("notes", "/tmp/b", "**/*.md").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
