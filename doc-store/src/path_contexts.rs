use doc_model::PathContext;
use rusqlite::{params, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::Store;

impl Store {
    pub fn add_path_context(&self, vpath: &str, text: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO path_contexts (vpath, text) VALUES (?1, ?2)
             ON CONFLICT(vpath) DO UPDATE SET text = excluded.text",
            params![vpath, text],
        )?;
        Ok(())
    }

    pub fn list_path_contexts(&self) -> Result<Vec<PathContext>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT vpath, text FROM path_contexts ORDER BY vpath")?;
        let rows = stmt.query_map([], |row| {
            Ok(PathContext {
                vpath: row.get(0)?,
                text: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn remove_path_context(&self, vpath: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM path_contexts WHERE vpath = ?1", params![vpath])?;
        if n == 0 {
            return Err(StoreError::NotFound(format!("path context `{vpath}`")));
        }
        Ok(())
    }

    pub fn get_path_context(&self, vpath: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT text FROM path_contexts WHERE vpath = ?1",
            params![vpath],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }
}
