use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::errors::Result;
use crate::schema::init_schema;

/// The persistent index: collections, documents, FTS, per-model vector
/// tables, the LLM response cache, and small settings.
///
/// All of it lives in one SQLite file. Access is serialized
/// through a single mutex-guarded connection; WAL mode is enabled so a
/// future multi-connection reader pool could relax this without a schema
/// change, but this process never opens a second connection itself —
/// concurrent multi-writer access is explicitly a non-goal.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the SQLite database at `path` and ensure
    /// the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
