use rusqlite::{params, OptionalExtension};

use crate::errors::Result;
use crate::Store;

/// Settings keys the engine reads; not an exhaustive enum because any
/// caller may stash its own key/value pairs here.
pub const SETTING_EMBEDDING_PROVIDER: &str = "embedding_provider";
pub const SETTING_EMBEDDING_MODEL: &str = "embedding_model";

impl Store {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(Into::into)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// The active `(provider, model_id)` pair, if one has been set.
    pub fn active_provider(&self) -> Result<Option<(String, String)>> {
        let provider = self.get_setting(SETTING_EMBEDDING_PROVIDER)?;
        let model = self.get_setting(SETTING_EMBEDDING_MODEL)?;
        Ok(match (provider, model) {
            (Some(p), Some(m)) => Some((p, m)),
            _ => None,
        })
    }

    pub fn set_active_provider(&self, provider: &str, model_id: &str) -> Result<()> {
        self.set_setting(SETTING_EMBEDDING_PROVIDER, provider)?;
        self.set_setting(SETTING_EMBEDDING_MODEL, model_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_active_provider() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.active_provider().unwrap(), None);
        store.set_active_provider("local", "ruri-v3-onnx").unwrap();
        assert_eq!(
            store.active_provider().unwrap(),
            Some(("local".to_string(), "ruri-v3-onnx".to_string()))
        );
    }
}
