use crate::errors::Result;
use crate::Store;

/// Summary of a `Store::cleanup` pass.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub inactive_documents_removed: usize,
    pub orphaned_vectors_removed: usize,
    pub llm_cache_entries_removed: usize,
}

impl Store {
    /// Run every maintenance step once: drop inactive document rows, drop
    /// vector rows whose document is gone, and clear the LLM cache. This
    /// is the one operation the engine's scheduled/manual `cleanup`
    /// command runs end to end.
    pub fn cleanup(&self, clear_llm_cache: bool) -> Result<CleanupReport> {
        let inactive_documents_removed = self.delete_inactive()?;
        let orphaned_vectors_removed = self.cleanup_orphaned_vectors()?;
        let llm_cache_entries_removed = if clear_llm_cache { self.delete_llm_cache()? } else { 0 };
        Ok(CleanupReport {
            inactive_documents_removed,
            orphaned_vectors_removed,
            llm_cache_entries_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_removes_inactive_rows_and_dangling_vectors() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "hello").unwrap();
        store.add_or_update_document("notes", "a.md", "goodbye").unwrap();
        let report = store.cleanup(false).unwrap();
        assert_eq!(report.inactive_documents_removed, 1);
        assert_eq!(report.llm_cache_entries_removed, 0);
    }
}
