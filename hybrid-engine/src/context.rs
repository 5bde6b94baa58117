use doc_model::PathContext;
use doc_store::Store;

use crate::errors::Result;

/// Attach or replace a freeform note on `vpath`, surfaced alongside any
/// document whose virtual path falls under it.
pub fn add(store: &Store, vpath: &str, text: &str) -> Result<()> {
    store.add_path_context(vpath, text)?;
    Ok(())
}

pub fn remove(store: &Store, vpath: &str) -> Result<()> {
    store.remove_path_context(vpath)?;
    Ok(())
}

pub fn list(store: &Store) -> Result<Vec<PathContext>> {
    Ok(store.list_path_contexts()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_path_context() {
        let store = Store::open_in_memory().unwrap();
        add(&store, "notes/", "personal journal, informal tone").unwrap();
        let contexts = list(&store).unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].vpath, "notes/");

        remove(&store, "notes/").unwrap();
        assert!(list(&store).unwrap().is_empty());
    }
}
