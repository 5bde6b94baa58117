use doc_model::Collection;
use doc_store::Store;

use crate::errors::{EngineError, Result};

/// Add a named collection rooted at `path`, scanning files matching
/// `mask` (defaults to [`Collection::DEFAULT_MASK`]). `path` must exist
/// and be a directory; the distilled spec assumes this but leaves it
/// implicit.
pub fn add(store: &Store, name: &str, path: &str, mask: Option<&str>) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        EngineError::InvalidCollectionRoot(format!("`{path}` does not exist"))
    })?;
    if !metadata.is_dir() {
        return Err(EngineError::InvalidCollectionRoot(format!("`{path}` is not a directory")));
    }
    let mask = mask.unwrap_or(Collection::DEFAULT_MASK);
    store.add_collection(name, path, mask)?;
    Ok(())
}

pub fn remove(store: &Store, name: &str) -> Result<()> {
    store.remove_collection(name)?;
    Ok(())
}

pub fn rename(store: &Store, old_name: &str, new_name: &str) -> Result<()> {
    store.rename_collection(old_name, new_name)?;
    Ok(())
}

pub fn list(store: &Store) -> Result<Vec<Collection>> {
    Ok(store.list_collections()?)
}
