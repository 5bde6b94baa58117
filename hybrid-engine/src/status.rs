use doc_model::StoreStatus;
use doc_store::{CleanupReport, Store};

use crate::errors::Result;

pub fn status(store: &Store) -> Result<StoreStatus> {
    Ok(store.status()?)
}

pub fn cleanup(store: &Store, clear_llm_cache: bool) -> Result<CleanupReport> {
    Ok(store.cleanup(clear_llm_cache)?)
}
