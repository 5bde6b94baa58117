//! SQLite-backed persistent store: documents, collections, path contexts,
//! full-text and vector indexes, the LLM response cache, and settings.
//!
//! Everything lives behind a single [`Store`] handle over one SQLite file,
//! serialized through one connection (see [`store::Store`]'s doc comment
//! for why).

mod collections;
mod documents;
mod errors;
mod fts;
mod fuzzy;
mod llm_cache;
mod maintenance;
mod path_contexts;
mod schema;
mod settings;
mod status;
mod store;
mod vectors;

pub use documents::{FindOptions, FindOutcome, MultiGetError, MultiGetErrorKind, MultiGetOptions, MultiGetResult};
pub use errors::{Result, StoreError};
pub use maintenance::CleanupReport;
pub use settings::{SETTING_EMBEDDING_MODEL, SETTING_EMBEDDING_PROVIDER};
pub use store::Store;
pub use vectors::ChunkHit;
