use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::errors::{HostError, Result};

static ORT_RUNTIME_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Shared by the reranker and generator models, which both run through
/// the same ONNX Runtime shared library as `embedding-provider`'s local
/// embedder. `ort`'s global environment init is idempotent for a
/// repeated identical path, so calling this once per model is harmless.
pub fn ensure_ort_initialized(runtime_library_path: &Path) -> Result<()> {
    if let Some(existing) = ORT_RUNTIME_PATH.get() {
        if !paths_equal(existing, runtime_library_path) {
            return Err(HostError::InvalidConfiguration(format!(
                "ONNX Runtime already initialized with library `{}`; cannot reinitialize with `{}`",
                existing.display(),
                runtime_library_path.display()
            )));
        }
    } else {
        let _ = ORT_RUNTIME_PATH.set(runtime_library_path.to_path_buf());
    }

    ort::init_from(runtime_library_path.to_string_lossy().to_string())
        .with_name("doc-search-llm-host")
        .commit()
        .map_err(|e| HostError::InferenceFailure(format!("initialize ONNX Runtime environment: {e}")))?;
    Ok(())
}

pub fn resolve_existing_path(path: &Path, description: &str) -> Result<PathBuf> {
    fs::metadata(path).map_err(|_| HostError::InvalidConfiguration(format!("{description} `{}` does not exist", path.display())))?;
    path.canonicalize()
        .map_err(|e| HostError::InferenceFailure(format!("canonicalize {description} `{}`: {e}", path.display())))
}

fn paths_equal(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
