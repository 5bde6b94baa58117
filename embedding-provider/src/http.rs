use std::time::Duration;

use crate::errors::{EmbedderError, Result};

pub const MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Run `request` up to `MAX_RETRIES` additional times when it reports HTTP
/// 429, honouring `Retry-After` when the server sends one.
pub fn with_retry<F>(mut request: F) -> Result<reqwest::blocking::Response>
where
    F: FnMut() -> std::result::Result<reqwest::blocking::Response, reqwest::Error>,
{
    let mut attempt = 0;
    loop {
        let response = request().map_err(|err| EmbedderError::ProviderFailure {
            message: format!("request failed: {err}"),
        })?;

        if response.status().as_u16() != 429 || attempt >= MAX_RETRIES {
            return Ok(response);
        }

        let wait = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_BACKOFF);

        tracing::warn!(attempt, wait_secs = wait.as_secs(), "provider overloaded, retrying");
        std::thread::sleep(wait);
        attempt += 1;
    }
}
