use url::Url;

use crate::error::{QueueLensError, Result};

/// Resolves an API `path` below `base_url`, keeping any path prefix of the base
/// (`https://proxy.example/dd` + `api/v1/series` -> `https://proxy.example/dd/api/v1/series`).
///
/// # Errors
///
/// Returns a configuration error naming `service` if either part is invalid.
pub fn api_url(base_url: &str, path: &str, service: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)
        .map_err(|e| QueueLensError::Config(format!("Invalid {service} URL: {e}")))?;

    if !base.path().ends_with('/') {
        let path_with_slash = format!("{}/", base.path());
        base.set_path(&path_with_slash);
    }

    base.join(path)
        .map_err(|e| QueueLensError::Config(format!("Invalid {service} API URL: {e}")))
}
