//! URL helpers shared by the provider adapters.

use crate::error::ClientError;

/// Join a base URL and a path segment without doubling or dropping slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Validate a configured base URL at adapter construction time.
pub fn validate_base_url(base: &str) -> Result<(), ClientError> {
    if base.trim().is_empty() {
        return Err(ClientError::InvalidConfiguration(
            "base URL cannot be empty".to_string(),
        ));
    }
    let parsed = reqwest::Url::parse(base)
        .map_err(|e| ClientError::InvalidConfiguration(format!("invalid base URL {base:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidConfiguration(format!(
            "base URL {base:?} must use http or https"
        )));
    }
    Ok(())
}
