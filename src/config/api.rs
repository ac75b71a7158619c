use serde::{Deserialize, Serialize};

use super::defaults::DEFAULT_API_BASE_URL;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Seconds before an upstream call is abandoned.
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

/// Normalizes a user supplied endpoint to a base URL ending in `/v1`.
pub fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }

    for suffix in ["/responses", "/chat/completions", "/images/generations"] {
        if let Some(base) = endpoint.strip_suffix(suffix) {
            return normalize_base_url(base);
        }
    }

    if endpoint.ends_with("/v1") {
        endpoint.to_string()
    } else {
        format!("{}/v1", endpoint)
    }
}
