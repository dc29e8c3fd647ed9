//! Blocking HTTP client setup shared by the OpenAI-compatible services

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// Build a client with bearer auth, JSON content type and a request timeout
pub fn build_client(api_key: &str, timeout: Duration) -> Result<Client, String> {
    if api_key.trim().is_empty() {
        return Err("API key is empty".to_string());
    }

    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth).map_err(|_| "API key contains invalid characters".to_string())?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {}", e))
}

/// Read an API key from the named environment variable
pub fn api_key_from_env(var: &str) -> Result<String, String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(format!("environment variable {} is empty", var)),
        Err(_) => Err(format!("environment variable {} is not set", var)),
    }
}

/// Join a base URL and an endpoint path
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Response body for error messages, truncated to keep logs readable
pub fn error_body(resp: reqwest::blocking::Response) -> String {
    let body = resp
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    if body.chars().count() > 500 {
        let truncated: String = body.chars().take(500).collect();
        format!("{}...", truncated)
    } else {
        body
    }
}
