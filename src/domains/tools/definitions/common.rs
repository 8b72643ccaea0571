//! Common utilities shared across the HTTP-backed tools.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use crate::domains::tools::error::UpstreamError;

/// Longest upstream body excerpt embedded in an error message.
const BODY_SNIPPET_CHARS: usize = 200;

/// Build an HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(UpstreamError::Client)
}

/// Parse an upstream body as JSON.
pub fn parse_json(url: &str, body: &[u8]) -> Result<Value, UpstreamError> {
    debug!("Parsing {} byte(s) from {}", body.len(), url);
    serde_json::from_slice(body).map_err(|source| {
        error!("Failed to decode JSON from {}: {}", url, source);
        UpstreamError::DataFormat {
            url: url.to_string(),
            source,
        }
    })
}

/// Shorten an upstream body for inclusion in an error message.
pub fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_SNIPPET_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{head}...")
    }
}
