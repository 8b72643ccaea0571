//! Tool-specific error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The call arguments do not match the tool's declared schema.
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// The tool ran but its upstream call failed.
    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: UpstreamError,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "unknown tool" error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap an upstream failure raised while executing `tool`.
    pub fn execution(tool: impl Into<String>, source: UpstreamError) -> Self {
        Self::Execution {
            tool: tool.into(),
            source,
        }
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure happened before any tool code ran.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::Validation(_))
    }
}

/// Failures talking to an upstream HTTP provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// A retryable HTTP status persisted through every attempt.
    #[error("upstream returned {status} after {attempts} attempt(s)")]
    Transient { status: StatusCode, attempts: u32 },

    /// A non-success HTTP status on a call that is not retried.
    #[error("upstream returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Connection, DNS, TLS or timeout failure. Never retried.
    #[error("request to upstream failed: {0}")]
    Network(#[source] reqwest::Error),

    /// The upstream body was not valid JSON. Never retried.
    #[error("invalid JSON from {url}: {source}")]
    DataFormat {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured provider URL cannot be parsed.
    #[error("invalid upstream URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(ToolError::unknown_tool("nope").is_rejection());
        assert!(ToolError::validation("bad").is_rejection());
        assert!(!ToolError::internal("boom").is_rejection());
    }

    #[test]
    fn test_execution_error_message_includes_cause() {
        let err = ToolError::execution(
            "create_random_user",
            UpstreamError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "maintenance".to_string(),
            },
        );
        let text = err.to_string();
        assert!(text.contains("create_random_user"));
        assert!(text.contains("503"));
        assert!(text.contains("maintenance"));
    }
}
