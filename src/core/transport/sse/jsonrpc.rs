//! JSON-RPC 2.0 message types carried over the SSE transport.

use rmcp::ErrorData as McpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::transport::{TransportError, TransportResult};

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP revision spoken by the SSE transport.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC request or notification sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Notifications carry no id and never get a reply.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// A request other than `initialize` or `ping` arrived first.
    pub fn not_initialized(id: Option<Value>) -> Self {
        Self::error(id, INVALID_REQUEST, "session not initialized")
    }

    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, INVALID_PARAMS, msg)
    }

    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, INTERNAL_ERROR, msg)
    }

    /// Carry an rmcp error object over unchanged.
    pub fn from_mcp_error(id: Option<Value>, err: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: err.code.0,
                message: err.message.into_owned(),
                data: err.data,
            }),
        }
    }
}

/// A decoded POST body.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Request or notification for the session worker.
    Request(JsonRpcRequest),
    /// Reply to a server-initiated request.
    Response(Value),
}

impl IncomingMessage {
    /// Decode a POST body, rejecting anything that is not a single
    /// JSON-RPC 2.0 object.
    pub fn parse(body: &[u8]) -> TransportResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| TransportError::protocol(format!("invalid JSON: {e}")))?;

        let Some(object) = value.as_object() else {
            return Err(TransportError::protocol("message must be a JSON object"));
        };
        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(TransportError::protocol("jsonrpc must be \"2.0\""));
        }

        if object.contains_key("method") {
            let request = serde_json::from_value(value)
                .map_err(|e| TransportError::protocol(format!("invalid request: {e}")))?;
            Ok(Self::Request(request))
        } else if object.contains_key("result") || object.contains_key("error") {
            Ok(Self::Response(value))
        } else {
            Err(TransportError::protocol("message has no method, result or error"))
        }
    }
}
