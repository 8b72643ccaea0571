//! Dispatcher - validates tool calls and runs them.
//!
//! Every tool call, whatever the transport, goes through
//! [`Dispatcher::call`]. It is also the only place where a typed
//! [`ToolError`] is turned into what the client sees:
//!
//! - unknown tool / invalid arguments: a JSON-RPC `invalid params` error,
//!   raised before any tool code runs;
//! - upstream failure: a `CallToolResult` flagged with `isError`;
//! - success: a `CallToolResult` with one text block holding the payload.

use std::time::Instant;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content, JsonObject, Tool},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, Span, info, info_span, warn};

use super::error::ToolError;
use super::registry::ToolRegistry;

/// Indentation used when rendering a payload into a text block.
const PAYLOAD_INDENT: &[u8] = b"   ";

/// A decoded request to run one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Option<Value>,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    Validating,
    Invoking,
    Completed,
    Failed,
}

/// Routes tool calls to their handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    span: Span,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, parent: &Span) -> Self {
        Self {
            registry,
            span: info_span!(parent: parent, "dispatcher"),
        }
    }

    /// Tool list advertised to clients.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.registry.get_all_tools()
    }

    /// Run a call and convert the outcome to its wire form.
    pub async fn call(&self, request: ToolCallRequest) -> Result<CallToolResult, McpError> {
        into_envelope(self.dispatch(request).await)
    }

    /// Run a call, keeping the typed error.
    pub async fn dispatch(&self, request: ToolCallRequest) -> Result<CallToolResult, ToolError> {
        let started = Instant::now();
        let tool = request.name.clone();
        let span = info_span!(parent: &self.span, "tool_call", tool = %tool);

        async {
            let mut phase = DispatchPhase::Idle;
            let outcome = self.run(request, &mut phase).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &outcome {
                Ok(_) => info!(
                    tool = %tool,
                    outcome = "completed",
                    phase = ?phase,
                    elapsed_ms,
                    "Tool call finished"
                ),
                Err(e) => warn!(
                    tool = %tool,
                    outcome = if e.is_rejection() { "rejected" } else { "failed" },
                    phase = ?phase,
                    elapsed_ms,
                    error = %e,
                    "Tool call finished"
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: ToolCallRequest,
        phase: &mut DispatchPhase,
    ) -> Result<CallToolResult, ToolError> {
        *phase = DispatchPhase::Validating;
        let Some(handler) = self.registry.get(&request.name) else {
            *phase = DispatchPhase::Failed;
            return Err(ToolError::unknown_tool(request.name));
        };

        let call = match arguments_object(&request.name, request.arguments)
            .and_then(|arguments| handler.prepare(arguments))
        {
            Ok(call) => call,
            Err(e) => {
                *phase = DispatchPhase::Failed;
                return Err(e);
            }
        };

        *phase = DispatchPhase::Invoking;
        let result = call
            .await
            .and_then(|payload| render_payload(&payload))
            .map(|text| CallToolResult::success(vec![Content::text(text)]));

        *phase = if result.is_ok() {
            DispatchPhase::Completed
        } else {
            DispatchPhase::Failed
        };
        result
    }
}

/// Convert a typed tool outcome into the response sent to the client.
///
/// Unknown tools and invalid arguments become JSON-RPC `invalid params`
/// errors rather than `isError` results, since they are protocol-level
/// mistakes by the caller and no tool ran.
pub fn into_envelope(
    outcome: Result<CallToolResult, ToolError>,
) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(result) => Ok(result),
        Err(e @ (ToolError::UnknownTool(_) | ToolError::Validation(_))) => {
            Err(McpError::invalid_params(e.to_string(), None))
        }
        Err(e @ ToolError::Execution { .. }) => {
            Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
        }
        Err(e @ ToolError::Internal(_)) => Err(McpError::internal_error(e.to_string(), None)),
    }
}

/// Raw call arguments as an object. Absent and `null` mean no arguments.
fn arguments_object(tool: &str, arguments: Option<Value>) -> Result<JsonObject, ToolError> {
    match arguments {
        None | Some(Value::Null) => Ok(JsonObject::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ToolError::validation(format!(
            "arguments for '{tool}' must be an object, got {other}"
        ))),
    }
}

/// Serialize a payload as indented JSON text.
pub fn render_payload(payload: &Value) -> Result<String, ToolError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(PAYLOAD_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    payload
        .serialize(&mut serializer)
        .map_err(|e| ToolError::internal(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| ToolError::internal(e.to_string()))
}
