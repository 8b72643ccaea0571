//! SSE sessions: one event stream, one inbound queue, one worker task.
//!
//! The worker drains its queue strictly in arrival order, so responses on a
//! session's stream follow the order the client posted its requests. The
//! [`SessionManager`] only routes POSTs to the right queue; sessions share
//! nothing else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rmcp::model::CallToolRequestParam;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::jsonrpc::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use crate::core::McpServer;
use crate::core::server::INSTRUCTIONS;

/// Handshake state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    AwaitingInitialize,
    Initialized,
}

/// Directory of live sessions, keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, mpsc::Sender<JsonRpcRequest>>>>,
}

/// A freshly opened session, handed to the SSE stream.
pub struct OpenSession {
    pub id: String,
    pub outbound: mpsc::Receiver<JsonRpcResponse>,
    pub guard: SessionGuard,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and spawn its worker.
    pub fn open(&self, server: McpServer, capacity: usize) -> OpenSession {
        let id = uuid::Uuid::new_v4().to_string();
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);

        let span = info_span!(parent: server.span(), "session", id = %id);
        let worker = SessionWorker {
            server,
            phase: HandshakePhase::AwaitingInitialize,
            outbound: outbound_tx,
        };

        self.lock().insert(id.clone(), inbound_tx);
        let handle = tokio::spawn(worker.run(inbound_rx).instrument(span));
        info!(session = %id, "Session opened");

        OpenSession {
            guard: SessionGuard {
                id: id.clone(),
                manager: self.clone(),
                worker: handle.abort_handle(),
            },
            id,
            outbound: outbound_rx,
        }
    }

    /// Queue of the given session, if it is still open.
    pub fn sender(&self, id: &str) -> Option<mpsc::Sender<JsonRpcRequest>> {
        self.lock().get(id).cloned()
    }

    /// Forget a session. Dropping its queue stops the worker, which in turn
    /// ends the event stream.
    pub fn close(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::Sender<JsonRpcRequest>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tears a session down when its event stream is dropped.
pub struct SessionGuard {
    id: String,
    manager: SessionManager,
    worker: AbortHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.worker.abort();
        self.manager.close(&self.id);
        info!(session = %self.id, "Session closed");
    }
}

struct SessionWorker {
    server: McpServer,
    phase: HandshakePhase,
    outbound: mpsc::Sender<JsonRpcResponse>,
}

impl SessionWorker {
    async fn run(mut self, mut inbound: mpsc::Receiver<JsonRpcRequest>) {
        while let Some(request) = inbound.recv().await {
            let Some(response) = self.handle(request).await else {
                continue;
            };
            if self.outbound.send(response).await.is_err() {
                debug!("Event stream gone, stopping worker");
                break;
            }
        }
    }

    async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        if self.phase == HandshakePhase::AwaitingInitialize
            && !matches!(method.as_str(), "initialize" | "ping")
        {
            warn!(method = %method, "Request before initialize");
            return Some(JsonRpcResponse::not_initialized(id));
        }

        let response = match method.as_str() {
            "initialize" => self.initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.tools_list(id),
            "tools/call" => self.tools_call(id, params).await,
            _ => {
                warn!("Unknown method: {}", method);
                JsonRpcResponse::method_not_found(id, &method)
            }
        };
        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client sent initialized notification"),
            method => debug!("Received notification: {}", method),
        }
    }

    fn initialize(&mut self, id: Option<Value>) -> JsonRpcResponse {
        info!("Processing initialize request");
        self.phase = HandshakePhase::Initialized;

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.server.name(),
                    "version": self.server.version()
                },
                "instructions": INSTRUCTIONS
            }),
        )
    }

    fn tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        debug!("Processing tools/list request");
        JsonRpcResponse::success(id, json!({ "tools": self.server.list_tools() }))
    }

    async fn tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::invalid_params(id, "Missing params");
        };
        let params: CallToolRequestParam = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::invalid_params(id, format!("Invalid params: {e}")),
        };

        let arguments = params.arguments.map(Value::Object);
        match self.server.call_tool(&params.name, arguments).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::internal_error(id, e.to_string()),
            },
            Err(e) => JsonRpcResponse::from_mcp_error(id, e),
        }
    }
}
