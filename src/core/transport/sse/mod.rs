//! SSE transport implementation.
//!
//! MCP's HTTP+SSE transport: `GET /sse` opens a session and streams
//! server messages, `POST /request?session_id=…` delivers client messages.
//! The first event on every stream is `endpoint`, telling the client where
//! to post.

pub mod jsonrpc;
pub mod session;

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use super::{SseConfig, TransportError, TransportResult};
use crate::core::McpServer;
use jsonrpc::{IncomingMessage, JsonRpcResponse};
use session::{OpenSession, SessionManager};

/// Interval between keep-alive comments on idle streams.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// SSE transport handler.
pub struct SseTransport {
    config: SseConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
struct AppState {
    server: McpServer,
    sessions: SessionManager,
    message_path: String,
    channel_capacity: usize,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

impl SseTransport {
    /// Create a new SSE transport with the given config.
    pub fn new(config: SseConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the HTTP router serving the given server.
    pub fn router(&self, server: McpServer) -> Router {
        build_router(&self.config, server, SessionManager::new())
    }

    /// Run the SSE transport.
    ///
    /// This method blocks until the listener fails.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (MCP over SSE, CORS {})", addr, cors_status);
        info!("  → Events:   GET {}", self.config.sse_path);
        info!("  → Messages: POST {}?session_id=<id>", self.config.message_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

fn build_router(config: &SseConfig, server: McpServer, sessions: SessionManager) -> Router {
    let state = AppState {
        server,
        sessions,
        message_path: config.message_path.clone(),
        channel_capacity: config.channel_capacity.max(1),
    };

    let mut app = Router::new()
        .route(&config.sse_path, get(handle_sse))
        .route(&config.message_path, post(handle_message))
        .route("/health", get(health_check))
        .route("/", get(root_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    app
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "SSE",
        "endpoints": {
            "messages": state.message_path,
            "health": "/health"
        },
        "protocol": jsonrpc::PROTOCOL_VERSION,
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "sessions": state.sessions.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Open a session and stream its messages.
async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let OpenSession {
        id,
        outbound,
        guard,
    } = state
        .sessions
        .open(state.server.clone(), state.channel_capacity);

    let endpoint = format!("{}?session_id={}", state.message_path, id);
    let first = futures::stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });

    // The stream owns the guard: when the client goes away the stream is
    // dropped and the session is torn down with it.
    let messages = ReceiverStream::new(outbound).map(move |response| {
        let _session = &guard;
        Ok(message_event(&response))
    });

    Sse::new(first.chain(messages)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn message_event(response: &JsonRpcResponse) -> Event {
    Event::default()
        .event("message")
        .json_data(response)
        .unwrap_or_else(|e| {
            warn!("Dropping unserializable response: {}", e);
            Event::default().comment("unserializable response dropped")
        })
}

/// Accept one client message for a session.
#[instrument(skip_all, fields(session))]
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Result<StatusCode, TransportError> {
    let id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TransportError::protocol("missing session_id"))?;
    tracing::Span::current().record("session", id.as_str());

    let sender = state
        .sessions
        .sender(&id)
        .ok_or_else(|| TransportError::UnknownSession(id.clone()))?;

    let message = match IncomingMessage::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Malformed message, closing session: {}", e);
            drop(sender);
            state.sessions.close(&id);
            return Err(e);
        }
    };

    match message {
        IncomingMessage::Request(request) => {
            debug!("Queueing {}", request.method);
            sender
                .send(request)
                .await
                .map_err(|_| TransportError::SessionClosed(id))?;
        }
        IncomingMessage::Response(_) => debug!("Ignoring client response"),
    }

    Ok(StatusCode::ACCEPTED)
}
