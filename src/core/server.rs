//! MCP Server implementation and lifecycle management.
//!
//! `McpServer` owns the tool dispatcher and is shared by every transport:
//! the STDIO transport drives it through rmcp's `ServerHandler`, the SSE
//! transport calls [`McpServer::list_tools`] and [`McpServer::call_tool`]
//! directly from each session worker.

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::*,
    service::RequestContext,
};
use std::sync::Arc;
use tracing::{Span, info, instrument};

use super::Result;
use super::config::Config;
use crate::domains::tools::{Dispatcher, ToolCallRequest, ToolRegistry};

/// Instructions sent to clients during initialization.
pub const INSTRUCTIONS: &str = "This server provides two tools: \
    get_current_weather returns the current weather and forecast for a location, \
    create_random_user generates random user data.";

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Validates and runs tool calls.
    dispatcher: Arc<Dispatcher>,

    /// Logging scope for everything this server spawns.
    span: Span,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// `span` is the process-wide logging scope; every component logs
    /// beneath it.
    pub fn new(config: Config, span: &Span) -> Result<Self> {
        let registry = ToolRegistry::from_config(&config, span)?;
        info!("Registered tools: {:?}", registry.tool_names());

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(registry, span)),
            config: Arc::new(config),
            span: span.clone(),
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// List all available tools.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.dispatcher.list_tools()
    }

    /// Call a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> std::result::Result<CallToolResult, McpError> {
        self.dispatcher
            .call(ToolCallRequest::new(name, arguments))
            .await
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name().to_string(),
                version: self.version().to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        info!("Listing tools");
        Ok(ListToolsResult {
            tools: McpServer::list_tools(self),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, _context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(serde_json::Value::Object);
        McpServer::call_tool(self, &request.name, arguments).await
    }
}
