//! STDIO transport implementation.
//!
//! Serves the MCP server over stdin/stdout with rmcp, for clients that
//! launch the server as a subprocess.

use rmcp::ServiceExt;
use tracing::{Instrument, info, info_span};

use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Run the STDIO transport until the client disconnects.
    pub async fn run(server: McpServer) -> TransportResult<()> {
        let span = info_span!(parent: server.span(), "stdio");

        async move {
            info!("Ready - communicating via stdin/stdout");

            let service = server
                .serve(rmcp::transport::stdio())
                .await
                .map_err(|e| TransportError::init(e.to_string()))?;

            service
                .waiting()
                .await
                .map_err(|e| TransportError::ServiceError(e.to_string()))?;

            info!("STDIO transport finished");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
