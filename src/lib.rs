//! Weather and random-user MCP server.
//!
//! A Model Context Protocol server exposing two tools backed by public HTTP
//! APIs: `get_current_weather` (wttr.in, retried with exponential backoff)
//! and `create_random_user` (randomuser.me).
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the server handler and the
//!   SSE / STDIO transports
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: typed tool definitions, argument validation, the dispatcher and
//!     the upstream clients
//!
//! # Example
//!
//! ```rust,no_run
//! use weather_user_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let span = tracing::info_span!("server");
//!     let server = McpServer::new(config.clone(), &span)?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
