//! Transport layer for the MCP server.
//!
//! This module provides two transport implementations:
//! - **SSE**: HTTP server streaming responses as server-sent events, with
//!   client messages posted per session - feature: `sse`
//! - **STDIO**: Standard input/output via rmcp - feature: `stdio`
//!
//! Both delegate message processing to the same [`McpServer`](crate::core::McpServer).

mod config;
mod error;
mod service;

#[cfg(feature = "sse")]
pub mod sse;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "sse")]
pub use config::SseConfig;
