//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are executable functions that can be called by MCP clients.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `handlers.rs` - `ToolDefinition` (typed) and `ToolHandler` (type-erased) traits
//! - `registry.rs` - Ordered catalog of all tools
//! - `dispatcher.rs` - Validation, invocation and result/error envelope
//! - `error.rs` - Tool and upstream error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` (e.g., `my_tool.rs`)
//! 2. Derive `Deserialize` + `JsonSchema` on its params and implement `ToolDefinition`
//! 3. Export it in `definitions/mod.rs`
//! 4. Register it in `ToolRegistry::from_config`
//!
//! Neither the transports nor `server.rs` need to change.

pub mod definitions;
pub mod dispatcher;
mod error;
mod handlers;
mod registry;

pub use dispatcher::{DispatchPhase, Dispatcher, ToolCallRequest};
pub use error::{ToolError, UpstreamError};
pub use handlers::{ToolDefinition, ToolFuture, ToolHandler};
pub use registry::ToolRegistry;
