//! Tool handler traits.
//!
//! A tool implements [`ToolDefinition`] with a typed parameter struct. The
//! blanket [`ToolHandler`] impl erases that type so the registry can hold
//! every tool behind `Arc<dyn ToolHandler>`: it advertises the schema
//! derived from the parameters and decodes raw arguments into them before
//! anything runs.

use async_trait::async_trait;
use futures::future::BoxFuture;
use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ToolError;

/// Pending execution of a call whose arguments already decoded.
pub type ToolFuture<'a> = BoxFuture<'a, Result<Value, ToolError>>;

/// A tool with typed parameters.
///
/// Implementations are stateless with respect to sessions and are shared
/// read-only between all of them.
#[async_trait]
pub trait ToolDefinition: Send + Sync + 'static {
    /// Tool name as registered in MCP.
    const NAME: &'static str;

    /// Tool description shown to clients.
    const DESCRIPTION: &'static str;

    /// Arguments accepted by the tool. Its JSON Schema is what clients see.
    type Params: DeserializeOwned + JsonSchema + Send + 'static;

    /// Run the tool. Returns the upstream payload as opaque JSON.
    async fn execute(&self, params: Self::Params) -> Result<Value, ToolError>;
}

/// Type-erased tool, as stored in the registry.
pub trait ToolHandler: Send + Sync {
    /// Get the name of this tool.
    fn name(&self) -> &'static str;

    /// Tool model advertised in `tools/list`.
    fn to_tool(&self) -> Tool;

    /// Decode `arguments` into the tool's parameters.
    ///
    /// A decoding failure is a [`ToolError::Validation`] and no tool code
    /// runs. On success the returned future performs the call.
    fn prepare(&self, arguments: JsonObject) -> Result<ToolFuture<'_>, ToolError>;
}

impl<T: ToolDefinition> ToolHandler for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: T::NAME.into(),
            description: Some(T::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<T::Params>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    fn prepare(&self, arguments: JsonObject) -> Result<ToolFuture<'_>, ToolError> {
        let params: T::Params = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| ToolError::validation(e.to_string()))?;
        Ok(self.execute(params))
    }
}
