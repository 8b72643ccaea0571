//! Tool Registry - central, ordered catalog of all tools.
//!
//! The registry is built once at startup and never changes afterwards.
//! Listing order is registration order, so every session sees the same
//! tool list in the same order.

use std::sync::Arc;

use rmcp::model::Tool;
use tracing::Span;

use super::definitions::{RandomUserTool, WeatherTool};
use super::handlers::ToolHandler;
use crate::core::config::Config;
use crate::core::{Error, Result};

/// Tool registry - manages all available tools.
#[derive(Clone)]
pub struct ToolRegistry {
    handlers: Arc<[Arc<dyn ToolHandler>]>,
    tools: Arc<[Tool]>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl ToolRegistry {
    /// Create a registry from handlers, in listing order.
    ///
    /// Fails if two handlers share a name.
    pub fn new(handlers: Vec<Arc<dyn ToolHandler>>) -> Result<Self> {
        for (i, handler) in handlers.iter().enumerate() {
            if handlers[..i].iter().any(|h| h.name() == handler.name()) {
                return Err(Error::config(format!(
                    "duplicate tool name: {}",
                    handler.name()
                )));
            }
        }

        let tools: Vec<Tool> = handlers.iter().map(|h| h.to_tool()).collect();

        Ok(Self {
            handlers: handlers.into(),
            tools: tools.into(),
        })
    }

    /// Build the registry with every built-in tool.
    pub fn from_config(config: &Config, parent: &Span) -> Result<Self> {
        let upstream = &config.upstream;
        let weather = WeatherTool::new(upstream, parent)
            .map_err(|e| Error::config(format!("weather tool: {e}")))?;
        let random_user = RandomUserTool::new(upstream, parent)
            .map_err(|e| Error::config(format!("random user tool: {e}")))?;

        let handlers: Vec<Arc<dyn ToolHandler>> = vec![Arc::new(weather), Arc::new(random_user)];
        Self::new(handlers)
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools(&self) -> Vec<Tool> {
        self.tools.to_vec()
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.iter().find(|h| h.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> ToolRegistry {
        ToolRegistry::from_config(&Config::default(), &Span::none()).unwrap()
    }

    #[test]
    fn test_registry_tool_names() {
        let registry = test_registry();
        assert_eq!(
            registry.tool_names(),
            vec!["get_current_weather", "create_random_user"]
        );
    }

    #[test]
    fn test_registry_listing_is_stable() {
        let registry = test_registry();
        let first = serde_json::to_value(registry.get_all_tools()).unwrap();
        let second = serde_json::to_value(registry.get_all_tools()).unwrap();
        assert_eq!(first, second);

        let other = test_registry();
        assert_eq!(first, serde_json::to_value(other.get_all_tools()).unwrap());
    }

    #[test]
    fn test_registry_schemas() {
        let registry = test_registry();
        let tools = registry.get_all_tools();

        let weather = &tools[0];
        assert_eq!(weather.input_schema["required"], serde_json::json!(["location_name"]));

        let user = &tools[1];
        assert_eq!(user.input_schema["required"], serde_json::json!(["gender"]));
        assert!(user.input_schema["properties"].get("nationality").is_some());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = test_registry();
        assert!(registry.get("create_random_user").is_some());
        assert!(registry.get("does_not_exist").is_none());
        assert_eq!(registry.tool_names().len(), 2);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let config = Config::default();
        let a = WeatherTool::new(&config.upstream, &Span::none()).unwrap();
        let b = WeatherTool::new(&config.upstream, &Span::none()).unwrap();

        let handlers: Vec<Arc<dyn ToolHandler>> = vec![Arc::new(a), Arc::new(b)];
        let result = ToolRegistry::new(handlers);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
