use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Database;
use crate::llm::ToolDefinition;
use crate::tools::Tool;
use crate::tools::builtin::store_tools;

/// Name-indexed set of tools, kept in registration order for the catalog.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every store-backed tool.
    pub fn with_builtins(db: Arc<dyn Database>) -> Self {
        let mut registry = Self::new();
        for tool in store_tools(db) {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replacing previously registered tool");
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Model-facing declarations for every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::tools::builtin::test_support::setup_store;
    use crate::tools::{ToolContext, ToolError, ToolOutput};

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            self.0
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(
            &self,
            params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(params, std::time::Duration::ZERO))
        }
    }

    #[tokio::test]
    async fn builtins_follow_catalog_order() {
        let (db, _fixture) = setup_store().await;
        let registry = ToolRegistry::with_builtins(db);
        assert_eq!(
            registry.names(),
            [
                "list_users",
                "get_user_by_full_name",
                "get_user_by_email",
                "list_clients",
                "list_sales",
                "list_products",
                "list_claims",
                "create_product",
                "update_product",
            ]
        );
        assert_eq!(registry.definitions().len(), registry.len());
        assert!(registry.get("list_sales").is_some());
        assert!(registry.get("drop_tables").is_none());
    }

    #[test]
    fn re_registering_replaces_without_duplicating() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("first")));
        registry.register(Arc::new(Echo("second")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].description, "second");
    }
}
