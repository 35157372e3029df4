use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::db::{Database, list_orders_with_client};
use crate::tools::builtin::{NoParams, object_schema};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, parse_params};

/// Orders joined with their client.
pub struct ListSalesTool {
    db: Arc<dyn Database>,
}

impl ListSalesTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListSalesTool {
    fn name(&self) -> &str {
        "list_sales"
    }

    fn description(&self) -> &str {
        "Obtiene la lista completa de todas las ventas que existen en el momento con su \
         cliente y sus productos"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        object_schema(serde_json::json!({}))
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let NoParams {} = parse_params(self.name(), params)?;
        let sales = list_orders_with_client(self.db.as_ref()).await?;
        ToolOutput::from_serializable(&sales, start.elapsed())
    }
}
