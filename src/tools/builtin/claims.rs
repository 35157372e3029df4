use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::db::{Database, list_claims_with_client_and_order};
use crate::tools::builtin::{NoParams, object_schema};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, parse_params};

pub struct ListClaimsTool {
    db: Arc<dyn Database>,
}

impl ListClaimsTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListClaimsTool {
    fn name(&self) -> &str {
        "list_claims"
    }

    fn description(&self) -> &str {
        "Obtiene la lista de reclamos con el cliente y la orden a la que corresponden"
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
        let claims = list_claims_with_client_and_order(self.db.as_ref()).await?;
        ToolOutput::from_serializable(&claims, start.elapsed())
    }
}
