use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::db::Database;
use crate::tools::builtin::{NoParams, object_schema};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, parse_params};

pub struct ListClientsTool {
    db: Arc<dyn Database>,
}

impl ListClientsTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListClientsTool {
    fn name(&self) -> &str {
        "list_clients"
    }

    fn description(&self) -> &str {
        "Obtiene la lista completa de clientes con su estado y datos de contacto"
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
        let clients = self.db.list_clients().await?;
        ToolOutput::from_serializable(&clients, start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ClientStatus, NewClientParams};
    use crate::tools::builtin::test_support::setup_store;

    #[tokio::test]
    async fn lists_clients_with_camel_case_fields() {
        let (db, _fixture) = setup_store().await;
        db.insert_client(&NewClientParams {
            full_name: "Ferreteria Sur".to_string(),
            email: "ventas@sur.test".to_string(),
            phone: "011 4000-0000".to_string(),
            address: "Calle 1".to_string(),
            created_at: 5,
            status: ClientStatus::Active,
        })
        .await
        .expect("insert");

        let out = ListClientsTool::new(db)
            .execute(serde_json::json!({}), &ToolContext::default())
            .await
            .expect("execute");
        assert_eq!(out.result[0]["fullName"], "Ferreteria Sur");
        assert_eq!(out.result[0]["status"], "active");
    }
}
