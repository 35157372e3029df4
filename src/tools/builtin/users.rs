use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;

use crate::db::Database;
use crate::tools::builtin::{NoParams, object_schema};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, parse_params};

pub struct ListUsersTool {
    db: Arc<dyn Database>,
}

impl ListUsersTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListUsersTool {
    fn name(&self) -> &str {
        "list_users"
    }

    fn description(&self) -> &str {
        "Obtiene la lista completa de usuarios"
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
        let users = self.db.list_users().await?;
        ToolOutput::from_serializable(&users, start.elapsed())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FullNameParams {
    nombre: String,
    apellido: String,
}

pub struct GetUserByFullNameTool {
    db: Arc<dyn Database>,
}

impl GetUserByFullNameTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for GetUserByFullNameTool {
    fn name(&self) -> &str {
        "get_user_by_full_name"
    }

    fn description(&self) -> &str {
        "Obtiene un usuario específico por nombre y apellido. Devuelve null si no existe \
         o si hay más de un usuario con ese nombre."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        object_schema(serde_json::json!({
            "nombre": { "type": "string", "description": "Nombre del usuario" },
            "apellido": { "type": "string", "description": "Apellido del usuario" }
        }))
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let params: FullNameParams = parse_params(self.name(), params)?;
        let user = self
            .db
            .get_user_by_full_name(&params.nombre, &params.apellido)
            .await?;
        ToolOutput::from_serializable(&user, start.elapsed())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmailParams {
    email: String,
}

pub struct GetUserByEmailTool {
    db: Arc<dyn Database>,
}

impl GetUserByEmailTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for GetUserByEmailTool {
    fn name(&self) -> &str {
        "get_user_by_email"
    }

    fn description(&self) -> &str {
        "Obtiene un usuario por su correo electrónico. Devuelve null si no existe."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        object_schema(serde_json::json!({
            "email": { "type": "string", "description": "Correo electrónico exacto" }
        }))
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let params: EmailParams = parse_params(self.name(), params)?;
        let user = self.db.get_user_by_email(&params.email).await?;
        ToolOutput::from_serializable(&user, start.elapsed())
    }
}
