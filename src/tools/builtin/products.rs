use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Database, ProductParams};
use crate::tools::builtin::{NoParams, object_schema};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, parse_params};

fn product_properties() -> serde_json::Map<String, serde_json::Value> {
    let props = serde_json::json!({
        "name": { "type": "string", "description": "Nombre del producto" },
        "description": { "type": "string", "description": "Descripción del producto" },
        "price": { "type": "number", "description": "Precio unitario" },
        "stock": { "type": "integer", "description": "Unidades disponibles" },
        "sku": { "type": "string", "description": "Código SKU" },
        "createdAt": { "type": "integer", "description": "Fecha de alta en milisegundos Unix" },
        "active": { "type": "boolean", "description": "Si el producto está activo" }
    });
    match props {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

pub struct ListProductsTool {
    db: Arc<dyn Database>,
}

impl ListProductsTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListProductsTool {
    fn name(&self) -> &str {
        "list_products"
    }

    fn description(&self) -> &str {
        "Obtiene la lista de productos"
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
        let products = self.db.list_products().await?;
        ToolOutput::from_serializable(&products, start.elapsed())
    }
}

pub struct CreateProductTool {
    db: Arc<dyn Database>,
}

impl CreateProductTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for CreateProductTool {
    fn name(&self) -> &str {
        "create_product"
    }

    fn description(&self) -> &str {
        "Crea un nuevo producto y devuelve su id"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        object_schema(serde_json::Value::Object(product_properties()))
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let params: ProductParams = parse_params(self.name(), params)?;
        let id = self.db.insert_product(&params).await?;
        tracing::info!(
            request_id = %ctx.request_id,
            product_id = %id,
            sku = %params.sku,
            "Created product"
        );
        ToolOutput::from_serializable(&id, start.elapsed())
    }
}

/// `update_product` arguments: the target id plus every editable field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateProductParams {
    id: String,
    name: String,
    description: String,
    price: f64,
    stock: i64,
    sku: String,
    created_at: i64,
    active: bool,
}

impl UpdateProductParams {
    fn into_parts(self) -> (String, ProductParams) {
        (
            self.id,
            ProductParams {
                name: self.name,
                description: self.description,
                price: self.price,
                stock: self.stock,
                sku: self.sku,
                created_at: self.created_at,
                active: self.active,
            },
        )
    }
}

pub struct UpdateProductTool {
    db: Arc<dyn Database>,
}

impl UpdateProductTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for UpdateProductTool {
    fn name(&self) -> &str {
        "update_product"
    }

    fn description(&self) -> &str {
        "Edita un producto existente. Reemplaza todos sus campos con los valores indicados."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let mut props = product_properties();
        props.insert(
            "id".to_string(),
            serde_json::json!({ "type": "string", "description": "Id del producto a editar" }),
        );
        object_schema(serde_json::Value::Object(props))
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let params: UpdateProductParams = parse_params(self.name(), params)?;
        let (raw_id, fields) = params.into_parts();
        let id = Uuid::parse_str(&raw_id).map_err(|e| {
            ToolError::InvalidParameters(format!("{}: id '{}': {}", self.name(), raw_id, e))
        })?;
        self.db.replace_product(id, &fields).await?;
        tracing::info!(request_id = %ctx.request_id, product_id = %id, "Replaced product");
        ToolOutput::from_serializable(&serde_json::Value::Null, start.elapsed())
    }
}
