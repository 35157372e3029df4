//! Tools backed by the record store.
//!
//! Each tool forwards its validated arguments to exactly one store operation
//! and returns the result as JSON. Argument structs deny unknown fields, so a
//! malformed call never reaches the store.

mod claims;
mod clients;
mod orders;
mod products;
mod users;

use std::sync::Arc;

pub use claims::ListClaimsTool;
pub use clients::ListClientsTool;
pub use orders::ListSalesTool;
pub use products::{CreateProductTool, ListProductsTool, UpdateProductTool};
pub use users::{GetUserByEmailTool, GetUserByFullNameTool, ListUsersTool};

use serde::Deserialize;

use crate::db::Database;
use crate::tools::Tool;

/// Every store-backed tool, in catalog order.
pub fn store_tools(db: Arc<dyn Database>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListUsersTool::new(db.clone())),
        Arc::new(GetUserByFullNameTool::new(db.clone())),
        Arc::new(GetUserByEmailTool::new(db.clone())),
        Arc::new(ListClientsTool::new(db.clone())),
        Arc::new(ListSalesTool::new(db.clone())),
        Arc::new(ListProductsTool::new(db.clone())),
        Arc::new(ListClaimsTool::new(db.clone())),
        Arc::new(CreateProductTool::new(db.clone())),
        Arc::new(UpdateProductTool::new(db)),
    ]
}

/// Arguments for tools that take none.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NoParams {}

/// Closed object schema: every listed property is required.
pub(crate) fn object_schema(properties: serde_json::Value) -> serde_json::Value {
    let required: Vec<String> = properties
        .as_object()
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}
