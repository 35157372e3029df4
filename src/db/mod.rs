//! Database abstraction layer.
//!
//! Provides a backend-agnostic `Database` trait over the five record kinds
//! the assistant can see: users, clients, products, orders and claims. The
//! only backend is libSQL (Turso's SQLite fork), either as a local file or as
//! an embedded replica of a remote database.
//!
//! Every kind exposes the same small capability set (list, get-by-key,
//! insert, and for products a full replace). Adding a record kind means one
//! more sub-trait and one more backend impl; the tool and agent layers only
//! ever see `Arc<dyn Database>`.

pub mod libsql;
pub mod libsql_migrations;
pub mod views;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::DatabaseError;

pub use views::{
    ClaimWithClientAndOrder, OrderWithClient, list_claims_with_client_and_order,
    list_orders_with_client,
};

/// Open the configured backend, run migrations, and return it.
pub async fn connect_from_config(
    config: &DatabaseConfig,
) -> Result<Arc<dyn Database>, DatabaseError> {
    use secrecy::ExposeSecret as _;

    let backend = if let Some(ref url) = config.libsql_url {
        let token = config.libsql_auth_token.as_ref().ok_or_else(|| {
            DatabaseError::Pool("LIBSQL_AUTH_TOKEN required when LIBSQL_URL is set".to_string())
        })?;
        libsql::LibSqlBackend::new_remote_replica(
            &config.libsql_path,
            url.as_str(),
            token.expose_secret(),
        )
        .await?
    } else {
        libsql::LibSqlBackend::new_local(&config.libsql_path).await?
    };
    backend.run_migrations().await?;
    Ok(Arc::new(backend))
}

/// Client account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Order lifecycle label.
///
/// Stored as-is; nothing in the system enforces transitions between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// What a claim is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Refund,
    Damaged,
    WrongItem,
    LateDelivery,
    Other,
}

impl ClaimType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refund => "refund",
            Self::Damaged => "damaged",
            Self::WrongItem => "wrong_item",
            Self::LateDelivery => "late_delivery",
            Self::Other => "other",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "refund" => Some(Self::Refund),
            "damaged" => Some(Self::Damaged),
            "wrong_item" => Some(Self::WrongItem),
            "late_delivery" => Some(Self::LateDelivery),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Claim review label. Like [`OrderStatus`], transitions are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Open,
    InReview,
    Resolved,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InReview => "in_review",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_review" => Some(Self::InReview),
            "resolved" => Some(Self::Resolved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Internal staff member. JSON field names follow the Spanish naming used by
/// the front office (`nombre`, `apellido`, `rol`, `activo`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    pub email: String,
    #[serde(rename = "rol")]
    pub role: String,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewUserParams {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: i64,
    pub status: ClientStatus,
}

#[derive(Debug, Clone)]
pub struct NewClientParams {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: i64,
    pub status: ClientStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub sku: String,
    pub created_at: i64,
    pub active: bool,
}

/// Every editable product field. Used both for inserts and for full-replace
/// updates, so an update can never silently keep a stale value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductParams {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub sku: String,
    pub created_at: i64,
    pub active: bool,
}

/// One order line. `price_at_purchase` and `subtotal` are frozen at order
/// time and never recomputed from the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub price_at_purchase: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrderParams {
    pub client_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub order_id: Uuid,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub description: String,
    pub status: ClaimStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewClaimParams {
    pub client_id: Uuid,
    pub order_id: Uuid,
    pub claim_type: ClaimType,
    pub description: String,
    pub status: ClaimStatus,
    pub created_at: i64,
}

// ==================== Sub-traits ====================
//
// One sub-trait per record kind. The `Database` supertrait combines them so
// tools and views can hold a single `Arc<dyn Database>`.

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DatabaseError>;
    /// Exactly one match or `None`. Duplicate (name, surname) pairs are not
    /// disambiguated and also yield `None`.
    async fn get_user_by_full_name(
        &self,
        name: &str,
        surname: &str,
    ) -> Result<Option<UserRecord>, DatabaseError>;
    /// Same uniqueness rule as [`UserStore::get_user_by_full_name`].
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;
    async fn insert_user(&self, input: &NewUserParams) -> Result<Uuid, DatabaseError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, DatabaseError>;
    async fn get_client(&self, client_id: Uuid) -> Result<Option<ClientRecord>, DatabaseError>;
    async fn insert_client(&self, input: &NewClientParams) -> Result<Uuid, DatabaseError>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, DatabaseError>;
    async fn get_product(&self, product_id: Uuid)
    -> Result<Option<ProductRecord>, DatabaseError>;
    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<ProductRecord>, DatabaseError>;
    async fn insert_product(&self, input: &ProductParams) -> Result<Uuid, DatabaseError>;
    /// Overwrite every editable field. Succeeds silently when the id does not
    /// exist.
    async fn replace_product(
        &self,
        product_id: Uuid,
        input: &ProductParams,
    ) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, DatabaseError>;
    async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderRecord>, DatabaseError>;
    async fn insert_order(&self, input: &NewOrderParams) -> Result<Uuid, DatabaseError>;
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn list_claims(&self) -> Result<Vec<ClaimRecord>, DatabaseError>;
    async fn insert_claim(&self, input: &NewClaimParams) -> Result<Uuid, DatabaseError>;
}

/// Backend-agnostic database supertrait.
#[async_trait]
pub trait Database:
    UserStore + ClientStore + ProductStore + OrderStore + ClaimStore + Send + Sync
{
    /// Run schema migrations for this backend.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;
}
