use libsql::params;
use uuid::Uuid;

use crate::db::{ProductParams, ProductRecord, ProductStore};
use crate::error::DatabaseError;

use super::{
    LibSqlBackend, bool_value, collect_rows, get_bool, get_f64, get_i64, get_text, parse_uuid,
    unique_match,
};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, sku, created_at, active";

fn row_to_product_record(row: &libsql::Row) -> Result<ProductRecord, DatabaseError> {
    Ok(ProductRecord {
        id: parse_uuid(&get_text(row, 0), "products.id")?,
        name: get_text(row, 1),
        description: get_text(row, 2),
        price: get_f64(row, 3),
        stock: get_i64(row, 4),
        sku: get_text(row, 5),
        created_at: get_i64(row, 6),
        active: get_bool(row, 7),
    })
}

#[async_trait::async_trait]
impl ProductStore for LibSqlBackend {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY rowid ASC"),
                (),
            )
            .await?;
        collect_rows(rows, row_to_product_record).await
    }

    async fn get_product(
        &self,
        product_id: Uuid,
    ) -> Result<Option<ProductRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let row = conn
            .query(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 LIMIT 1"),
                params![product_id.to_string()],
            )
            .await?
            .next()
            .await?;
        row.map(|row| row_to_product_record(&row)).transpose()
    }

    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<ProductRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1 LIMIT 2"),
                params![sku],
            )
            .await?;
        let matches = collect_rows(rows, row_to_product_record).await?;
        Ok(unique_match(matches, "products.by_sku"))
    }

    async fn insert_product(&self, input: &ProductParams) -> Result<Uuid, DatabaseError> {
        let conn = self.connect().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO products (id, name, description, price, stock, sku, created_at, active) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                input.name.as_str(),
                input.description.as_str(),
                input.price,
                input.stock,
                input.sku.as_str(),
                input.created_at,
                bool_value(input.active),
            ],
        )
        .await?;
        Ok(id)
    }

    async fn replace_product(
        &self,
        product_id: Uuid,
        input: &ProductParams,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        let changed = conn
            .execute(
                "UPDATE products SET \
                   name = ?2, \
                   description = ?3, \
                   price = ?4, \
                   stock = ?5, \
                   sku = ?6, \
                   created_at = ?7, \
                   active = ?8 \
                 WHERE id = ?1",
                params![
                    product_id.to_string(),
                    input.name.as_str(),
                    input.description.as_str(),
                    input.price,
                    input.stock,
                    input.sku.as_str(),
                    input.created_at,
                    bool_value(input.active),
                ],
            )
            .await?;
        tracing::debug!(%product_id, changed, "Replaced product fields");
        Ok(())
    }
}
