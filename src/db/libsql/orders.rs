use libsql::params;
use uuid::Uuid;

use crate::db::{LineItem, NewOrderParams, OrderRecord, OrderStatus, OrderStore};
use crate::error::DatabaseError;

use super::{LibSqlBackend, collect_rows, get_f64, get_i64, get_text, parse_uuid};

const ORDER_COLUMNS: &str = "id, client_id, items, total_amount, status, created_at";

fn row_to_order_record(row: &libsql::Row) -> Result<OrderRecord, DatabaseError> {
    let raw_status = get_text(row, 4);
    let status = OrderStatus::from_db_value(&raw_status).ok_or_else(|| {
        DatabaseError::Serialization(format!("invalid order status '{}'", raw_status))
    })?;
    let items: Vec<LineItem> = serde_json::from_str(&get_text(row, 2))
        .map_err(|e| DatabaseError::Serialization(format!("orders.items: {}", e)))?;

    Ok(OrderRecord {
        id: parse_uuid(&get_text(row, 0), "orders.id")?,
        client_id: parse_uuid(&get_text(row, 1), "orders.client_id")?,
        items,
        total_amount: get_f64(row, 3),
        status,
        created_at: get_i64(row, 5),
    })
}

#[async_trait::async_trait]
impl OrderStore for LibSqlBackend {
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY rowid ASC"),
                (),
            )
            .await?;
        collect_rows(rows, row_to_order_record).await
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let row = conn
            .query(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 LIMIT 1"),
                params![order_id.to_string()],
            )
            .await?
            .next()
            .await?;
        row.map(|row| row_to_order_record(&row)).transpose()
    }

    async fn insert_order(&self, input: &NewOrderParams) -> Result<Uuid, DatabaseError> {
        let items = serde_json::to_string(&input.items)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let conn = self.connect().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO orders (id, client_id, items, total_amount, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                input.client_id.to_string(),
                items,
                input.total_amount,
                input.status.as_str(),
                input.created_at,
            ],
        )
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::libsql::test_support::setup_backend;

    #[tokio::test]
    async fn line_items_survive_storage_unchanged() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;
        let items = vec![
            LineItem {
                product_id: Uuid::new_v4(),
                product_name: "Mouse".to_string(),
                quantity: 3,
                price_at_purchase: 19.5,
                subtotal: 58.5,
            },
            LineItem {
                product_id: Uuid::new_v4(),
                product_name: "Monitor".to_string(),
                quantity: 1,
                price_at_purchase: 210.0,
                subtotal: 210.0,
            },
        ];
        let client_id = Uuid::new_v4();
        let id = db
            .insert_order(&NewOrderParams {
                client_id,
                items: items.clone(),
                total_amount: 268.5,
                status: OrderStatus::Shipped,
                created_at: 1_700_000_000_000,
            })
            .await
            .expect("insert");

        let stored = db.get_order(id).await.expect("get").expect("exists");
        assert_eq!(stored.client_id, client_id);
        assert_eq!(stored.items, items);
        assert_eq!(stored.total_amount, 268.5);
        assert_eq!(stored.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn corrupt_items_column_surfaces_as_serialization_error() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;
        let conn = db.connect().await.expect("connect");
        conn.execute(
            "INSERT INTO orders (id, client_id, items, total_amount, status, created_at) \
             VALUES (?1, ?2, 'not json', 0, 'pending', 0)",
            params![Uuid::new_v4().to_string(), Uuid::new_v4().to_string()],
        )
        .await
        .expect("raw insert");

        let err = db.list_orders().await.expect_err("items must be JSON");
        assert!(matches!(err, DatabaseError::Serialization(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unknown_order_is_none() {
        let fixture = setup_backend().await;
        assert!(
            fixture
                .backend
                .get_order(Uuid::new_v4())
                .await
                .expect("lookup")
                .is_none()
        );
    }
}
