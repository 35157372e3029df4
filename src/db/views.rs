//! Join-style read projections.
//!
//! Each view fetches a base collection and attaches the records its foreign
//! keys point at. The lookups for all base records run concurrently; one
//! failed lookup fails the whole read, while a dangling key simply leaves the
//! attached field `null`.

use futures::future::try_join_all;
use serde::Serialize;

use crate::db::{ClaimRecord, ClientRecord, Database, OrderRecord};
use crate::error::DatabaseError;

/// An order with its client attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithClient {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub client: Option<ClientRecord>,
}

/// A claim with its client and order attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimWithClientAndOrder {
    #[serde(flatten)]
    pub claim: ClaimRecord,
    pub client: Option<ClientRecord>,
    pub order: Option<OrderRecord>,
}

pub async fn list_orders_with_client(
    db: &dyn Database,
) -> Result<Vec<OrderWithClient>, DatabaseError> {
    let orders = db.list_orders().await?;

    let clients = try_join_all(orders.iter().map(|order| db.get_client(order.client_id))).await?;

    Ok(orders
        .into_iter()
        .zip(clients)
        .map(|(order, client)| OrderWithClient { order, client })
        .collect())
}

pub async fn list_claims_with_client_and_order(
    db: &dyn Database,
) -> Result<Vec<ClaimWithClientAndOrder>, DatabaseError> {
    let claims = db.list_claims().await?;

    let relations = try_join_all(claims.iter().map(|claim| async move {
        let (client, order) =
            futures::try_join!(db.get_client(claim.client_id), db.get_order(claim.order_id))?;
        Ok::<_, DatabaseError>((client, order))
    }))
    .await?;

    Ok(claims
        .into_iter()
        .zip(relations)
        .map(|(claim, (client, order))| ClaimWithClientAndOrder {
            claim,
            client,
            order,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::db::libsql::test_support::setup_backend;
    use crate::db::{
        ClaimStatus, ClaimStore, ClaimType, ClientStatus, ClientStore, LineItem, NewClaimParams,
        NewClientParams, NewOrderParams, OrderStatus, OrderStore,
    };

    fn client_params(name: &str) -> NewClientParams {
        NewClientParams {
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: "+54 11 5555-0000".to_string(),
            address: "Av. Corrientes 1234".to_string(),
            created_at: 1_700_000_000_000,
            status: ClientStatus::Active,
        }
    }

    fn order_params(client_id: Uuid) -> NewOrderParams {
        NewOrderParams {
            client_id,
            items: vec![LineItem {
                product_id: Uuid::new_v4(),
                product_name: "Monitor 27".to_string(),
                quantity: 2,
                price_at_purchase: 150.0,
                subtotal: 300.0,
            }],
            total_amount: 300.0,
            status: OrderStatus::Paid,
            created_at: 1_700_000_100_000,
        }
    }

    #[tokio::test]
    async fn orders_view_attaches_existing_client_and_nulls_dangling_keys() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;

        let client_id = db
            .insert_client(&client_params("Lucia Fernandez"))
            .await
            .expect("insert client");
        let linked = db
            .insert_order(&order_params(client_id))
            .await
            .expect("insert linked order");
        let orphan = db
            .insert_order(&order_params(Uuid::new_v4()))
            .await
            .expect("insert orphan order");

        let view = list_orders_with_client(db).await.expect("orders view");
        assert_eq!(view.len(), 2);

        let linked_row = view.iter().find(|row| row.order.id == linked).expect("linked");
        assert_eq!(
            linked_row.client.as_ref().map(|c| c.full_name.as_str()),
            Some("Lucia Fernandez")
        );

        let orphan_row = view.iter().find(|row| row.order.id == orphan).expect("orphan");
        assert!(orphan_row.client.is_none());
    }

    #[tokio::test]
    async fn claims_view_resolves_both_relations_independently() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;

        let client_id = db
            .insert_client(&client_params("Martin Gomez"))
            .await
            .expect("insert client");
        let order_id = db
            .insert_order(&order_params(client_id))
            .await
            .expect("insert order");

        let complete = db
            .insert_claim(&NewClaimParams {
                client_id,
                order_id,
                claim_type: ClaimType::Damaged,
                description: "La caja llego abierta".to_string(),
                status: ClaimStatus::Open,
                created_at: 1_700_000_200_000,
            })
            .await
            .expect("insert claim");
        let missing_order = db
            .insert_claim(&NewClaimParams {
                client_id,
                order_id: Uuid::new_v4(),
                claim_type: ClaimType::LateDelivery,
                description: "Nunca llego".to_string(),
                status: ClaimStatus::InReview,
                created_at: 1_700_000_300_000,
            })
            .await
            .expect("insert claim");

        let view = list_claims_with_client_and_order(db)
            .await
            .expect("claims view");
        assert_eq!(view.len(), 2);

        let row = view.iter().find(|r| r.claim.id == complete).expect("complete");
        assert_eq!(row.client.as_ref().map(|c| c.id), Some(client_id));
        assert_eq!(row.order.as_ref().map(|o| o.id), Some(order_id));

        let row = view
            .iter()
            .find(|r| r.claim.id == missing_order)
            .expect("missing order");
        assert_eq!(row.client.as_ref().map(|c| c.id), Some(client_id));
        assert!(row.order.is_none());
    }

    #[tokio::test]
    async fn orders_view_serializes_order_fields_flat_with_client() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;

        let client_id = db
            .insert_client(&client_params("Ana Ruiz"))
            .await
            .expect("insert client");
        db.insert_order(&order_params(client_id))
            .await
            .expect("insert order");

        let view = list_orders_with_client(db).await.expect("orders view");
        let json = serde_json::to_value(&view).expect("serialize");
        let row = &json[0];
        assert_eq!(row["clientId"], serde_json::json!(client_id.to_string()));
        assert_eq!(row["status"], "paid");
        assert_eq!(row["items"][0]["priceAtPurchase"], 150.0);
        assert_eq!(row["client"]["fullName"], "Ana Ruiz");
    }

    #[tokio::test]
    async fn views_are_empty_on_empty_store() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;
        assert!(list_orders_with_client(db).await.expect("orders").is_empty());
        assert!(
            list_claims_with_client_and_order(db)
                .await
                .expect("claims")
                .is_empty()
        );
    }
}
