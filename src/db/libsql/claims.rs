use libsql::params;
use uuid::Uuid;

use crate::db::{ClaimRecord, ClaimStatus, ClaimStore, ClaimType, NewClaimParams};
use crate::error::DatabaseError;

use super::{LibSqlBackend, collect_rows, get_i64, get_text, parse_uuid};

const CLAIM_COLUMNS: &str = "id, client_id, order_id, claim_type, description, status, created_at";

fn row_to_claim_record(row: &libsql::Row) -> Result<ClaimRecord, DatabaseError> {
    let raw_type = get_text(row, 3);
    let claim_type = ClaimType::from_db_value(&raw_type)
        .ok_or_else(|| DatabaseError::Serialization(format!("invalid claim type '{}'", raw_type)))?;
    let raw_status = get_text(row, 5);
    let status = ClaimStatus::from_db_value(&raw_status).ok_or_else(|| {
        DatabaseError::Serialization(format!("invalid claim status '{}'", raw_status))
    })?;

    Ok(ClaimRecord {
        id: parse_uuid(&get_text(row, 0), "claims.id")?,
        client_id: parse_uuid(&get_text(row, 1), "claims.client_id")?,
        order_id: parse_uuid(&get_text(row, 2), "claims.order_id")?,
        claim_type,
        description: get_text(row, 4),
        status,
        created_at: get_i64(row, 6),
    })
}

#[async_trait::async_trait]
impl ClaimStore for LibSqlBackend {
    async fn list_claims(&self) -> Result<Vec<ClaimRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {CLAIM_COLUMNS} FROM claims ORDER BY rowid ASC"),
                (),
            )
            .await?;
        collect_rows(rows, row_to_claim_record).await
    }

    async fn insert_claim(&self, input: &NewClaimParams) -> Result<Uuid, DatabaseError> {
        let conn = self.connect().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO claims (id, client_id, order_id, claim_type, description, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                input.client_id.to_string(),
                input.order_id.to_string(),
                input.claim_type.as_str(),
                input.description.as_str(),
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
    use super::*;
    use crate::db::libsql::test_support::setup_backend;

    #[tokio::test]
    async fn claim_labels_round_trip_through_storage() {
        let fixture = setup_backend().await;
        let db = &fixture.backend;
        let id = db
            .insert_claim(&NewClaimParams {
                client_id: Uuid::new_v4(),
                order_id: Uuid::new_v4(),
                claim_type: ClaimType::WrongItem,
                description: "Llego otro modelo".to_string(),
                status: ClaimStatus::InReview,
                created_at: 42,
            })
            .await
            .expect("insert");

        let claims = db.list_claims().await.expect("list");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].id, id);
        assert_eq!(claims[0].claim_type, ClaimType::WrongItem);
        assert_eq!(claims[0].status, ClaimStatus::InReview);

        let json = serde_json::to_value(&claims[0]).expect("serialize");
        assert_eq!(json["type"], "wrong_item");
        assert_eq!(json["status"], "in_review");
    }
}
