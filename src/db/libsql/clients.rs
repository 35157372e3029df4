use libsql::params;
use uuid::Uuid;

use crate::db::{ClientRecord, ClientStatus, ClientStore, NewClientParams};
use crate::error::DatabaseError;

use super::{LibSqlBackend, collect_rows, get_i64, get_text, parse_uuid};

const CLIENT_COLUMNS: &str = "id, full_name, email, phone, address, created_at, status";

fn parse_client_status(raw: &str) -> Result<ClientStatus, DatabaseError> {
    ClientStatus::from_db_value(raw)
        .ok_or_else(|| DatabaseError::Serialization(format!("invalid client status '{}'", raw)))
}

fn row_to_client_record(row: &libsql::Row) -> Result<ClientRecord, DatabaseError> {
    Ok(ClientRecord {
        id: parse_uuid(&get_text(row, 0), "clients.id")?,
        full_name: get_text(row, 1),
        email: get_text(row, 2),
        phone: get_text(row, 3),
        address: get_text(row, 4),
        created_at: get_i64(row, 5),
        status: parse_client_status(&get_text(row, 6))?,
    })
}

#[async_trait::async_trait]
impl ClientStore for LibSqlBackend {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY rowid ASC"),
                (),
            )
            .await?;
        collect_rows(rows, row_to_client_record).await
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<ClientRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let row = conn
            .query(
                &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1 LIMIT 1"),
                params![client_id.to_string()],
            )
            .await?
            .next()
            .await?;
        row.map(|row| row_to_client_record(&row)).transpose()
    }

    async fn insert_client(&self, input: &NewClientParams) -> Result<Uuid, DatabaseError> {
        let conn = self.connect().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO clients (id, full_name, email, phone, address, created_at, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                input.full_name.as_str(),
                input.email.as_str(),
                input.phone.as_str(),
                input.address.as_str(),
                input.created_at,
                input.status.as_str(),
            ],
        )
        .await?;
        Ok(id)
    }
}
