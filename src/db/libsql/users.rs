use libsql::params;
use uuid::Uuid;

use crate::db::{NewUserParams, UserRecord, UserStore};
use crate::error::DatabaseError;

use super::{
    LibSqlBackend, bool_value, collect_rows, get_bool, get_i64, get_opt_i64, get_text, opt_i64,
    parse_uuid, unique_match,
};

const USER_COLUMNS: &str = "id, name, surname, email, role, active, created_at, updated_at";

fn row_to_user_record(row: &libsql::Row) -> Result<UserRecord, DatabaseError> {
    Ok(UserRecord {
        id: parse_uuid(&get_text(row, 0), "users.id")?,
        name: get_text(row, 1),
        surname: get_text(row, 2),
        email: get_text(row, 3),
        role: get_text(row, 4),
        active: get_bool(row, 5),
        created_at: get_i64(row, 6),
        updated_at: get_opt_i64(row, 7),
    })
}

#[async_trait::async_trait]
impl UserStore for LibSqlBackend {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid ASC"),
                (),
            )
            .await?;
        collect_rows(rows, row_to_user_record).await
    }

    async fn get_user_by_full_name(
        &self,
        name: &str,
        surname: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let conn = self.connect().await?;
        // LIMIT 2 is enough to tell "unique" from "ambiguous".
        let rows = conn
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE name = ?1 AND surname = ?2 LIMIT 2"
                ),
                params![name, surname],
            )
            .await?;
        let matches = collect_rows(rows, row_to_user_record).await?;
        Ok(unique_match(matches, "users.by_fullname"))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let conn = self.connect().await?;
        let rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 LIMIT 2"),
                params![email],
            )
            .await?;
        let matches = collect_rows(rows, row_to_user_record).await?;
        Ok(unique_match(matches, "users.by_email"))
    }

    async fn insert_user(&self, input: &NewUserParams) -> Result<Uuid, DatabaseError> {
        let conn = self.connect().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO users (id, name, surname, email, role, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                input.name.as_str(),
                input.surname.as_str(),
                input.email.as_str(),
                input.role.as_str(),
                bool_value(input.active),
                input.created_at,
                opt_i64(input.updated_at),
            ],
        )
        .await?;
        Ok(id)
    }
}
