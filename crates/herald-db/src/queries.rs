use crate::models::UserRow;
use crate::{Database, OptionalExt, uuid_col};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password, refresh_token, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id.to_string(), email, password_hash, now],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    /// Store (or clear, with `None`) the user's current refresh token.
    pub fn set_refresh_token(
        &self,
        id: Uuid,
        refresh_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users SET refresh_token = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![refresh_token, now, id.to_string()],
            )?;
            Ok(n == 1)
        })
    }

    pub fn set_password(&self, id: Uuid, password_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users SET password = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![password_hash, now, id.to_string()],
            )?;
            Ok(n == 1)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always one of our own literals, never user input.
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    let row = stmt.query_row([value], user_from_row).optional()?;

    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_col(row, 0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        refresh_token: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
