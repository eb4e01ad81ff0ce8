//! Channel credential rows. Functions take a `&Connection` so callers can
//! compose several of them inside one `Database::with_conn_mut` transaction.

use anyhow::Result;
use herald_types::models::{ChannelEntry, ChannelName};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::{OptionalExt, parsed_col, uuid_col};

const COLUMNS: &str = "id, channel_name, access_token, refresh_token, sub, user_name, \
                       user_email, profile_picture, created_at, updated_at";

/// All entries for a user, in the order they were first bound.
pub fn list(conn: &Connection, user_id: Uuid) -> Result<Vec<ChannelEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM channels WHERE user_id = ?1 ORDER BY created_at, rowid"
    ))?;

    let rows = stmt
        .query_map([user_id.to_string()], channel_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn find(conn: &Connection, user_id: Uuid, name: ChannelName) -> Result<Option<ChannelEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM channels WHERE user_id = ?1 AND channel_name = ?2"
    ))?;

    stmt.query_row(rusqlite::params![user_id.to_string(), name.as_str()], channel_from_row)
        .optional()
}

pub fn insert(conn: &Connection, user_id: Uuid, entry: &ChannelEntry) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO channels (user_id, {COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        rusqlite::params![
            user_id.to_string(),
            entry.id.to_string(),
            entry.channel_name.as_str(),
            entry.access_token,
            entry.refresh_token,
            entry.sub,
            entry.user_name,
            entry.user_email,
            entry.profile_picture,
            entry.created_at,
            entry.updated_at,
        ],
    )?;
    Ok(())
}

/// Overwrite the credential and metadata fields of an existing entry in place.
/// The entry keeps its id, so posts referencing it see the new tokens.
pub fn update(conn: &Connection, user_id: Uuid, entry: &ChannelEntry) -> Result<bool> {
    let n = conn.execute(
        "UPDATE channels
         SET access_token = ?1, refresh_token = ?2, sub = ?3, user_name = ?4,
             user_email = ?5, profile_picture = ?6, updated_at = ?7
         WHERE id = ?8 AND user_id = ?9",
        rusqlite::params![
            entry.access_token,
            entry.refresh_token,
            entry.sub,
            entry.user_name,
            entry.user_email,
            entry.profile_picture,
            entry.updated_at,
            entry.id.to_string(),
            user_id.to_string(),
        ],
    )?;
    Ok(n == 1)
}

/// Hard-delete an entry. Posts keep their `ChannelRef` to the removed id.
pub fn delete(conn: &Connection, user_id: Uuid, name: ChannelName) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM channels WHERE user_id = ?1 AND channel_name = ?2",
        rusqlite::params![user_id.to_string(), name.as_str()],
    )?;
    Ok(n == 1)
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelEntry> {
    Ok(ChannelEntry {
        id: uuid_col(row, 0)?,
        channel_name: parsed_col(row, 1)?,
        access_token: row.get(2)?,
        refresh_token: row.get(3)?,
        sub: row.get(4)?,
        user_name: row.get(5)?,
        user_email: row.get(6)?,
        profile_picture: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Utc;

    fn entry(name: ChannelName, token: &str) -> ChannelEntry {
        let now = Utc::now();
        ChannelEntry {
            id: Uuid::new_v4(),
            channel_name: name,
            access_token: token.into(),
            refresh_token: None,
            sub: None,
            user_name: None,
            user_email: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn db_with_user() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "u@example.com", "hash", Utc::now()).unwrap();
        (db, user)
    }

    #[test]
    fn one_entry_per_name_per_user() {
        let (db, user) = db_with_user();
        db.with_conn_mut(|c| insert(c, user, &entry(ChannelName::LinkedIn, "a"))).unwrap();
        let dup = db.with_conn_mut(|c| insert(c, user, &entry(ChannelName::LinkedIn, "b")));
        assert!(dup.is_err());
    }

    #[test]
    fn update_keeps_identity() {
        let (db, user) = db_with_user();
        let mut e = entry(ChannelName::Twitter, "old");
        db.with_conn_mut(|c| insert(c, user, &e)).unwrap();

        e.access_token = "new".into();
        e.sub = Some("provider-sub".into());
        assert!(db.with_conn_mut(|c| update(c, user, &e)).unwrap());

        let found = db.with_conn(|c| find(c, user, ChannelName::Twitter)).unwrap().unwrap();
        assert_eq!(found.id, e.id);
        assert_eq!(found.access_token, "new");
        assert_eq!(found.sub.as_deref(), Some("provider-sub"));
    }

    #[test]
    fn list_preserves_bind_order() {
        let (db, user) = db_with_user();
        for name in [ChannelName::YouTube, ChannelName::Facebook] {
            db.with_conn_mut(|c| insert(c, user, &entry(name, "t"))).unwrap();
        }
        let names: Vec<_> = db
            .with_conn(|c| list(c, user))
            .unwrap()
            .into_iter()
            .map(|e| e.channel_name)
            .collect();
        assert_eq!(names, vec![ChannelName::YouTube, ChannelName::Facebook]);
    }
}
