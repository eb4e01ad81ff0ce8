//! Published post records, one row per post, ordered by insertion.

use anyhow::Result;
use herald_types::models::{ChannelRef, Post};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::{OptionalExt, parsed_col, uuid_col};

const COLUMNS: &str = "id, channel_id, channel_name, urn, created_at, updated_at";

pub fn list(conn: &Connection, user_id: Uuid) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM posts WHERE user_id = ?1 ORDER BY rowid"
    ))?;

    let rows = stmt
        .query_map([user_id.to_string()], post_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn find(conn: &Connection, user_id: Uuid, id: Uuid) -> Result<Option<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM posts WHERE user_id = ?1 AND id = ?2"
    ))?;

    stmt.query_row(rusqlite::params![user_id.to_string(), id.to_string()], post_from_row)
        .optional()
}

pub fn insert(conn: &Connection, user_id: Uuid, post: &Post) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO posts (user_id, {COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        rusqlite::params![
            user_id.to_string(),
            post.id.to_string(),
            post.channel.id.to_string(),
            post.channel.name.as_str(),
            post.urn,
            post.created_at,
            post.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update(conn: &Connection, user_id: Uuid, post: &Post) -> Result<bool> {
    let n = conn.execute(
        "UPDATE posts SET channel_id = ?1, channel_name = ?2, urn = ?3, updated_at = ?4
         WHERE user_id = ?5 AND id = ?6",
        rusqlite::params![
            post.channel.id.to_string(),
            post.channel.name.as_str(),
            post.urn,
            post.updated_at,
            user_id.to_string(),
            post.id.to_string(),
        ],
    )?;
    Ok(n == 1)
}

pub fn delete(conn: &Connection, user_id: Uuid, id: Uuid) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM posts WHERE user_id = ?1 AND id = ?2",
        rusqlite::params![user_id.to_string(), id.to_string()],
    )?;
    Ok(n == 1)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: uuid_col(row, 0)?,
        channel: ChannelRef {
            id: uuid_col(row, 1)?,
            name: parsed_col(row, 2)?,
        },
        urn: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Utc;
    use herald_types::models::ChannelName;

    fn post(urn: &str) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            channel: ChannelRef { id: Uuid::new_v4(), name: ChannelName::LinkedIn },
            urn: urn.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_list_update_delete() {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "u@example.com", "hash", Utc::now()).unwrap();

        let first = post("urn:1");
        let second = post("urn:2");
        db.with_conn_mut(|c| {
            insert(c, user, &first)?;
            insert(c, user, &second)
        })
        .unwrap();

        let listed = db.with_conn(|c| list(c, user)).unwrap();
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        let mut changed = first.clone();
        changed.urn = "urn:1b".into();
        assert!(db.with_conn_mut(|c| update(c, user, &changed)).unwrap());
        assert_eq!(db.with_conn(|c| find(c, user, first.id)).unwrap().unwrap().urn, "urn:1b");

        assert!(db.with_conn_mut(|c| delete(c, user, first.id)).unwrap());
        assert!(!db.with_conn_mut(|c| delete(c, user, first.id)).unwrap());
        assert!(db.with_conn(|c| find(c, user, first.id)).unwrap().is_none());
    }

    #[test]
    fn rows_are_scoped_by_user() {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "u@example.com", "hash", Utc::now()).unwrap();
        let p = post("urn:1");
        db.with_conn_mut(|c| insert(c, user, &p)).unwrap();

        let stranger = Uuid::new_v4();
        assert!(db.with_conn(|c| list(c, stranger)).unwrap().is_empty());
        assert!(db.with_conn(|c| find(c, stranger, p.id)).unwrap().is_none());
        assert!(!db.with_conn_mut(|c| update(c, stranger, &p)).unwrap());
    }
}
