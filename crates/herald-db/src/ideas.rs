use anyhow::Result;
use herald_types::models::Idea;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::{OptionalExt, uuid_col};

const COLUMNS: &str = "id, user_id, content, image_url, created_at, updated_at";

/// Newest first.
pub fn list(conn: &Connection, user_id: Uuid) -> Result<Vec<Idea>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM ideas WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
    ))?;

    let rows = stmt
        .query_map([user_id.to_string()], idea_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn find(conn: &Connection, user_id: Uuid, id: Uuid) -> Result<Option<Idea>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM ideas WHERE user_id = ?1 AND id = ?2"
    ))?;

    stmt.query_row(rusqlite::params![user_id.to_string(), id.to_string()], idea_from_row)
        .optional()
}

pub fn insert(conn: &Connection, idea: &Idea) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO ideas ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        rusqlite::params![
            idea.id.to_string(),
            idea.user_id.to_string(),
            idea.content,
            idea.image_url,
            idea.created_at,
            idea.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update(conn: &Connection, idea: &Idea) -> Result<bool> {
    let n = conn.execute(
        "UPDATE ideas SET content = ?1, image_url = ?2, updated_at = ?3
         WHERE user_id = ?4 AND id = ?5",
        rusqlite::params![
            idea.content,
            idea.image_url,
            idea.updated_at,
            idea.user_id.to_string(),
            idea.id.to_string(),
        ],
    )?;
    Ok(n == 1)
}

pub fn delete(conn: &Connection, user_id: Uuid, id: Uuid) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM ideas WHERE user_id = ?1 AND id = ?2",
        rusqlite::params![user_id.to_string(), id.to_string()],
    )?;
    Ok(n == 1)
}

fn idea_from_row(row: &Row<'_>) -> rusqlite::Result<Idea> {
    Ok(Idea {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{DateTime, TimeDelta, Utc};

    #[test]
    fn newest_first_and_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "u@example.com", "hash", Utc::now()).unwrap();

        let now = Utc::now();
        let idea = |content: &str, at: DateTime<Utc>| Idea {
            id: Uuid::new_v4(),
            user_id: user,
            content: content.into(),
            image_url: "i.png".into(),
            created_at: at,
            updated_at: at,
        };
        let old = idea("old", now - TimeDelta::hours(1));
        let new = idea("new", now);
        db.with_conn_mut(|c| {
            insert(c, &old)?;
            insert(c, &new)
        })
        .unwrap();

        let contents: Vec<_> = db
            .with_conn(|c| list(c, user))
            .unwrap()
            .into_iter()
            .map(|i| i.content)
            .collect();
        assert_eq!(contents, ["new", "old"]);

        assert!(db.with_conn(|c| find(c, Uuid::new_v4(), old.id)).unwrap().is_none());
        assert!(db.with_conn_mut(|c| delete(c, user, old.id)).unwrap());
        assert_eq!(db.with_conn(|c| list(c, user)).unwrap(), vec![new]);
    }
}
