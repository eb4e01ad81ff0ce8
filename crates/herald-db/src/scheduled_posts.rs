//! Persistence for the per-user scheduled post aggregate.
//!
//! The aggregate row carries a revision. `save` only succeeds when the
//! stored revision still equals the one the caller loaded, so two
//! interleaved read-modify-write cycles cannot silently drop each other's
//! changes: the second writer gets a [`RevisionConflict`].

use anyhow::Result;
use herald_types::models::{ChannelRef, MediaItem, ScheduledPost, ScheduledPostCollection};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::{OptionalExt, parsed_col, uuid_col};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("scheduled post collection revision mismatch: expected {expected}, found {actual:?}")]
pub struct RevisionConflict {
    pub expected: u32,
    /// `None` when the aggregate vanished between load and save.
    pub actual: Option<u32>,
}

pub fn load(conn: &Connection, user_id: Uuid) -> Result<Option<ScheduledPostCollection>> {
    let header = conn
        .query_row(
            "SELECT revision, created_at, updated_at
             FROM scheduled_post_collections WHERE user_id = ?1",
            [user_id.to_string()],
            |row| Ok((row.get::<_, u32>(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((revision, created_at, updated_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, channel_id, channel_name, content, media, scheduled_at, created_at, updated_at
         FROM scheduled_posts
         WHERE user_id = ?1
         ORDER BY position",
    )?;

    let posts = stmt
        .query_map([user_id.to_string()], post_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(ScheduledPostCollection {
        user_id,
        revision,
        posts,
        created_at,
        updated_at,
    }))
}

/// Persist the whole aggregate and return its new revision.
///
/// A collection with revision 0 has never been saved and is inserted;
/// anything else must match the stored revision. Must run inside a
/// transaction (`Database::with_conn_mut`) so a failed check writes nothing.
pub fn save(conn: &Connection, collection: &ScheduledPostCollection) -> Result<u32> {
    let user_id = collection.user_id.to_string();
    let expected = collection.revision;
    let next = expected + 1;

    let written = if expected == 0 {
        conn.execute(
            "INSERT OR IGNORE INTO scheduled_post_collections
                (user_id, revision, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, next, collection.created_at, collection.updated_at],
        )?
    } else {
        conn.execute(
            "UPDATE scheduled_post_collections
             SET revision = ?1, updated_at = ?2
             WHERE user_id = ?3 AND revision = ?4",
            rusqlite::params![next, collection.updated_at, user_id, expected],
        )?
    };

    if written != 1 {
        let actual = current_revision(conn, collection.user_id)?;
        return Err(RevisionConflict { expected, actual }.into());
    }

    conn.execute("DELETE FROM scheduled_posts WHERE user_id = ?1", [&user_id])?;

    let mut insert = conn.prepare(
        "INSERT INTO scheduled_posts
            (id, user_id, position, channel_id, channel_name, content, media, scheduled_at,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    for (position, post) in collection.posts.iter().enumerate() {
        insert.execute(rusqlite::params![
            post.id.to_string(),
            user_id,
            position as i64,
            post.channel.id.to_string(),
            post.channel.name.as_str(),
            post.content,
            serde_json::to_string(&post.media)?,
            post.scheduled_at_utc,
            post.created_at,
            post.updated_at,
        ])?;
    }

    Ok(next)
}

pub fn current_revision(conn: &Connection, user_id: Uuid) -> Result<Option<u32>> {
    conn.query_row(
        "SELECT revision FROM scheduled_post_collections WHERE user_id = ?1",
        [user_id.to_string()],
        |row| row.get(0),
    )
    .optional()
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledPost> {
    let media_json: String = row.get(4)?;
    let media: Vec<MediaItem> = serde_json::from_str(&media_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(ScheduledPost {
        id: uuid_col(row, 0)?,
        channel: ChannelRef {
            id: uuid_col(row, 1)?,
            name: parsed_col(row, 2)?,
        },
        content: row.get(3)?,
        media,
        scheduled_at_utc: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
