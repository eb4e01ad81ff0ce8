use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                refresh_token   TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE channels (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                channel_name    TEXT NOT NULL,
                access_token    TEXT NOT NULL,
                refresh_token   TEXT,
                sub             TEXT,
                user_name       TEXT,
                user_email      TEXT,
                profile_picture TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                UNIQUE(user_id, channel_name)
            );

            CREATE TABLE scheduled_post_collections (
                user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                revision    INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            -- channel_id is a weak reference: no foreign key on purpose.
            CREATE TABLE scheduled_posts (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL
                                REFERENCES scheduled_post_collections(user_id) ON DELETE CASCADE,
                position        INTEGER NOT NULL,
                channel_id      TEXT NOT NULL,
                channel_name    TEXT NOT NULL,
                content         TEXT NOT NULL,
                media           TEXT NOT NULL,
                scheduled_at    TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_scheduled_posts_user
                ON scheduled_posts(user_id, position);

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                channel_id      TEXT NOT NULL,
                channel_name    TEXT NOT NULL,
                urn             TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_user ON posts(user_id);

            CREATE TABLE ideas (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                image_url   TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_ideas_user ON ideas(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
