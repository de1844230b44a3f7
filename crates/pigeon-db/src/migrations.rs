use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT,
            last_name   TEXT,
            email       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per pair, user_a < user_b
        CREATE TABLE IF NOT EXISTS friendships (
            user_a      TEXT NOT NULL REFERENCES users(username),
            user_b      TEXT NOT NULL REFERENCES users(username),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_a, user_b),
            CHECK (user_a < user_b)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            sender                  TEXT NOT NULL REFERENCES users(username),
            recipient               TEXT NOT NULL REFERENCES users(username),
            subject                 TEXT NOT NULL DEFAULT '',
            body                    TEXT NOT NULL DEFAULT '',
            read_status             INTEGER NOT NULL DEFAULT 0,
            deleted_for_sender      INTEGER NOT NULL DEFAULT 0,
            deleted_for_recipient   INTEGER NOT NULL DEFAULT 0,
            date_sent               TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender);

        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient, date_sent);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
