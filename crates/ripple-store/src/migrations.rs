use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            conversation     TEXT NOT NULL,
            sender_id        TEXT NOT NULL,
            receiver_id      TEXT NOT NULL,
            content          TEXT NOT NULL,
            kind             TEXT NOT NULL,
            media_url        TEXT,
            duration_seconds REAL,
            created_at       TEXT NOT NULL,
            read_at          TEXT,
            edited           INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(conversation, receiver_id)
            WHERE read_at IS NULL;

        CREATE TABLE IF NOT EXISTS chat_settings (
            owner_id           TEXT NOT NULL,
            partner_id         TEXT NOT NULL,
            is_locked          INTEGER NOT NULL DEFAULT 0,
            pin_code           TEXT,
            temporary_messages TEXT NOT NULL DEFAULT 'disabled',
            PRIMARY KEY (owner_id, partner_id)
        );
        ",
    )?;

    info!("Store migrations complete");
    Ok(())
}
