pub mod migrations;
pub mod queries;

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tokio::sync::broadcast;
use tracing::info;

use ripple_types::ChangeEvent;

/// Buffered change events per subscriber before the stream lags.
const CHANGE_BUFFER: usize = 1024;

/// The message store gateway.
///
/// One handle per process, created at startup and injected into every
/// component. Every successful write fans out a [`ChangeEvent`] to all
/// subscribers, so clients mirror state by replaying the stream. After
/// [`Store::close`] all operations fail.
pub struct Store {
    conn: Mutex<Option<Connection>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Message store opened at {}", path.display());
        Ok(Self::from_conn(conn))
    }

    /// In-memory store for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self::from_conn(conn))
    }

    fn from_conn(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            conn: Mutex::new(Some(conn)),
            changes,
        }
    }

    /// Subscribe to the change stream. Events published after this call
    /// are delivered; there is no replay of earlier changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Shut the store down. Subsequent operations return errors; the
    /// change stream stays quiet and closes when the handle is dropped.
    pub fn close(&self) {
        let mut guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            info!("Message store closed");
        }
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("store lock poisoned: {}", e))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("store is closed"))?;
        f(conn)
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        // No subscribers is fine, nobody has the conversation open.
        let _ = self.changes.send(event);
    }
}

/// Fixed-width RFC 3339 UTC, so stored timestamps compare
/// chronologically as TEXT.
pub(crate) fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("bad timestamp '{}': {}", s, e))?
        .with_timezone(&Utc))
}
