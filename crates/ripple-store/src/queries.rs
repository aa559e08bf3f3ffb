use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use ripple_types::{ChangeEvent, ChatSettings, ConversationKey, Draft, Message};

use crate::{Store, fmt_ts, parse_ts};

impl Store {
    // -- Messages --

    /// Persist a draft. The store assigns the canonical id and the
    /// authoritative `created_at`; the conversation key is derived from
    /// the sender/receiver pair, never taken from the caller.
    pub fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        draft: &Draft,
    ) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            conversation: ConversationKey::new(sender_id, receiver_id),
            sender_id,
            receiver_id,
            content: draft.content.clone(),
            kind: draft.kind,
            media_url: draft.media_url.clone(),
            duration_seconds: draft.duration_seconds,
            created_at: Utc::now(),
            read_at: None,
            edited: false,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages
                     (id, conversation, sender_id, receiver_id, content, kind,
                      media_url, duration_seconds, created_at, read_at, edited)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, 0)",
                rusqlite::params![
                    message.id.to_string(),
                    message.conversation.to_string(),
                    message.sender_id.to_string(),
                    message.receiver_id.to_string(),
                    message.content,
                    message.kind.as_str(),
                    message.media_url,
                    message.duration_seconds,
                    fmt_ts(message.created_at),
                ],
            )?;
            Ok(())
        })?;

        self.publish(ChangeEvent::Inserted {
            message: message.clone(),
        });
        Ok(message)
    }

    /// All messages of a conversation, oldest first by store clock.
    pub fn messages_for(&self, conversation: ConversationKey) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation, sender_id, receiver_id, content, kind,
                        media_url, duration_seconds, created_at, read_at, edited
                 FROM messages
                 WHERE conversation = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([conversation.to_string()], row_to_raw)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(decode_message).collect()
        })
    }

    /// Set `read_at` on every unread message addressed to `receiver_id`.
    /// Monotonic and idempotent: rows already read are untouched, so
    /// reapplying is a no-op. Returns the rows that changed.
    pub fn mark_conversation_read(
        &self,
        conversation: ConversationKey,
        receiver_id: Uuid,
    ) -> Result<Vec<Message>> {
        let updated = self.with_conn(|conn| {
            let ids: Vec<String> = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM messages
                     WHERE conversation = ?1 AND receiver_id = ?2 AND read_at IS NULL",
                )?;
                stmt.query_map(
                    rusqlite::params![conversation.to_string(), receiver_id.to_string()],
                    |row| row.get(0),
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?
            };

            if ids.is_empty() {
                return Ok(vec![]);
            }

            let now = fmt_ts(Utc::now());
            let placeholders: Vec<String> = (2..=ids.len() + 1).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "UPDATE messages SET read_at = ?1 WHERE id IN ({})",
                placeholders.join(", ")
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&now];
            params.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));
            conn.execute(&sql, params.as_slice())?;

            ids.iter().map(|id| query_message(conn, id)).collect()
        })?;

        for message in &updated {
            self.publish(ChangeEvent::Updated {
                message: message.clone(),
            });
        }
        Ok(updated)
    }

    /// Replace a message's content and flag it as edited.
    pub fn set_content(&self, id: Uuid, new_content: &str) -> Result<Message> {
        let message = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET content = ?1, edited = 1 WHERE id = ?2",
                rusqlite::params![new_content, id.to_string()],
            )?;
            if changed == 0 {
                bail!("no such message: {}", id);
            }
            query_message(conn, &id.to_string())
        })?;

        self.publish(ChangeEvent::Updated {
            message: message.clone(),
        });
        Ok(message)
    }

    /// Remove a message. Deleting an id that is already gone is a no-op,
    /// not an error. Delete is terminal and idempotent.
    pub fn delete_message(&self, id: Uuid) -> Result<bool> {
        let conversation = self.with_conn(|conn| {
            let conversation: Option<String> = conn
                .query_row(
                    "SELECT conversation FROM messages WHERE id = ?1",
                    [id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(conversation) = conversation else {
                return Ok(None);
            };
            conn.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
            Ok(Some(conversation))
        })?;

        match conversation {
            Some(raw) => {
                let conversation = raw
                    .parse()
                    .map_err(|e| anyhow!("corrupt conversation key '{}': {}", raw, e))?;
                self.publish(ChangeEvent::Deleted { id, conversation });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete every message in the conversation created at or before
    /// `cutoff`. Returns the ids that were removed.
    pub fn delete_expired(
        &self,
        conversation: ConversationKey,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        let ids = self.with_conn(|conn| {
            let ids: Vec<String> = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM messages
                     WHERE conversation = ?1 AND created_at <= ?2",
                )?;
                stmt.query_map(
                    rusqlite::params![conversation.to_string(), fmt_ts(cutoff)],
                    |row| row.get(0),
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?
            };

            conn.execute(
                "DELETE FROM messages WHERE conversation = ?1 AND created_at <= ?2",
                rusqlite::params![conversation.to_string(), fmt_ts(cutoff)],
            )?;

            ids.iter()
                .map(|id| {
                    id.parse::<Uuid>()
                        .map_err(|e| anyhow!("corrupt message id '{}': {}", id, e))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        for id in &ids {
            self.publish(ChangeEvent::Deleted {
                id: *id,
                conversation,
            });
        }
        Ok(ids)
    }

    // -- Chat settings --

    pub fn upsert_settings(&self, settings: &ChatSettings) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_settings
                     (owner_id, partner_id, is_locked, pin_code, temporary_messages)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (owner_id, partner_id) DO UPDATE SET
                     is_locked = excluded.is_locked,
                     pin_code = excluded.pin_code,
                     temporary_messages = excluded.temporary_messages",
                rusqlite::params![
                    settings.owner_id.to_string(),
                    settings.partner_id.to_string(),
                    settings.is_locked,
                    settings.pin_code,
                    settings.temporary_messages.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn settings(&self, owner_id: Uuid, partner_id: Uuid) -> Result<Option<ChatSettings>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT is_locked, pin_code, temporary_messages
                     FROM chat_settings
                     WHERE owner_id = ?1 AND partner_id = ?2",
                    rusqlite::params![owner_id.to_string(), partner_id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, bool>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;

            let Some((is_locked, pin_code, duration)) = row else {
                return Ok(None);
            };
            Ok(Some(ChatSettings {
                owner_id,
                partner_id,
                is_locked,
                pin_code,
                temporary_messages: duration
                    .parse()
                    .map_err(|e| anyhow!("corrupt temporary duration: {}", e))?,
            }))
        })
    }
}

/// Column tuple as stored, before parsing into domain types.
type RawMessage = (
    String,         // id
    String,         // conversation
    String,         // sender_id
    String,         // receiver_id
    String,         // content
    String,         // kind
    Option<String>, // media_url
    Option<f64>,    // duration_seconds
    String,         // created_at
    Option<String>, // read_at
    bool,           // edited
);

fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawMessage> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn decode_message(raw: RawMessage) -> Result<Message> {
    let (
        id,
        conversation,
        sender_id,
        receiver_id,
        content,
        kind,
        media_url,
        duration_seconds,
        created_at,
        read_at,
        edited,
    ) = raw;

    Ok(Message {
        id: id.parse().map_err(|e| anyhow!("corrupt message id '{}': {}", id, e))?,
        conversation: conversation
            .parse()
            .map_err(|e| anyhow!("corrupt conversation key '{}': {}", conversation, e))?,
        sender_id: sender_id
            .parse()
            .map_err(|e| anyhow!("corrupt sender id '{}': {}", sender_id, e))?,
        receiver_id: receiver_id
            .parse()
            .map_err(|e| anyhow!("corrupt receiver id '{}': {}", receiver_id, e))?,
        content,
        kind: kind.parse().map_err(|e| anyhow!("corrupt message kind: {}", e))?,
        media_url,
        duration_seconds,
        created_at: parse_ts(&created_at)?,
        read_at: read_at.as_deref().map(parse_ts).transpose()?,
        edited,
    })
}

fn query_message(conn: &Connection, id: &str) -> Result<Message> {
    let raw = conn.query_row(
        "SELECT id, conversation, sender_id, receiver_id, content, kind,
                media_url, duration_seconds, created_at, read_at, edited
         FROM messages
         WHERE id = ?1",
        [id],
        row_to_raw,
    )?;
    decode_message(raw)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::{MessageKind, TemporaryDuration};

    fn pair() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn insert_assigns_id_and_timestamp_and_publishes() {
        let store = Store::open_in_memory().unwrap();
        let mut changes = store.subscribe();
        let (a, b) = pair();

        let message = store.insert_message(a, b, &Draft::text("hi")).unwrap();
        assert_eq!(message.conversation, ConversationKey::new(a, b));
        assert_eq!(message.kind, MessageKind::Text);
        assert!(message.read_at.is_none());
        assert!(!message.edited);

        match changes.try_recv().unwrap() {
            ChangeEvent::Inserted { message: event } => assert_eq!(event.id, message.id),
            other => panic!("expected insert event, got {other:?}"),
        }
    }

    #[test]
    fn messages_come_back_oldest_first() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = pair();

        let first = store.insert_message(a, b, &Draft::text("one")).unwrap();
        let second = store.insert_message(b, a, &Draft::text("two")).unwrap();

        // Both directions land in the same conversation.
        let messages = store.messages_for(ConversationKey::new(a, b)).unwrap();
        assert_eq!(
            messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[test]
    fn mark_read_is_monotonic_and_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = pair();
        let key = ConversationKey::new(a, b);

        store.insert_message(a, b, &Draft::text("for b")).unwrap();
        store.insert_message(b, a, &Draft::text("for a")).unwrap();

        let updated = store.mark_conversation_read(key, b).unwrap();
        assert_eq!(updated.len(), 1);
        let read_at = updated[0].read_at.expect("read_at set");

        // Second pass touches nothing and the timestamp stays put.
        assert!(store.mark_conversation_read(key, b).unwrap().is_empty());
        let reread = store.messages_for(key).unwrap();
        let row = reread.iter().find(|m| m.id == updated[0].id).unwrap();
        assert_eq!(row.read_at, Some(read_at));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = pair();
        let message = store.insert_message(a, b, &Draft::text("gone soon")).unwrap();

        assert!(store.delete_message(message.id).unwrap());
        assert!(!store.delete_message(message.id).unwrap());

        let mut changes = store.subscribe();
        assert!(!store.delete_message(message.id).unwrap());
        assert!(changes.try_recv().is_err(), "no event for a no-op delete");
    }

    #[test]
    fn edit_flags_the_row() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = pair();
        let message = store.insert_message(a, b, &Draft::text("typo")).unwrap();

        let edited = store.set_content(message.id, "fixed").unwrap();
        assert_eq!(edited.content, "fixed");
        assert!(edited.edited);

        assert!(store.set_content(Uuid::new_v4(), "nope").is_err());
    }

    #[test]
    fn delete_expired_honors_cutoff() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = pair();
        let key = ConversationKey::new(a, b);

        let old = store.insert_message(a, b, &Draft::text("old")).unwrap();
        let fresh = store.insert_message(a, b, &Draft::text("fresh")).unwrap();

        // Backdate the first row past the cutoff.
        let backdated = fmt_ts(Utc::now() - chrono::Duration::minutes(6));
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE messages SET created_at = ?1 WHERE id = ?2",
                    rusqlite::params![backdated, old.id.to_string()],
                )?;
                Ok(())
            })
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::minutes(5);
        let removed = store.delete_expired(key, cutoff).unwrap();
        assert_eq!(removed, vec![old.id]);

        let left = store.messages_for(key).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, fresh.id);
    }

    #[test]
    fn settings_roundtrip_and_upsert() {
        let store = Store::open_in_memory().unwrap();
        let (owner, partner) = pair();

        assert!(store.settings(owner, partner).unwrap().is_none());

        let mut settings = ChatSettings::new(owner, partner);
        settings.temporary_messages = TemporaryDuration::FiveMinutes;
        store.upsert_settings(&settings).unwrap();

        let loaded = store.settings(owner, partner).unwrap().unwrap();
        assert_eq!(loaded.temporary_messages, TemporaryDuration::FiveMinutes);
        assert!(!loaded.is_locked);

        settings.is_locked = true;
        settings.pin_code = Some("4821".into());
        store.upsert_settings(&settings).unwrap();

        let loaded = store.settings(owner, partner).unwrap().unwrap();
        assert!(loaded.is_locked);
        assert_eq!(loaded.pin_code.as_deref(), Some("4821"));
    }
}
