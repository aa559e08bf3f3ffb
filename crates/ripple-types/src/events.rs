use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ConversationKey, Message};

/// Row-level change delivered on the store's subscription stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeEvent {
    /// A message was persisted
    Inserted { message: Message },

    /// A message was patched (read receipt, edit)
    Updated { message: Message },

    /// A message was removed (sender delete or expiry)
    Deleted {
        id: Uuid,
        conversation: ConversationKey,
    },
}

impl ChangeEvent {
    /// The conversation this change belongs to. Every change is scoped;
    /// clients drop events for conversations they don't have open.
    pub fn conversation(&self) -> ConversationKey {
        match self {
            Self::Inserted { message } | Self::Updated { message } => message.conversation,
            Self::Deleted { conversation, .. } => *conversation,
        }
    }
}

/// A user came online or went quiet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user_id: Uuid,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}

/// A user started or stopped typing in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TypingEvent {
    pub conversation: ConversationKey,
    pub user_id: Uuid,
    pub typing: bool,
}
