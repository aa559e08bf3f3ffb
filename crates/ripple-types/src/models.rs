use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unordered pair of two users exchanging messages.
///
/// Both directions of a chat map onto the same key: the two ids are sorted
/// on construction, so `new(a, b) == new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    low: Uuid,
    high: Uuid,
}

impl ConversationKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The other participant, if `user_id` is one of the pair.
    pub fn peer_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.low {
            Some(self.high)
        } else if user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

impl FromStr for ConversationKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = s
            .split_once(':')
            .ok_or_else(|| format!("bad conversation key: {s}"))?;
        let low = low.parse().map_err(|e| format!("bad conversation key: {e}"))?;
        let high = high.parse().map_err(|e| format!("bad conversation key: {e}"))?;
        Ok(Self::new(low, high))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

/// A direct message as the store returns it.
///
/// `id` and `created_at` are assigned by the store on insert; `read_at`
/// moves null → timestamp exactly once and is never reverted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation: ConversationKey,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub media_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub edited: bool,
}

impl Message {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// A send intent before the store has seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub content: String,
    pub kind: MessageKind,
    pub media_url: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl Draft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: MessageKind::Text,
            media_url: None,
            duration_seconds: None,
        }
    }

    pub fn audio(media_url: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            content: String::new(),
            kind: MessageKind::Audio,
            media_url: Some(media_url.into()),
            duration_seconds: Some(duration_seconds),
        }
    }

    /// Empty across both content and media, nothing worth sending.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.media_url.is_none()
    }
}

/// Time-to-live for disappearing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporaryDuration {
    #[serde(rename = "disabled")]
    Disabled,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl TemporaryDuration {
    /// `None` means messages never expire.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::FiveMinutes => Some(Duration::from_secs(5 * 60)),
            Self::OneHour => Some(Duration::from_secs(60 * 60)),
            Self::OneDay => Some(Duration::from_secs(24 * 60 * 60)),
            Self::OneWeek => Some(Duration::from_secs(7 * 24 * 60 * 60)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }
}

impl FromStr for TemporaryDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "5m" => Ok(Self::FiveMinutes),
            "1h" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            other => Err(format!("unknown temporary duration: {other}")),
        }
    }
}

/// Per-chat preferences, owned by `owner_id` and read by that user's
/// client only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub owner_id: Uuid,
    pub partner_id: Uuid,
    pub is_locked: bool,
    pub pin_code: Option<String>,
    pub temporary_messages: TemporaryDuration,
}

impl ChatSettings {
    pub fn new(owner_id: Uuid, partner_id: Uuid) -> Self {
        Self {
            owner_id,
            partner_id,
            is_locked: false,
            pin_code: None,
            temporary_messages: TemporaryDuration::Disabled,
        }
    }
}

/// Best-effort online/offline status. Advisory only, never used for
/// correctness decisions elsewhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PresenceState {
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}
