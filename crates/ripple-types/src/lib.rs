pub mod events;
pub mod models;

pub use events::{ChangeEvent, PresenceUpdate, TypingEvent};
pub use models::{
    ChatSettings, ConversationKey, Draft, Message, MessageKind, PresenceState, TemporaryDuration,
};
