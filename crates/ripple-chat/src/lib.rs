pub mod config;
pub mod error;
pub mod expiry;
pub mod lifecycle;
pub mod notify;
pub mod presence;
pub mod typing;
pub mod view;

pub use config::ChatConfig;
pub use error::{DeleteError, EditError, MarkReadError, SendError};
pub use expiry::ExpirySweeper;
pub use lifecycle::{ChatManager, Delivery, LocalMessage};
pub use notify::{AppVisibility, Notifier};
pub use presence::PresenceTracker;
pub use typing::TypingCoordinator;
pub use view::{ConversationView, DaySection, Receipt, RenderedMessage};
