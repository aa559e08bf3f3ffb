use thiserror::Error;

/// Why a send was rejected or failed.
///
/// `EmptyDraft` and `MissingMedia` are caught before any I/O.
/// `DuplicateInFlight` is a silent no-op at the UI boundary: the first
/// attempt is still running and will land. `Store` means the optimistic
/// entry was rolled back; there is no automatic retry, the caller sends a
/// fresh draft.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("draft has no content or media")]
    EmptyDraft,

    #[error("non-text draft has no media attached")]
    MissingMedia,

    #[error("sender is not part of this conversation")]
    NotParticipant,

    #[error("an identical send is already in flight")]
    DuplicateInFlight,

    #[error("message could not be persisted: {0}")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("message is not in the open conversation")]
    UnknownMessage,

    #[error("only the sender can edit a message")]
    NotSender,

    #[error("only text messages can be edited")]
    NotText,

    #[error("edited content must not be empty")]
    EmptyContent,

    #[error("edit could not be persisted: {0}")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("message is not in the open conversation")]
    UnknownMessage,

    #[error("only the sender can delete a message")]
    NotSender,

    #[error("delete could not be persisted: {0}")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum MarkReadError {
    #[error("read receipts could not be persisted: {0}")]
    Store(#[source] anyhow::Error),
}
