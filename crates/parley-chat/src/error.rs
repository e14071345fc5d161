use thiserror::Error;

/// Error taxonomy for the conversation core.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Caller bug: same user on both sides of a pair, empty identifier,
    /// or a sender that is not a participant. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Message content was empty after trimming. Surfaced to the user as a
    /// validation message; nothing is written.
    #[error("message content must not be empty")]
    EmptyMessage,

    /// The channel (or profile) the operation refers to does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient store failure. The operation is not retried here; the
    /// caller re-triggers it (e.g. resend).
    #[error("store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl ChatError {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        Self::StoreUnavailable(err)
    }
}
