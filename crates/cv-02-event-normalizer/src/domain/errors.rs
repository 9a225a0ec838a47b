use thiserror::Error;

/// Why a single frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Not JSON, or missing `channel`/`type`/`payload`.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Message type {message_type} is not valid on channel {channel}")]
    ChannelMismatch {
        message_type: String,
        channel: String,
    },

    /// The payload does not fit the schema for its message type.
    #[error("Invalid {message_type} payload: {reason}")]
    InvalidPayload {
        message_type: String,
        reason: String,
    },
}
