//! Inbound message decoding.

use serde::Deserialize;

use cv_01_transport::Channel;
use shared_bus::ChainVizEvent;
use shared_types::{RawBlock, RawTransaction, TransactionStatus};

use super::errors::NormalizeError;

/// Closed set of message types the feed may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    BlockFinalized,
    TransactionPending,
    TransactionProposed,
    TransactionConfirmed,
    TransactionRejected,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::BlockFinalized,
        MessageType::TransactionPending,
        MessageType::TransactionProposed,
        MessageType::TransactionConfirmed,
        MessageType::TransactionRejected,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockFinalized => "block.finalized",
            Self::TransactionPending => "transaction.pending",
            Self::TransactionProposed => "transaction.proposed",
            Self::TransactionConfirmed => "transaction.confirmed",
            Self::TransactionRejected => "transaction.rejected",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// The only channel this type may arrive on.
    #[must_use]
    pub fn channel(&self) -> Channel {
        match self {
            Self::BlockFinalized => Channel::Chain,
            _ => Channel::Transactions,
        }
    }

    /// Status implied by a transaction message type.
    #[must_use]
    pub fn status(&self) -> Option<TransactionStatus> {
        match self {
            Self::BlockFinalized => None,
            Self::TransactionPending => Some(TransactionStatus::Pending),
            Self::TransactionProposed => Some(TransactionStatus::Proposed),
            Self::TransactionConfirmed => Some(TransactionStatus::Confirmed),
            Self::TransactionRejected => Some(TransactionStatus::Rejected),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame that passed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    BlockFinalized(RawBlock),
    Transaction {
        status: TransactionStatus,
        transaction: RawTransaction,
    },
}

impl InboundMessage {
    /// The bus event this message republishes as.
    #[must_use]
    pub fn into_event(self) -> ChainVizEvent {
        match self {
            Self::BlockFinalized(block) => ChainVizEvent::BlockFinalized(block),
            Self::Transaction {
                status,
                transaction,
            } => ChainVizEvent::transaction(status, transaction),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    channel: String,
    #[serde(rename = "type")]
    message_type: String,
    payload: serde_json::Value,
}

/// Decode one frame into a typed message.
///
/// Channel and type are checked before the payload is touched, so an
/// unknown type never costs a payload parse.
pub fn decode(text: &str) -> Result<InboundMessage, NormalizeError> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| NormalizeError::MalformedEnvelope(e.to_string()))?;

    let channel = Channel::from_name(&envelope.channel)
        .ok_or_else(|| NormalizeError::UnknownChannel(envelope.channel.clone()))?;
    let message_type = MessageType::from_name(&envelope.message_type)
        .ok_or_else(|| NormalizeError::UnknownType(envelope.message_type.clone()))?;

    if message_type.channel() != channel {
        return Err(NormalizeError::ChannelMismatch {
            message_type: envelope.message_type,
            channel: envelope.channel,
        });
    }

    let invalid = |e: serde_json::Error| NormalizeError::InvalidPayload {
        message_type: message_type.as_str().to_string(),
        reason: e.to_string(),
    };

    match message_type.status() {
        None => serde_json::from_value::<RawBlock>(envelope.payload)
            .map(InboundMessage::BlockFinalized)
            .map_err(invalid),
        Some(status) => serde_json::from_value::<RawTransaction>(envelope.payload)
            .map(|transaction| InboundMessage::Transaction {
                status,
                transaction,
            })
            .map_err(invalid),
    }
}

/// Decode one frame straight into its bus event.
pub fn classify(text: &str) -> Result<ChainVizEvent, NormalizeError> {
    decode(text).map(InboundMessage::into_event)
}
