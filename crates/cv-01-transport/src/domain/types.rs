//! Transport value types.

use serde::{Deserialize, Serialize};

/// A server-side feed the client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Finalized blocks.
    Chain,
    /// Transaction lifecycle updates.
    Transactions,
}

impl Channel {
    /// Both channels, in subscription order.
    pub const ALL: [Channel; 2] = [Channel::Chain, Channel::Transactions];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Transactions => "transactions",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "chain" => Some(Self::Chain),
            "transactions" => Some(Self::Transactions),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control frame verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// Outbound control frame: `{ "action": "subscribe", "channel": "chain" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub action: SubscriptionAction,
    pub channel: Channel,
}

impl SubscriptionRequest {
    #[must_use]
    pub fn subscribe(channel: Channel) -> Self {
        Self {
            action: SubscriptionAction::Subscribe,
            channel,
        }
    }

    #[must_use]
    pub fn unsubscribe(channel: Channel) -> Self {
        Self {
            action: SubscriptionAction::Unsubscribe,
            channel,
        }
    }
}

/// Observable connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Connect failed, or reconnection gave up.
    Failed,
}

impl ConnectionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the transport hands to the ingestion side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame, not yet parsed.
    Frame(String),
    /// The push connection was lost.
    Disconnected(String),
}
