//! Engine error types.

use shared_types::AmountError;
use thiserror::Error;

/// Why a single inbound event was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{record} has an empty hash")]
    EmptyHash { record: &'static str },

    #[error("Block {hash} has an invalid reward: {source}")]
    InvalidReward {
        hash: String,
        #[source]
        source: AmountError,
    },
}
