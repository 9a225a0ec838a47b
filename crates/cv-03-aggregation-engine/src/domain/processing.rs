//! Raw feed records to processed records.

use shared_bus::TransactionEvent;
use shared_types::{
    parse_amount, parse_decimal_u64, ProcessedBlock, ProcessedTransaction, RawBlock, U256,
};

use super::errors::EngineError;

/// Derive a [`ProcessedBlock`].
///
/// An empty hash or a reward that is not an exact decimal integer rejects
/// the block. A non-numeric number or timestamp degrades to `None`.
pub fn process_block(raw: &RawBlock) -> Result<ProcessedBlock, EngineError> {
    if raw.hash.trim().is_empty() {
        return Err(EngineError::EmptyHash { record: "block" });
    }

    let reward = parse_amount(&raw.reward).map_err(|source| EngineError::InvalidReward {
        hash: raw.hash.clone(),
        source,
    })?;

    Ok(ProcessedBlock {
        hash: raw.hash.clone(),
        number: parse_decimal_u64(&raw.number),
        timestamp: parse_decimal_u64(&raw.timestamp),
        transaction_count: raw.transaction_count,
        reward,
        size: 0,
        miner: raw.miner.clone(),
        difficulty: 0,
    })
}

/// Derive a [`ProcessedTransaction`] carrying the event's status.
pub fn process_transaction(event: &TransactionEvent) -> Result<ProcessedTransaction, EngineError> {
    let raw = &event.transaction;
    if raw.hash.trim().is_empty() {
        return Err(EngineError::EmptyHash {
            record: "transaction",
        });
    }

    Ok(ProcessedTransaction {
        hash: raw.hash.clone(),
        status: event.status,
        value: U256::zero(),
        fee: U256::zero(),
        inputs: 0,
        outputs: 0,
        size: 0,
        timestamp: raw.timestamp.as_deref().and_then(parse_decimal_u64),
    })
}
