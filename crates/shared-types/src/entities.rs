//! # Chain Entities
//!
//! Defines the records received from the remote indexer and the records the
//! aggregation engine derives from them.
//!
//! ## Clusters
//!
//! - **Wire**: `RawBlock`, `RawTransaction`, `TransactionContext`, `FetchedSnapshot`
//! - **Lifecycle**: `TransactionStatus`
//! - **Derived**: `ProcessedBlock`, `ProcessedTransaction`, `ChainMetrics`, `ChainSnapshot`

use serde::{Deserialize, Serialize};

use crate::errors::AmountError;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// Block or transaction identity as sent by the indexer.
pub type Hash = String;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

// =============================================================================
// CLUSTER A: WIRE RECORDS
// =============================================================================

/// A finalized block as pushed by the indexer.
///
/// Immutable once received. A later block with the same hash supersedes
/// this one entirely; the two are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    /// Block number as a decimal string.
    pub number: String,
    /// Block hash (identity).
    pub hash: Hash,
    /// Epoch milliseconds as a decimal string.
    pub timestamp: String,
    /// Miner address.
    pub miner: String,
    /// Block reward as a decimal integer string of arbitrary size.
    pub reward: String,
    /// Number of transactions committed in the block.
    pub transaction_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposals_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncles_count: Option<u64>,
    /// Hashes of the contained transactions.
    #[serde(default)]
    pub transactions: Vec<Hash>,
}

/// Where a transaction landed, once it has landed anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
}

/// A transaction as pushed by the indexer.
///
/// The same hash arrives once per lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Transaction hash (identity).
    pub hash: Hash,
    /// Epoch milliseconds as a decimal string, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TransactionContext>,
}

/// Body of the one-shot snapshot endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedSnapshot {
    #[serde(default)]
    pub latest_block: Option<RawBlock>,
    #[serde(default)]
    pub pending_transactions: Option<Vec<RawTransaction>>,
    #[serde(default)]
    pub proposed_transactions: Option<Vec<RawTransaction>>,
}

// =============================================================================
// CLUSTER B: TRANSACTION LIFECYCLE
// =============================================================================

/// Transaction lifecycle state.
///
/// ```text
/// PENDING ──→ PROPOSED ──→ CONFIRMED
///    │            │
///    └────────────┴──────→ REJECTED
/// ```
///
/// The transition table is informational. Ingestion accepts any sequence at
/// face value because the feed may legitimately resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Proposed,
    Confirmed,
    Rejected,
}

impl TransactionStatus {
    /// Upper-case label used on the wire and in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Proposed => "PROPOSED",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Confirmed and rejected are terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    /// Whether `next` is a forward edge of the lifecycle graph.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Proposed | Self::Rejected) => true,
            (Self::Proposed, Self::Confirmed | Self::Rejected) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER C: DERIVED RECORDS
// =============================================================================

/// A block after normalization by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedBlock {
    pub hash: Hash,
    /// `None` when the wire number was not a decimal integer.
    pub number: Option<u64>,
    /// `None` when the wire timestamp was not a decimal integer.
    pub timestamp: Option<Timestamp>,
    pub transaction_count: u64,
    /// Exact block reward.
    pub reward: U256,
    /// Placeholder, not derived from source data.
    pub size: u64,
    pub miner: String,
    /// Placeholder, not derived from source data.
    pub difficulty: u64,
}

/// A transaction after normalization by the aggregation engine.
///
/// `value`, `fee`, `inputs`, `outputs` and `size` are placeholders until the
/// feed carries richer data. They are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    pub hash: Hash,
    pub status: TransactionStatus,
    pub value: U256,
    pub fee: U256,
    pub inputs: u32,
    pub outputs: u32,
    pub size: u64,
    pub timestamp: Option<Timestamp>,
}

/// Live metrics derived from the engine's sliding windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainMetrics {
    /// Mean spacing of recent blocks, in seconds.
    pub average_block_time_secs: f64,
    /// Transactions per second over the last ten blocks.
    pub transactions_per_second: f64,
    /// Transactions currently in `PENDING`.
    pub pending_transactions: usize,
    /// Stand-in estimate; difficulty is never populated yet, so this is 0.
    pub hash_rate: f64,
    /// Six-block confirmation depth times the average block time, in seconds.
    pub confirmation_time_secs: f64,
}

/// Bulk export for consumers that need to populate a scene at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Up to the last 50 blocks, in insertion order.
    pub blocks: Vec<ProcessedBlock>,
    /// Up to the last 100 transactions, in insertion order.
    pub transactions: Vec<ProcessedTransaction>,
    pub metrics: ChainMetrics,
}

/// Parse a decimal amount string into an exact `U256`.
///
/// Surrounding whitespace is ignored. An empty string, a sign, a fraction or
/// a value wider than 256 bits is an error.
pub fn parse_amount(raw: &str) -> Result<U256, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotDecimal(raw.to_string()));
    }
    U256::from_dec_str(trimmed).map_err(|_| AmountError::Overflow(raw.to_string()))
}

/// Parse a decimal integer string, yielding `None` instead of an error.
///
/// This is the degraded "not a number" path for block numbers and
/// timestamps.
#[must_use]
pub fn parse_decimal_u64(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_block_json() -> &'static str {
        r#"{
            "number": "1024",
            "hash": "0xabc",
            "timestamp": "1700000000000",
            "miner": "0xminer",
            "reward": "123456789012345678",
            "transactionCount": 3,
            "transactions": ["0x1", "0x2", "0x3"]
        }"#
    }

    #[test]
    fn test_raw_block_parsing() {
        let block: RawBlock = serde_json::from_str(raw_block_json()).unwrap();
        assert_eq!(block.hash, "0xabc");
        assert_eq!(block.transaction_count, 3);
        assert_eq!(block.transactions.len(), 3);
        assert_eq!(block.uncles_count, None);
    }

    #[test]
    fn test_raw_block_missing_hash_rejected() {
        let json = r#"{"number":"1","timestamp":"0","miner":"m","reward":"0","transactionCount":0}"#;
        assert!(serde_json::from_str::<RawBlock>(json).is_err());
    }

    #[test]
    fn test_raw_transaction_optional_fields() {
        let tx: RawTransaction = serde_json::from_str(r#"{"hash":"0xt1"}"#).unwrap();
        assert_eq!(tx.timestamp, None);
        assert!(tx.context.is_none());

        let tx: RawTransaction = serde_json::from_str(
            r#"{"hash":"0xt2","timestamp":"5","context":{"blockNumber":"9","index":2}}"#,
        )
        .unwrap();
        let ctx = tx.context.unwrap();
        assert_eq!(ctx.block_number.as_deref(), Some("9"));
        assert_eq!(ctx.index, Some(2));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TransactionStatus::Proposed).unwrap();
        assert_eq!(json, "\"PROPOSED\"");
        assert_eq!(TransactionStatus::Confirmed.to_string(), "CONFIRMED");
    }

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Proposed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Proposed.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Proposed));
        assert!(Confirmed.is_terminal());
        assert!(!Proposed.is_terminal());
    }

    #[test]
    fn test_parse_amount_exact() {
        let value = parse_amount("123456789012345678").unwrap();
        assert_eq!(value, U256::from(123_456_789_012_345_678u64));
        assert_eq!(value.to_string(), "123456789012345678");
    }

    #[test]
    fn test_parse_amount_beyond_u128() {
        let raw = "340282366920938463463374607431768211456"; // 2^128
        let value = parse_amount(raw).unwrap();
        assert_eq!(value.to_string(), raw);
    }

    #[test]
    fn test_parse_amount_rejects_non_decimal() {
        assert!(matches!(parse_amount(""), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_amount("1.5"), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_amount("-1"), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_amount("0x10"), Err(AmountError::NotDecimal(_))));
    }

    #[test]
    fn test_parse_decimal_u64() {
        assert_eq!(parse_decimal_u64("42"), Some(42));
        assert_eq!(parse_decimal_u64(" 7 "), Some(7));
        assert_eq!(parse_decimal_u64("abc"), None);
    }

    #[test]
    fn test_fetched_snapshot_defaults() {
        let snap: FetchedSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snap.latest_block.is_none());
        assert!(snap.pending_transactions.is_none());
    }
}
