//! Chain events, transactions and the request unit threaded through the engine.

use crate::{CcipMessage, ChainAddress, Lane, PrimitivesError};
use alloy_primitives::{Bytes, B256};
use core::{fmt, str::FromStr};
use serde::Serialize;

/// A block reference: either a fixed height or a logical finality tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// A fixed block number.
    Number(u64),
    /// The latest finalized block.
    Finalized,
    /// The chain head.
    Latest,
}

impl BlockTag {
    /// Returns true for the logical tags.
    pub const fn is_finality_tag(&self) -> bool {
        matches!(self, Self::Finalized | Self::Latest)
    }
}

impl From<u64> for BlockTag {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Finalized => f.write_str("finalized"),
            Self::Latest => f.write_str("latest"),
        }
    }
}

impl FromStr for BlockTag {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finalized" => Ok(Self::Finalized),
            "latest" => Ok(Self::Latest),
            n => n
                .parse::<u64>()
                .map(Self::Number)
                .map_err(|_| PrimitivesError::InvalidBlockTag(s.to_string())),
        }
    }
}

/// A single event emitted on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLog {
    /// The emitting contract.
    pub address: ChainAddress,
    /// Indexed topics; the first is the event selector.
    pub topics: Vec<B256>,
    /// The non-indexed payload.
    pub data: Bytes,
    /// The block the event was included in.
    pub block_number: u64,
    /// The transaction that emitted the event.
    pub transaction_hash: String,
    /// The position of the event within its block.
    pub log_index: u64,
}

impl ChainLog {
    /// Returns the event selector topic.
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// Metadata of a transaction, with the events it emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    /// The transaction hash, in the family's native encoding.
    pub hash: String,
    /// The block the transaction was included in.
    pub block_number: u64,
    /// The block timestamp, in unix seconds.
    pub timestamp: u64,
    /// The sending account.
    pub from: String,
    /// The emitted events.
    pub logs: Vec<ChainLog>,
}

/// A sent message with the context it was observed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CcipRequest {
    /// The lane the message travels on.
    pub lane: Lane,
    /// The decoded message.
    pub message: CcipMessage,
    /// The originating send event.
    pub log: ChainLog,
    /// The originating transaction.
    pub tx: ChainTransaction,
}
