//! The contract expected from an off-chain message index.

use crate::IndexResult;
use alloy_primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use ccip_primitives::VerifierResult;
use core::fmt::Debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message as recorded by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedMessage {
    /// The message id.
    pub message_id: B256,
    /// The sending network.
    #[serde(with = "crate::serde_utils::flexible_u64")]
    pub source_chain_selector: u64,
    /// The receiving network.
    #[serde(with = "crate::serde_utils::flexible_u64")]
    pub dest_chain_selector: u64,
    /// The lane sequence number.
    #[serde(with = "crate::serde_utils::flexible_u64")]
    pub sequence_number: u64,
    /// The source on-ramp, in the source family's encoding.
    pub on_ramp_address: String,
    /// The destination off-ramp, if the index knows it.
    #[serde(default)]
    pub off_ramp_address: Option<String>,
    /// The lane version, e.g. `1.5.0`.
    pub version: String,
    /// The hash of the sending transaction.
    pub send_transaction_hash: String,
    /// The block the send was included in.
    #[serde(default, with = "crate::serde_utils::flexible_u64::option")]
    pub send_block_number: Option<u64>,
    /// The position of the send event in its block.
    #[serde(default, with = "crate::serde_utils::flexible_u64::option")]
    pub send_log_index: Option<u64>,
    /// The send timestamp, in seconds.
    #[serde(default, with = "crate::serde_utils::flexible_u64::option")]
    pub send_timestamp: Option<u64>,
    /// The delivery status as reported by the index.
    #[serde(default)]
    pub status: Option<String>,
    /// The raw message record, normalized by the codec.
    pub message: Value,
}

/// A verifier result as recorded by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedVerifierResult {
    /// The verifier's destination contract.
    pub verifier: String,
    /// The attestation payload.
    pub data: Bytes,
}

impl From<IndexedVerifierResult> for VerifierResult {
    fn from(result: IndexedVerifierResult) -> Self {
        Self { verifier: result.verifier, data: result.data }
    }
}

/// Everything the index knows that is needed to execute a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionInputs {
    /// The destination off-ramp.
    pub off_ramp_address: Option<String>,
    /// The committed root of the message's batch.
    pub merkle_root: Option<B256>,
    /// The precomputed proof hashes.
    pub proofs: Vec<B256>,
    /// The precomputed proof flag bits.
    pub proof_flag_bits: Option<U256>,
    /// The raw records of every message of the batch, in sequence order.
    pub messages_in_batch: Vec<Value>,
    /// Off-chain token data, one entry per token transfer.
    pub offchain_token_data: Vec<Bytes>,
    /// Off-chain verifier results for versions without on-chain commits.
    pub verifier_results: Vec<IndexedVerifierResult>,
}

/// Static lane information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneInfo {
    /// The sending network.
    #[serde(with = "crate::serde_utils::flexible_u64")]
    pub source_chain_selector: u64,
    /// The receiving network.
    #[serde(with = "crate::serde_utils::flexible_u64")]
    pub dest_chain_selector: u64,
    /// The source on-ramp.
    pub on_ramp_address: String,
    /// The destination off-ramp.
    #[serde(default)]
    pub off_ramp_address: Option<String>,
    /// The lane version.
    pub version: String,
}

/// Observed end-to-end delivery latency of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneLatency {
    /// Typical time between send and execution, in milliseconds.
    #[serde(with = "crate::serde_utils::flexible_u64")]
    pub total_ms: u64,
}

/// Describes the functionality of the optional off-chain message index.
///
/// A disabled index answers every call with [IndexError::Disabled].
///
/// [IndexError::Disabled]: crate::IndexError::Disabled
#[async_trait]
pub trait IndexApi: Debug + Send + Sync {
    /// Returns whether the index may be queried at all.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Fetches a message by id.
    async fn get_message_by_id(&self, message_id: B256) -> IndexResult<IndexedMessage>;

    /// Lists the ids of the messages sent in a transaction.
    async fn get_message_ids_in_tx(&self, tx_hash: &str) -> IndexResult<Vec<B256>>;

    /// Fetches the inputs needed to execute a message.
    async fn get_execution_inputs(&self, message_id: B256) -> IndexResult<ExecutionInputs>;

    /// Fetches static information on a lane.
    async fn get_lane_info(&self, source_selector: u64, dest_selector: u64)
        -> IndexResult<LaneInfo>;

    /// Fetches the observed delivery latency of a lane.
    async fn get_lane_latency(
        &self,
        source_selector: u64,
        dest_selector: u64,
    ) -> IndexResult<LaneLatency>;
}
