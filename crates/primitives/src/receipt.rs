//! Execution receipts.

use alloy_primitives::{Bytes, B256, U256};
use serde::Serialize;

/// The execution state of a message on the destination chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExecutionState {
    /// Not yet attempted.
    Untouched,
    /// An execution is in progress.
    InProgress,
    /// The message was delivered.
    Success,
    /// The last execution attempt failed.
    Failed,
}

impl ExecutionState {
    /// Whether the state is final for the attempt that produced it.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl TryFrom<u8> for ExecutionState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Untouched),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::Success),
            3 => Ok(Self::Failed),
            other => Err(other),
        }
    }
}

/// The record of a delivery attempt observed on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
    /// The selector of the sending network, when the event carries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chain_selector: Option<u64>,
    /// The lane sequence number.
    pub sequence_number: u64,
    /// The message id.
    pub message_id: B256,
    /// The leaf hash of the message, when the event carries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_hash: Option<B256>,
    /// The resulting state.
    pub state: ExecutionState,
    /// Revert data of a failed receiver call.
    pub return_data: Bytes,
    /// Gas used by the execution, when the event carries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<U256>,
}
