//! The canonical in-memory message.

use crate::{ChainAddress, ExtraArgs};
use alloy_primitives::{Bytes, B256, U256};
use serde::Serialize;

/// Identifying fields common to all message versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    /// The protocol-wide message id.
    pub message_id: B256,
    /// The lane sequence number.
    pub sequence_number: u64,
    /// The sender nonce, `0` for out-of-order messages.
    pub nonce: u64,
    /// The selector of the sending network.
    pub source_chain_selector: u64,
    /// The selector of the receiving network. Older message versions leave it to the lane.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_chain_selector: Option<u64>,
}

/// A token transfer carried by a message.
///
/// Older message versions only know `token`; newer ones describe the source pool and the
/// destination token instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    /// The source-chain token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<ChainAddress>,
    /// The source-chain token pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pool_address: Option<ChainAddress>,
    /// The destination-chain token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_token_address: Option<ChainAddress>,
    /// The amount transferred, in source-token units.
    pub amount: U256,
    /// Pool-specific data forwarded to the destination pool.
    pub extra_data: Bytes,
    /// Gas reserved for the destination pool's release/mint call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_gas_amount: Option<u32>,
    /// Raw destination execution data the gas amount was decoded from.
    pub dest_exec_data: Bytes,
}

/// A cross-chain message, normalized from any of its on-chain or off-chain representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CcipMessage {
    /// Identifying fields.
    #[serde(flatten)]
    pub header: MessageHeader,
    /// The sending account, in the source family's encoding.
    pub sender: ChainAddress,
    /// The receiving account, in the destination family's encoding.
    pub receiver: ChainAddress,
    /// The data payload delivered to the receiver.
    pub data: Bytes,
    /// The token transfers.
    pub token_amounts: Vec<TokenTransfer>,
    /// The token fees were paid in.
    pub fee_token: ChainAddress,
    /// The fee amount, in fee-token units.
    pub fee_token_amount: U256,
    /// The fee value in LINK juels, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_value_juels: Option<U256>,
    /// Execution hints.
    #[serde(flatten)]
    pub extra_args: ExtraArgs,
    /// Whether a receiver failure must block the lane (v1.2/v1.5 only).
    pub strict: bool,
    /// Per-token source pool data (v1.2/v1.5 only).
    pub source_token_data: Vec<Bytes>,
}

impl CcipMessage {
    /// Returns the message id.
    pub const fn message_id(&self) -> B256 {
        self.header.message_id
    }

    /// Returns the lane sequence number.
    pub const fn sequence_number(&self) -> u64 {
        self.header.sequence_number
    }

    /// Returns the execution gas limit requested by the sender.
    pub fn gas_limit(&self) -> U256 {
        self.extra_args.gas_limit()
    }
}
