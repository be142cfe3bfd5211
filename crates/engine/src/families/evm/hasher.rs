//! Merkle leaf hashing of messages delivered to EVM off-ramps.

use super::abi::{Any2EVMTokenTransfer, EVMTokenAmount};
use crate::{traits::LeafHasher, CcipError, CcipResult};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use alloy_sol_types::SolValue;
use ccip_merkle::LEAF_DOMAIN_SEPARATOR;
use ccip_primitives::{CcipMessage, ChainAddress, ChainFamily, Lane};

fn evm(address: &ChainAddress) -> CcipResult<Address> {
    address
        .to_evm()
        .ok_or(CcipError::FamilyMismatch { expected: ChainFamily::Evm, actual: address.family() })
}

fn missing_token_field(what: &str) -> CcipError {
    CcipError::InvalidArgument(format!("token transfer without {what}"))
}

/// Leaf hasher of `EVM2EVMOffRamp` lanes (v1.2 and v1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evm2EvmLeafHasher {
    metadata_hash: B256,
}

impl Evm2EvmLeafHasher {
    /// Creates the hasher of `lane`, whose on-ramp must be an EVM contract.
    pub fn new(lane: &Lane) -> CcipResult<Self> {
        let on_ramp = evm(&lane.on_ramp)?;
        let metadata_hash = keccak256(
            (
                keccak256("EVM2EVMMessageHashV2"),
                lane.source_chain_selector,
                lane.dest_chain_selector,
                on_ramp,
            )
                .abi_encode_params(),
        );
        Ok(Self { metadata_hash })
    }
}

impl LeafHasher for Evm2EvmLeafHasher {
    fn hash_leaf(&self, message: &CcipMessage) -> CcipResult<B256> {
        let fixed = keccak256(
            (
                evm(&message.sender)?,
                evm(&message.receiver)?,
                message.sequence_number(),
                message.gas_limit(),
                message.strict,
                message.header.nonce,
                evm(&message.fee_token)?,
                message.fee_token_amount,
            )
                .abi_encode_params(),
        );
        let token_amounts = message
            .token_amounts
            .iter()
            .map(|transfer| -> CcipResult<EVMTokenAmount> {
                let token = transfer.token.as_ref().ok_or_else(|| missing_token_field("token"))?;
                Ok(EVMTokenAmount { token: evm(token)?, amount: transfer.amount })
            })
            .collect::<CcipResult<Vec<_>>>()?;
        Ok(keccak256(
            (
                LEAF_DOMAIN_SEPARATOR,
                self.metadata_hash,
                fixed,
                keccak256(&message.data),
                keccak256(token_amounts.abi_encode()),
                keccak256(message.source_token_data.abi_encode()),
            )
                .abi_encode_params(),
        ))
    }
}

/// Leaf hasher of `OffRamp` lanes (v1.6), from any source family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Any2EvmLeafHasher {
    metadata_hash: B256,
}

impl Any2EvmLeafHasher {
    /// Creates the hasher of `lane`.
    pub fn new(lane: &Lane) -> Self {
        let metadata_hash = keccak256(
            (
                keccak256("Any2EVMMessageHashV1"),
                lane.source_chain_selector,
                lane.dest_chain_selector,
                keccak256(lane.on_ramp.to_abi_bytes()),
            )
                .abi_encode_params(),
        );
        Self { metadata_hash }
    }
}

impl LeafHasher for Any2EvmLeafHasher {
    fn hash_leaf(&self, message: &CcipMessage) -> CcipResult<B256> {
        let fixed = keccak256(
            (
                message.message_id(),
                evm(&message.receiver)?,
                message.sequence_number(),
                message.gas_limit(),
                message.header.nonce,
            )
                .abi_encode_params(),
        );
        let token_amounts = message
            .token_amounts
            .iter()
            .map(|transfer| -> CcipResult<Any2EVMTokenTransfer> {
                let pool = transfer
                    .source_pool_address
                    .as_ref()
                    .ok_or_else(|| missing_token_field("source pool"))?;
                let dest_token = transfer
                    .dest_token_address
                    .as_ref()
                    .ok_or_else(|| missing_token_field("destination token"))?;
                Ok(Any2EVMTokenTransfer {
                    sourcePoolAddress: Bytes::from(pool.to_abi_bytes()),
                    destTokenAddress: evm(dest_token)?,
                    destGasAmount: transfer.dest_gas_amount.unwrap_or_default(),
                    extraData: transfer.extra_data.clone(),
                    amount: transfer.amount,
                })
            })
            .collect::<CcipResult<Vec<_>>>()?;
        Ok(keccak256(
            (
                LEAF_DOMAIN_SEPARATOR,
                self.metadata_hash,
                fixed,
                keccak256(message.sender.to_abi_bytes()),
                keccak256(&message.data),
                keccak256(token_amounts.abi_encode()),
            )
                .abi_encode_params(),
        ))
    }
}
