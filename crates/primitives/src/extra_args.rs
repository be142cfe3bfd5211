//! Family-specific execution hints carried by a message.

use alloy_primitives::{B256, U256};
use serde::Serialize;

/// The gas limit applied to messages carrying a data payload when the sender did not set one.
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Execution hints attached to a message, tagged by their schema version.
///
/// When serialized, the fields are emitted flat with a `_tag` marker naming the schema, matching
/// the shape messages take when merged into a message record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_tag")]
pub enum ExtraArgs {
    /// `EVMExtraArgsV1`: a bare gas limit.
    #[serde(rename = "EVMExtraArgsV1", rename_all = "camelCase")]
    EvmV1 {
        /// Gas limit for the receiver callback.
        gas_limit: U256,
    },
    /// `EVMExtraArgsV2` / `GenericExtraArgsV2`: gas limit plus ordering flag.
    #[serde(rename = "EVMExtraArgsV2", rename_all = "camelCase")]
    EvmV2 {
        /// Gas limit for the receiver callback.
        gas_limit: U256,
        /// Whether the message may be executed out of nonce order.
        allow_out_of_order_execution: bool,
    },
    /// `SVMExtraArgsV1`: Solana destination hints.
    #[serde(rename = "SVMExtraArgsV1", rename_all = "camelCase")]
    SvmV1 {
        /// Compute units for the receiver program.
        compute_units: u32,
        /// Writability bitmap over `accounts`.
        account_is_writable_bitmap: u64,
        /// Whether the message may be executed out of nonce order.
        allow_out_of_order_execution: bool,
        /// Account receiving transferred tokens.
        token_receiver: B256,
        /// Extra accounts passed to the receiver program.
        accounts: Vec<B256>,
    },
    /// `SuiExtraArgsV1`: Sui destination hints.
    #[serde(rename = "SuiExtraArgsV1", rename_all = "camelCase")]
    SuiV1 {
        /// Gas limit for the receiver call.
        gas_limit: U256,
        /// Whether the message may be executed out of nonce order.
        allow_out_of_order_execution: bool,
        /// Account receiving transferred tokens.
        token_receiver: B256,
        /// Objects passed to the receiver module.
        receiver_object_ids: Vec<B256>,
    },
}

impl ExtraArgs {
    /// `bytes4(keccak256("CCIP EVMExtraArgsV1"))`
    pub const EVM_V1_TAG: [u8; 4] = [0x97, 0xa6, 0x57, 0xc9];
    /// `bytes4(keccak256("CCIP EVMExtraArgsV2"))`
    pub const EVM_V2_TAG: [u8; 4] = [0x18, 0x1d, 0xcf, 0x10];
    /// `bytes4(keccak256("CCIP SVMExtraArgsV1"))`
    pub const SVM_V1_TAG: [u8; 4] = [0x1f, 0x3b, 0x3a, 0xba];
    /// `bytes4(keccak256("CCIP SuiExtraArgsV1"))`
    pub const SUI_V1_TAG: [u8; 4] = [0x21, 0xea, 0x4c, 0xa9];

    /// Returns the 4-byte tag prefixing the encoded form.
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            Self::EvmV1 { .. } => Self::EVM_V1_TAG,
            Self::EvmV2 { .. } => Self::EVM_V2_TAG,
            Self::SvmV1 { .. } => Self::SVM_V1_TAG,
            Self::SuiV1 { .. } => Self::SUI_V1_TAG,
        }
    }

    /// Returns the schema name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EvmV1 { .. } => "EVMExtraArgsV1",
            Self::EvmV2 { .. } => "EVMExtraArgsV2",
            Self::SvmV1 { .. } => "SVMExtraArgsV1",
            Self::SuiV1 { .. } => "SuiExtraArgsV1",
        }
    }

    /// Returns the execution gas budget. For Solana this is the compute-unit budget.
    pub fn gas_limit(&self) -> U256 {
        match self {
            Self::EvmV1 { gas_limit }
            | Self::EvmV2 { gas_limit, .. }
            | Self::SuiV1 { gas_limit, .. } => *gas_limit,
            Self::SvmV1 { compute_units, .. } => U256::from(*compute_units),
        }
    }

    /// Replaces the execution gas budget, saturating compute units at `u32::MAX`.
    pub fn set_gas_limit(&mut self, limit: U256) {
        match self {
            Self::EvmV1 { gas_limit }
            | Self::EvmV2 { gas_limit, .. }
            | Self::SuiV1 { gas_limit, .. } => *gas_limit = limit,
            Self::SvmV1 { compute_units, .. } => *compute_units = limit.saturating_to(),
        }
    }

    /// Whether the message may be executed out of nonce order.
    pub const fn allow_out_of_order_execution(&self) -> bool {
        match self {
            Self::EvmV1 { .. } => false,
            Self::EvmV2 { allow_out_of_order_execution, .. }
            | Self::SvmV1 { allow_out_of_order_execution, .. }
            | Self::SuiV1 { allow_out_of_order_execution, .. } => *allow_out_of_order_execution,
        }
    }
}

impl Default for ExtraArgs {
    fn default() -> Self {
        Self::EvmV1 { gas_limit: U256::ZERO }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_flat_with_tag() {
        let args =
            ExtraArgs::EvmV2 { gas_limit: U256::from(1000), allow_out_of_order_execution: true };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["_tag"], "EVMExtraArgsV2");
        assert_eq!(json["allowOutOfOrderExecution"], true);
        assert!(json.get("gasLimit").is_some());
    }

    #[test]
    fn test_gas_limit_accessors() {
        let mut svm = ExtraArgs::SvmV1 {
            compute_units: 10,
            account_is_writable_bitmap: 0,
            allow_out_of_order_execution: true,
            token_receiver: B256::ZERO,
            accounts: vec![],
        };
        assert_eq!(svm.gas_limit(), U256::from(10));
        svm.set_gas_limit(U256::MAX);
        assert_eq!(svm.gas_limit(), U256::from(u32::MAX));
        assert!(svm.allow_out_of_order_execution());
        assert!(!ExtraArgs::default().allow_out_of_order_execution());
    }
}
