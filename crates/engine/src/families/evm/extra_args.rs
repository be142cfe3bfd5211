//! ABI encoding of the tagged extra-args blob.

use super::abi::{EVMExtraArgsV1, EVMExtraArgsV2, SVMExtraArgsV1, SuiExtraArgsV1};
use crate::{CcipError, CcipResult};
use alloy_primitives::Bytes;
use alloy_sol_types::{SolType, SolValue};
use ccip_primitives::ExtraArgs;

/// Decodes `tag ++ abi.encode(args)`. An empty blob yields the default arguments.
pub fn decode_extra_args(data: &[u8]) -> CcipResult<ExtraArgs> {
    if data.is_empty() {
        return Ok(ExtraArgs::default());
    }
    if data.len() < 4 {
        return Err(CcipError::Decode(format!("extra args too short: {} bytes", data.len())));
    }
    let (tag, body) = data.split_at(4);
    let bad = |err: alloy_sol_types::Error| CcipError::Decode(format!("extra args: {err}"));
    match <[u8; 4]>::try_from(tag).unwrap_or_default() {
        ExtraArgs::EVM_V1_TAG => {
            let args = <EVMExtraArgsV1 as SolType>::abi_decode(body, true).map_err(bad)?;
            Ok(ExtraArgs::EvmV1 { gas_limit: args.gasLimit })
        }
        ExtraArgs::EVM_V2_TAG => {
            let args = <EVMExtraArgsV2 as SolType>::abi_decode(body, true).map_err(bad)?;
            Ok(ExtraArgs::EvmV2 {
                gas_limit: args.gasLimit,
                allow_out_of_order_execution: args.allowOutOfOrderExecution,
            })
        }
        ExtraArgs::SVM_V1_TAG => {
            let args = <SVMExtraArgsV1 as SolType>::abi_decode(body, true).map_err(bad)?;
            Ok(ExtraArgs::SvmV1 {
                compute_units: args.computeUnits,
                account_is_writable_bitmap: args.accountIsWritableBitmap,
                allow_out_of_order_execution: args.allowOutOfOrderExecution,
                token_receiver: args.tokenReceiver,
                accounts: args.accounts,
            })
        }
        ExtraArgs::SUI_V1_TAG => {
            let args = <SuiExtraArgsV1 as SolType>::abi_decode(body, true).map_err(bad)?;
            Ok(ExtraArgs::SuiV1 {
                gas_limit: args.gasLimit,
                allow_out_of_order_execution: args.allowOutOfOrderExecution,
                token_receiver: args.tokenReceiver,
                receiver_object_ids: args.receiverObjectIds,
            })
        }
        other => Err(CcipError::Decode(format!(
            "unknown extra args tag 0x{}",
            alloy_primitives::hex::encode(other)
        ))),
    }
}

/// Encodes the arguments as `tag ++ abi.encode(args)`.
pub fn encode_extra_args(args: &ExtraArgs) -> Bytes {
    let body = match args.clone() {
        ExtraArgs::EvmV1 { gas_limit } => EVMExtraArgsV1 { gasLimit: gas_limit }.abi_encode(),
        ExtraArgs::EvmV2 { gas_limit, allow_out_of_order_execution } => EVMExtraArgsV2 {
            gasLimit: gas_limit,
            allowOutOfOrderExecution: allow_out_of_order_execution,
        }
        .abi_encode(),
        ExtraArgs::SvmV1 {
            compute_units,
            account_is_writable_bitmap,
            allow_out_of_order_execution,
            token_receiver,
            accounts,
        } => SVMExtraArgsV1 {
            computeUnits: compute_units,
            accountIsWritableBitmap: account_is_writable_bitmap,
            allowOutOfOrderExecution: allow_out_of_order_execution,
            tokenReceiver: token_receiver,
            accounts,
        }
        .abi_encode(),
        ExtraArgs::SuiV1 {
            gas_limit,
            allow_out_of_order_execution,
            token_receiver,
            receiver_object_ids,
        } => SuiExtraArgsV1 {
            gasLimit: gas_limit,
            allowOutOfOrderExecution: allow_out_of_order_execution,
            tokenReceiver: token_receiver,
            receiverObjectIds: receiver_object_ids,
        }
        .abi_encode(),
    };
    let mut out = args.tag().to_vec();
    out.extend_from_slice(&body);
    out.into()
}
