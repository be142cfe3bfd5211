//! Building destination-ready messages from partial input.

use super::{parse_b256, parse_u256, parse_u64};
use crate::{traits::OutboundMessage, CcipError, CcipResult};
use alloy_primitives::{Bytes, B256, U256};
use ccip_primitives::{ChainAddress, ChainFamily, ExtraArgs, NetworkInfo, DEFAULT_GAS_LIMIT};
use serde_json::{Map, Value};

/// Execution hints as supplied by a caller or found in a record; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraArgsInput {
    /// Receiver gas limit.
    pub gas_limit: Option<U256>,
    /// Out-of-order execution flag.
    pub allow_out_of_order_execution: Option<bool>,
    /// Solana compute units.
    pub compute_units: Option<u32>,
    /// Solana account writability bitmap.
    pub account_is_writable_bitmap: Option<u64>,
    /// Token receiving account on Solana or Sui.
    pub token_receiver: Option<B256>,
    /// Extra Solana accounts.
    pub accounts: Option<Vec<B256>>,
    /// Sui receiver objects.
    pub receiver_object_ids: Option<Vec<B256>>,
}

impl ExtraArgsInput {
    /// Collects the hint fields of a normalized record.
    pub(crate) fn from_record(obj: &Map<String, Value>) -> CcipResult<Self> {
        let bad = |key: &str| CcipError::Decode(format!("extra args: invalid {key}"));
        let get = |key: &str| obj.get(key).filter(|value| !value.is_null());
        let words = |key: &str| -> CcipResult<Option<Vec<B256>>> {
            get(key)
                .map(|value| {
                    value
                        .as_array()
                        .and_then(|items| items.iter().map(parse_b256).collect::<Option<Vec<_>>>())
                        .ok_or_else(|| bad(key))
                })
                .transpose()
        };
        Ok(Self {
            gas_limit: get("gasLimit")
                .map(|value| parse_u256(value).ok_or_else(|| bad("gasLimit")))
                .transpose()?,
            allow_out_of_order_execution: get("allowOutOfOrderExecution")
                .map(|value| value.as_bool().ok_or_else(|| bad("allowOutOfOrderExecution")))
                .transpose()?,
            compute_units: get("computeUnits")
                .map(|value| {
                    parse_u64(value)
                        .and_then(|units| u32::try_from(units).ok())
                        .ok_or_else(|| bad("computeUnits"))
                })
                .transpose()?,
            account_is_writable_bitmap: get("accountIsWritableBitmap")
                .map(|value| parse_u64(value).ok_or_else(|| bad("accountIsWritableBitmap")))
                .transpose()?,
            token_receiver: get("tokenReceiver")
                .map(|value| parse_b256(value).ok_or_else(|| bad("tokenReceiver")))
                .transpose()?,
            accounts: words("accounts")?,
            receiver_object_ids: words("receiverObjectIds")?,
        })
    }

    /// Returns the schema selected by a field only one family understands.
    fn family_schema(&self) -> Option<&'static str> {
        if self.receiver_object_ids.is_some() {
            Some("SuiExtraArgsV1")
        } else if self.compute_units.is_some()
            || self.account_is_writable_bitmap.is_some()
            || self.accounts.is_some()
        {
            Some("SVMExtraArgsV1")
        } else {
            None
        }
    }

    /// Resolves the hints into one schema.
    ///
    /// With an explicit `tag` the named schema is used. Otherwise the schema is picked by the
    /// fields present: Sui-only fields select `SuiExtraArgsV1`, Solana-only fields select
    /// `SVMExtraArgsV1`, an ordering flag selects `EVMExtraArgsV2`, and anything else
    /// `EVMExtraArgsV1`. Missing gas limits default to `default_gas_limit`.
    pub fn into_extra_args(
        self,
        tag: Option<&str>,
        default_gas_limit: U256,
    ) -> CcipResult<ExtraArgs> {
        let schema = match tag.or_else(|| self.family_schema()) {
            Some(schema) => schema,
            None if self.allow_out_of_order_execution.is_some() => "EVMExtraArgsV2",
            None => "EVMExtraArgsV1",
        };
        let gas_limit = self.gas_limit.unwrap_or(default_gas_limit);
        match schema {
            "EVMExtraArgsV1" => Ok(ExtraArgs::EvmV1 { gas_limit }),
            "EVMExtraArgsV2" | "GenericExtraArgsV2" => Ok(ExtraArgs::EvmV2 {
                gas_limit,
                allow_out_of_order_execution: self.allow_out_of_order_execution.unwrap_or(false),
            }),
            "SVMExtraArgsV1" => Ok(ExtraArgs::SvmV1 {
                compute_units: self.compute_units.unwrap_or_else(|| gas_limit.saturating_to()),
                account_is_writable_bitmap: self.account_is_writable_bitmap.unwrap_or_default(),
                allow_out_of_order_execution: self.allow_out_of_order_execution.unwrap_or(true),
                token_receiver: self.token_receiver.unwrap_or_default(),
                accounts: self.accounts.unwrap_or_default(),
            }),
            "SuiExtraArgsV1" => Ok(ExtraArgs::SuiV1 {
                gas_limit,
                allow_out_of_order_execution: self.allow_out_of_order_execution.unwrap_or(true),
                token_receiver: self.token_receiver.unwrap_or_default(),
                receiver_object_ids: self.receiver_object_ids.unwrap_or_default(),
            }),
            other => Err(CcipError::Decode(format!("unknown extra args schema {other}"))),
        }
    }
}

/// A message as a caller describes it before sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDraft {
    /// The destination network.
    pub dest_chain_selector: u64,
    /// The receiver, in the destination family's textual encoding.
    pub receiver: String,
    /// The data payload.
    pub data: Bytes,
    /// Tokens and amounts to transfer.
    pub token_amounts: Vec<(ChainAddress, U256)>,
    /// The fee token. `None` pays in the native coin.
    pub fee_token: Option<ChainAddress>,
    /// Execution hints; missing ones are defaulted.
    pub extra_args: ExtraArgsInput,
}

/// Builds a destination-ready message, filling default execution hints.
///
/// The default gas limit is zero for token-only transfers and [DEFAULT_GAS_LIMIT] when a data
/// payload is present. Unless a family-specific hint picks the schema, Solana and Sui
/// destinations get their own schema and every other family the EVM one.
pub fn build_message_for_dest(draft: MessageDraft) -> CcipResult<OutboundMessage> {
    let dest = NetworkInfo::by_selector(draft.dest_chain_selector)?;
    let receiver = ChainAddress::parse(dest.family, &draft.receiver)?;
    let default_gas_limit =
        if draft.data.is_empty() { U256::ZERO } else { U256::from(DEFAULT_GAS_LIMIT) };
    let tag = match dest.family {
        _ if draft.extra_args.family_schema().is_some() => None,
        ChainFamily::Solana => Some("SVMExtraArgsV1"),
        ChainFamily::Sui => Some("SuiExtraArgsV1"),
        ChainFamily::Evm | ChainFamily::Aptos | ChainFamily::Ton => None,
    };
    Ok(OutboundMessage {
        dest_chain_selector: draft.dest_chain_selector,
        receiver,
        data: draft.data,
        token_amounts: draft.token_amounts,
        fee_token: draft.fee_token,
        extra_args: draft.extra_args.into_extra_args(tag, default_gas_limit)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUJI: u64 = 14_767_482_510_784_806_043;
    const SOLANA_DEVNET: u64 = 16_423_721_717_087_811_551;
    const SUI_TESTNET: u64 = 9_762_610_643_973_837_292;

    fn draft(dest: u64, receiver: &str, data: &[u8], extra_args: ExtraArgsInput) -> MessageDraft {
        MessageDraft {
            dest_chain_selector: dest,
            receiver: receiver.to_string(),
            data: Bytes::copy_from_slice(data),
            extra_args,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_gas_depends_on_data() {
        let receiver = "0x9d087fc03ae39b088326b67fa3c788236645b717";
        let token_only = build_message_for_dest(draft(FUJI, receiver, &[], Default::default()));
        assert_eq!(token_only.unwrap().extra_args, ExtraArgs::EvmV1 { gas_limit: U256::ZERO });

        let with_data = build_message_for_dest(draft(FUJI, receiver, b"hi", Default::default()));
        assert_eq!(
            with_data.unwrap().extra_args,
            ExtraArgs::EvmV1 { gas_limit: U256::from(DEFAULT_GAS_LIMIT) }
        );
    }

    #[test]
    fn test_schema_follows_present_fields() {
        let receiver = "0x9d087fc03ae39b088326b67fa3c788236645b717";
        let v2 = ExtraArgsInput { allow_out_of_order_execution: Some(true), ..Default::default() };
        assert_eq!(
            build_message_for_dest(draft(FUJI, receiver, b"x", v2)).unwrap().extra_args,
            ExtraArgs::EvmV2 {
                gas_limit: U256::from(DEFAULT_GAS_LIMIT),
                allow_out_of_order_execution: true
            }
        );

        let solana_receiver = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG";
        let svm = ExtraArgsInput { compute_units: Some(50_000), ..Default::default() };
        let message = build_message_for_dest(draft(SOLANA_DEVNET, solana_receiver, &[], svm));
        let message = message.unwrap();
        assert_eq!(message.receiver.family(), ChainFamily::Solana);
        assert!(matches!(
            message.extra_args,
            ExtraArgs::SvmV1 { compute_units: 50_000, allow_out_of_order_execution: true, .. }
        ));

        let sui = ExtraArgsInput {
            receiver_object_ids: Some(vec![B256::repeat_byte(1)]),
            gas_limit: Some(U256::from(10)),
            ..Default::default()
        };
        let message = build_message_for_dest(draft(SUI_TESTNET, "0x1", &[], sui)).unwrap();
        assert_eq!(message.extra_args.tag(), ExtraArgs::SUI_V1_TAG);
        assert_eq!(message.extra_args.gas_limit(), U256::from(10));
    }

    #[test]
    fn test_default_schema_follows_destination_family() {
        let solana_receiver = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG";
        let message = build_message_for_dest(draft(
            SOLANA_DEVNET,
            solana_receiver,
            b"hi",
            Default::default(),
        ));
        assert_eq!(
            message.unwrap().extra_args,
            ExtraArgs::SvmV1 {
                compute_units: 200_000,
                account_is_writable_bitmap: 0,
                allow_out_of_order_execution: true,
                token_receiver: B256::ZERO,
                accounts: vec![],
            }
        );

        let ordered =
            ExtraArgsInput { allow_out_of_order_execution: Some(false), ..Default::default() };
        let message = build_message_for_dest(draft(SUI_TESTNET, "0x1", &[], ordered)).unwrap();
        assert_eq!(
            message.extra_args,
            ExtraArgs::SuiV1 {
                gas_limit: U256::ZERO,
                allow_out_of_order_execution: false,
                token_receiver: B256::ZERO,
                receiver_object_ids: vec![],
            }
        );

        // Records keep the field rule: no hints still decode as the EVM schema.
        let args = ExtraArgsInput::default().into_extra_args(None, U256::from(5)).unwrap();
        assert_eq!(args, ExtraArgs::EvmV1 { gas_limit: U256::from(5) });
    }

    #[test]
    fn test_receiver_must_match_destination_family() {
        let err = build_message_for_dest(draft(FUJI, "not-hex", &[], Default::default()));
        assert!(matches!(err, Err(CcipError::Primitives(_))));
        let err = build_message_for_dest(draft(42, "0x01", &[], Default::default()));
        assert!(matches!(err, Err(CcipError::Primitives(_))));
    }
}
