//! Codec of families whose transports surface CCIP events as JSON records.
//!
//! Solana, Aptos, Sui and TON transports translate their native events into a [ChainLog] whose
//! first topic is the keccak hash of the event name and whose data is the UTF-8 JSON of the
//! event fields. Integers in extra-args blobs written by these families are little-endian.

use crate::{
    codec::{decode_record, parse_b256, parse_bytes, parse_u256, parse_u64},
    families::{FamilyCodec, FamilyRegistry},
    traits::LeafHasher,
    CcipError, CcipResult,
};
use alloy_primitives::{keccak256, Bytes, B256, U256};
use ccip_primitives::{
    CcipMessage, ChainAddress, ChainFamily, ChainLog, CommitReport, ExecutionReceipt,
    ExecutionState, ExtraArgs, Lane,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Name of the event announcing a sent message.
pub const MESSAGE_SENT_EVENT: &str = "CCIPMessageSent";

/// Name of the event announcing committed merkle roots.
pub const COMMIT_REPORT_EVENT: &str = "CommitReportAccepted";

/// Name of the event reporting an execution attempt.
pub const EXECUTION_STATE_EVENT: &str = "ExecutionStateChanged";

/// Codec of one JSON-record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonEventCodec {
    family: ChainFamily,
}

impl JsonEventCodec {
    /// Creates the codec of `family`.
    pub const fn new(family: ChainFamily) -> Self {
        Self { family }
    }

    /// Width in bytes of the gas limit in extra-args blobs of this family.
    const fn gas_width(&self) -> usize {
        match self.family {
            ChainFamily::Solana => 16,
            _ => 32,
        }
    }

    fn expect_topic(&self, log: &ChainLog, event: &str) -> CcipResult<()> {
        if log.topic0() == Some(keccak256(event)) {
            Ok(())
        } else {
            Err(CcipError::Decode(format!(
                "log {} of {} is not a {} {event} event",
                log.log_index, log.transaction_hash, self.family
            )))
        }
    }

    fn record(data: &[u8]) -> CcipResult<Map<String, Value>> {
        match serde_json::from_slice::<Value>(data) {
            Ok(Value::Object(map)) => Ok(camelize_keys(map)),
            Ok(_) => Err(CcipError::Decode("event record is not an object".into())),
            Err(err) => Err(CcipError::Decode(format!("event record: {err}"))),
        }
    }

    fn message_from_record(&self, data: &[u8]) -> CcipResult<CcipMessage> {
        let message = decode_record(FamilyRegistry::global(), &Value::Object(Self::record(data)?))?;
        if message.sender.family() != self.family {
            return Err(CcipError::FamilyMismatch {
                expected: self.family,
                actual: message.sender.family(),
            });
        }
        Ok(message)
    }
}

fn camelize_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(key, value)| (crate::codec::to_camel_case(&key), value)).collect()
}

fn invalid(what: &str) -> CcipError {
    CcipError::Decode(format!("event record: missing or invalid {what}"))
}

fn execution_state(value: &Value) -> Option<ExecutionState> {
    if let Some(raw) = parse_u64(value) {
        return u8::try_from(raw).ok().and_then(|raw| ExecutionState::try_from(raw).ok());
    }
    match value.as_str()?.to_ascii_lowercase().replace('_', "").as_str() {
        "untouched" => Some(ExecutionState::Untouched),
        "inprogress" => Some(ExecutionState::InProgress),
        "success" => Some(ExecutionState::Success),
        "failure" | "failed" => Some(ExecutionState::Failed),
        _ => None,
    }
}

impl FamilyCodec for JsonEventCodec {
    fn family(&self) -> ChainFamily {
        self.family
    }

    fn message_topics(&self) -> Vec<B256> {
        vec![keccak256(MESSAGE_SENT_EVENT)]
    }

    fn commit_topics(&self) -> Vec<B256> {
        vec![keccak256(COMMIT_REPORT_EVENT)]
    }

    fn receipt_topics(&self) -> Vec<B256> {
        vec![keccak256(EXECUTION_STATE_EVENT)]
    }

    fn decode_message(&self, log: &ChainLog) -> CcipResult<CcipMessage> {
        self.expect_topic(log, MESSAGE_SENT_EVENT)?;
        self.message_from_record(&log.data)
    }

    fn decode_message_bytes(&self, data: &[u8]) -> CcipResult<CcipMessage> {
        self.message_from_record(data)
    }

    fn decode_commits(&self, log: &ChainLog, lane: &Lane) -> CcipResult<Vec<CommitReport>> {
        self.expect_topic(log, COMMIT_REPORT_EVENT)?;
        let record = Self::record(&log.data)?;
        let mut reports = Vec::new();
        for key in ["merkleRoots", "blessedMerkleRoots", "unblessedMerkleRoots"] {
            let Some(roots) = record.get(key).filter(|value| !value.is_null()) else { continue };
            let roots = roots.as_array().ok_or_else(|| invalid(key))?;
            for root in roots {
                let root = root.as_object().map(|root| camelize_keys(root.clone()));
                let root = root.ok_or_else(|| invalid(key))?;
                let number = |field: &str| root.get(field).and_then(parse_u64);
                if number("sourceChainSelector") != Some(lane.source_chain_selector) {
                    continue;
                }
                let on_ramp = root
                    .get("onRampAddress")
                    .and_then(Value::as_str)
                    .and_then(|text| ChainAddress::parse(lane.on_ramp.family(), text).ok());
                if on_ramp.as_ref() != Some(&lane.on_ramp) {
                    continue;
                }
                reports.push(CommitReport {
                    source_chain_selector: lane.source_chain_selector,
                    on_ramp_address: lane.on_ramp.clone(),
                    min_seq_nr: number("minSeqNr").ok_or_else(|| invalid("minSeqNr"))?,
                    max_seq_nr: number("maxSeqNr").ok_or_else(|| invalid("maxSeqNr"))?,
                    merkle_root: root
                        .get("merkleRoot")
                        .and_then(parse_b256)
                        .ok_or_else(|| invalid("merkleRoot"))?,
                });
            }
        }
        Ok(reports)
    }

    fn decode_receipt(&self, log: &ChainLog) -> CcipResult<ExecutionReceipt> {
        self.expect_topic(log, EXECUTION_STATE_EVENT)?;
        let record = Self::record(&log.data)?;
        let field = |key: &str| record.get(key).filter(|value| !value.is_null());
        Ok(ExecutionReceipt {
            source_chain_selector: field("sourceChainSelector").and_then(parse_u64),
            sequence_number: field("sequenceNumber")
                .and_then(parse_u64)
                .ok_or_else(|| invalid("sequenceNumber"))?,
            message_id: field("messageId")
                .and_then(parse_b256)
                .ok_or_else(|| invalid("messageId"))?,
            message_hash: field("messageHash").and_then(parse_b256),
            state: field("state").and_then(execution_state).ok_or_else(|| invalid("state"))?,
            return_data: field("returnData").and_then(parse_bytes).unwrap_or_default(),
            gas_used: field("gasUsed").and_then(parse_u256),
        })
    }

    fn decode_extra_args(&self, data: &[u8]) -> CcipResult<ExtraArgs> {
        if data.is_empty() {
            return Ok(ExtraArgs::default());
        }
        if data.len() < 5 {
            return Err(CcipError::Decode(format!("extra args too short: {} bytes", data.len())));
        }
        let (tag, body) = data.split_at(4);
        let gas = |bytes: &[u8]| {
            U256::try_from_le_slice(bytes)
                .ok_or_else(|| CcipError::Decode("extra args: gas limit overflows".into()))
        };
        match <[u8; 4]>::try_from(tag).unwrap_or_default() {
            ExtraArgs::EVM_V1_TAG => Ok(ExtraArgs::EvmV1 { gas_limit: gas(body)? }),
            ExtraArgs::EVM_V2_TAG => match body.split_last() {
                Some((flag, gas_limit)) if !gas_limit.is_empty() => Ok(ExtraArgs::EvmV2 {
                    gas_limit: gas(gas_limit)?,
                    allow_out_of_order_execution: *flag != 0,
                }),
                _ => Err(CcipError::Decode("extra args: truncated EVMExtraArgsV2".into())),
            },
            other => Err(CcipError::Decode(format!(
                "extra args tag 0x{} cannot be sent from {}",
                alloy_primitives::hex::encode(other),
                self.family
            ))),
        }
    }

    fn encode_extra_args(&self, args: &ExtraArgs) -> CcipResult<Bytes> {
        let gas = |limit: U256| {
            let le = limit.to_le_bytes::<32>();
            if le[self.gas_width()..].iter().any(|b| *b != 0) {
                return Err(CcipError::InvalidArgument(format!(
                    "gas limit {limit} does not fit {} bytes",
                    self.gas_width()
                )));
            }
            Ok(le[..self.gas_width()].to_vec())
        };
        let mut out = args.tag().to_vec();
        match args {
            ExtraArgs::EvmV1 { gas_limit } => out.extend(gas(*gas_limit)?),
            ExtraArgs::EvmV2 { gas_limit, allow_out_of_order_execution } => {
                out.extend(gas(*gas_limit)?);
                out.push(u8::from(*allow_out_of_order_execution));
            }
            ExtraArgs::SvmV1 { .. } | ExtraArgs::SuiV1 { .. } => {
                return Err(CcipError::Unsupported {
                    family: self.family,
                    what: "encoding destination-specific extra args",
                })
            }
        }
        Ok(out.into())
    }

    fn leaf_hasher(&self, _lane: &Lane) -> CcipResult<Arc<dyn LeafHasher>> {
        Err(CcipError::Unsupported { family: self.family, what: "merkle leaf hashing" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use ccip_primitives::ProtocolVersion;
    use serde_json::json;

    const SEPOLIA: u64 = 16_015_286_601_757_825_753;
    const SOLANA_DEVNET: u64 = 16_423_721_717_087_811_551;

    fn log(event: &str, record: Value) -> ChainLog {
        ChainLog {
            address: ChainAddress::from_bytes(ChainFamily::Solana, &[9u8; 32]).unwrap(),
            topics: vec![keccak256(event)],
            data: serde_json::to_vec(&record).unwrap().into(),
            block_number: 100,
            transaction_hash: "5h3kYh".to_string(),
            log_index: 1,
        }
    }

    fn solana_sent() -> Value {
        json!({
            "message_id": format!("0x{}", "ab".repeat(32)),
            "source_chain_selector": SOLANA_DEVNET.to_string(),
            "dest_chain_selector": SEPOLIA.to_string(),
            "sequence_number": 12,
            "nonce": 0,
            "sender": "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG",
            "receiver": "0x9d087fc03ae39b088326b67fa3c788236645b717",
            "data": "0x",
            "extra_args": {"gas_limit": "5000", "allow_out_of_order_execution": true},
            "fee_token": "So11111111111111111111111111111111111111112",
            "fee_token_amount": "100",
        })
    }

    #[test]
    fn test_decode_message_event() {
        let codec = JsonEventCodec::new(ChainFamily::Solana);
        let message = codec.decode_message(&log(MESSAGE_SENT_EVENT, solana_sent())).unwrap();
        assert_eq!(message.sequence_number(), 12);
        assert_eq!(message.sender.family(), ChainFamily::Solana);
        assert_eq!(message.receiver.family(), ChainFamily::Evm);
        assert_eq!(
            message.extra_args,
            ExtraArgs::EvmV2 { gas_limit: U256::from(5000), allow_out_of_order_execution: true }
        );

        let aptos = JsonEventCodec::new(ChainFamily::Aptos);
        assert!(matches!(
            aptos.decode_message(&log(MESSAGE_SENT_EVENT, solana_sent())),
            Err(CcipError::FamilyMismatch { expected: ChainFamily::Aptos, .. })
        ));
        assert!(matches!(
            codec.decode_message(&log(COMMIT_REPORT_EVENT, solana_sent())),
            Err(CcipError::Decode(_))
        ));
    }

    #[test]
    fn test_little_endian_extra_args() {
        let codec = JsonEventCodec::new(ChainFamily::Solana);
        let args =
            ExtraArgs::EvmV2 { gas_limit: U256::from(300_000), allow_out_of_order_execution: true };
        let blob = codec.encode_extra_args(&args).unwrap();
        assert_eq!(blob.len(), 4 + 16 + 1);
        assert_eq!(&blob[4..7], &[0xe0, 0x93, 0x04]);
        assert_eq!(codec.decode_extra_args(&blob).unwrap(), args);

        let sui = JsonEventCodec::new(ChainFamily::Sui);
        let v1 = ExtraArgs::EvmV1 { gas_limit: U256::from(1) };
        assert_eq!(sui.encode_extra_args(&v1).unwrap().len(), 36);
        assert!(matches!(
            sui.decode_extra_args(&[0x1f, 0x3b, 0x3a, 0xba, 0x00]),
            Err(CcipError::Decode(_))
        ));
    }

    #[test]
    fn test_commit_roots_match_lane() {
        let on_ramp = address!("0000000000000000000000000000000000000abc");
        let lane = Lane {
            source_chain_selector: SEPOLIA,
            dest_chain_selector: SOLANA_DEVNET,
            on_ramp: on_ramp.into(),
            version: ProtocolVersion::V1_6,
        };
        let padded =
            alloy_primitives::hex::encode_prefixed(ChainAddress::from(on_ramp).to_abi_bytes());
        let root = |source: u64, min: u64| {
            json!({
                "source_chain_selector": source.to_string(),
                "on_ramp_address": padded,
                "min_seq_nr": min,
                "max_seq_nr": min + 9,
                "merkle_root": B256::with_last_byte(min as u8).to_string(),
            })
        };
        let record = json!({
            "blessed_merkle_roots": [root(SEPOLIA, 1)],
            "unblessed_merkle_roots": [root(SOLANA_DEVNET, 1), root(SEPOLIA, 11)],
        });
        let codec = JsonEventCodec::new(ChainFamily::Solana);
        let reports = codec.decode_commits(&log(COMMIT_REPORT_EVENT, record), &lane).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!((reports[1].min_seq_nr, reports[1].max_seq_nr), (11, 20));
    }

    #[test]
    fn test_receipt_state_forms() {
        let codec = JsonEventCodec::new(ChainFamily::Aptos);
        let record = |state: Value| {
            json!({
                "sequence_number": "7",
                "message_id": B256::repeat_byte(7).to_string(),
                "state": state,
            })
        };
        let receipt =
            codec.decode_receipt(&log(EXECUTION_STATE_EVENT, record(json!(2)))).unwrap();
        assert_eq!(receipt.state, ExecutionState::Success);
        let receipt =
            codec.decode_receipt(&log(EXECUTION_STATE_EVENT, record(json!("FAILURE")))).unwrap();
        assert_eq!(receipt.state, ExecutionState::Failed);
        assert!(codec.decode_receipt(&log(EXECUTION_STATE_EVENT, record(json!(9)))).is_err());
    }

    #[test]
    fn test_no_leaf_hashing() {
        let lane = Lane {
            source_chain_selector: SEPOLIA,
            dest_chain_selector: SOLANA_DEVNET,
            on_ramp: address!("0000000000000000000000000000000000000abc").into(),
            version: ProtocolVersion::V1_6,
        };
        assert!(matches!(
            JsonEventCodec::new(ChainFamily::Ton).leaf_hasher(&lane),
            Err(CcipError::Unsupported { family: ChainFamily::Ton, .. })
        ));
    }
}
