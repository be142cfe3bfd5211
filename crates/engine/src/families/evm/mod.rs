//! The EVM family codec.

use crate::{
    codec::decode_token_gas, families::FamilyCodec, traits::LeafHasher, CcipError, CcipResult,
};
use alloy_primitives::{Bytes, B256};
use alloy_sol_types::{SolEvent, SolType};
use ccip_primitives::{
    CcipMessage, ChainAddress, ChainFamily, ChainLog, CommitReport, ExecutionReceipt,
    ExecutionState, ExtraArgs, Lane, MessageHeader, NetworkInfo, ProtocolVersion, TokenTransfer,
};
use std::sync::Arc;

pub mod abi;
use abi::{
    v1_5, v1_6, CCIPMessageSent, CCIPSendRequested, CommitReportAccepted, EVM2AnyRampMessage,
    EVM2EVMMessage, ReportAccepted, SourceTokenData,
};

mod extra_args;
pub use extra_args::{decode_extra_args, encode_extra_args};

mod hasher;
pub use hasher::{Any2EvmLeafHasher, Evm2EvmLeafHasher};

fn abi_error(what: &'static str) -> impl Fn(alloy_sol_types::Error) -> CcipError {
    move |err| CcipError::Decode(format!("{what}: {err}"))
}

fn unexpected_topic(what: &str, log: &ChainLog) -> CcipError {
    CcipError::Decode(format!(
        "log {} of {} is not a {what} event",
        log.log_index, log.transaction_hash
    ))
}

fn decode_event<E: SolEvent>(log: &ChainLog) -> CcipResult<E> {
    E::decode_raw_log(log.topics.iter().copied(), log.data.as_ref(), true)
        .map_err(abi_error(E::SIGNATURE))
}

/// Codec of EVM logs and ABI payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvmCodec;

impl EvmCodec {
    fn from_evm2evm(message: EVM2EVMMessage) -> CcipMessage {
        let token_amounts = message
            .tokenAmounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                let pool = message
                    .sourceTokenData
                    .get(i)
                    .and_then(|raw| <SourceTokenData as SolType>::abi_decode(raw, true).ok());
                let evm_address =
                    |raw: &Bytes| ChainAddress::from_bytes(ChainFamily::Evm, raw).ok();
                TokenTransfer {
                    token: Some(amount.token.into()),
                    source_pool_address: pool
                        .as_ref()
                        .and_then(|p| evm_address(&p.sourcePoolAddress)),
                    dest_token_address: pool
                        .as_ref()
                        .and_then(|p| evm_address(&p.destTokenAddress)),
                    amount: amount.amount,
                    extra_data: pool.as_ref().map(|p| p.extraData.clone()).unwrap_or_default(),
                    dest_gas_amount: pool.as_ref().map(|p| p.destGasAmount),
                    dest_exec_data: Bytes::new(),
                }
            })
            .collect();
        // Messages without a nonce were sent out of order.
        let extra_args = if message.nonce == 0 {
            ExtraArgs::EvmV2 { gas_limit: message.gasLimit, allow_out_of_order_execution: true }
        } else {
            ExtraArgs::EvmV1 { gas_limit: message.gasLimit }
        };
        CcipMessage {
            header: MessageHeader {
                message_id: message.messageId,
                sequence_number: message.sequenceNumber,
                nonce: message.nonce,
                source_chain_selector: message.sourceChainSelector,
                dest_chain_selector: None,
            },
            sender: message.sender.into(),
            receiver: message.receiver.into(),
            data: message.data,
            token_amounts,
            fee_token: message.feeToken.into(),
            fee_token_amount: message.feeTokenAmount,
            fee_value_juels: None,
            extra_args,
            strict: message.strict,
            source_token_data: message.sourceTokenData,
        }
    }

    fn from_evm2any(message: EVM2AnyRampMessage) -> CcipResult<CcipMessage> {
        let dest = NetworkInfo::by_selector(message.header.destChainSelector)?.family;
        let token_amounts = message
            .tokenAmounts
            .into_iter()
            .map(|transfer| -> CcipResult<TokenTransfer> {
                Ok(TokenTransfer {
                    token: None,
                    source_pool_address: Some(transfer.sourcePoolAddress.into()),
                    dest_token_address: Some(ChainAddress::from_bytes(
                        dest,
                        &transfer.destTokenAddress,
                    )?),
                    amount: transfer.amount,
                    extra_data: transfer.extraData,
                    dest_gas_amount: decode_token_gas(
                        &transfer.destExecData,
                        ChainFamily::Evm.token_gas_endianness(),
                    ),
                    dest_exec_data: transfer.destExecData,
                })
            })
            .collect::<CcipResult<Vec<_>>>()?;
        Ok(CcipMessage {
            header: MessageHeader {
                message_id: message.header.messageId,
                sequence_number: message.header.sequenceNumber,
                nonce: message.header.nonce,
                source_chain_selector: message.header.sourceChainSelector,
                dest_chain_selector: Some(message.header.destChainSelector),
            },
            sender: message.sender.into(),
            receiver: ChainAddress::from_bytes(dest, &message.receiver)?,
            data: message.data,
            token_amounts,
            fee_token: message.feeToken.into(),
            fee_token_amount: message.feeTokenAmount,
            fee_value_juels: Some(message.feeValueJuels),
            extra_args: decode_extra_args(&message.extraArgs)?,
            strict: false,
            source_token_data: vec![],
        })
    }

    fn commit_root(root: &abi::MerkleRoot, lane: &Lane) -> Option<CommitReport> {
        if root.sourceChainSelector != lane.source_chain_selector {
            return None;
        }
        let on_ramp = ChainAddress::from_bytes(lane.on_ramp.family(), &root.onRampAddress).ok()?;
        (on_ramp == lane.on_ramp).then(|| CommitReport {
            source_chain_selector: root.sourceChainSelector,
            on_ramp_address: on_ramp,
            min_seq_nr: root.minSeqNr,
            max_seq_nr: root.maxSeqNr,
            merkle_root: root.merkleRoot,
        })
    }
}

impl FamilyCodec for EvmCodec {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn message_topics(&self) -> Vec<B256> {
        vec![CCIPSendRequested::SIGNATURE_HASH, CCIPMessageSent::SIGNATURE_HASH]
    }

    fn commit_topics(&self) -> Vec<B256> {
        vec![ReportAccepted::SIGNATURE_HASH, CommitReportAccepted::SIGNATURE_HASH]
    }

    fn receipt_topics(&self) -> Vec<B256> {
        vec![
            v1_5::ExecutionStateChanged::SIGNATURE_HASH,
            v1_6::ExecutionStateChanged::SIGNATURE_HASH,
        ]
    }

    fn decode_message(&self, log: &ChainLog) -> CcipResult<CcipMessage> {
        match log.topic0() {
            Some(topic) if topic == CCIPSendRequested::SIGNATURE_HASH => {
                Ok(Self::from_evm2evm(decode_event::<CCIPSendRequested>(log)?.message))
            }
            Some(topic) if topic == CCIPMessageSent::SIGNATURE_HASH => {
                Self::from_evm2any(decode_event::<CCIPMessageSent>(log)?.message)
            }
            _ => Err(unexpected_topic("send", log)),
        }
    }

    fn decode_message_bytes(&self, data: &[u8]) -> CcipResult<CcipMessage> {
        if let Ok(message) = <EVM2EVMMessage as SolType>::abi_decode(data, true) {
            return Ok(Self::from_evm2evm(message));
        }
        let message = <EVM2AnyRampMessage as SolType>::abi_decode(data, true)
            .map_err(abi_error("EVM2AnyRampMessage"))?;
        Self::from_evm2any(message)
    }

    fn decode_commits(&self, log: &ChainLog, lane: &Lane) -> CcipResult<Vec<CommitReport>> {
        match log.topic0() {
            Some(topic) if topic == ReportAccepted::SIGNATURE_HASH => {
                let report = decode_event::<ReportAccepted>(log)?.report;
                Ok(vec![CommitReport {
                    source_chain_selector: lane.source_chain_selector,
                    on_ramp_address: lane.on_ramp.clone(),
                    min_seq_nr: report.interval.min,
                    max_seq_nr: report.interval.max,
                    merkle_root: report.merkleRoot,
                }])
            }
            Some(topic) if topic == CommitReportAccepted::SIGNATURE_HASH => {
                let event = decode_event::<CommitReportAccepted>(log)?;
                Ok(event
                    .blessedMerkleRoots
                    .iter()
                    .chain(event.unblessedMerkleRoots.iter())
                    .filter_map(|root| Self::commit_root(root, lane))
                    .collect())
            }
            _ => Err(unexpected_topic("commit", log)),
        }
    }

    fn decode_receipt(&self, log: &ChainLog) -> CcipResult<ExecutionReceipt> {
        let state = |raw: u8| {
            ExecutionState::try_from(raw)
                .map_err(|raw| CcipError::Decode(format!("unknown execution state {raw}")))
        };
        match log.topic0() {
            Some(topic) if topic == v1_5::ExecutionStateChanged::SIGNATURE_HASH => {
                let event = decode_event::<v1_5::ExecutionStateChanged>(log)?;
                Ok(ExecutionReceipt {
                    source_chain_selector: None,
                    sequence_number: event.sequenceNumber,
                    message_id: event.messageId,
                    message_hash: None,
                    state: state(event.state)?,
                    return_data: event.returnData,
                    gas_used: None,
                })
            }
            Some(topic) if topic == v1_6::ExecutionStateChanged::SIGNATURE_HASH => {
                let event = decode_event::<v1_6::ExecutionStateChanged>(log)?;
                Ok(ExecutionReceipt {
                    source_chain_selector: Some(event.sourceChainSelector),
                    sequence_number: event.sequenceNumber,
                    message_id: event.messageId,
                    message_hash: Some(event.messageHash),
                    state: state(event.state)?,
                    return_data: event.returnData,
                    gas_used: Some(event.gasUsed),
                })
            }
            _ => Err(unexpected_topic("execution", log)),
        }
    }

    fn decode_extra_args(&self, data: &[u8]) -> CcipResult<ExtraArgs> {
        decode_extra_args(data)
    }

    fn encode_extra_args(&self, args: &ExtraArgs) -> CcipResult<Bytes> {
        Ok(encode_extra_args(args))
    }

    fn leaf_hasher(&self, lane: &Lane) -> CcipResult<Arc<dyn LeafHasher>> {
        match lane.version {
            ProtocolVersion::V1_2 | ProtocolVersion::V1_5 => {
                Ok(Arc::new(Evm2EvmLeafHasher::new(lane)?))
            }
            ProtocolVersion::V1_6 => Ok(Arc::new(Any2EvmLeafHasher::new(lane))),
            ProtocolVersion::V2_0 => Err(CcipError::Unsupported {
                family: ChainFamily::Evm,
                what: "merkle leaves of verifier-attested lanes",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::{
        EVM2AnyTokenTransfer, EVMTokenAmount, Interval, MerkleRoot, PriceUpdates,
        RampMessageHeader,
    };
    use alloy_primitives::{address, b256, U256};
    use alloy_sol_types::SolValue;

    const SEPOLIA: u64 = 16_015_286_601_757_825_753;
    const FUJI: u64 = 14_767_482_510_784_806_043;
    const SOLANA_DEVNET: u64 = 16_423_721_717_087_811_551;

    fn log_of<E: SolEvent>(event: &E) -> ChainLog {
        let log = event.encode_log_data();
        ChainLog {
            address: address!("0000000000000000000000000000000000000001").into(),
            topics: log.topics().to_vec(),
            data: log.data,
            block_number: 10,
            transaction_hash: "0x01".to_string(),
            log_index: 0,
        }
    }

    fn v1_6_message(dest: u64, receiver: Bytes) -> EVM2AnyRampMessage {
        EVM2AnyRampMessage {
            header: RampMessageHeader {
                messageId: B256::repeat_byte(0x42),
                sourceChainSelector: SEPOLIA,
                destChainSelector: dest,
                sequenceNumber: 9,
                nonce: 0,
            },
            sender: address!("00000000000000000000000000000000000000aa"),
            data: Bytes::from_static(b"payload"),
            receiver,
            extraArgs: encode_extra_args(&ExtraArgs::EvmV2 {
                gas_limit: U256::from(300_000),
                allow_out_of_order_execution: true,
            }),
            feeToken: address!("00000000000000000000000000000000000000cc"),
            feeTokenAmount: U256::from(10),
            feeValueJuels: U256::from(20),
            tokenAmounts: vec![EVM2AnyTokenTransfer {
                sourcePoolAddress: address!("00000000000000000000000000000000000000dd"),
                destTokenAddress: Bytes::from(vec![0xee; 32]),
                extraData: Bytes::new(),
                amount: U256::from(7),
                destExecData: U256::from(90_000).to_be_bytes::<32>().into(),
            }],
        }
    }

    #[test]
    fn test_decode_v1_6_send_event() {
        let receiver = Bytes::from(vec![0x11; 32]);
        let event = CCIPMessageSent {
            destChainSelector: SOLANA_DEVNET,
            sequenceNumber: 9,
            message: v1_6_message(SOLANA_DEVNET, receiver),
        };
        let message = EvmCodec.decode_message(&log_of(&event)).unwrap();
        assert_eq!(message.message_id(), B256::repeat_byte(0x42));
        assert_eq!(message.sequence_number(), 9);
        assert_eq!(message.receiver.family(), ChainFamily::Solana);
        assert_eq!(message.gas_limit(), U256::from(300_000));
        assert!(message.extra_args.allow_out_of_order_execution());
        assert_eq!(message.fee_value_juels, Some(U256::from(20)));
        let transfer = &message.token_amounts[0];
        assert_eq!(transfer.dest_gas_amount, Some(90_000));
        assert_eq!(transfer.dest_token_address.as_ref().unwrap().family(), ChainFamily::Solana);
    }

    #[test]
    fn test_decode_v1_5_message_bytes() {
        let source_token_data = SourceTokenData {
            sourcePoolAddress: address!("00000000000000000000000000000000000000dd")
                .abi_encode()
                .into(),
            destTokenAddress: address!("00000000000000000000000000000000000000ee")
                .abi_encode()
                .into(),
            extraData: Bytes::new(),
            destGasAmount: 50_000,
        };
        let message = EVM2EVMMessage {
            sourceChainSelector: SEPOLIA,
            sender: address!("00000000000000000000000000000000000000aa"),
            receiver: address!("00000000000000000000000000000000000000bb"),
            sequenceNumber: 3,
            gasLimit: U256::from(100_000),
            strict: false,
            nonce: 2,
            feeToken: address!("00000000000000000000000000000000000000cc"),
            feeTokenAmount: U256::from(1),
            data: Bytes::new(),
            tokenAmounts: vec![EVMTokenAmount {
                token: address!("00000000000000000000000000000000000000ff"),
                amount: U256::from(5),
            }],
            sourceTokenData: vec![source_token_data.abi_encode().into()],
            messageId: B256::repeat_byte(0x01),
        };
        let decoded = EvmCodec.decode_message_bytes(&message.abi_encode()).unwrap();
        assert_eq!(decoded.extra_args, ExtraArgs::EvmV1 { gas_limit: U256::from(100_000) });
        assert_eq!(decoded.header.dest_chain_selector, None);
        assert_eq!(decoded.token_amounts[0].dest_gas_amount, Some(50_000));
        assert_eq!(
            decoded.token_amounts[0].dest_token_address,
            Some(address!("00000000000000000000000000000000000000ee").into())
        );
        assert_eq!(decoded.source_token_data.len(), 1);
    }

    #[test]
    fn test_unknown_destination_is_rejected() {
        let message = v1_6_message(42, Bytes::from(vec![0x11; 20]));
        assert!(matches!(
            EvmCodec.decode_message_bytes(&message.abi_encode()),
            Err(CcipError::Primitives(_))
        ));
    }

    #[test]
    fn test_commit_roots_are_filtered_by_lane() {
        let on_ramp = address!("0000000000000000000000000000000000000abc");
        let lane = Lane {
            source_chain_selector: SEPOLIA,
            dest_chain_selector: FUJI,
            on_ramp: on_ramp.into(),
            version: ProtocolVersion::V1_6,
        };
        let root = |source: u64, min: u64| MerkleRoot {
            sourceChainSelector: source,
            onRampAddress: on_ramp.abi_encode().into(),
            minSeqNr: min,
            maxSeqNr: min + 4,
            merkleRoot: B256::with_last_byte(min as u8),
        };
        let event = CommitReportAccepted {
            blessedMerkleRoots: vec![root(SEPOLIA, 1), root(FUJI, 1)],
            unblessedMerkleRoots: vec![root(SEPOLIA, 6)],
            priceUpdates: PriceUpdates { tokenPriceUpdates: vec![], gasPriceUpdates: vec![] },
        };
        let reports = EvmCodec.decode_commits(&log_of(&event), &lane).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!((reports[0].min_seq_nr, reports[0].max_seq_nr), (1, 5));
        assert_eq!(reports[1].merkle_root, B256::with_last_byte(6));
    }

    #[test]
    fn test_v1_5_commit_uses_lane() {
        let lane = Lane {
            source_chain_selector: SEPOLIA,
            dest_chain_selector: FUJI,
            on_ramp: address!("0000000000000000000000000000000000000abc").into(),
            version: ProtocolVersion::V1_5,
        };
        let event = ReportAccepted {
            report: abi::CommitStoreReport {
                priceUpdates: PriceUpdates { tokenPriceUpdates: vec![], gasPriceUpdates: vec![] },
                interval: Interval { min: 11, max: 20 },
                merkleRoot: b256!(
                    "00000000000000000000000000000000000000000000000000000000000000aa"
                ),
            },
        };
        let reports = EvmCodec.decode_commits(&log_of(&event), &lane).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains(15));
        assert_eq!(reports[0].on_ramp_address, lane.on_ramp);
    }

    #[test]
    fn test_decode_receipts() {
        let legacy = v1_5::ExecutionStateChanged {
            sequenceNumber: 4,
            messageId: B256::repeat_byte(4),
            state: 2,
            returnData: Bytes::new(),
        };
        let receipt = EvmCodec.decode_receipt(&log_of(&legacy)).unwrap();
        assert_eq!(receipt.state, ExecutionState::Success);
        assert_eq!(receipt.gas_used, None);

        let current = v1_6::ExecutionStateChanged {
            sourceChainSelector: SEPOLIA,
            sequenceNumber: 4,
            messageId: B256::repeat_byte(4),
            messageHash: B256::repeat_byte(5),
            state: 3,
            returnData: Bytes::from_static(b"revert"),
            gasUsed: U256::from(21_000),
        };
        let receipt = EvmCodec.decode_receipt(&log_of(&current)).unwrap();
        assert_eq!(receipt.state, ExecutionState::Failed);
        assert_eq!(receipt.source_chain_selector, Some(SEPOLIA));
        assert_eq!(receipt.gas_used, Some(U256::from(21_000)));

        let bad = v1_5::ExecutionStateChanged { state: 9, ..legacy };
        assert!(matches!(EvmCodec.decode_receipt(&log_of(&bad)), Err(CcipError::Decode(_))));
    }

    #[test]
    fn test_wrong_topic() {
        let event = v1_5::ExecutionStateChanged {
            sequenceNumber: 1,
            messageId: B256::ZERO,
            state: 0,
            returnData: Bytes::new(),
        };
        assert!(matches!(EvmCodec.decode_message(&log_of(&event)), Err(CcipError::Decode(_))));
    }

    #[test]
    fn test_leaf_hasher_by_version() {
        let mut lane = Lane {
            source_chain_selector: SEPOLIA,
            dest_chain_selector: FUJI,
            on_ramp: address!("0000000000000000000000000000000000000abc").into(),
            version: ProtocolVersion::V2_0,
        };
        assert!(matches!(EvmCodec.leaf_hasher(&lane), Err(CcipError::Unsupported { .. })));
        lane.version = ProtocolVersion::V1_6;
        assert!(EvmCodec.leaf_hasher(&lane).is_ok());
    }
}
