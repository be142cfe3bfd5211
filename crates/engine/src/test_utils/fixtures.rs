//! Messages, lanes and EVM events of a Sepolia to Fuji corridor.

use super::TestChain;
use crate::families::evm::{
    abi::{
        v1_6, CCIPMessageSent, CCIPSendRequested, CommitReportAccepted, CommitStoreReport,
        EVM2AnyRampMessage, EVM2EVMMessage, Interval, MerkleRoot, PriceUpdates,
        RampMessageHeader, ReportAccepted,
    },
    encode_extra_args,
};
use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;
use ccip_primitives::{
    CcipMessage, ChainAddress, ChainLog, ExecutionState, ExtraArgs, Lane, MessageHeader,
    ProtocolVersion, TypeAndVersion,
};

/// Selector of Ethereum Sepolia.
pub const SEPOLIA: u64 = 16_015_286_601_757_825_753;

/// Selector of Avalanche Fuji.
pub const FUJI: u64 = 14_767_482_510_784_806_043;

/// Selector of Solana devnet.
pub const SOLANA_DEVNET: u64 = 16_423_721_717_087_811_551;

/// Selector of Solana mainnet.
pub const SOLANA_MAINNET: u64 = 124_615_329_519_749_607;

/// The Sepolia on-ramp of every fixture lane.
pub const ON_RAMP: Address = address!("00000000000000000000000000000000000000a1");

/// The Fuji off-ramp paired with [ON_RAMP].
pub const OFF_RAMP: Address = address!("00000000000000000000000000000000000000b1");

/// The Fuji on-ramp of the reverse lane.
pub const DEST_ON_RAMP: Address = address!("00000000000000000000000000000000000000a2");

/// The Sepolia off-ramp of the reverse lane.
pub const SOURCE_OFF_RAMP: Address = address!("00000000000000000000000000000000000000b2");

/// The Sepolia router.
pub const SOURCE_ROUTER: Address = address!("00000000000000000000000000000000000000c1");

/// The Fuji router.
pub const DEST_ROUTER: Address = address!("00000000000000000000000000000000000000c2");

/// The sender of fixture messages.
pub const SENDER: Address = address!("00000000000000000000000000000000000000d1");

/// The receiver of fixture messages.
pub const RECEIVER: Address = address!("00000000000000000000000000000000000000d2");

/// The fee token of fixture messages.
pub const FEE_TOKEN: Address = address!("00000000000000000000000000000000000000d3");

/// The Sepolia to Fuji lane at `version`.
pub fn lane(version: ProtocolVersion) -> Lane {
    Lane {
        source_chain_selector: SEPOLIA,
        dest_chain_selector: FUJI,
        on_ramp: ON_RAMP.into(),
        version,
    }
}

/// Wires the routers and ramps of both directions of the Sepolia and Fuji corridor, so that
/// [OFF_RAMP] is discovered for [ON_RAMP].
pub fn connect_lane(source: &TestChain, dest: &TestChain) {
    let mut state = source.state();
    state.on_ramp_routers.insert((ON_RAMP.into(), FUJI), SOURCE_ROUTER.into());
    state.router_on_ramps.insert((SOURCE_ROUTER.into(), FUJI), ON_RAMP.into());
    state.router_off_ramps.insert((SOURCE_ROUTER.into(), FUJI), vec![SOURCE_OFF_RAMP.into()]);
    state.off_ramp_sources.insert((SOURCE_OFF_RAMP.into(), FUJI), vec![DEST_ON_RAMP.into()]);
    state.off_ramp_routers.insert((SOURCE_OFF_RAMP.into(), FUJI), SOURCE_ROUTER.into());
    drop(state);

    let mut state = dest.state();
    state.on_ramp_routers.insert((DEST_ON_RAMP.into(), SEPOLIA), DEST_ROUTER.into());
    state.router_on_ramps.insert((DEST_ROUTER.into(), SEPOLIA), DEST_ON_RAMP.into());
    state.router_off_ramps.insert((DEST_ROUTER.into(), SEPOLIA), vec![OFF_RAMP.into()]);
    state.off_ramp_sources.insert((OFF_RAMP.into(), SEPOLIA), vec![ON_RAMP.into()]);
    state.off_ramp_routers.insert((OFF_RAMP.into(), SEPOLIA), DEST_ROUTER.into());
}

/// The id of the fixture message with `sequence_number`.
pub fn message_id(sequence_number: u64) -> B256 {
    keccak256(sequence_number.to_be_bytes())
}

/// A message of `lane`, shaped as the EVM codec decodes a `CCIPMessageSent` event.
pub fn message(lane: &Lane, sequence_number: u64) -> CcipMessage {
    CcipMessage {
        header: MessageHeader {
            message_id: message_id(sequence_number),
            sequence_number,
            nonce: sequence_number,
            source_chain_selector: lane.source_chain_selector,
            dest_chain_selector: Some(lane.dest_chain_selector),
        },
        sender: SENDER.into(),
        receiver: RECEIVER.into(),
        data: Bytes::from(format!("message #{sequence_number}").into_bytes()),
        token_amounts: vec![],
        fee_token: FEE_TOKEN.into(),
        fee_token_amount: U256::from(1_000),
        fee_value_juels: Some(U256::from(2_000)),
        extra_args: ExtraArgs::EvmV2 {
            gas_limit: U256::from(200_000),
            allow_out_of_order_execution: false,
        },
        strict: false,
        source_token_data: vec![],
    }
}

/// A message shaped as the EVM codec decodes a `CCIPSendRequested` event.
pub fn legacy_message(lane: &Lane, sequence_number: u64) -> CcipMessage {
    let mut message = message(lane, sequence_number);
    message.header.dest_chain_selector = None;
    message.fee_value_juels = None;
    message.extra_args = ExtraArgs::EvmV1 { gas_limit: U256::from(200_000) };
    message
}

fn evm(address: &ChainAddress) -> Address {
    address.to_evm().expect("fixture addresses are EVM")
}

fn log_of<E: SolEvent>(event: &E, address: Address, block: u64, log_index: u64) -> ChainLog {
    let data = event.encode_log_data();
    ChainLog {
        address: address.into(),
        topics: data.topics().to_vec(),
        data: data.data,
        ..TestChain::log_at(block, log_index, B256::ZERO)
    }
}

/// The `CCIPMessageSent` log of `message`, emitted by [ON_RAMP].
pub fn send_log(message: &CcipMessage, block: u64, log_index: u64) -> ChainLog {
    let event = CCIPMessageSent {
        destChainSelector: message.header.dest_chain_selector.unwrap_or(FUJI),
        sequenceNumber: message.sequence_number(),
        message: EVM2AnyRampMessage {
            header: RampMessageHeader {
                messageId: message.message_id(),
                sourceChainSelector: message.header.source_chain_selector,
                destChainSelector: message.header.dest_chain_selector.unwrap_or(FUJI),
                sequenceNumber: message.sequence_number(),
                nonce: message.header.nonce,
            },
            sender: evm(&message.sender),
            data: message.data.clone(),
            receiver: message.receiver.to_abi_bytes().into(),
            extraArgs: encode_extra_args(&message.extra_args),
            feeToken: evm(&message.fee_token),
            feeTokenAmount: message.fee_token_amount,
            feeValueJuels: message.fee_value_juels.unwrap_or_default(),
            tokenAmounts: vec![],
        },
    };
    log_of(&event, ON_RAMP, block, log_index)
}

/// The `CCIPSendRequested` log of a [legacy_message], emitted by [ON_RAMP].
pub fn legacy_send_log(message: &CcipMessage, block: u64, log_index: u64) -> ChainLog {
    let event = CCIPSendRequested {
        message: EVM2EVMMessage {
            sourceChainSelector: message.header.source_chain_selector,
            sender: evm(&message.sender),
            receiver: evm(&message.receiver),
            sequenceNumber: message.sequence_number(),
            gasLimit: message.gas_limit(),
            strict: message.strict,
            nonce: message.header.nonce,
            feeToken: evm(&message.fee_token),
            feeTokenAmount: message.fee_token_amount,
            data: message.data.clone(),
            tokenAmounts: vec![],
            sourceTokenData: vec![],
            messageId: message.message_id(),
        },
    };
    log_of(&event, ON_RAMP, block, log_index)
}

/// A `CommitReportAccepted` log of [OFF_RAMP] committing `[min, max]` of `lane`.
pub fn commit_log(
    lane: &Lane,
    min: u64,
    max: u64,
    root: B256,
    block: u64,
    log_index: u64,
) -> ChainLog {
    let event = CommitReportAccepted {
        blessedMerkleRoots: vec![MerkleRoot {
            sourceChainSelector: lane.source_chain_selector,
            onRampAddress: lane.on_ramp.to_abi_bytes().into(),
            minSeqNr: min,
            maxSeqNr: max,
            merkleRoot: root,
        }],
        unblessedMerkleRoots: vec![],
        priceUpdates: PriceUpdates { tokenPriceUpdates: vec![], gasPriceUpdates: vec![] },
    };
    log_of(&event, OFF_RAMP, block, log_index)
}

/// A `ReportAccepted` log of a commit store at `store`, committing `[min, max]`.
pub fn legacy_commit_log(
    store: Address,
    min: u64,
    max: u64,
    root: B256,
    block: u64,
    log_index: u64,
) -> ChainLog {
    let event = ReportAccepted {
        report: CommitStoreReport {
            priceUpdates: PriceUpdates { tokenPriceUpdates: vec![], gasPriceUpdates: vec![] },
            interval: Interval { min, max },
            merkleRoot: root,
        },
    };
    log_of(&event, store, block, log_index)
}

/// An `ExecutionStateChanged` log of [OFF_RAMP] for `message`.
pub fn receipt_log(
    message: &CcipMessage,
    state: ExecutionState,
    block: u64,
    log_index: u64,
) -> ChainLog {
    let event = v1_6::ExecutionStateChanged {
        sourceChainSelector: message.header.source_chain_selector,
        sequenceNumber: message.sequence_number(),
        messageId: message.message_id(),
        messageHash: keccak256(message.message_id()),
        state: state as u8,
        returnData: Bytes::new(),
        gasUsed: U256::from(50_000),
    };
    log_of(&event, OFF_RAMP, block, log_index)
}

/// Deploys [ON_RAMP] on `source` at `version`, serving the Fuji lane.
pub fn deploy_on_ramp(source: &TestChain, version: ProtocolVersion) {
    let contract_type = match version {
        ProtocolVersion::V1_2 | ProtocolVersion::V1_5 => "EVM2EVMOnRamp",
        ProtocolVersion::V1_6 | ProtocolVersion::V2_0 => "OnRamp",
    };
    let mut state = source.state();
    state.type_and_versions.insert(
        ON_RAMP.into(),
        TypeAndVersion { contract_type: contract_type.to_string(), version },
    );
    if version < ProtocolVersion::V1_6 {
        state.on_ramp_dest_selectors.insert(ON_RAMP.into(), FUJI);
    }
}
