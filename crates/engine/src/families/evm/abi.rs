//! Solidity bindings of the CCIP events and structs the EVM codec reads and hashes.

#![allow(missing_docs, unreachable_pub)]

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct EVMTokenAmount {
        address token;
        uint256 amount;
    }

    /// v1.2 / v1.5 message, as emitted by `EVM2EVMOnRamp`.
    #[derive(Debug, PartialEq, Eq)]
    struct EVM2EVMMessage {
        uint64 sourceChainSelector;
        address sender;
        address receiver;
        uint64 sequenceNumber;
        uint256 gasLimit;
        bool strict;
        uint64 nonce;
        address feeToken;
        uint256 feeTokenAmount;
        bytes data;
        EVMTokenAmount[] tokenAmounts;
        bytes[] sourceTokenData;
        bytes32 messageId;
    }

    /// v1.5 per-token pool data carried in `sourceTokenData`.
    #[derive(Debug, PartialEq, Eq)]
    struct SourceTokenData {
        bytes sourcePoolAddress;
        bytes destTokenAddress;
        bytes extraData;
        uint32 destGasAmount;
    }

    #[derive(Debug, PartialEq, Eq)]
    event CCIPSendRequested(EVM2EVMMessage message);

    #[derive(Debug, PartialEq, Eq)]
    struct RampMessageHeader {
        bytes32 messageId;
        uint64 sourceChainSelector;
        uint64 destChainSelector;
        uint64 sequenceNumber;
        uint64 nonce;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct EVM2AnyTokenTransfer {
        address sourcePoolAddress;
        bytes destTokenAddress;
        bytes extraData;
        uint256 amount;
        bytes destExecData;
    }

    /// v1.6 message, as emitted by `OnRamp`.
    #[derive(Debug, PartialEq, Eq)]
    struct EVM2AnyRampMessage {
        RampMessageHeader header;
        address sender;
        bytes data;
        bytes receiver;
        bytes extraArgs;
        address feeToken;
        uint256 feeTokenAmount;
        uint256 feeValueJuels;
        EVM2AnyTokenTransfer[] tokenAmounts;
    }

    #[derive(Debug, PartialEq, Eq)]
    event CCIPMessageSent(
        uint64 indexed destChainSelector,
        uint64 indexed sequenceNumber,
        EVM2AnyRampMessage message
    );

    /// v1.6 token transfer, as hashed by `OffRamp`.
    #[derive(Debug, PartialEq, Eq)]
    struct Any2EVMTokenTransfer {
        bytes sourcePoolAddress;
        address destTokenAddress;
        uint32 destGasAmount;
        bytes extraData;
        uint256 amount;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Interval {
        uint64 min;
        uint64 max;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct TokenPriceUpdate {
        address sourceToken;
        uint224 usdPerToken;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct GasPriceUpdate {
        uint64 destChainSelector;
        uint224 usdPerUnitGas;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct PriceUpdates {
        TokenPriceUpdate[] tokenPriceUpdates;
        GasPriceUpdate[] gasPriceUpdates;
    }

    /// v1.2 / v1.5 `CommitStore` report.
    #[derive(Debug, PartialEq, Eq)]
    struct CommitStoreReport {
        PriceUpdates priceUpdates;
        Interval interval;
        bytes32 merkleRoot;
    }

    #[derive(Debug, PartialEq, Eq)]
    event ReportAccepted(CommitStoreReport report);

    #[derive(Debug, PartialEq, Eq)]
    struct MerkleRoot {
        uint64 sourceChainSelector;
        bytes onRampAddress;
        uint64 minSeqNr;
        uint64 maxSeqNr;
        bytes32 merkleRoot;
    }

    #[derive(Debug, PartialEq, Eq)]
    event CommitReportAccepted(
        MerkleRoot[] blessedMerkleRoots,
        MerkleRoot[] unblessedMerkleRoots,
        PriceUpdates priceUpdates
    );

    #[derive(Debug, PartialEq, Eq)]
    struct EVMExtraArgsV1 {
        uint256 gasLimit;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct EVMExtraArgsV2 {
        uint256 gasLimit;
        bool allowOutOfOrderExecution;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SVMExtraArgsV1 {
        uint32 computeUnits;
        uint64 accountIsWritableBitmap;
        bool allowOutOfOrderExecution;
        bytes32 tokenReceiver;
        bytes32[] accounts;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SuiExtraArgsV1 {
        uint256 gasLimit;
        bool allowOutOfOrderExecution;
        bytes32 tokenReceiver;
        bytes32[] receiverObjectIds;
    }
}

/// `EVM2EVMOffRamp` (v1.2 / v1.5) events.
pub mod v1_5 {
    use alloy_sol_types::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        event ExecutionStateChanged(
            uint64 indexed sequenceNumber,
            bytes32 indexed messageId,
            uint8 state,
            bytes returnData
        );
    }
}

/// `OffRamp` (v1.6) events.
pub mod v1_6 {
    use alloy_sol_types::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        event ExecutionStateChanged(
            uint64 indexed sourceChainSelector,
            uint64 indexed sequenceNumber,
            bytes32 indexed messageId,
            bytes32 messageHash,
            uint8 state,
            bytes returnData,
            uint256 gasUsed
        );
    }
}
