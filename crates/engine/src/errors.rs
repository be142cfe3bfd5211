//! Error types for the `ccip-engine` crate.

use alloy_primitives::B256;
use ccip_merkle::MerkleError;
use ccip_primitives::{ChainFamily, PrimitivesError, ProtocolVersion};
use core::time::Duration;
use thiserror::Error;

/// A top level filter for [CcipError] that sorts by how callers should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller error or family mismatch. Never retried.
    Configuration,
    /// The data is not available yet. Safe to retry or poll.
    Transient,
    /// The data contradicts itself or a commitment. Aborts the pipeline, never retried.
    Integrity,
    /// The requested path does not exist.
    Topology,
    /// An optional dependency is down or disabled.
    Unavailable,
}

/// An error encountered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CcipError {
    /// A chain or address of one family was handed to code expecting another.
    #[error("Chain family mismatch: expected {expected}, got {actual}")]
    FamilyMismatch {
        /// The family the operation works on.
        expected: ChainFamily,
        /// The family that was supplied.
        actual: ChainFamily,
    },
    /// An argument was invalid or missing.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The log filter is inconsistent.
    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(&'static str),
    /// A primitive value failed to parse.
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
    /// The transaction is not (yet) known to the chain.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    /// No commit report covering the sequence number was found in the scanned window.
    #[error("Commit report not found for sequence number {sequence_number} since {since}")]
    CommitNotFound {
        /// The scan start point.
        since: String,
        /// The sequence number looked for.
        sequence_number: u64,
    },
    /// Not every message of a committed batch could be retrieved.
    #[error("Batch incomplete: {found} of {expected} messages in [{min_seq_nr}, {max_seq_nr}]")]
    BatchIncomplete {
        /// The number of messages found.
        found: usize,
        /// The number of messages in the range.
        expected: usize,
        /// Lower bound of the batch.
        min_seq_nr: u64,
        /// Upper bound of the batch.
        max_seq_nr: u64,
    },
    /// An off-chain attestation has not been issued yet.
    #[error("Attestation pending for message hash {0}")]
    AttestationPending(B256),
    /// The attestation service failed to answer.
    #[error("Attestation service error for message hash {message_hash}: {reason}")]
    AttestationService {
        /// The hash of the attested message.
        message_hash: B256,
        /// The HTTP status, unset when the request did not complete.
        status: Option<u16>,
        /// The failure.
        reason: String,
    },
    /// A chain call failed.
    #[error("RPC error on {chain}: {message}")]
    Rpc {
        /// The network name.
        chain: String,
        /// The underlying failure.
        message: String,
    },
    /// The recomputed batch root disagrees with the committed one.
    #[error("Merkle root mismatch: expected {expected}, computed {computed}")]
    MerkleRootMismatch {
        /// The committed root.
        expected: B256,
        /// The root recomputed from the batch.
        computed: B256,
    },
    /// The target message is not part of the batch.
    #[error("Message {message_id} not in batch [{min_seq_nr}, {max_seq_nr}]")]
    MessageNotInBatch {
        /// The message looked for.
        message_id: B256,
        /// Lowest sequence number of the batch.
        min_seq_nr: u64,
        /// Highest sequence number of the batch.
        max_seq_nr: u64,
    },
    /// Bytes or a record could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Merkle tree construction or proof failure.
    #[error("Merkle error: {0}")]
    Merkle(#[from] MerkleError),
    /// No destination off-ramp authorizes the on-ramp.
    #[error("Off-ramp not found for on-ramp {on_ramp} on {dest}")]
    OffRampNotFound {
        /// The source on-ramp.
        on_ramp: String,
        /// The destination network name.
        dest: String,
    },
    /// The token is not registered on the lane.
    #[error("Token not registered: {0}")]
    TokenNotRegistered(String),
    /// No connected chain serves the selector.
    #[error("No chain connected for selector {0}")]
    ChainNotFound(u64),
    /// The transaction does not carry the message.
    #[error("Message {message_id} not found in transaction {tx_hash}")]
    MessageNotInTx {
        /// The message looked for.
        message_id: B256,
        /// The transaction scanned.
        tx_hash: String,
    },
    /// The transaction carries no message at all.
    #[error("No CCIP messages found in transaction {0}")]
    NoMessagesInTx(String),
    /// The family does not implement the capability.
    #[error("{what} is not supported for {family}")]
    Unsupported {
        /// The family lacking the capability.
        family: ChainFamily,
        /// The capability.
        what: &'static str,
    },
    /// No verified commitment exists for the message.
    #[error("No on-chain commitment found for message {message_id}: {cause}")]
    CommitmentRequired {
        /// The message being executed.
        message_id: B256,
        /// Why the commitment could not be found.
        cause: Box<CcipError>,
    },
    /// The off-chain index is disabled.
    #[error("Index not available")]
    IndexUnavailable,
    /// The protocol version can only be executed with off-chain index data.
    #[error("Index data required to execute message {message_id} on {version} lanes")]
    IndexRequired {
        /// The message being executed.
        message_id: B256,
        /// The lane version.
        version: ProtocolVersion,
    },
    /// The off-chain index failed.
    #[error("Index error: {0}")]
    Index(IndexError),
}

impl From<IndexError> for CcipError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Disabled => Self::IndexUnavailable,
            err => Self::Index(err),
        }
    }
}

impl CcipError {
    /// Returns the [ErrorKind] of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FamilyMismatch { .. }
            | Self::InvalidArgument(_)
            | Self::InvalidLogFilter(_)
            | Self::Primitives(_)
            | Self::Unsupported { .. } => ErrorKind::Configuration,
            Self::TransactionNotFound(_)
            | Self::CommitNotFound { .. }
            | Self::BatchIncomplete { .. }
            | Self::AttestationPending(_)
            | Self::Rpc { .. } => ErrorKind::Transient,
            Self::AttestationService { status: None, .. } => ErrorKind::Transient,
            Self::AttestationService { status: Some(status), .. }
                if *status == 429 || *status >= 500 =>
            {
                ErrorKind::Transient
            }
            Self::AttestationService { .. } => ErrorKind::Unavailable,
            Self::MerkleRootMismatch { .. }
            | Self::MessageNotInBatch { .. }
            | Self::Decode(_)
            | Self::Merkle(_)
            | Self::CommitmentRequired { .. } => ErrorKind::Integrity,
            Self::OffRampNotFound { .. }
            | Self::TokenNotRegistered(_)
            | Self::ChainNotFound(_)
            | Self::MessageNotInTx { .. }
            | Self::NoMessagesInTx(_) => ErrorKind::Topology,
            Self::IndexUnavailable | Self::IndexRequired { .. } => ErrorKind::Unavailable,
            Self::Index(err) if err.is_transient() => ErrorKind::Transient,
            Self::Index(_) => ErrorKind::Unavailable,
        }
    }

    /// Returns true if retrying the failed operation may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient)
    }

    /// Returns the delay the remote side asked for before the next attempt, if any.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Index(err) => err.retry_after(),
            _ => None,
        }
    }

    /// Wraps a chain-call failure.
    pub fn rpc(chain: impl Into<String>, message: impl ToString) -> Self {
        Self::Rpc { chain: chain.into(), message: message.to_string() }
    }
}

/// A [Result] alias for the [CcipError] type.
pub type CcipResult<T> = core::result::Result<T, CcipError>;

/// An error returned by an off-chain index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The index was disabled by the caller.
    #[error("Index disabled")]
    Disabled,
    /// The index has no record for the key.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The index answered with an error status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The response body or reason.
        message: String,
        /// The parsed `Retry-After` hint.
        retry_after: Option<Duration>,
    },
    /// The request did not complete.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The response could not be parsed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl IndexError {
    /// Returns true for rate limiting, server-side failures and transport errors.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
            _ => false,
        }
    }

    /// Returns the `Retry-After` hint of the response, if any.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// A [Result] alias for the [IndexError] type.
pub type IndexResult<T> = core::result::Result<T, IndexError>;
