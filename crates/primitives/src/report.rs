//! Execution reports submitted to deliver a message manually.

use crate::CcipMessage;
use alloy_primitives::{Bytes, B256, U256};
use serde::Serialize;

/// Merkle inclusion proof fields of an [ExecutionReport].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProofFields {
    /// Sibling hashes, in consumption order.
    pub proofs: Vec<B256>,
    /// One bit per internal node: set when both children are already known, clear when the
    /// next hash of `proofs` is consumed.
    pub proof_flag_bits: U256,
    /// The committed root the proof resolves to.
    pub merkle_root: B256,
}

/// The result of an off-chain verifier attesting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierResult {
    /// The verifier's destination-side contract, in destination encoding.
    pub verifier: String,
    /// The verifier-specific attestation payload.
    pub data: Bytes,
}

/// How an [ExecutionReport] proves that its message was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReportProof {
    /// An inclusion proof against an on-chain commit report.
    Merkle(MerkleProofFields),
    /// Off-chain verifier results.
    Verifiers {
        /// The results, in the order the destination expects them.
        results: Vec<VerifierResult>,
    },
}

/// The artifact submitted to the destination chain to manually deliver a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// The message to deliver.
    pub message: CcipMessage,
    /// Off-chain token data, one entry per token transfer.
    pub offchain_token_data: Vec<Bytes>,
    /// The commitment proof.
    pub proof: ReportProof,
}

impl ExecutionReport {
    /// Returns the merkle proof fields, if this report is proven against a commit report.
    pub const fn merkle(&self) -> Option<&MerkleProofFields> {
        match &self.proof {
            ReportProof::Merkle(fields) => Some(fields),
            ReportProof::Verifiers { .. } => None,
        }
    }
}
