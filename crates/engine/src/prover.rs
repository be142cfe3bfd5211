//! The merkle batch prover.
//!
//! Proves that one message belongs to a committed batch. The batch must be complete and in
//! sequence number order, since that is the order in which the leaves were committed.

use crate::{traits::LeafHasher, CcipError, CcipResult};
use alloy_primitives::B256;
use ccip_merkle::{merkle_root, MerkleTree};
use ccip_primitives::{CcipMessage, MerkleProofFields};
use tracing::trace;

/// Computes the inclusion proof of `message_id` in the batch `messages`.
///
/// When `expected_root` is given, the recomputed root must match it; a mismatch means the batch
/// or the commitment is wrong and is never worth retrying.
pub fn compute_proof(
    hasher: &dyn LeafHasher,
    messages: &[CcipMessage],
    message_id: B256,
    expected_root: Option<B256>,
) -> CcipResult<MerkleProofFields> {
    let index = messages
        .iter()
        .position(|message| message.message_id() == message_id)
        .ok_or_else(|| CcipError::MessageNotInBatch {
            message_id,
            min_seq_nr: messages.first().map(CcipMessage::sequence_number).unwrap_or_default(),
            max_seq_nr: messages.last().map(CcipMessage::sequence_number).unwrap_or_default(),
        })?;

    let leaves =
        messages.iter().map(|message| hasher.hash_leaf(message)).collect::<CcipResult<Vec<_>>>()?;
    let tree = MerkleTree::new(leaves)?;
    let root = tree.root();
    if let Some(expected) = expected_root {
        if expected != root {
            return Err(CcipError::MerkleRootMismatch { expected, computed: root });
        }
    }

    let proof = tree.prove(&[index])?;
    trace!(
        target: "prover",
        "Proved leaf {index} of {} with {} hashes",
        messages.len(),
        proof.hashes.len()
    );
    Ok(MerkleProofFields {
        proof_flag_bits: proof.flag_bits()?,
        proofs: proof.hashes,
        merkle_root: root,
    })
}

/// Recomputes the root from `leaf` and `proof` the way the destination verifier does, returning
/// true if it equals `proof.merkle_root`.
pub fn verify_proof(leaf: B256, proof: &MerkleProofFields) -> CcipResult<bool> {
    Ok(merkle_root(&[leaf], &proof.proofs, proof.proof_flag_bits)? == proof.merkle_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        families::evm::Any2EvmLeafHasher,
        test_utils::fixtures::{lane, message},
    };
    use alloy_primitives::U256;
    use ccip_merkle::hash_pair;
    use ccip_primitives::ProtocolVersion;
    use proptest::prelude::*;

    fn batch(min: u64, max: u64) -> (Any2EvmLeafHasher, Vec<CcipMessage>) {
        let lane = lane(ProtocolVersion::V1_6);
        (Any2EvmLeafHasher::new(&lane), (min..=max).map(|seq| message(&lane, seq)).collect())
    }

    #[test]
    fn test_single_message_batch() {
        let (hasher, messages) = batch(4, 4);
        let proof = compute_proof(&hasher, &messages, messages[0].message_id(), None).unwrap();
        assert!(proof.proofs.is_empty());
        assert_eq!(proof.proof_flag_bits, U256::ZERO);
        assert_eq!(proof.merkle_root, hasher.hash_leaf(&messages[0]).unwrap());
    }

    #[test]
    fn test_two_message_batch() {
        let (hasher, messages) = batch(1, 2);
        let first = hasher.hash_leaf(&messages[0]).unwrap();
        let second = hasher.hash_leaf(&messages[1]).unwrap();
        let root = hash_pair(first, second);

        let proof =
            compute_proof(&hasher, &messages, messages[1].message_id(), Some(root)).unwrap();
        assert_eq!(proof.proofs, vec![first]);
        assert_eq!(proof.merkle_root, root);
        assert!(verify_proof(second, &proof).unwrap());
        assert!(!verify_proof(first, &proof).unwrap());
    }

    #[test]
    fn test_root_mismatch_is_fatal() {
        let (hasher, messages) = batch(1, 3);
        let err = compute_proof(&hasher, &messages, messages[0].message_id(), Some(B256::ZERO))
            .unwrap_err();
        assert!(matches!(
            err,
            CcipError::MerkleRootMismatch { expected, .. } if expected == B256::ZERO
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Integrity);
    }

    #[test]
    fn test_missing_message_reports_bounds() {
        let (hasher, messages) = batch(5, 9);
        let err = compute_proof(&hasher, &messages, B256::repeat_byte(0xff), None).unwrap_err();
        assert_eq!(
            err,
            CcipError::MessageNotInBatch {
                message_id: B256::repeat_byte(0xff),
                min_seq_nr: 5,
                max_seq_nr: 9,
            }
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_proof_round_trip(size in 1u64..40, pick in any::<prop::sample::Index>()) {
            let (hasher, messages) = batch(1, size);
            let target = &messages[pick.index(messages.len())];
            let proof = compute_proof(&hasher, &messages, target.message_id(), None).unwrap();
            let leaf = hasher.hash_leaf(target).unwrap();
            prop_assert!(verify_proof(leaf, &proof).unwrap());
        }
    }
}
