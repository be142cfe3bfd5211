//! Multi-proofs and root recomputation.

use crate::{hash_pair, MerkleError, MerkleResult};
use alloc::vec::Vec;
use alloy_primitives::{B256, U256};

/// The maximum number of hashing steps the on-chain verifier accepts, bounded by the width of the
/// flag bitmask.
pub const MAX_PROOF_STEPS: usize = 256;

/// An inclusion multi-proof for one or more leaves of a [MerkleTree].
///
/// [MerkleTree]: crate::MerkleTree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proof {
    /// Sibling hashes that cannot be computed from the proven leaves, in consumption order.
    pub hashes: Vec<B256>,
    /// One flag per hashing step. `true` when both inputs of the step are already known (proven
    /// leaves or previously computed hashes), `false` when the step consumes the next entry of
    /// [Self::hashes].
    pub source_flags: Vec<bool>,
}

impl Proof {
    /// Packs [Self::source_flags] into the bitmask consumed by the on-chain verifier, where the
    /// flag of step `i` is bit `i`.
    pub fn flag_bits(&self) -> MerkleResult<U256> {
        if self.source_flags.len() > MAX_PROOF_STEPS {
            return Err(MerkleError::TooManySteps(self.source_flags.len()));
        }
        Ok(self
            .source_flags
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag)
            .fold(U256::ZERO, |bits, (i, _)| bits | (U256::from(1) << i)))
    }
}

/// Recomputes the root of a tree from a subset of its leaves (in tree order), the proof hashes
/// and the packed proof flags, following the on-chain verifier step for step.
pub fn merkle_root(leaves: &[B256], proofs: &[B256], flag_bits: U256) -> MerkleResult<B256> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyLeaves);
    }
    let total_steps = leaves.len() + proofs.len() - 1;
    if total_steps == 0 {
        return Ok(leaves[0]);
    }
    if total_steps > MAX_PROOF_STEPS {
        return Err(MerkleError::TooManySteps(total_steps));
    }

    let mut hashes = Vec::with_capacity(total_steps);
    let (mut leaves_used, mut hashes_used, mut proofs_used) = (0usize, 0usize, 0usize);

    // Pops the next proven leaf, then the next computed hash once leaves are exhausted.
    let mut next_known = |hashes: &Vec<B256>| -> MerkleResult<B256> {
        if leaves_used < leaves.len() {
            leaves_used += 1;
            Ok(leaves[leaves_used - 1])
        } else if hashes_used < hashes.len() {
            hashes_used += 1;
            Ok(hashes[hashes_used - 1])
        } else {
            Err(MerkleError::InvalidProof("step consumes a hash that was not computed yet"))
        }
    };

    for step in 0..total_steps {
        let a = if flag_bits.bit(step) {
            next_known(&hashes)?
        } else {
            let proof = proofs
                .get(proofs_used)
                .copied()
                .ok_or(MerkleError::InvalidProof("proof hashes exhausted"))?;
            proofs_used += 1;
            proof
        };
        let b = next_known(&hashes)?;
        hashes.push(hash_pair(a, b));
    }

    if proofs_used != proofs.len() {
        return Err(MerkleError::InvalidProof("unused proof hashes"));
    }
    if hashes_used != total_steps - 1 {
        return Err(MerkleError::InvalidProof("intermediate hashes left unconsumed"));
    }
    Ok(hashes[total_steps - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloy_primitives::keccak256;

    #[test]
    fn test_flag_bits_are_lsb_first() {
        let proof = Proof { hashes: vec![], source_flags: vec![true, false, true] };
        assert_eq!(proof.flag_bits().unwrap(), U256::from(0b101));
        assert_eq!(Proof::default().flag_bits().unwrap(), U256::ZERO);
    }

    #[test]
    fn test_flag_bits_overflow() {
        let proof = Proof { hashes: vec![], source_flags: vec![false; 257] };
        assert_eq!(proof.flag_bits(), Err(MerkleError::TooManySteps(257)));
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let leaf = keccak256([1u8]);
        assert_eq!(merkle_root(&[leaf], &[], U256::ZERO).unwrap(), leaf);
    }

    #[test]
    fn test_rejects_unused_proofs() {
        let a = keccak256([1u8]);
        let b = keccak256([2u8]);
        // Two known leaves hash together in one step; the extra proof hash is left over.
        let err = merkle_root(&[a, b], &[a], U256::from(0b11)).unwrap_err();
        assert!(matches!(err, MerkleError::InvalidProof(_)));
    }

    #[test]
    fn test_empty_leaves() {
        assert_eq!(merkle_root(&[], &[], U256::ZERO), Err(MerkleError::EmptyLeaves));
    }
}
