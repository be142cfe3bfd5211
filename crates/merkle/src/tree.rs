//! This module contains the [MerkleTree] struct, a multi-leaf merkle tree with layers retained for
//! proving.

use crate::{hash_pair, MerkleError, MerkleResult, Proof, MAX_PROOF_STEPS, ZERO_HASH};
use alloc::vec::Vec;
use alloy_primitives::B256;

/// A merkle tree over an ordered list of leaf hashes.
///
/// Every layer of odd length (other than the root layer) is padded with [ZERO_HASH] before the
/// next layer is computed. Leaf order is significant: it must match the order in which the leaves
/// were committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// The number of real (unpadded) leaves.
    leaf_count: usize,
    /// All layers, leaves first and the single root last. Non-root layers have even length.
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Builds a tree over `leaves`.
    pub fn new(leaves: Vec<B256>) -> MerkleResult<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyLeaves);
        }
        let leaf_count = leaves.len();
        let mut layers = Vec::new();
        let mut current = leaves;
        while current.len() > 1 {
            if current.len() % 2 == 1 {
                current.push(ZERO_HASH);
            }
            let next = current.chunks_exact(2).map(|pair| hash_pair(pair[0], pair[1])).collect();
            layers.push(core::mem::replace(&mut current, next));
        }
        layers.push(current);
        Ok(Self { leaf_count, layers })
    }

    /// Returns the root hash.
    pub fn root(&self) -> B256 {
        self.layers[self.layers.len() - 1][0]
    }

    /// Returns the number of leaves the tree was built from.
    pub const fn len(&self) -> usize {
        self.leaf_count
    }

    /// Always false; a tree has at least one leaf.
    pub const fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Returns the leaves the tree was built from, without padding.
    pub fn leaves(&self) -> &[B256] {
        &self.layers[0][..self.leaf_count]
    }

    /// Generates a multi-proof for the leaves at `indices`.
    ///
    /// Indices may be given in any order and with duplicates; the proof always covers the sorted,
    /// deduplicated set, which is also the order in which the leaves must be supplied to
    /// [merkle_root].
    ///
    /// [merkle_root]: crate::merkle_root
    pub fn prove(&self, indices: &[usize]) -> MerkleResult<Proof> {
        if indices.is_empty() {
            return Err(MerkleError::NoIndices);
        }
        if let Some(&index) = indices.iter().find(|i| **i >= self.leaf_count) {
            return Err(MerkleError::IndexOutOfBounds { index, leaves: self.leaf_count });
        }

        let mut current = indices.to_vec();
        current.sort_unstable();
        current.dedup();

        let mut proof = Proof::default();
        for layer in &self.layers[..self.layers.len() - 1] {
            let mut next = Vec::with_capacity(current.len());
            let mut i = 0;
            while i < current.len() {
                let index = current[i];
                let sibling = index ^ 1;
                if current.get(i + 1) == Some(&sibling) {
                    // Both children are known; the step hashes two known values.
                    proof.source_flags.push(true);
                    i += 2;
                } else {
                    proof.hashes.push(layer[sibling]);
                    proof.source_flags.push(false);
                    i += 1;
                }
                next.push(index / 2);
            }
            current = next;
        }

        if proof.source_flags.len() > MAX_PROOF_STEPS {
            return Err(MerkleError::TooManySteps(proof.source_flags.len()));
        }
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle_root;
    use alloy_primitives::{keccak256, U256};
    use proptest::{collection::vec as arb_vec, prelude::any, proptest};

    fn leaves(n: usize) -> Vec<B256> {
        (0..n).map(|i| keccak256((i as u64).to_be_bytes())).collect()
    }

    #[test]
    fn test_single_leaf_tree() {
        let leaves = leaves(1);
        let tree = MerkleTree::new(leaves.clone()).unwrap();
        assert_eq!(tree.root(), leaves[0]);

        let proof = tree.prove(&[0]).unwrap();
        assert!(proof.hashes.is_empty());
        assert_eq!(proof.flag_bits().unwrap(), U256::ZERO);
    }

    #[test]
    fn test_two_leaf_proof_is_sibling() {
        let leaves = leaves(2);
        let tree = MerkleTree::new(leaves.clone()).unwrap();
        assert_eq!(tree.root(), hash_pair(leaves[0], leaves[1]));

        let proof = tree.prove(&[1]).unwrap();
        assert_eq!(proof.hashes, vec![leaves[0]]);
        assert_eq!(proof.source_flags, vec![false]);
        assert_eq!(
            merkle_root(&[leaves[1]], &proof.hashes, proof.flag_bits().unwrap()).unwrap(),
            tree.root()
        );
    }

    #[test]
    fn test_odd_layer_is_zero_padded() {
        let leaves = leaves(3);
        let tree = MerkleTree::new(leaves.clone()).unwrap();
        let expected =
            hash_pair(hash_pair(leaves[0], leaves[1]), hash_pair(leaves[2], ZERO_HASH));
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.leaves(), leaves.as_slice());
        assert_eq!(tree.len(), 3);

        let proof = tree.prove(&[2]).unwrap();
        assert_eq!(proof.hashes, vec![ZERO_HASH, hash_pair(leaves[0], leaves[1])]);
    }

    #[test]
    fn test_full_batch_proof_needs_no_hashes() {
        let leaves = leaves(4);
        let tree = MerkleTree::new(leaves.clone()).unwrap();
        let proof = tree.prove(&[3, 1, 2, 0, 0]).unwrap();
        assert!(proof.hashes.is_empty());
        assert_eq!(proof.source_flags, vec![true, true, true]);
        assert_eq!(
            merkle_root(&leaves, &proof.hashes, proof.flag_bits().unwrap()).unwrap(),
            tree.root()
        );
    }

    #[test]
    fn test_prove_errors() {
        let tree = MerkleTree::new(leaves(2)).unwrap();
        assert_eq!(tree.prove(&[]), Err(MerkleError::NoIndices));
        assert_eq!(tree.prove(&[2]), Err(MerkleError::IndexOutOfBounds { index: 2, leaves: 2 }));
        assert_eq!(MerkleTree::new(Vec::new()), Err(MerkleError::EmptyLeaves));
    }

    proptest! {
        #[test]
        fn test_single_leaf_proof_verifies(count in 1usize..96, pick in any::<usize>()) {
            let leaves = leaves(count);
            let tree = MerkleTree::new(leaves.clone()).unwrap();
            let index = pick % count;
            let proof = tree.prove(&[index]).unwrap();
            let root = merkle_root(&[leaves[index]], &proof.hashes, proof.flag_bits().unwrap());
            assert_eq!(root.unwrap(), tree.root());
        }

        #[test]
        fn test_multi_leaf_proof_verifies(
            count in 1usize..64,
            picks in arb_vec(any::<usize>(), 1..16),
        ) {
            let leaves = leaves(count);
            let tree = MerkleTree::new(leaves.clone()).unwrap();
            let mut indices: Vec<usize> = picks.iter().map(|p| p % count).collect();
            let proof = tree.prove(&indices).unwrap();
            indices.sort_unstable();
            indices.dedup();
            let proven: Vec<B256> = indices.iter().map(|i| leaves[*i]).collect();
            let root = merkle_root(&proven, &proof.hashes, proof.flag_bits().unwrap());
            assert_eq!(root.unwrap(), tree.root());
        }
    }
}
