//! Errors for the `ccip-merkle` crate.

use thiserror::Error;

/// A [Result] type alias where the error is [MerkleError].
pub type MerkleResult<T> = Result<T, MerkleError>;

/// An error type for tree construction, proving and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// A tree needs at least one leaf.
    #[error("Cannot build a merkle tree without leaves")]
    EmptyLeaves,
    /// A proof was requested for a leaf the tree does not have.
    #[error("Leaf index {index} out of bounds for a tree of {leaves} leaves")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of leaves in the tree.
        leaves: usize,
    },
    /// No leaf indices were given to prove.
    #[error("No leaves selected for proving")]
    NoIndices,
    /// The proof needs more internal hashing steps than the verifier supports.
    #[error("Proof requires {0} hashing steps, at most 256 are supported")]
    TooManySteps(usize),
    /// The proof does not describe a well-formed tree over the given leaves.
    #[error("Invalid proof: {0}")]
    InvalidProof(&'static str),
}
