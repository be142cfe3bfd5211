//! Leaf hashing for the merkle batch prover.

use crate::CcipResult;
use alloy_primitives::B256;
use ccip_primitives::CcipMessage;
use core::fmt::Debug;

/// Hashes a message into the merkle leaf the destination verifier expects.
///
/// The hashing domain depends on the lane version and the destination family, so hashers are
/// obtained per lane from the destination family's codec.
pub trait LeafHasher: Debug + Send + Sync {
    /// Returns the leaf hash of `message`.
    fn hash_leaf(&self, message: &CcipMessage) -> CcipResult<B256>;
}
