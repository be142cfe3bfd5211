#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod errors;
pub use errors::{MerkleError, MerkleResult};

mod hash;
pub use hash::{
    hash_internal_node, hash_pair, INTERNAL_DOMAIN_SEPARATOR, LEAF_DOMAIN_SEPARATOR, ZERO_HASH,
};

mod proof;
pub use proof::{merkle_root, Proof, MAX_PROOF_STEPS};

mod tree;
pub use tree::MerkleTree;
