//! Node hashing.

use alloy_primitives::{b256, keccak256, B256};

/// Domain separator mixed into leaf hashes.
pub const LEAF_DOMAIN_SEPARATOR: B256 = B256::ZERO;

/// Domain separator mixed into internal node hashes.
pub const INTERNAL_DOMAIN_SEPARATOR: B256 =
    b256!("0000000000000000000000000000000000000000000000000000000000000001");

/// Padding node appended to layers of odd length.
pub const ZERO_HASH: B256 = B256::ZERO;

/// Hashes an internal node from its ordered children.
pub fn hash_internal_node(left: B256, right: B256) -> B256 {
    let mut buf = [0u8; 96];
    buf[..32].copy_from_slice(INTERNAL_DOMAIN_SEPARATOR.as_slice());
    buf[32..64].copy_from_slice(left.as_slice());
    buf[64..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

/// Hashes two sibling nodes. The pair is sorted first, so the result does not depend on which
/// side of the parent each child sits.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    if a < b {
        hash_internal_node(a, b)
    } else {
        hash_internal_node(b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_pair_is_symmetric() {
        let a = keccak256([1u8]);
        let b = keccak256([2u8]);
        assert_eq!(hash_pair(a, b), hash_pair(b, a));
        assert_ne!(hash_internal_node(a, b), hash_internal_node(b, a));
    }

    #[test]
    fn test_internal_node_is_domain_separated() {
        let a = keccak256([1u8]);
        let b = keccak256([2u8]);
        let mut plain = [0u8; 64];
        plain[..32].copy_from_slice(a.as_slice());
        plain[32..].copy_from_slice(b.as_slice());
        assert_ne!(hash_internal_node(a, b), keccak256(plain));
    }
}
