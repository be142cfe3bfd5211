//! Family-aware addresses.

use crate::{ChainFamily, PrimitivesError, PrimitivesResult};
use alloy_primitives::{hex, Address};
use core::fmt;
use serde::{Serialize, Serializer};

/// An address on a ledger of a given [ChainFamily].
///
/// The bytes are stored normalized (EVM addresses are always 20 bytes, Move addresses are always
/// left-padded to 32 bytes), so two [ChainAddress]es compare equal iff they designate the same
/// account regardless of the textual form they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainAddress {
    family: ChainFamily,
    bytes: Vec<u8>,
}

impl ChainAddress {
    /// Parses a textual address in the native representation of `family`.
    pub fn parse(family: ChainFamily, value: &str) -> PrimitivesResult<Self> {
        let invalid = || PrimitivesError::InvalidAddress { family, value: value.to_string() };
        let value = value.trim();
        let bytes = match family {
            ChainFamily::Evm => hex::decode(value).map_err(|_| invalid())?,
            ChainFamily::Solana => match value.strip_prefix("0x") {
                Some(h) => hex::decode(h).map_err(|_| invalid())?,
                None => bs58::decode(value).into_vec().map_err(|_| invalid())?,
            },
            ChainFamily::Aptos | ChainFamily::Sui => {
                let digits = value.strip_prefix("0x").unwrap_or(value);
                if digits.is_empty() || digits.len() > 64 {
                    return Err(invalid());
                }
                hex::decode(format!("{digits:0>64}")).map_err(|_| invalid())?
            }
            ChainFamily::Ton => {
                let (wc, hash) = value.split_once(':').ok_or_else(invalid)?;
                let wc: i32 = wc.parse().map_err(|_| invalid())?;
                let hash = hex::decode(hash).map_err(|_| invalid())?;
                if hash.len() != 32 {
                    return Err(invalid());
                }
                let mut bytes = wc.to_be_bytes().to_vec();
                bytes.extend_from_slice(&hash);
                bytes
            }
        };
        Self::from_bytes(family, &bytes).map_err(|_| invalid())
    }

    /// Builds an address from its raw bytes. EVM addresses may be given ABI-encoded (left-padded
    /// to 32 bytes).
    pub fn from_bytes(family: ChainFamily, bytes: &[u8]) -> PrimitivesResult<Self> {
        let invalid =
            || PrimitivesError::InvalidAddress { family, value: hex::encode_prefixed(bytes) };
        let bytes = match family {
            ChainFamily::Evm => match bytes.len() {
                20 => bytes.to_vec(),
                32 if bytes[..12].iter().all(|b| *b == 0) => bytes[12..].to_vec(),
                _ => return Err(invalid()),
            },
            ChainFamily::Solana => {
                if bytes.len() != 32 {
                    return Err(invalid());
                }
                bytes.to_vec()
            }
            ChainFamily::Aptos | ChainFamily::Sui => {
                if bytes.is_empty() || bytes.len() > 32 {
                    return Err(invalid());
                }
                let mut padded = vec![0u8; 32 - bytes.len()];
                padded.extend_from_slice(bytes);
                padded
            }
            ChainFamily::Ton => match bytes.len() {
                36 => bytes.to_vec(),
                32 => [&[0u8; 4][..], bytes].concat(),
                _ => return Err(invalid()),
            },
        };
        Ok(Self { family, bytes })
    }

    /// Returns the family this address belongs to.
    pub const fn family(&self) -> ChainFamily {
        self.family
    }

    /// Returns the normalized raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the bytes as they appear in ABI-encoded `bytes` fields of cross-family messages:
    /// EVM addresses are left-padded to a full word, other families are passed through raw.
    pub fn to_abi_bytes(&self) -> Vec<u8> {
        match self.family {
            ChainFamily::Evm => {
                let mut word = vec![0u8; 12];
                word.extend_from_slice(&self.bytes);
                word
            }
            _ => self.bytes.clone(),
        }
    }

    /// Returns the EVM [Address] if this is an EVM address.
    pub fn to_evm(&self) -> Option<Address> {
        (self.family == ChainFamily::Evm).then(|| Address::from_slice(&self.bytes))
    }
}

impl From<Address> for ChainAddress {
    fn from(address: Address) -> Self {
        Self { family: ChainFamily::Evm, bytes: address.to_vec() }
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            ChainFamily::Evm => f.write_str(&Address::from_slice(&self.bytes).to_checksum(None)),
            ChainFamily::Solana => f.write_str(&bs58::encode(&self.bytes).into_string()),
            ChainFamily::Aptos | ChainFamily::Sui => {
                f.write_str(&hex::encode_prefixed(&self.bytes))
            }
            ChainFamily::Ton => {
                let mut wc = [0u8; 4];
                wc.copy_from_slice(&self.bytes[..4]);
                write!(f, "{}:{}", i32::from_be_bytes(wc), hex::encode(&self.bytes[4..]))
            }
        }
    }
}

impl Serialize for ChainAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
