//! Chain families supported by the protocol.

use crate::PrimitivesError;
use core::{fmt, str::FromStr};
use serde::Serialize;

/// A family of ledgers sharing addressing, log and encoding conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// Ethereum and EVM-compatible chains.
    Evm,
    /// Solana (SVM).
    Solana,
    /// Aptos (Move).
    Aptos,
    /// Sui (Move).
    Sui,
    /// The Open Network.
    Ton,
}

/// Byte order of an encoded integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

impl ChainFamily {
    /// All known families, in decoder probing order.
    pub const ALL: [Self; 5] = [Self::Evm, Self::Solana, Self::Aptos, Self::Sui, Self::Ton];

    /// Returns the canonical lowercase name of the family.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Aptos => "aptos",
            Self::Sui => "sui",
            Self::Ton => "ton",
        }
    }

    /// Byte order used by messages sent from this family when encoding per-token destination
    /// gas amounts.
    pub const fn token_gas_endianness(&self) -> Endianness {
        match self {
            Self::Evm | Self::Solana => Endianness::Big,
            Self::Aptos | Self::Sui | Self::Ton => Endianness::Little,
        }
    }

    /// Returns true if `hash` has the shape of a transaction hash on this family.
    pub fn is_tx_hash(&self, hash: &str) -> bool {
        match self {
            Self::Evm | Self::Aptos => is_hex_of_len(hash.strip_prefix("0x"), 32),
            Self::Solana => decodes_to(hash, 64),
            Self::Sui => decodes_to(hash, 32),
            Self::Ton => !hash.starts_with("0x") && is_hex_of_len(Some(hash), 32),
        }
    }
}

fn is_hex_of_len(s: Option<&str>, bytes: usize) -> bool {
    s.is_some_and(|s| s.len() == bytes * 2 && s.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn decodes_to(s: &str, bytes: usize) -> bool {
    bs58::decode(s).into_vec().is_ok_and(|v| v.len() == bytes)
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainFamily {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "evm" | "ethereum" => Ok(Self::Evm),
            "solana" | "svm" => Ok(Self::Solana),
            "aptos" => Ok(Self::Aptos),
            "sui" => Ok(Self::Sui),
            "ton" => Ok(Self::Ton),
            _ => Err(PrimitivesError::UnknownFamily(s.to_string())),
        }
    }
}
