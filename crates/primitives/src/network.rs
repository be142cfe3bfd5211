//! Static network metadata.

use crate::{ChainFamily, PrimitivesError, PrimitivesResult};
use core::fmt;
use serde::Serialize;

/// A family-native chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ChainId {
    /// A numeric id, as used by EVM chains.
    Numeric(u64),
    /// A textual id, e.g. a genesis hash or a `family:id` pair.
    Named(&'static str),
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Named(id) => f.write_str(id),
        }
    }
}

/// Immutable metadata about a network supported by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// The protocol-wide unique chain selector.
    pub chain_selector: u64,
    /// The family-native chain id.
    pub chain_id: ChainId,
    /// The chain family.
    pub family: ChainFamily,
    /// The canonical network name.
    pub name: &'static str,
    /// Decimals of the native gas token.
    pub decimals: u8,
    /// Whether this is a test network.
    pub is_testnet: bool,
}

macro_rules! network {
    ($selector:expr, $id:expr, $family:ident, $name:expr, $decimals:expr, $testnet:expr) => {
        NetworkInfo {
            chain_selector: $selector,
            chain_id: $id,
            family: ChainFamily::$family,
            name: $name,
            decimals: $decimals,
            is_testnet: $testnet,
        }
    };
}

/// The static network table.
pub static NETWORKS: &[NetworkInfo] = &[
    network!(5009297550715157269, ChainId::Numeric(1), Evm, "ethereum-mainnet", 18, false),
    network!(
        16015286601757825753,
        ChainId::Numeric(11155111),
        Evm,
        "ethereum-testnet-sepolia",
        18,
        true
    ),
    network!(
        4949039107694359620,
        ChainId::Numeric(42161),
        Evm,
        "ethereum-mainnet-arbitrum-1",
        18,
        false
    ),
    network!(
        3478487238524512106,
        ChainId::Numeric(421614),
        Evm,
        "ethereum-testnet-sepolia-arbitrum-1",
        18,
        true
    ),
    network!(
        15971525489660198786,
        ChainId::Numeric(8453),
        Evm,
        "ethereum-mainnet-base-1",
        18,
        false
    ),
    network!(
        10344971235874465080,
        ChainId::Numeric(84532),
        Evm,
        "ethereum-testnet-sepolia-base-1",
        18,
        true
    ),
    network!(
        3734403246176062136,
        ChainId::Numeric(10),
        Evm,
        "ethereum-mainnet-optimism-1",
        18,
        false
    ),
    network!(
        5224473277236331295,
        ChainId::Numeric(11155420),
        Evm,
        "ethereum-testnet-sepolia-optimism-1",
        18,
        true
    ),
    network!(6433500567565415381, ChainId::Numeric(43114), Evm, "avalanche-mainnet", 18, false),
    network!(
        14767482510784806043,
        ChainId::Numeric(43113),
        Evm,
        "avalanche-fuji-testnet",
        18,
        true
    ),
    network!(4051577828743386545, ChainId::Numeric(137), Evm, "polygon-mainnet", 18, false),
    network!(16281711391670634445, ChainId::Numeric(80002), Evm, "polygon-testnet-amoy", 18, true),
    network!(
        11344663589394136015,
        ChainId::Numeric(56),
        Evm,
        "binance_smart_chain-mainnet",
        18,
        false
    ),
    network!(
        13264668187771770619,
        ChainId::Numeric(97),
        Evm,
        "binance_smart_chain-testnet",
        18,
        true
    ),
    network!(
        124615329519749607,
        ChainId::Named("5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d"),
        Solana,
        "solana-mainnet",
        9,
        false
    ),
    network!(
        16423721717087811551,
        ChainId::Named("EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG"),
        Solana,
        "solana-devnet",
        9,
        true
    ),
    network!(4741433654826277614, ChainId::Named("aptos:1"), Aptos, "aptos-mainnet", 8, false),
    network!(743186221051783445, ChainId::Named("aptos:2"), Aptos, "aptos-testnet", 8, true),
    network!(17529533435026248318, ChainId::Named("sui:1"), Sui, "sui-mainnet", 9, false),
    network!(9762610643973837292, ChainId::Named("sui:2"), Sui, "sui-testnet", 9, true),
    network!(16448340667252469081, ChainId::Named("ton:-239"), Ton, "ton-mainnet", 9, false),
    network!(1399300952838017768, ChainId::Named("ton:-3"), Ton, "ton-testnet", 9, true),
];

impl NetworkInfo {
    /// Looks up a network by its chain selector.
    pub fn by_selector(selector: u64) -> PrimitivesResult<&'static Self> {
        NETWORKS
            .iter()
            .find(|n| n.chain_selector == selector)
            .ok_or_else(|| PrimitivesError::UnknownNetwork(selector.to_string()))
    }

    /// Looks up a network by its family-native chain id.
    pub fn by_chain_id(id: &str) -> PrimitivesResult<&'static Self> {
        let numeric = id.parse::<u64>().ok();
        NETWORKS
            .iter()
            .find(|n| match n.chain_id {
                ChainId::Numeric(cid) => numeric == Some(cid),
                ChainId::Named(cid) => cid == id,
            })
            .ok_or_else(|| PrimitivesError::UnknownNetwork(id.to_string()))
    }

    /// Looks up a network by its canonical name.
    pub fn by_name(name: &str) -> PrimitivesResult<&'static Self> {
        NETWORKS
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| PrimitivesError::UnknownNetwork(name.to_string()))
    }

    /// Looks up a network by any of its keys: chain selector, native chain id or name.
    ///
    /// Numeric keys are tried as selectors first; selectors and EVM chain ids do not overlap.
    pub fn lookup(key: &str) -> PrimitivesResult<&'static Self> {
        let key = key.trim();
        if let Ok(selector) = key.parse::<u64>() {
            if let Ok(network) = Self::by_selector(selector) {
                return Ok(network);
            }
        }
        Self::by_chain_id(key)
            .or_else(|_| Self::by_name(key))
            .map_err(|_| PrimitivesError::UnknownNetwork(key.to_string()))
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
