//! Lanes.

use crate::{ChainAddress, ProtocolVersion};
use core::fmt;
use serde::Serialize;

/// A directional corridor between two networks at a given protocol revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    /// The selector of the sending network.
    pub source_chain_selector: u64,
    /// The selector of the receiving network.
    pub dest_chain_selector: u64,
    /// The sending-side protocol contract.
    pub on_ramp: ChainAddress,
    /// The protocol version of the on-ramp.
    pub version: ProtocolVersion,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} via {} (v{})",
            self.source_chain_selector, self.dest_chain_selector, self.on_ramp, self.version
        )
    }
}
