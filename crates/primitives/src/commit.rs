//! Commit reports.

use crate::ChainAddress;
use alloy_primitives::B256;
use serde::Serialize;

/// A batch commitment covering a contiguous sequence-number range of one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    /// The selector of the sending network.
    pub source_chain_selector: u64,
    /// The on-ramp the committed messages were sent through.
    pub on_ramp_address: ChainAddress,
    /// First sequence number in the batch, inclusive.
    pub min_seq_nr: u64,
    /// Last sequence number in the batch, inclusive.
    pub max_seq_nr: u64,
    /// Root of the merkle tree over the batch's leaves.
    pub merkle_root: B256,
}

impl CommitReport {
    /// Returns true if `sequence_number` falls within the committed range.
    pub const fn contains(&self, sequence_number: u64) -> bool {
        self.min_seq_nr <= sequence_number && sequence_number <= self.max_seq_nr
    }

    /// Number of messages in the batch.
    pub const fn len(&self) -> u64 {
        self.max_seq_nr.saturating_sub(self.min_seq_nr).saturating_add(1)
    }

    /// Whether the committed range is inverted.
    pub const fn is_empty(&self) -> bool {
        self.max_seq_nr < self.min_seq_nr
    }
}
