//! Caller options of a manual execution.

use crate::logs::LogStreamConfig;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// How the commit report of a message is searched for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitSearch {
    /// First destination block to scan. Defaults to the block at the send timestamp.
    pub start_block: Option<u64>,
    /// Whether the destination's commit events are known to be ordered by sequence number,
    /// allowing the scan to stop past the target.
    pub ordered: bool,
}

/// The request of one manual execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualExecOptions {
    /// The message to execute.
    pub message_id: B256,
    /// The sending transaction. Looked up in the index when unset.
    pub tx_hash: Option<String>,
    /// RPC endpoints of the source and destination chains, in any order.
    pub endpoints: Vec<String>,
    /// Gas limit of the receiver callback, replacing the message's own.
    pub gas_limit: Option<u64>,
    /// Gas limits of the destination token pools, aligned with the token transfers.
    pub token_gas_limits: Vec<Option<u32>>,
    /// Estimate the receiver's gas and add this percentage on top. The estimate only ever
    /// raises the limit.
    pub estimate_gas_margin: Option<u32>,
    /// Whether the off-chain index may be queried.
    pub use_index: bool,
    /// Commit report search.
    pub commit_search: CommitSearch,
    /// Blocks per log page.
    pub log_page_size: u64,
}

impl Default for ManualExecOptions {
    fn default() -> Self {
        Self {
            message_id: B256::ZERO,
            tx_hash: None,
            endpoints: Vec::new(),
            gas_limit: None,
            token_gas_limits: Vec::new(),
            estimate_gas_margin: None,
            use_index: true,
            commit_search: CommitSearch::default(),
            log_page_size: LogStreamConfig::default().page_size,
        }
    }
}

impl ManualExecOptions {
    /// Creates options executing `message_id` through `endpoints`.
    pub fn new(message_id: B256, endpoints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            message_id,
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The log stream tuning implied by the options.
    pub fn log_config(&self) -> LogStreamConfig {
        LogStreamConfig { page_size: self.log_page_size.max(1), ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let options: ManualExecOptions = serde_json::from_str(
            r#"{
                "messageId": "0x0000000000000000000000000000000000000000000000000000000000000042",
                "endpoints": ["https://sepolia.example", "https://fuji.example"],
                "estimateGasMargin": 10,
                "commitSearch": { "ordered": true }
            }"#,
        )
        .unwrap();
        assert_eq!(options.message_id, B256::with_last_byte(0x42));
        assert_eq!(options.endpoints.len(), 2);
        assert_eq!(options.estimate_gas_margin, Some(10));
        assert!(options.use_index);
        assert!(options.commit_search.ordered);
        assert_eq!(options.commit_search.start_block, None);
        assert_eq!(options.log_config().page_size, 10_000);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let options =
            ManualExecOptions { log_page_size: 0, ..ManualExecOptions::new(B256::ZERO, ["a"]) };
        assert_eq!(options.log_config().page_size, 1);
    }
}
