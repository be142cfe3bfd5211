//! Log filters and stream configuration.

use crate::{CcipError, CcipResult};
use alloy_primitives::B256;
use ccip_primitives::{BlockTag, ChainAddress};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Stops a watching [LogStream](super::LogStream).
///
/// Clones share the same signal. Cancelling is idempotent.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: std::sync::Arc::new(tx) }
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once [Self::cancel] has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Whether a stream keeps polling for new events once the initial range is exhausted.
#[derive(Debug, Clone, Default)]
pub enum Watch {
    /// Stop at the end of the range.
    #[default]
    Disabled,
    /// Poll until the stream is dropped.
    Forever,
    /// Poll until the handle is cancelled or the stream is dropped. Logs fetched but not yet
    /// consumed when the handle is cancelled are discarded.
    Until(CancelHandle),
}

impl Watch {
    /// Returns true unless watching is disabled.
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl From<bool> for Watch {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Forever
        } else {
            Self::Disabled
        }
    }
}

impl From<CancelHandle> for Watch {
    fn from(handle: CancelHandle) -> Self {
        Self::Until(handle)
    }
}

/// Selects the logs a [LogStream](super::LogStream) yields.
///
/// With a start point (`start_block`, or `start_time` resolved to the first block at or after
/// it) the range is walked forward. Without one it is walked backward from the end.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// First block of a forward scan.
    pub start_block: Option<u64>,
    /// Unix timestamp, in seconds, the forward scan starts at when `start_block` is unset.
    pub start_time: Option<u64>,
    /// Last block, or the finality tag bounding the scan. Defaults to [BlockTag::Latest].
    pub end_block: Option<BlockTag>,
    /// Hash of a transaction; the scan ends right before its first log.
    pub end_before: Option<String>,
    /// Continuous polling after the initial range.
    pub watch: Watch,
    /// Emitting contract.
    pub address: Option<ChainAddress>,
    /// Accepted first topics. Empty accepts every event.
    pub topics: Vec<B256>,
    /// Page size hint, in blocks.
    pub page: Option<u64>,
}

impl LogFilter {
    /// The end bound, defaulting to the chain head.
    pub fn end(&self) -> BlockTag {
        self.end_block.unwrap_or(BlockTag::Latest)
    }

    /// Returns true if the scan walks forward.
    pub const fn is_forward(&self) -> bool {
        self.start_block.is_some() || self.start_time.is_some()
    }

    /// Rejects inconsistent filters.
    pub fn validate(&self) -> CcipResult<()> {
        if self.watch.is_enabled() {
            if !self.end().is_finality_tag() {
                return Err(CcipError::InvalidLogFilter("watch mode requires a finality end tag"));
            }
            if !self.is_forward() {
                return Err(CcipError::InvalidLogFilter("watch mode requires a start point"));
            }
            if self.end_before.is_some() {
                return Err(CcipError::InvalidLogFilter("watch mode cannot end before a tx"));
            }
        }
        if let (Some(start), Some(BlockTag::Number(end))) = (self.start_block, self.end_block) {
            if start > end {
                return Err(CcipError::InvalidLogFilter("start block is after end block"));
            }
        }
        if self.page == Some(0) {
            return Err(CcipError::InvalidLogFilter("page size must be positive"));
        }
        Ok(())
    }
}

/// Tuning of log streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogStreamConfig {
    /// Blocks per `get_logs` page when the filter gives no hint.
    pub page_size: u64,
    /// Delay between polls in watch mode.
    #[serde(rename = "pollIntervalMs", with = "crate::serde_utils::duration_ms")]
    pub poll_interval: Duration,
    /// Logs buffered ahead of the consumer.
    pub channel_capacity: usize,
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        Self { page_size: 10_000, poll_interval: Duration::from_secs(5), channel_capacity: 128 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_needs_finality_tag_and_start() {
        let filter = LogFilter {
            watch: Watch::Forever,
            end_block: Some(BlockTag::Number(10)),
            start_block: Some(1),
            ..Default::default()
        };
        assert_eq!(
            filter.validate(),
            Err(CcipError::InvalidLogFilter("watch mode requires a finality end tag"))
        );

        let filter = LogFilter { watch: true.into(), ..Default::default() };
        assert_eq!(
            filter.validate(),
            Err(CcipError::InvalidLogFilter("watch mode requires a start point"))
        );

        let filter = LogFilter {
            watch: CancelHandle::new().into(),
            start_time: Some(1_700_000_000),
            end_block: Some(BlockTag::Finalized),
            ..Default::default()
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_range_checks() {
        let filter = LogFilter {
            start_block: Some(11),
            end_block: Some(BlockTag::Number(10)),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
        assert!(LogFilter { page: Some(0), ..Default::default() }.validate().is_err());
        assert!(LogFilter::default().validate().is_ok());
        assert!(!LogFilter::default().is_forward());
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        let rx = handle.subscribe();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
        assert!(*rx.borrow());
    }

    #[test]
    fn test_config_defaults() {
        let config: LogStreamConfig = serde_json::from_str(r#"{"pollIntervalMs": 250}"#).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.page_size, 10_000);
        assert_eq!(config.channel_capacity, 128);
    }
}
