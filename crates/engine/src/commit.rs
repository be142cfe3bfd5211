//! The commit report matcher.

use crate::{
    families::FamilyRegistry,
    logs::{LogFilter, LogStream, LogStreamConfig},
    traits::Chain,
    CcipError, CcipResult,
};
use ccip_primitives::{ChainAddress, CommitReport, Lane};
use core::fmt;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Where a commit scan starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchStart {
    /// A block number.
    Block(u64),
    /// A unix timestamp, in seconds, resolved to the first block at or after it.
    Timestamp(u64),
}

impl SearchStart {
    /// Splits the start point into the `(start_block, start_time)` pair of a [LogFilter].
    pub const fn bounds(self) -> (Option<u64>, Option<u64>) {
        match self {
            Self::Block(block) => (Some(block), None),
            Self::Timestamp(timestamp) => (None, Some(timestamp)),
        }
    }
}

impl fmt::Display for SearchStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(block) => write!(f, "block {block}"),
            Self::Timestamp(timestamp) => write!(f, "timestamp {timestamp}"),
        }
    }
}

/// Finds the commit report covering a sequence number.
#[derive(Debug, Clone, Default)]
pub struct CommitMatcher {
    config: LogStreamConfig,
    ordered: bool,
}

impl CommitMatcher {
    /// Creates a matcher streaming with `config`.
    pub const fn new(config: LogStreamConfig) -> Self {
        Self { config, ordered: false }
    }

    /// Declares whether the commit events of the scanned source are strictly ordered by sequence
    /// number. Only then does the scan stop at the first report past the target.
    pub const fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    /// Streams the commit events of `commit_store` on `dest` from `since`, returning the first
    /// report of `lane` whose range covers `sequence_number`.
    pub async fn find(
        &self,
        dest: Arc<dyn Chain>,
        commit_store: &ChainAddress,
        lane: &Lane,
        sequence_number: u64,
        since: SearchStart,
    ) -> CcipResult<CommitReport> {
        let (start_block, start_time) = since.bounds();
        let filter = LogFilter {
            start_block,
            start_time,
            address: Some(commit_store.clone()),
            topics: FamilyRegistry::global().get(dest.family())?.commit_topics(),
            ..Default::default()
        };
        debug!(
            target: "commit-matcher",
            "Looking for the commit of #{sequence_number} on {commit_store} since {since}"
        );

        let mut logs = LogStream::new(dest.clone(), filter, &self.config)?;
        while let Some(log) = logs.next().await {
            let log = log?;
            for report in dest.decode_commits(&log, lane)? {
                if report.contains(sequence_number) {
                    debug!(
                        target: "commit-matcher",
                        "Found commit [{}, {}] in {}",
                        report.min_seq_nr,
                        report.max_seq_nr,
                        log.transaction_hash
                    );
                    return Ok(report);
                }
                if self.ordered && report.min_seq_nr > sequence_number {
                    trace!(target: "commit-matcher", "Passed #{sequence_number}, stopping");
                    return Err(not_found(since, sequence_number));
                }
            }
        }
        Err(not_found(since, sequence_number))
    }
}

fn not_found(since: SearchStart, sequence_number: u64) -> CcipError {
    CcipError::CommitNotFound { since: since.to_string(), sequence_number }
}
