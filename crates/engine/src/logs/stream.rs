//! The paging producer behind [LogStream].

use super::{CancelHandle, LogFilter, LogStreamConfig, Watch};
use crate::{
    traits::{Chain, LogQuery},
    CcipResult,
};
use ccip_primitives::{BlockTag, ChainLog};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, trace};

/// A lazy, ordered stream of chain logs.
///
/// A producer task pages through the filtered range and pushes logs into a bounded channel,
/// so at most `channel_capacity` logs are fetched ahead of the consumer. The first error ends
/// the stream. Dropping the stream stops the producer, and cancelling a [Watch::Until] handle
/// ends it without yielding the logs still buffered.
#[derive(Debug)]
pub struct LogStream {
    logs: mpsc::Receiver<CcipResult<ChainLog>>,
    producer: JoinHandle<()>,
    cancel: Option<CancelHandle>,
}

impl LogStream {
    /// Validates `filter` and starts streaming. Must be called within a tokio runtime.
    pub fn new(
        chain: Arc<dyn Chain>,
        filter: LogFilter,
        config: &LogStreamConfig,
    ) -> CcipResult<Self> {
        filter.validate()?;
        let (tx, logs) = mpsc::channel(config.channel_capacity.max(1));
        let cancel = match &filter.watch {
            Watch::Until(handle) => Some(handle.clone()),
            _ => None,
        };
        let producer = Producer {
            page: filter.page.unwrap_or(config.page_size).max(1),
            poll_interval: config.poll_interval,
            cancel: cancel.as_ref().map(CancelHandle::subscribe),
            chain,
            filter,
            tx,
        };
        let producer = tokio::spawn(async move {
            if let Err(err) = producer.run().await {
                debug!(target: "log-stream", "Log stream failed: {err}");
                let _ = producer.tx.send(Err(err)).await;
            }
        });
        Ok(Self { logs, producer, cancel })
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

impl Stream for LogStream {
    type Item = CcipResult<ChainLog>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
            self.logs.close();
            return Poll::Ready(None);
        }
        self.logs.poll_recv(cx)
    }
}

/// Why paging stopped early.
enum Halt {
    /// The consumer is gone or the stream was cancelled.
    Closed,
    /// The `end_before` transaction was reached.
    Boundary,
}

/// Whether `log` is at or after the `(block, log index)` boundary.
fn is_past(boundary: Option<(u64, u64)>, log: &ChainLog) -> bool {
    boundary.is_some_and(|boundary| (log.block_number, log.log_index) >= boundary)
}

struct Producer {
    chain: Arc<dyn Chain>,
    filter: LogFilter,
    page: u64,
    poll_interval: core::time::Duration,
    cancel: Option<watch::Receiver<bool>>,
    tx: mpsc::Sender<CcipResult<ChainLog>>,
}

impl Producer {
    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn run(&self) -> CcipResult<()> {
        let (end, boundary) = match &self.filter.end_before {
            Some(hash) => {
                let tx = self.chain.get_transaction(hash).await?;
                let first_log = tx.logs.iter().map(|log| log.log_index).min();
                (tx.block_number, first_log.map(|index| (tx.block_number, index)))
            }
            None => (self.chain.get_block_number(self.filter.end()).await?, None),
        };

        let start = match (self.filter.start_block, self.filter.start_time) {
            (Some(block), _) => Some(block),
            (None, Some(timestamp)) => Some(block_at_or_after(&*self.chain, timestamp, end).await?),
            (None, None) => None,
        };

        let Some(start) = start else {
            return self.backward(end, boundary).await;
        };

        debug!(target: "log-stream", "Streaming logs forward over [{start}, {end}]");
        if let Some(halt) = self.forward(start, end, boundary).await? {
            if matches!(halt, Halt::Boundary) {
                debug!(target: "log-stream", "Reached the end-before transaction");
            }
            return Ok(());
        }
        if self.filter.watch.is_enabled() {
            self.watch(end.saturating_add(1).max(start)).await?;
        }
        Ok(())
    }

    fn query(&self, from_block: u64, to_block: u64) -> LogQuery {
        LogQuery {
            address: self.filter.address.clone(),
            topics: self.filter.topics.clone(),
            from_block,
            to_block,
        }
    }

    /// Sends one log, returning false once nobody listens anymore.
    async fn emit(&self, log: ChainLog) -> bool {
        !self.is_cancelled() && self.tx.send(Ok(log)).await.is_ok()
    }

    async fn forward(
        &self,
        mut from: u64,
        end: u64,
        boundary: Option<(u64, u64)>,
    ) -> CcipResult<Option<Halt>> {
        while from <= end {
            let to = from.saturating_add(self.page - 1).min(end);
            trace!(target: "log-stream", "Fetching logs [{from}, {to}]");
            for log in self.chain.get_logs(&self.query(from, to)).await? {
                if is_past(boundary, &log) {
                    return Ok(Some(Halt::Boundary));
                }
                if !self.emit(log).await {
                    return Ok(Some(Halt::Closed));
                }
            }
            if to == u64::MAX {
                break;
            }
            from = to + 1;
        }
        Ok(None)
    }

    async fn backward(&self, end: u64, boundary: Option<(u64, u64)>) -> CcipResult<()> {
        debug!(target: "log-stream", "Streaming logs backward from {end}");
        let mut to = end;
        loop {
            let from = to.saturating_sub(self.page - 1);
            trace!(target: "log-stream", "Fetching logs [{from}, {to}]");
            let logs = self.chain.get_logs(&self.query(from, to)).await?;
            for log in logs.into_iter().rev() {
                if is_past(boundary, &log) {
                    continue;
                }
                if !self.emit(log).await {
                    return Ok(());
                }
            }
            if from == 0 {
                return Ok(());
            }
            to = from - 1;
        }
    }

    /// Polls for blocks past `next` until cancelled or dropped.
    async fn watch(&self, mut next: u64) -> CcipResult<()> {
        let mut cancel = self.cancel.clone();
        let tag = self.filter.end();
        loop {
            let cancelled = async {
                match cancel.as_mut() {
                    Some(rx) => {
                        let _ = rx.wait_for(|cancelled| *cancelled).await;
                    }
                    None => core::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancelled => {
                    debug!(target: "log-stream", "Log stream cancelled");
                    return Ok(());
                }
                _ = self.tx.closed() => return Ok(()),
            }
            if self.is_cancelled() {
                return Ok(());
            }

            let head = self.chain.get_block_number(tag).await?;
            if head < next {
                continue;
            }
            trace!(target: "log-stream", "Watching new blocks [{next}, {head}]");
            if self.forward(next, head, None).await?.is_some() {
                return Ok(());
            }
            next = head.saturating_add(1);
        }
    }
}

/// Returns the first block whose timestamp is at least `timestamp`, searching `[0, latest]`.
/// Returns `latest` if every block is older.
pub async fn block_at_or_after(chain: &dyn Chain, timestamp: u64, latest: u64) -> CcipResult<u64> {
    if chain.get_block_timestamp(BlockTag::Number(latest)).await? < timestamp {
        return Ok(latest);
    }
    let (mut low, mut high) = (0, latest);
    while low < high {
        let mid = low + (high - low) / 2;
        if chain.get_block_timestamp(BlockTag::Number(mid)).await? < timestamp {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    trace!(target: "log-stream", "Timestamp {timestamp} resolved to block {low}");
    Ok(low)
}
