//! Sent messages and what became of them.
//!
//! A [CcipRequest] is a decoded send event together with its lane and transaction. The helpers
//! here extract requests from a source transaction, gather the full batch a request was
//! committed in, and follow its execution receipts on the destination chain.

use crate::{
    commit::{CommitMatcher, SearchStart},
    families::FamilyRegistry,
    logs::{LogFilter, LogStream, LogStreamConfig},
    traits::Chain,
    CcipError, CcipResult,
};
use alloy_primitives::B256;
use ccip_primitives::{
    BlockTag, CcipMessage, CcipRequest, ChainAddress, ChainTransaction, ExecutionReceipt,
    ExecutionState, Lane, ProtocolVersion,
};
use core::ops::RangeInclusive;
use futures::StreamExt;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::{debug, trace};

/// Decodes every message sent in `tx` and resolves the lane it travels on.
///
/// The destination comes from the message header when the event carries one, and from the
/// on-ramp's static config otherwise. The version is read from the on-ramp once per contract.
pub async fn get_requests_in_tx(
    source: &dyn Chain,
    tx: &ChainTransaction,
) -> CcipResult<Vec<CcipRequest>> {
    let topics = FamilyRegistry::global().get(source.family())?.message_topics();
    let mut versions: HashMap<ChainAddress, ProtocolVersion> = HashMap::new();
    let mut requests = Vec::new();

    for log in tx.logs.iter().filter(|log| log.topic0().is_some_and(|t| topics.contains(&t))) {
        let message = source.decode_message(log)?;
        let version = match versions.get(&log.address) {
            Some(version) => *version,
            None => {
                let version = source.type_and_version(&log.address).await?.version;
                versions.insert(log.address.clone(), version);
                version
            }
        };
        let dest_chain_selector = match message.header.dest_chain_selector {
            Some(dest) => dest,
            None => source.get_on_ramp_dest_selector(&log.address).await?,
        };
        let lane = Lane {
            source_chain_selector: message.header.source_chain_selector,
            dest_chain_selector,
            on_ramp: log.address.clone(),
            version,
        };
        trace!(
            target: "requests",
            "Found message {} (#{}) on {lane}",
            message.message_id(),
            message.sequence_number()
        );
        requests.push(CcipRequest { lane, message, log: log.clone(), tx: tx.clone() });
    }

    if requests.is_empty() {
        return Err(CcipError::NoMessagesInTx(tx.hash.clone()));
    }
    Ok(requests)
}

/// Picks the request carrying `message_id`.
pub fn select_request(requests: Vec<CcipRequest>, message_id: B256) -> CcipResult<CcipRequest> {
    let tx_hash = requests.first().map(|request| request.tx.hash.clone()).unwrap_or_default();
    requests
        .into_iter()
        .find(|request| request.message.message_id() == message_id)
        .ok_or(CcipError::MessageNotInTx { message_id, tx_hash })
}

/// Returns true if `message` was sent on `lane`. Single-lane events carry no destination.
fn on_lane(lane: &Lane, message: &CcipMessage) -> bool {
    message.header.source_chain_selector == lane.source_chain_selector
        && message.header.dest_chain_selector.map_or(true, |dest| dest == lane.dest_chain_selector)
}

/// Collects the messages of `lane` within `range` from `filter`, until `done` holds for a
/// sequence number.
async fn scan(
    source: &Arc<dyn Chain>,
    filter: LogFilter,
    config: &LogStreamConfig,
    lane: &Lane,
    range: &RangeInclusive<u64>,
    batch: &mut BTreeMap<u64, CcipMessage>,
    done: impl Fn(u64) -> bool,
) -> CcipResult<()> {
    let mut logs = LogStream::new(source.clone(), filter, config)?;
    while let Some(log) = logs.next().await {
        let message = source.decode_message(&log?)?;
        if !on_lane(lane, &message) {
            continue;
        }
        let sequence_number = message.sequence_number();
        if range.contains(&sequence_number) {
            batch.entry(sequence_number).or_insert(message);
        }
        if done(sequence_number) {
            break;
        }
    }
    Ok(())
}

/// Fetches every message of `request`'s lane in `[min_seq_nr, max_seq_nr]`, in sequence order.
///
/// The on-ramp is scanned forward from the request's block for the later messages, then
/// backward for the earlier ones. A gap fails with the transient [CcipError::BatchIncomplete].
pub async fn fetch_messages_in_batch(
    source: Arc<dyn Chain>,
    request: &CcipRequest,
    min_seq_nr: u64,
    max_seq_nr: u64,
    config: &LogStreamConfig,
) -> CcipResult<Vec<CcipMessage>> {
    let target = request.message.sequence_number();
    let range = min_seq_nr..=max_seq_nr;
    if !range.contains(&target) {
        return Err(CcipError::MessageNotInBatch {
            message_id: request.message.message_id(),
            min_seq_nr,
            max_seq_nr,
        });
    }

    let topics = FamilyRegistry::global().get(source.family())?.message_topics();
    let mut batch = BTreeMap::from([(target, request.message.clone())]);
    debug!(
        target: "batch",
        "Fetching batch [{min_seq_nr}, {max_seq_nr}] of {} around #{target}",
        request.lane.on_ramp
    );

    if max_seq_nr > target {
        let filter = LogFilter {
            start_block: Some(request.log.block_number),
            address: Some(request.lane.on_ramp.clone()),
            topics: topics.clone(),
            ..Default::default()
        };
        scan(&source, filter, config, &request.lane, &range, &mut batch, |seq| seq >= max_seq_nr)
            .await?;
    }
    if min_seq_nr < target {
        let filter = LogFilter {
            end_block: Some(BlockTag::Number(request.log.block_number)),
            address: Some(request.lane.on_ramp.clone()),
            topics,
            ..Default::default()
        };
        scan(&source, filter, config, &request.lane, &range, &mut batch, |seq| seq <= min_seq_nr)
            .await?;
    }

    let expected =
        usize::try_from(max_seq_nr - min_seq_nr).unwrap_or(usize::MAX).saturating_add(1);
    if batch.len() != expected {
        return Err(CcipError::BatchIncomplete {
            found: batch.len(),
            expected,
            min_seq_nr,
            max_seq_nr,
        });
    }
    debug!(target: "batch", "Fetched {expected} messages");
    Ok(batch.into_values().collect())
}

/// Returns the execution receipts of `request` emitted by `off_ramp` since `since`, oldest
/// first.
pub async fn fetch_execution_receipts(
    dest: Arc<dyn Chain>,
    off_ramp: &ChainAddress,
    request: &CcipRequest,
    since: SearchStart,
    config: &LogStreamConfig,
) -> CcipResult<Vec<ExecutionReceipt>> {
    let (start_block, start_time) = since.bounds();
    let filter = LogFilter {
        start_block,
        start_time,
        address: Some(off_ramp.clone()),
        topics: FamilyRegistry::global().get(dest.family())?.receipt_topics(),
        ..Default::default()
    };
    let message_id = request.message.message_id();
    let source_selector = request.lane.source_chain_selector;

    let mut receipts = Vec::new();
    let mut logs = LogStream::new(dest.clone(), filter, config)?;
    while let Some(log) = logs.next().await {
        let receipt = dest.decode_receipt(&log?)?;
        if receipt.message_id == message_id
            && receipt.source_chain_selector.map_or(true, |selector| selector == source_selector)
        {
            receipts.push(receipt);
        }
    }
    trace!(target: "requests", "Found {} receipts of {message_id}", receipts.len());
    Ok(receipts)
}

/// Where a message is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Sent, not yet committed.
    Sent,
    /// Committed on the destination, not yet executed.
    Committed,
    /// Delivered.
    Success,
    /// The last execution attempt failed.
    Failed,
}

impl MessageStatus {
    /// Derives the status from the receipts of a message, oldest first.
    ///
    /// A successful delivery is final even if failed attempts precede it. Any receipt proves
    /// the commit.
    pub fn from_receipts(receipts: &[ExecutionReceipt], committed: bool) -> Self {
        if receipts.iter().any(|receipt| receipt.state == ExecutionState::Success) {
            return Self::Success;
        }
        match receipts.iter().rev().find(|receipt| receipt.state.is_terminal()) {
            Some(_) => Self::Failed,
            None if committed || !receipts.is_empty() => Self::Committed,
            None => Self::Sent,
        }
    }
}

/// Returns the status of `request` on the destination served by `off_ramp`.
///
/// Receipts are looked up first; without any, the commit store is searched for the commit
/// report covering the message. Verifier-attested lanes never commit on chain and stay
/// [MessageStatus::Sent] until executed.
pub async fn message_status(
    dest: Arc<dyn Chain>,
    off_ramp: &ChainAddress,
    request: &CcipRequest,
    config: &LogStreamConfig,
) -> CcipResult<MessageStatus> {
    let since = SearchStart::Timestamp(request.tx.timestamp);
    let receipts = fetch_execution_receipts(dest.clone(), off_ramp, request, since, config).await?;
    let status = MessageStatus::from_receipts(&receipts, false);
    if status != MessageStatus::Sent || !request.lane.version.requires_onchain_commit() {
        return Ok(status);
    }

    let commit_store = dest.get_commit_store_for_off_ramp(off_ramp).await?;
    let sequence_number = request.message.sequence_number();
    match CommitMatcher::new(*config)
        .find(dest, &commit_store, &request.lane, sequence_number, since)
        .await
    {
        Ok(_) => Ok(MessageStatus::Committed),
        Err(CcipError::CommitNotFound { .. }) => Ok(MessageStatus::Sent),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        fixtures::{
            commit_log, deploy_on_ramp, lane, legacy_message, legacy_send_log, message,
            receipt_log, send_log, FUJI, OFF_RAMP, SEPOLIA,
        },
        TestChain,
    };
    use ccip_primitives::ChainLog;

    fn same_tx(mut logs: Vec<ChainLog>) -> Vec<ChainLog> {
        let hash = logs[0].transaction_hash.clone();
        logs.iter_mut().for_each(|log| log.transaction_hash = hash.clone());
        logs
    }

    /// A v1.6 source whose message `n` is sent alone in block `n`.
    fn source_with(sequence_numbers: &[u64]) -> Arc<TestChain> {
        let lane = lane(ProtocolVersion::V1_6);
        let source = TestChain::new(SEPOLIA);
        deploy_on_ramp(&source, ProtocolVersion::V1_6);
        source.insert_logs(sequence_numbers.iter().map(|n| send_log(&message(&lane, *n), *n, 0)));
        Arc::new(source)
    }

    async fn request_of(source: &TestChain, sequence_number: u64) -> CcipRequest {
        let tx = source.get_transaction(&TestChain::tx_hash_at(sequence_number, 0)).await.unwrap();
        get_requests_in_tx(source, &tx).await.unwrap().remove(0)
    }

    fn config() -> LogStreamConfig {
        LogStreamConfig { page_size: 2, ..Default::default() }
    }

    #[tokio::test]
    async fn test_requests_of_multi_message_tx() {
        let lane = lane(ProtocolVersion::V1_6);
        let source = TestChain::new(SEPOLIA);
        deploy_on_ramp(&source, ProtocolVersion::V1_6);
        source.insert_logs(same_tx(vec![
            send_log(&message(&lane, 1), 5, 0),
            commit_log(&lane, 1, 1, B256::ZERO, 5, 1),
            send_log(&message(&lane, 2), 5, 2),
        ]));
        let tx = source.get_transaction(&TestChain::tx_hash_at(5, 0)).await.unwrap();

        let requests = get_requests_in_tx(&source, &tx).await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].lane, lane);
        assert_eq!(requests[1].message, message(&lane, 2));
        assert_eq!(requests[1].log.log_index, 2);
        assert_eq!(source.calls("type_and_version"), 1);
        assert_eq!(source.calls("get_on_ramp_dest_selector"), 0);

        let selected = select_request(requests.clone(), message(&lane, 2).message_id()).unwrap();
        assert_eq!(selected.message.sequence_number(), 2);
        let err = select_request(requests, B256::ZERO).unwrap_err();
        assert_eq!(err, CcipError::MessageNotInTx { message_id: B256::ZERO, tx_hash: tx.hash });
    }

    #[tokio::test]
    async fn test_legacy_lane_comes_from_static_config() {
        let lane = lane(ProtocolVersion::V1_5);
        let source = TestChain::new(SEPOLIA);
        deploy_on_ramp(&source, ProtocolVersion::V1_5);
        source.insert_logs([legacy_send_log(&legacy_message(&lane, 4), 8, 0)]);

        let request = request_of(&source, 8).await;
        assert_eq!(request.lane, lane);
        assert_eq!(request.message, legacy_message(&lane, 4));
        assert_eq!(source.calls("get_on_ramp_dest_selector"), 1);
    }

    #[tokio::test]
    async fn test_tx_without_messages() {
        let lane = lane(ProtocolVersion::V1_6);
        let source = TestChain::new(SEPOLIA);
        source.insert_logs([commit_log(&lane, 1, 2, B256::ZERO, 3, 0)]);
        let tx = source.get_transaction(&TestChain::tx_hash_at(3, 0)).await.unwrap();
        let err = get_requests_in_tx(&source, &tx).await.unwrap_err();
        assert_eq!(err, CcipError::NoMessagesInTx(tx.hash));
    }

    #[tokio::test]
    async fn test_batch_is_gathered_around_the_request() {
        let source = source_with(&[1, 2, 3, 4, 5, 6, 7]);
        // A message of another lane of the same on-ramp, in between.
        let mut other = lane(ProtocolVersion::V1_6);
        other.dest_chain_selector = SEPOLIA;
        source.insert_logs([send_log(&message(&other, 4), 4, 1)]);

        let request = request_of(&source, 4).await;
        let batch = fetch_messages_in_batch(source.clone(), &request, 2, 6, &config())
            .await
            .unwrap();
        let sequence_numbers: Vec<_> = batch.iter().map(CcipMessage::sequence_number).collect();
        assert_eq!(sequence_numbers, vec![2, 3, 4, 5, 6]);
        assert!(batch.iter().all(|message| message.header.dest_chain_selector == Some(FUJI)));
    }

    #[tokio::test]
    async fn test_single_message_batch_needs_no_scan() {
        let source = source_with(&[9]);
        let request = request_of(&source, 9).await;
        let calls = source.calls("get_logs");
        let batch = fetch_messages_in_batch(source.clone(), &request, 9, 9, &config())
            .await
            .unwrap();
        assert_eq!(batch, vec![request.message]);
        assert_eq!(source.calls("get_logs"), calls);
    }

    #[tokio::test]
    async fn test_gap_is_incomplete() {
        let source = source_with(&[1, 2, 4, 5]);
        let request = request_of(&source, 2).await;
        let err = fetch_messages_in_batch(source.clone(), &request, 1, 5, &config())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CcipError::BatchIncomplete { found: 4, expected: 5, min_seq_nr: 1, max_seq_nr: 5 }
        );
        assert!(err.is_transient());

        let err = fetch_messages_in_batch(source, &request, 3, 5, &config()).await.unwrap_err();
        assert!(matches!(err, CcipError::MessageNotInBatch { min_seq_nr: 3, .. }));
    }

    #[tokio::test]
    async fn test_receipts_and_status() {
        let lane = lane(ProtocolVersion::V1_6);
        let source = source_with(&[3, 4]);
        let request = request_of(&source, 3).await;
        let config = config();

        let dest = Arc::new(TestChain::new(FUJI));
        assert_eq!(
            message_status(dest.clone(), &OFF_RAMP.into(), &request, &config).await.unwrap(),
            MessageStatus::Sent
        );

        dest.insert_logs([commit_log(&lane, 1, 4, B256::ZERO, 6, 0)]);
        assert_eq!(
            message_status(dest.clone(), &OFF_RAMP.into(), &request, &config).await.unwrap(),
            MessageStatus::Committed
        );

        dest.insert_logs([
            receipt_log(&request.message, ExecutionState::Failed, 7, 0),
            receipt_log(&message(&lane, 4), ExecutionState::Success, 7, 1),
        ]);
        let receipts = fetch_execution_receipts(
            dest.clone(),
            &OFF_RAMP.into(),
            &request,
            SearchStart::Block(0),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].sequence_number, 3);
        assert_eq!(
            message_status(dest.clone(), &OFF_RAMP.into(), &request, &config).await.unwrap(),
            MessageStatus::Failed
        );

        dest.insert_logs([receipt_log(&request.message, ExecutionState::Success, 9, 0)]);
        assert_eq!(
            message_status(dest, &OFF_RAMP.into(), &request, &config).await.unwrap(),
            MessageStatus::Success
        );
    }

    #[test]
    fn test_status_from_receipts() {
        let receipt = |state| ExecutionReceipt {
            source_chain_selector: None,
            sequence_number: 1,
            message_id: B256::ZERO,
            message_hash: None,
            state,
            return_data: Default::default(),
            gas_used: None,
        };
        assert_eq!(MessageStatus::from_receipts(&[], false), MessageStatus::Sent);
        assert_eq!(MessageStatus::from_receipts(&[], true), MessageStatus::Committed);
        assert_eq!(
            MessageStatus::from_receipts(&[receipt(ExecutionState::InProgress)], false),
            MessageStatus::Committed
        );
        assert_eq!(
            MessageStatus::from_receipts(
                &[receipt(ExecutionState::Success), receipt(ExecutionState::Failed)],
                true
            ),
            MessageStatus::Success
        );
    }
}
