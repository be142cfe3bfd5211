//! An in-memory [IndexApi] for testing.

use crate::{
    traits::{ExecutionInputs, IndexApi, IndexedMessage, LaneInfo, LaneLatency},
    IndexError, IndexResult,
};
use alloy_primitives::B256;
use async_trait::async_trait;
use ccip_primitives::CcipRequest;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// The records served by a [TestIndex].
#[derive(Debug, Default)]
pub struct TestIndexState {
    /// Messages by id.
    pub messages: HashMap<B256, IndexedMessage>,
    /// Message ids by transaction hash.
    pub tx_messages: HashMap<String, Vec<B256>>,
    /// Execution inputs by message id.
    pub execution_inputs: HashMap<B256, ExecutionInputs>,
    /// Lanes by `(source, dest)` selectors.
    pub lanes: HashMap<(u64, u64), LaneInfo>,
    /// Latencies by `(source, dest)` selectors.
    pub latencies: HashMap<(u64, u64), LaneLatency>,
    /// When set, every call fails with this error.
    pub failure: Option<IndexError>,
}

/// An in-memory off-chain index.
#[derive(Debug, Default)]
pub struct TestIndex {
    enabled: bool,
    state: Mutex<TestIndexState>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl TestIndex {
    /// Creates an empty, enabled index.
    pub fn new() -> Self {
        Self { enabled: true, ..Default::default() }
    }

    /// Creates an index that reports itself as disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Locks the index records.
    pub fn state(&self) -> MutexGuard<'_, TestIndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns how many times `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).get(method).copied().unwrap_or(0)
    }

    /// Records `request` as the index would, with its message serialized as a record.
    pub fn insert_request(&self, request: &CcipRequest) {
        let message_id = request.message.message_id();
        let indexed = IndexedMessage {
            message_id,
            source_chain_selector: request.lane.source_chain_selector,
            dest_chain_selector: request.lane.dest_chain_selector,
            sequence_number: request.message.sequence_number(),
            on_ramp_address: request.lane.on_ramp.to_string(),
            off_ramp_address: None,
            version: request.lane.version.to_string(),
            send_transaction_hash: request.tx.hash.clone(),
            send_block_number: Some(request.log.block_number),
            send_log_index: Some(request.log.log_index),
            send_timestamp: Some(request.tx.timestamp),
            status: Some("SENT".to_string()),
            message: serde_json::to_value(&request.message).expect("serializable message"),
        };
        let mut state = self.state();
        state.tx_messages.entry(request.tx.hash.clone()).or_default().push(message_id);
        state.messages.insert(message_id, indexed);
    }

    fn enter(&self, method: &'static str) -> IndexResult<MutexGuard<'_, TestIndexState>> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner).entry(method).or_default() += 1;
        if !self.enabled {
            return Err(IndexError::Disabled);
        }
        let state = self.state();
        match &state.failure {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        }
    }
}

fn not_found(key: impl ToString) -> IndexError {
    IndexError::NotFound(key.to_string())
}

#[async_trait]
impl IndexApi for TestIndex {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn get_message_by_id(&self, message_id: B256) -> IndexResult<IndexedMessage> {
        let state = self.enter("get_message_by_id")?;
        state.messages.get(&message_id).cloned().ok_or_else(|| not_found(message_id))
    }

    async fn get_message_ids_in_tx(&self, tx_hash: &str) -> IndexResult<Vec<B256>> {
        let state = self.enter("get_message_ids_in_tx")?;
        state.tx_messages.get(tx_hash).cloned().ok_or_else(|| not_found(tx_hash))
    }

    async fn get_execution_inputs(&self, message_id: B256) -> IndexResult<ExecutionInputs> {
        let state = self.enter("get_execution_inputs")?;
        state.execution_inputs.get(&message_id).cloned().ok_or_else(|| not_found(message_id))
    }

    async fn get_lane_info(
        &self,
        source_selector: u64,
        dest_selector: u64,
    ) -> IndexResult<LaneInfo> {
        let state = self.enter("get_lane_info")?;
        let key = (source_selector, dest_selector);
        state.lanes.get(&key).cloned().ok_or_else(|| not_found(format!("lane {key:?}")))
    }

    async fn get_lane_latency(
        &self,
        source_selector: u64,
        dest_selector: u64,
    ) -> IndexResult<LaneLatency> {
        let state = self.enter("get_lane_latency")?;
        let key = (source_selector, dest_selector);
        state.latencies.get(&key).copied().ok_or_else(|| not_found(format!("lane {key:?}")))
    }
}
