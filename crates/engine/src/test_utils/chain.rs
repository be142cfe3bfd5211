//! An in-memory [Chain] for testing.

use crate::{
    traits::{
        Chain, ChainConnector, ExecuteOptions, GasEstimateRequest, LogQuery, OutboundMessage,
        TokenInfo, Wallet,
    },
    CcipError, CcipResult,
};
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use ccip_primitives::{
    BlockTag, ChainAddress, ChainFamily, ChainLog, ChainTransaction, ExecutionReport, NetworkInfo,
    TypeAndVersion,
};
use core::time::Duration;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Timestamp of block zero of every [TestChain].
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Seconds between two blocks of a [TestChain].
pub const BLOCK_TIME: u64 = 12;

/// A manual execution recorded by a [TestChain].
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    /// The off-ramp the report was submitted to.
    pub off_ramp: ChainAddress,
    /// The submitted report.
    pub report: ExecutionReport,
    /// The submitted overrides.
    pub options: ExecuteOptions,
    /// The signing account.
    pub signer: String,
}

/// The mutable contents of a [TestChain].
#[derive(Debug, Default)]
pub struct TestChainState {
    /// The chain head.
    pub head: u64,
    /// The latest finalized block.
    pub finalized: u64,
    /// Every log of the chain, in any order.
    pub logs: Vec<ChainLog>,
    /// Known transactions by hash.
    pub transactions: HashMap<String, ChainTransaction>,
    /// `typeAndVersion` of deployed contracts.
    pub type_and_versions: HashMap<ChainAddress, TypeAndVersion>,
    /// Destination selectors of single-lane on-ramps.
    pub on_ramp_dest_selectors: HashMap<ChainAddress, u64>,
    /// Routers of on-ramps, by destination selector.
    pub on_ramp_routers: HashMap<(ChainAddress, u64), ChainAddress>,
    /// Routers of off-ramps, by source selector.
    pub off_ramp_routers: HashMap<(ChainAddress, u64), ChainAddress>,
    /// Off-ramps allow-listed on routers, by source selector.
    pub router_off_ramps: HashMap<(ChainAddress, u64), Vec<ChainAddress>>,
    /// On-ramps of routers, by destination selector.
    pub router_on_ramps: HashMap<(ChainAddress, u64), ChainAddress>,
    /// Remote on-ramps off-ramps accept, by source selector.
    pub off_ramp_sources: HashMap<(ChainAddress, u64), Vec<ChainAddress>>,
    /// Commit stores of off-ramps. Off-ramps without an entry commit themselves.
    pub commit_stores: HashMap<ChainAddress, ChainAddress>,
    /// Token metadata.
    pub tokens: HashMap<ChainAddress, TokenInfo>,
    /// Balances by holder and token.
    pub balances: HashMap<(ChainAddress, Option<ChainAddress>), U256>,
    /// The answer of receiver gas estimations.
    pub gas_estimate: Option<u64>,
    /// Submitted manual executions.
    pub executions: Vec<RecordedExecution>,
    /// Submitted sends.
    pub sent: Vec<OutboundMessage>,
    /// Methods that fail with an RPC error.
    pub failing: HashSet<&'static str>,
    /// Whether [Chain::close] was called.
    pub closed: bool,
}

/// An in-memory [Chain] whose state is set up by the test.
///
/// Block `n` has timestamp `GENESIS_TIMESTAMP + n * BLOCK_TIME`.
#[derive(Debug)]
pub struct TestChain {
    network: &'static NetworkInfo,
    state: Mutex<TestChainState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    latency: Option<Duration>,
}

impl TestChain {
    /// Creates an empty chain of the network with the given selector.
    ///
    /// Panics if the selector is unknown.
    pub fn new(selector: u64) -> Self {
        let network = NetworkInfo::by_selector(selector).expect("unknown selector");
        Self {
            network,
            state: Mutex::new(TestChainState::default()),
            calls: Mutex::default(),
            latency: None,
        }
    }

    /// Delays every call by `latency`.
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Locks the chain state.
    pub fn state(&self) -> MutexGuard<'_, TestChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns how many times `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).get(method).copied().unwrap_or(0)
    }

    /// Makes `method` fail from now on.
    pub fn fail(&self, method: &'static str) {
        self.state().failing.insert(method);
    }

    /// Returns true once the chain was closed.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Returns the timestamp of `block`.
    pub const fn timestamp_of(&self, block: u64) -> u64 {
        GENESIS_TIMESTAMP + block * BLOCK_TIME
    }

    /// Returns the hash [Self::log_at] assigns to the transaction of a log.
    pub fn tx_hash_at(block: u64, log_index: u64) -> String {
        format!("0x{:064x}", block * 1_000 + log_index)
    }

    /// Builds a log of a one-log transaction, emitted by the zero address.
    pub fn log_at(block: u64, log_index: u64, topic: B256) -> ChainLog {
        ChainLog {
            address: alloy_primitives::Address::ZERO.into(),
            topics: vec![topic],
            data: Default::default(),
            block_number: block,
            transaction_hash: Self::tx_hash_at(block, log_index),
            log_index,
        }
    }

    /// Registers the transaction `hash` made of every stored log carrying that hash.
    pub fn insert_transaction_of_logs(&self, hash: &str) {
        let mut state = self.state();
        let mut logs: Vec<_> =
            state.logs.iter().filter(|log| log.transaction_hash == hash).cloned().collect();
        logs.sort_by_key(|log| log.log_index);
        let block_number = logs.first().map(|log| log.block_number).unwrap_or(state.head);
        let tx = ChainTransaction {
            hash: hash.to_string(),
            block_number,
            timestamp: self.timestamp_of(block_number),
            from: "0x00000000000000000000000000000000000000f0".to_string(),
            logs,
        };
        state.transactions.insert(hash.to_string(), tx);
    }

    /// Stores `logs` and registers the transactions they belong to.
    pub fn insert_logs(&self, logs: impl IntoIterator<Item = ChainLog>) {
        let mut hashes = Vec::new();
        {
            let mut state = self.state();
            for log in logs {
                if !hashes.contains(&log.transaction_hash) {
                    hashes.push(log.transaction_hash.clone());
                }
                state.head = state.head.max(log.block_number);
                state.finalized = state.finalized.max(log.block_number);
                state.logs.push(log);
            }
        }
        for hash in hashes {
            self.insert_transaction_of_logs(&hash);
        }
    }

    async fn enter(&self, method: &'static str) -> CcipResult<()> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner).entry(method).or_default() += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.state().failing.contains(method) {
            return Err(CcipError::rpc(self.network.name, format!("{method} unavailable")));
        }
        Ok(())
    }

    fn missing(&self, what: impl core::fmt::Display) -> CcipError {
        CcipError::rpc(self.network.name, format!("execution reverted: no {what}"))
    }

    fn submitted(&self, state: &TestChainState, nonce: usize) -> ChainTransaction {
        ChainTransaction {
            hash: format!("0x{:064x}", 0xe0_0000 + nonce),
            block_number: state.head,
            timestamp: self.timestamp_of(state.head),
            from: "0x00000000000000000000000000000000000000f0".to_string(),
            logs: vec![],
        }
    }
}

#[async_trait]
impl Chain for TestChain {
    fn network(&self) -> &'static NetworkInfo {
        self.network
    }

    async fn get_transaction(&self, hash: &str) -> CcipResult<ChainTransaction> {
        self.enter("get_transaction").await?;
        self.state()
            .transactions
            .get(hash)
            .cloned()
            .ok_or_else(|| CcipError::TransactionNotFound(hash.to_string()))
    }

    async fn get_block_timestamp(&self, block: BlockTag) -> CcipResult<u64> {
        let number = self.get_block_number(block).await?;
        Ok(self.timestamp_of(number))
    }

    async fn get_block_number(&self, block: BlockTag) -> CcipResult<u64> {
        self.enter("get_block_number").await?;
        let state = self.state();
        Ok(match block {
            BlockTag::Number(number) => number,
            BlockTag::Finalized => state.finalized,
            BlockTag::Latest => state.head,
        })
    }

    async fn get_logs(&self, query: &LogQuery) -> CcipResult<Vec<ChainLog>> {
        self.enter("get_logs").await?;
        let mut logs: Vec<_> = self
            .state()
            .logs
            .iter()
            .filter(|log| (query.from_block..=query.to_block).contains(&log.block_number))
            .filter(|log| query.address.as_ref().map_or(true, |address| log.address == *address))
            .filter(|log| {
                query.topics.is_empty()
                    || log.topic0().is_some_and(|topic| query.topics.contains(&topic))
            })
            .cloned()
            .collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    async fn type_and_version(&self, address: &ChainAddress) -> CcipResult<TypeAndVersion> {
        self.enter("type_and_version").await?;
        let found = self.state().type_and_versions.get(address).cloned();
        found.ok_or_else(|| self.missing(format_args!("typeAndVersion at {address}")))
    }

    async fn get_on_ramp_dest_selector(&self, on_ramp: &ChainAddress) -> CcipResult<u64> {
        self.enter("get_on_ramp_dest_selector").await?;
        let found = self.state().on_ramp_dest_selectors.get(on_ramp).copied();
        found.ok_or_else(|| self.missing(format_args!("static config at {on_ramp}")))
    }

    async fn get_router_for_on_ramp(
        &self,
        on_ramp: &ChainAddress,
        dest_selector: u64,
    ) -> CcipResult<ChainAddress> {
        self.enter("get_router_for_on_ramp").await?;
        let found = self.state().on_ramp_routers.get(&(on_ramp.clone(), dest_selector)).cloned();
        found.ok_or_else(|| self.missing(format_args!("router for on-ramp {on_ramp}")))
    }

    async fn get_router_for_off_ramp(
        &self,
        off_ramp: &ChainAddress,
        source_selector: u64,
    ) -> CcipResult<ChainAddress> {
        self.enter("get_router_for_off_ramp").await?;
        let found =
            self.state().off_ramp_routers.get(&(off_ramp.clone(), source_selector)).cloned();
        found.ok_or_else(|| self.missing(format_args!("router for off-ramp {off_ramp}")))
    }

    async fn get_off_ramps_for_router(
        &self,
        router: &ChainAddress,
        source_selector: u64,
    ) -> CcipResult<Vec<ChainAddress>> {
        self.enter("get_off_ramps_for_router").await?;
        Ok(self
            .state()
            .router_off_ramps
            .get(&(router.clone(), source_selector))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_on_ramp_for_router(
        &self,
        router: &ChainAddress,
        dest_selector: u64,
    ) -> CcipResult<ChainAddress> {
        self.enter("get_on_ramp_for_router").await?;
        let found = self.state().router_on_ramps.get(&(router.clone(), dest_selector)).cloned();
        found.ok_or_else(|| self.missing(format_args!("on-ramp on router {router}")))
    }

    async fn get_on_ramps_for_off_ramp(
        &self,
        off_ramp: &ChainAddress,
        source_selector: u64,
    ) -> CcipResult<Vec<ChainAddress>> {
        self.enter("get_on_ramps_for_off_ramp").await?;
        let found =
            self.state().off_ramp_sources.get(&(off_ramp.clone(), source_selector)).cloned();
        found.ok_or_else(|| self.missing(format_args!("source config on {off_ramp}")))
    }

    async fn get_commit_store_for_off_ramp(
        &self,
        off_ramp: &ChainAddress,
    ) -> CcipResult<ChainAddress> {
        self.enter("get_commit_store_for_off_ramp").await?;
        Ok(self.state().commit_stores.get(off_ramp).cloned().unwrap_or_else(|| off_ramp.clone()))
    }

    async fn get_token_info(&self, token: &ChainAddress) -> CcipResult<TokenInfo> {
        self.enter("get_token_info").await?;
        let found = self.state().tokens.get(token).cloned();
        found.ok_or_else(|| CcipError::TokenNotRegistered(token.to_string()))
    }

    async fn get_balance(
        &self,
        holder: &ChainAddress,
        token: Option<&ChainAddress>,
    ) -> CcipResult<U256> {
        self.enter("get_balance").await?;
        Ok(self
            .state()
            .balances
            .get(&(holder.clone(), token.cloned()))
            .copied()
            .unwrap_or_default())
    }

    async fn estimate_receive_execution(&self, _request: &GasEstimateRequest) -> CcipResult<u64> {
        self.enter("estimate_receive_execution").await?;
        let found = self.state().gas_estimate;
        found.ok_or_else(|| self.missing("gas estimate"))
    }

    async fn send_message(
        &self,
        _router: &ChainAddress,
        message: &OutboundMessage,
        _wallet: &dyn Wallet,
    ) -> CcipResult<ChainTransaction> {
        self.enter("send_message").await?;
        let mut state = self.state();
        state.sent.push(message.clone());
        let nonce = state.sent.len() + state.executions.len();
        Ok(self.submitted(&state, nonce))
    }

    async fn execute_report(
        &self,
        off_ramp: &ChainAddress,
        report: &ExecutionReport,
        options: &ExecuteOptions,
        wallet: &dyn Wallet,
    ) -> CcipResult<ChainTransaction> {
        self.enter("execute_report").await?;
        let mut state = self.state();
        state.executions.push(RecordedExecution {
            off_ramp: off_ramp.clone(),
            report: report.clone(),
            options: options.clone(),
            signer: wallet.address(),
        });
        let nonce = state.sent.len() + state.executions.len();
        Ok(self.submitted(&state, nonce))
    }

    async fn close(&self) {
        self.state().closed = true;
    }
}

/// Connects to pre-registered [TestChain]s by endpoint.
#[derive(Debug)]
pub struct TestConnector {
    family: ChainFamily,
    chains: HashMap<String, Arc<TestChain>>,
    attempts: Mutex<Vec<String>>,
}

impl TestConnector {
    /// Creates a connector of `family` without endpoints.
    pub fn new(family: ChainFamily) -> Self {
        Self { family, chains: HashMap::new(), attempts: Mutex::default() }
    }

    /// Serves `chain` at `endpoint`.
    pub fn with_chain(mut self, endpoint: &str, chain: Arc<TestChain>) -> Self {
        self.chains.insert(endpoint.to_string(), chain);
        self
    }

    /// Returns the endpoints connection attempts were made to.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ChainConnector for TestConnector {
    fn family(&self) -> ChainFamily {
        self.family
    }

    async fn connect(&self, endpoint: &str) -> CcipResult<Arc<dyn Chain>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner).push(endpoint.to_string());
        match self.chains.get(endpoint) {
            Some(chain) => Ok(chain.clone() as Arc<dyn Chain>),
            None => Err(CcipError::rpc(endpoint, "connection refused")),
        }
    }
}
