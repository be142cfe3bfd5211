//! The manual-execution pipeline.

use super::{ChainPool, ManualExecOptions};
use crate::{
    codec::decode_record,
    commit::{CommitMatcher, SearchStart},
    discovery::OffRampDiscovery,
    families::FamilyRegistry,
    prover::{compute_proof, verify_proof},
    requests::{fetch_messages_in_batch, get_requests_in_tx, select_request},
    retry::{with_retry, RetryConfig},
    traits::{
        Chain, ChainConnector, ExecuteOptions, ExecutionInputs, GasEstimateRequest, IndexApi,
        IndexedMessage, NoOffchainTokenData, OffchainTokenDataProvider, Wallet,
    },
    CcipError, CcipResult,
};
use alloy_primitives::{Bytes, B256};
use ccip_primitives::{
    CcipMessage, CcipRequest, ChainAddress, ChainFamily, ChainTransaction, CommitReport,
    ExecutionReport, Lane, MerkleProofFields, ReportProof,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The outcome of a manual execution.
#[derive(Debug, Clone)]
pub struct ManualExecution {
    /// The executed request.
    pub request: CcipRequest,
    /// The off-ramp the report was submitted to.
    pub off_ramp: ChainAddress,
    /// The submitted report.
    pub report: ExecutionReport,
    /// The overrides the report was submitted with.
    pub options: ExecuteOptions,
    /// The execution transaction.
    pub tx: ChainTransaction,
}

/// Drives the manual execution of messages.
///
/// Every call connects its own chains and closes them before returning, whatever the outcome.
/// The off-ramp discovery cache is shared between calls.
#[derive(Debug)]
pub struct ManualExecutor {
    connectors: Vec<Arc<dyn ChainConnector>>,
    index: Option<Arc<dyn IndexApi>>,
    discovery: Arc<OffRampDiscovery>,
    token_data: Arc<dyn OffchainTokenDataProvider>,
    retry: RetryConfig,
}

impl ManualExecutor {
    /// Creates an executor connecting through `connectors`, without an index.
    pub fn new(connectors: Vec<Arc<dyn ChainConnector>>) -> Self {
        Self {
            connectors,
            index: None,
            discovery: Arc::default(),
            token_data: Arc::new(NoOffchainTokenData),
            retry: RetryConfig::default(),
        }
    }

    /// Uses `index` to look up messages and execution inputs.
    pub fn with_index(mut self, index: Arc<dyn IndexApi>) -> Self {
        self.index = Some(index);
        self
    }

    /// Shares `discovery` with other executors.
    pub fn with_discovery(mut self, discovery: Arc<OffRampDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Fetches off-chain token data with `provider`.
    pub fn with_token_data(mut self, provider: Arc<dyn OffchainTokenDataProvider>) -> Self {
        self.token_data = provider;
        self
    }

    /// Retries index calls and batch retrieval with `retry`.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Manually executes the message of `options`, signing with `wallet`.
    pub async fn execute(
        &self,
        options: &ManualExecOptions,
        wallet: Arc<dyn Wallet>,
    ) -> CcipResult<ManualExecution> {
        let pool = Arc::new(ChainPool::new());
        let result = self.run(&pool, options, wallet).await;
        pool.close().await;
        match &result {
            Ok(execution) => info!(
                target: "manual-exec",
                "Executed {} in {}",
                options.message_id,
                execution.tx.hash
            ),
            Err(err) => warn!(
                target: "manual-exec",
                "Manual execution of {} failed: {err}",
                options.message_id
            ),
        }
        result
    }

    fn index(&self, options: &ManualExecOptions) -> Option<&Arc<dyn IndexApi>> {
        self.index.as_ref().filter(|index| options.use_index && index.is_enabled())
    }

    async fn run(
        &self,
        pool: &Arc<ChainPool>,
        options: &ManualExecOptions,
        wallet: Arc<dyn Wallet>,
    ) -> CcipResult<ManualExecution> {
        let message_id = options.message_id;
        let index = self.index(options);

        let (tx_hash, indexed) = match (&options.tx_hash, index) {
            (Some(hash), _) => (hash.clone(), None),
            (None, Some(index)) => {
                let indexed = with_retry(&self.retry, "index message lookup", || {
                    index.get_message_by_id(message_id)
                })
                .await?;
                (indexed.send_transaction_hash.clone(), Some(indexed))
            }
            (None, None) => {
                return Err(CcipError::InvalidArgument(
                    "a transaction hash is required when the index is not used".to_string(),
                ))
            }
        };
        debug!(target: "manual-exec", "Executing {message_id} sent in {tx_hash}");

        let (found, (indexed, inputs)) = tokio::join!(
            pool.find_transaction(&self.connectors, &options.endpoints, &tx_hash),
            self.prefetch(index, message_id, indexed),
        );
        let (source, tx) = found?;

        let from_index =
            indexed.map(|indexed| request_from_index(&indexed, &tx, source.family()));
        let request = match from_index {
            Some(Ok(request)) => request,
            Some(Err(err)) => {
                warn!(target: "manual-exec", "Ignoring the index record of {message_id}: {err}");
                select_request(get_requests_in_tx(&*source, &tx).await?, message_id)?
            }
            None => select_request(get_requests_in_tx(&*source, &tx).await?, message_id)?,
        };
        let lane = request.lane.clone();
        let dest =
            pool.find_chain(&self.connectors, &options.endpoints, lane.dest_chain_selector).await?;
        let inputs = inputs.unwrap_or_default();

        let indexed_off_ramp = inputs.off_ramp_address.as_deref().and_then(|address| {
            ChainAddress::parse(dest.family(), address)
                .inspect_err(|err| warn!(target: "manual-exec", "Ignoring the off-ramp: {err}"))
                .ok()
        });
        let off_ramp = match indexed_off_ramp {
            Some(off_ramp) => off_ramp,
            None => self.discovery.discover(&*source, &*dest, &lane.on_ramp).await?,
        };

        let proof = if lane.version.requires_onchain_commit() {
            let report = self.find_commit(&dest, &off_ramp, &request, options).await?;
            let hasher = dest.leaf_hasher(&lane)?;
            let leaf = hasher.hash_leaf(&request.message)?;
            match indexed_proof(&inputs, &report, leaf) {
                Some(proof) => ReportProof::Merkle(proof),
                None => {
                    let messages =
                        self.batch_of(&source, &request, &report, &inputs, options).await?;
                    ReportProof::Merkle(compute_proof(
                        &*hasher,
                        &messages,
                        message_id,
                        Some(report.merkle_root),
                    )?)
                }
            }
        } else if inputs.verifier_results.is_empty() {
            return Err(CcipError::IndexRequired { message_id, version: lane.version });
        } else {
            ReportProof::Verifiers {
                results: inputs.verifier_results.iter().cloned().map(Into::into).collect(),
            }
        };

        let report = ExecutionReport {
            offchain_token_data: self.offchain_token_data(&request, &inputs).await?,
            message: request.message.clone(),
            proof,
        };
        let execute =
            self.execute_options(&dest, &lane, &off_ramp, &request.message, options).await?;

        let wallet = match wallet.as_reconnectable() {
            Some(reconnectable) => reconnectable.reconnect(dest.clone()).await?,
            None => wallet,
        };
        let tx = dest.execute_report(&off_ramp, &report, &execute, &*wallet).await?;
        Ok(ManualExecution { request, off_ramp, report, options: execute, tx })
    }

    /// Queries the index for the message record, unless already known, and the execution
    /// inputs. Failures are logged and leave the piece to the on-chain path.
    async fn prefetch(
        &self,
        index: Option<&Arc<dyn IndexApi>>,
        message_id: B256,
        indexed: Option<IndexedMessage>,
    ) -> (Option<IndexedMessage>, Option<ExecutionInputs>) {
        let Some(index) = index else {
            return (indexed, None);
        };
        let message = async move {
            if indexed.is_some() {
                return indexed;
            }
            with_retry(&self.retry, "index message lookup", || index.get_message_by_id(message_id))
                .await
                .inspect_err(|err| warn!(target: "manual-exec", "No index record: {err}"))
                .ok()
        };
        let inputs = async move {
            with_retry(&self.retry, "index execution inputs", || {
                index.get_execution_inputs(message_id)
            })
            .await
            .inspect_err(|err| warn!(target: "manual-exec", "No index execution inputs: {err}"))
            .ok()
        };
        tokio::join!(message, inputs)
    }

    /// Finds the commit report of `request`. Manual execution cannot proceed without one.
    async fn find_commit(
        &self,
        dest: &Arc<dyn Chain>,
        off_ramp: &ChainAddress,
        request: &CcipRequest,
        options: &ManualExecOptions,
    ) -> CcipResult<CommitReport> {
        let since = match options.commit_search.start_block {
            Some(block) => SearchStart::Block(block),
            None => SearchStart::Timestamp(request.tx.timestamp),
        };
        let commit_store = dest.get_commit_store_for_off_ramp(off_ramp).await?;
        CommitMatcher::new(options.log_config())
            .ordered(options.commit_search.ordered)
            .find(
                dest.clone(),
                &commit_store,
                &request.lane,
                request.message.sequence_number(),
                since,
            )
            .await
            .map_err(|err| match err {
                CcipError::CommitNotFound { .. } => CcipError::CommitmentRequired {
                    message_id: request.message.message_id(),
                    cause: Box::new(err),
                },
                err => err,
            })
    }

    /// Returns the messages of the committed batch, from the index when it has all of them.
    async fn batch_of(
        &self,
        source: &Arc<dyn Chain>,
        request: &CcipRequest,
        report: &CommitReport,
        inputs: &ExecutionInputs,
        options: &ManualExecOptions,
    ) -> CcipResult<Vec<CcipMessage>> {
        if let Some(messages) = indexed_batch(inputs, report) {
            debug!(target: "manual-exec", "Using {} indexed batch messages", messages.len());
            return Ok(messages);
        }
        let config = options.log_config();
        with_retry(&self.retry, "batch retrieval", || {
            fetch_messages_in_batch(
                source.clone(),
                request,
                report.min_seq_nr,
                report.max_seq_nr,
                &config,
            )
        })
        .await
    }

    async fn offchain_token_data(
        &self,
        request: &CcipRequest,
        inputs: &ExecutionInputs,
    ) -> CcipResult<Vec<Bytes>> {
        if inputs.offchain_token_data.len() == request.message.token_amounts.len() {
            return Ok(inputs.offchain_token_data.clone());
        }
        self.token_data.fetch(request).await
    }

    /// Applies the caller's gas overrides, raising the receiver gas limit to the padded
    /// estimate when asked to and when the estimate exceeds the limit.
    async fn execute_options(
        &self,
        dest: &Arc<dyn Chain>,
        lane: &Lane,
        off_ramp: &ChainAddress,
        message: &CcipMessage,
        options: &ManualExecOptions,
    ) -> CcipResult<ExecuteOptions> {
        let mut execute = ExecuteOptions {
            gas_limit: options.gas_limit,
            token_gas_limits: options.token_gas_limits.clone(),
        };
        let Some(margin) = options.estimate_gas_margin else {
            return Ok(execute);
        };

        let estimate = dest
            .estimate_receive_execution(&GasEstimateRequest {
                lane: lane.clone(),
                off_ramp: off_ramp.clone(),
                message: message.clone(),
            })
            .await?;
        let padded = estimate.saturating_mul(100 + u64::from(margin)) / 100;
        let current = execute.gas_limit.unwrap_or_else(|| message.gas_limit().saturating_to());
        if padded > current {
            info!(target: "manual-exec", "Raising the gas limit from {current} to {padded}");
            execute.gas_limit = Some(padded);
        } else {
            debug!(target: "manual-exec", "Estimate {padded} fits the gas limit {current}");
        }
        Ok(execute)
    }
}

/// Builds the request of an index record, locating its send event in `tx`.
fn request_from_index(
    indexed: &IndexedMessage,
    tx: &ChainTransaction,
    source_family: ChainFamily,
) -> CcipResult<CcipRequest> {
    let message = decode_record(FamilyRegistry::global(), &indexed.message)?;
    if message.message_id() != indexed.message_id {
        return Err(CcipError::Decode(format!(
            "record of {} carries message {}",
            indexed.message_id,
            message.message_id()
        )));
    }
    let log = tx
        .logs
        .iter()
        .find(|log| Some(log.log_index) == indexed.send_log_index)
        .cloned()
        .ok_or_else(|| {
            CcipError::Decode(format!("send event of {} not in {}", indexed.message_id, tx.hash))
        })?;
    let lane = Lane {
        source_chain_selector: indexed.source_chain_selector,
        dest_chain_selector: indexed.dest_chain_selector,
        on_ramp: ChainAddress::parse(source_family, &indexed.on_ramp_address)?,
        version: indexed.version.parse()?,
    };
    Ok(CcipRequest { lane, message, log, tx: tx.clone() })
}

/// Returns the indexed proof of `leaf` if it resolves to the committed root.
fn indexed_proof(
    inputs: &ExecutionInputs,
    report: &CommitReport,
    leaf: B256,
) -> Option<MerkleProofFields> {
    let (root, flag_bits) = (inputs.merkle_root?, inputs.proof_flag_bits?);
    if root != report.merkle_root {
        warn!(
            target: "manual-exec",
            "Ignoring the indexed proof: root {root} was not committed, expected {}",
            report.merkle_root
        );
        return None;
    }
    let proof = MerkleProofFields {
        proofs: inputs.proofs.clone(),
        proof_flag_bits: flag_bits,
        merkle_root: root,
    };
    match verify_proof(leaf, &proof) {
        Ok(true) => {
            debug!(
                target: "manual-exec",
                "Using the indexed proof of {} hashes",
                proof.proofs.len()
            );
            Some(proof)
        }
        Ok(false) => {
            warn!(target: "manual-exec", "Ignoring the indexed proof: it resolves elsewhere");
            None
        }
        Err(err) => {
            warn!(target: "manual-exec", "Ignoring the indexed proof: {err}");
            None
        }
    }
}

/// Decodes the indexed batch if it covers exactly the committed range.
fn indexed_batch(inputs: &ExecutionInputs, report: &CommitReport) -> Option<Vec<CcipMessage>> {
    if inputs.messages_in_batch.is_empty()
        || inputs.messages_in_batch.len() as u64 != report.len()
    {
        return None;
    }
    let messages = inputs
        .messages_in_batch
        .iter()
        .map(|record| decode_record(FamilyRegistry::global(), record))
        .collect::<CcipResult<Vec<_>>>()
        .inspect_err(|err| warn!(target: "manual-exec", "Ignoring the indexed batch: {err}"))
        .ok()?;
    let contiguous = messages
        .iter()
        .zip(report.min_seq_nr..)
        .all(|(message, sequence_number)| message.sequence_number() == sequence_number);
    contiguous.then_some(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        families::evm::Any2EvmLeafHasher,
        test_utils::{
            fixtures::{
                commit_log, connect_lane, deploy_on_ramp, lane, message, message_id, send_log,
                FUJI, OFF_RAMP, SEPOLIA, SOLANA_DEVNET,
            },
            CollectingLayer, TestChain, TestConnector, TestIndex, TestWallet, TraceStorage,
        },
        traits::{IndexedVerifierResult, LeafHasher},
        ErrorKind, IndexError,
    };
    use ccip_merkle::hash_pair;
    use ccip_primitives::ProtocolVersion;
    use tracing::Level;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    /// Messages 1 and 2 sent on Sepolia in blocks 1 and 2, with both directions of the lane
    /// wired for discovery.
    struct Harness {
        lane: Lane,
        source: Arc<TestChain>,
        dest: Arc<TestChain>,
        connector: Arc<TestConnector>,
    }

    impl Harness {
        fn new(version: ProtocolVersion) -> Self {
            let lane = lane(version);
            let (source, dest) = (TestChain::new(SEPOLIA), TestChain::new(FUJI));
            connect_lane(&source, &dest);
            deploy_on_ramp(&source, version);
            source.insert_logs((1..=2).map(|n| send_log(&message(&lane, n), n, 0)));
            let (source, dest) = (Arc::new(source), Arc::new(dest));
            let connector = Arc::new(
                TestConnector::new(ChainFamily::Evm)
                    .with_chain("sepolia", source.clone())
                    .with_chain("fuji", dest.clone()),
            );
            Self { lane, source, dest, connector }
        }

        fn leaf(&self, sequence_number: u64) -> B256 {
            let hasher = Any2EvmLeafHasher::new(&self.lane);
            hasher.hash_leaf(&message(&self.lane, sequence_number)).unwrap()
        }

        /// Commits `[1, 2]` on Fuji in block 5.
        fn commit(&self) -> B256 {
            let root = hash_pair(self.leaf(1), self.leaf(2));
            self.dest.insert_logs([commit_log(&self.lane, 1, 2, root, 5, 0)]);
            root
        }

        fn executor(&self) -> ManualExecutor {
            ManualExecutor::new(vec![self.connector.clone() as Arc<dyn ChainConnector>])
                .with_retry(RetryConfig::none())
        }

        fn options(&self, sequence_number: u64) -> ManualExecOptions {
            ManualExecOptions {
                tx_hash: Some(TestChain::tx_hash_at(sequence_number, 0)),
                use_index: false,
                ..ManualExecOptions::new(message_id(sequence_number), ["fuji", "sepolia"])
            }
        }

        async fn request(&self, sequence_number: u64) -> CcipRequest {
            let hash = TestChain::tx_hash_at(sequence_number, 0);
            let tx = self.source.get_transaction(&hash).await.unwrap();
            let requests = get_requests_in_tx(&*self.source, &tx).await.unwrap();
            select_request(requests, message_id(sequence_number)).unwrap()
        }

        fn is_closed(&self) -> bool {
            self.source.is_closed() && self.dest.is_closed()
        }
    }

    fn wallet() -> Arc<TestWallet> {
        Arc::new(TestWallet::reconnectable("0xabc"))
    }

    #[tokio::test]
    async fn test_executes_with_merkle_proof() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        let root = harness.commit();
        let wallet = wallet();

        let execution =
            harness.executor().execute(&harness.options(2), wallet.clone()).await.unwrap();
        assert_eq!(execution.off_ramp, OFF_RAMP.into());
        assert_eq!(execution.request.message, message(&harness.lane, 2));
        let proof = execution.report.merkle().unwrap();
        assert_eq!(proof.merkle_root, root);
        assert_eq!(proof.proofs, vec![harness.leaf(1)]);
        assert_eq!(execution.options, ExecuteOptions::default());

        let state = harness.dest.state();
        assert_eq!(state.executions.len(), 1);
        assert_eq!(state.executions[0].report, execution.report);
        assert_eq!(state.executions[0].signer, "0xabc@avalanche-fuji-testnet");
        drop(state);
        assert_eq!(wallet.reconnects(), 1);
        assert!(harness.is_closed());
    }

    #[tokio::test]
    async fn test_tx_hash_required_without_index() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        let options = ManualExecOptions { tx_hash: None, ..harness.options(2) };
        let err = harness.executor().execute(&options, wallet()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(harness.connector.attempts().is_empty());

        let disabled = harness.executor().with_index(Arc::new(TestIndex::disabled()));
        let options = ManualExecOptions { use_index: true, ..options };
        let err = disabled.execute(&options, wallet()).await.unwrap_err();
        assert!(matches!(err, CcipError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_missing_commit_requires_commitment() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        let err = harness.executor().execute(&harness.options(1), wallet()).await.unwrap_err();
        assert!(matches!(
            &err,
            CcipError::CommitmentRequired { message_id: id, cause }
                if *id == message_id(1)
                    && matches!(**cause, CcipError::CommitNotFound { sequence_number: 1, .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(harness.is_closed());
        assert!(harness.dest.state().executions.is_empty());
    }

    #[tokio::test]
    async fn test_gas_estimate_only_raises_the_limit() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        harness.commit();
        let options = ManualExecOptions { estimate_gas_margin: Some(10), ..harness.options(1) };

        harness.dest.state().gas_estimate = Some(300_000);
        let execution = harness.executor().execute(&options, wallet()).await.unwrap();
        assert_eq!(execution.options.gas_limit, Some(330_000));

        harness.dest.state().gas_estimate = Some(100_000);
        let execution = harness.executor().execute(&options, wallet()).await.unwrap();
        assert_eq!(execution.options.gas_limit, None);
    }

    #[tokio::test]
    async fn test_index_supplies_request_and_off_ramp() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        harness.commit();
        let request = harness.request(2).await;
        let index = Arc::new(TestIndex::new());
        index.insert_request(&request);
        index.state().execution_inputs.insert(
            message_id(2),
            ExecutionInputs {
                off_ramp_address: Some(ChainAddress::from(OFF_RAMP).to_string()),
                ..Default::default()
            },
        );

        let options = ManualExecOptions { tx_hash: None, use_index: true, ..harness.options(2) };
        let execution = harness
            .executor()
            .with_index(index.clone())
            .execute(&options, wallet())
            .await
            .unwrap();
        assert_eq!(execution.request, request);
        assert_eq!(execution.off_ramp, OFF_RAMP.into());
        assert_eq!(index.calls("get_message_by_id"), 1);
        assert_eq!(index.calls("get_execution_inputs"), 1);
        assert_eq!(harness.source.calls("get_router_for_on_ramp"), 0);
    }

    #[tokio::test]
    async fn test_indexed_batch_skips_log_scan() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        let root = harness.commit();
        let index = Arc::new(TestIndex::new());
        let records = (1..=2)
            .map(|n| serde_json::to_value(message(&harness.lane, n)).unwrap())
            .collect();
        index.state().execution_inputs.insert(
            message_id(1),
            ExecutionInputs { messages_in_batch: records, ..Default::default() },
        );

        let options = ManualExecOptions { use_index: true, ..harness.options(1) };
        let execution = harness
            .executor()
            .with_index(index.clone())
            .execute(&options, wallet())
            .await
            .unwrap();
        assert_eq!(execution.report.merkle().unwrap().merkle_root, root);
        assert_eq!(harness.source.calls("get_logs"), 0);
        // The index had no message record; the source transaction was decoded instead.
        assert_eq!(index.calls("get_message_by_id"), 1);
    }

    #[tokio::test]
    async fn test_indexed_proof_is_verified_before_use() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        let root = harness.commit();
        let batch = [message(&harness.lane, 1), message(&harness.lane, 2)];
        let hasher = Any2EvmLeafHasher::new(&harness.lane);
        let proof = compute_proof(&hasher, &batch, message_id(2), Some(root)).unwrap();
        let inputs = ExecutionInputs {
            merkle_root: Some(proof.merkle_root),
            proofs: proof.proofs.clone(),
            proof_flag_bits: Some(proof.proof_flag_bits),
            ..Default::default()
        };
        let index = Arc::new(TestIndex::new());
        index.state().execution_inputs.insert(message_id(2), inputs.clone());

        let options = ManualExecOptions { use_index: true, ..harness.options(2) };
        let execution = harness
            .executor()
            .with_index(index.clone())
            .execute(&options, wallet())
            .await
            .unwrap();
        assert_eq!(execution.report.merkle(), Some(&proof));
        assert_eq!(harness.source.calls("get_logs"), 0);

        // A proof that does not resolve to the committed root is recomputed from the batch.
        let forged = ExecutionInputs { proofs: vec![B256::repeat_byte(7)], ..inputs };
        index.state().execution_inputs.insert(message_id(2), forged);
        let execution =
            harness.executor().with_index(index).execute(&options, wallet()).await.unwrap();
        assert_eq!(execution.report.merkle(), Some(&proof));
        assert!(harness.source.calls("get_logs") > 0);
    }

    #[tokio::test]
    async fn test_index_outage_falls_back_to_the_chain() {
        let harness = Harness::new(ProtocolVersion::V1_6);
        harness.commit();
        let index = Arc::new(TestIndex::new());
        index.state().failure = Some(IndexError::Transport("connection refused".to_string()));

        let storage = TraceStorage::default();
        let layer = CollectingLayer::new(storage.clone());
        let _guard = tracing_subscriber::registry().with(layer).set_default();
        let options = ManualExecOptions { use_index: true, ..harness.options(2) };
        let execution =
            harness.executor().with_index(index).execute(&options, wallet()).await.unwrap();
        assert_eq!(execution.off_ramp, OFF_RAMP.into());

        let warnings = storage.get_by_level(Level::WARN);
        let logged = storage.get_by_target("manual-exec");
        for expected in ["No index record", "No index execution inputs"] {
            assert!(warnings.iter().any(|warning| warning.starts_with(expected)));
            assert!(logged.iter().any(|message| message.starts_with(expected)));
        }
    }

    #[tokio::test]
    async fn test_verifier_lanes_need_the_index() {
        let harness = Harness::new(ProtocolVersion::V2_0);
        let err = harness.executor().execute(&harness.options(2), wallet()).await.unwrap_err();
        assert_eq!(
            err,
            CcipError::IndexRequired { message_id: message_id(2), version: ProtocolVersion::V2_0 }
        );
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        let index = Arc::new(TestIndex::new());
        let result = IndexedVerifierResult {
            verifier: "0x00000000000000000000000000000000000000e5".to_string(),
            data: Bytes::from_static(b"attestation"),
        };
        index.state().execution_inputs.insert(
            message_id(2),
            ExecutionInputs { verifier_results: vec![result.clone()], ..Default::default() },
        );
        let options = ManualExecOptions { use_index: true, ..harness.options(2) };
        let execution =
            harness.executor().with_index(index).execute(&options, wallet()).await.unwrap();
        assert_eq!(execution.report.proof, ReportProof::Verifiers { results: vec![result.into()] });
        assert!(harness.dest.state().executions[0].report.merkle().is_none());
    }

    #[tokio::test]
    async fn test_destination_of_another_family() {
        let lane = Lane { dest_chain_selector: SOLANA_DEVNET, ..lane(ProtocolVersion::V2_0) };
        let mut sent = message(&lane, 1);
        sent.receiver = ChainAddress::from_bytes(ChainFamily::Solana, &[0xd2; 32]).unwrap();
        let source = Arc::new(TestChain::new(SEPOLIA));
        deploy_on_ramp(&source, ProtocolVersion::V2_0);
        source.insert_logs([send_log(&sent, 1, 0)]);
        let dest = Arc::new(TestChain::new(SOLANA_DEVNET));
        let evm = Arc::new(TestConnector::new(ChainFamily::Evm).with_chain("sepolia", source));
        let solana =
            Arc::new(TestConnector::new(ChainFamily::Solana).with_chain("devnet", dest.clone()));

        let off_ramp = ChainAddress::from_bytes(ChainFamily::Solana, &[0xb1; 32]).unwrap();
        let result = IndexedVerifierResult {
            verifier: "0x00000000000000000000000000000000000000e5".to_string(),
            data: Bytes::from_static(b"attestation"),
        };
        let index = Arc::new(TestIndex::new());
        index.state().execution_inputs.insert(
            message_id(1),
            ExecutionInputs {
                off_ramp_address: Some(off_ramp.to_string()),
                verifier_results: vec![result],
                ..Default::default()
            },
        );

        let executor = ManualExecutor::new(vec![
            evm.clone() as Arc<dyn ChainConnector>,
            solana.clone() as Arc<dyn ChainConnector>,
        ])
        .with_retry(RetryConfig::none())
        .with_index(index);
        let options = ManualExecOptions {
            tx_hash: Some(TestChain::tx_hash_at(1, 0)),
            use_index: true,
            ..ManualExecOptions::new(message_id(1), ["sepolia", "devnet"])
        };
        let execution = executor.execute(&options, wallet()).await.unwrap();
        assert_eq!(execution.off_ramp, off_ramp);
        assert_eq!(execution.request.lane.dest_chain_selector, SOLANA_DEVNET);
        assert_eq!(execution.request.message.receiver, sent.receiver);

        let state = dest.state();
        assert_eq!(state.executions.len(), 1);
        assert_eq!(state.executions[0].off_ramp, off_ramp);
        drop(state);
        assert!(!solana.attempts().is_empty());
        assert!(dest.is_closed());
    }
}
