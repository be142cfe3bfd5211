//! The capability contract every supported ledger family implements.

use crate::{
    families::FamilyRegistry,
    traits::{LeafHasher, Wallet},
    CcipResult,
};
use alloy_primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use ccip_primitives::{
    BlockTag, CcipMessage, ChainAddress, ChainFamily, ChainLog, ChainTransaction, CommitReport,
    ExecutionReceipt, ExecutionReport, ExtraArgs, Lane, NetworkInfo, TypeAndVersion,
};
use core::fmt::Debug;
use std::sync::Arc;

/// A single page of a log query. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Emitting contract, if filtered.
    pub address: Option<ChainAddress>,
    /// Accepted first topics. Empty accepts every event.
    pub topics: Vec<B256>,
    /// First block of the page.
    pub from_block: u64,
    /// Last block of the page.
    pub to_block: u64,
}

/// Token metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// The ticker symbol.
    pub symbol: String,
    /// The number of decimals.
    pub decimals: u8,
    /// The full name, if the token exposes one.
    pub name: Option<String>,
}

/// Overrides applied when executing a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Gas limit for the receiver callback, replacing the message's own.
    pub gas_limit: Option<u64>,
    /// Per-token gas limits for the destination pools, aligned with the token transfers.
    pub token_gas_limits: Vec<Option<u32>>,
}

/// The inputs of a receiver gas estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimateRequest {
    /// The lane the message travels.
    pub lane: Lane,
    /// The destination off-ramp that will call the receiver.
    pub off_ramp: ChainAddress,
    /// The message to deliver.
    pub message: CcipMessage,
}

/// A message ready to be sent through a source router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// The destination network.
    pub dest_chain_selector: u64,
    /// The receiver, in the destination family's encoding.
    pub receiver: ChainAddress,
    /// The data payload.
    pub data: Bytes,
    /// Tokens and amounts to transfer.
    pub token_amounts: Vec<(ChainAddress, U256)>,
    /// The fee token. `None` pays in the native coin.
    pub fee_token: Option<ChainAddress>,
    /// Execution hints.
    pub extra_args: ExtraArgs,
}

/// Describes the functionality of a connection to one network.
///
/// Implementations are supplied per [ChainFamily] by the embedding application; everything
/// decoding-related defaults to the family codec registered in [FamilyRegistry].
#[async_trait]
pub trait Chain: Debug + Send + Sync {
    /// Returns the metadata of the connected network.
    fn network(&self) -> &'static NetworkInfo;

    /// Returns the family of the connected network.
    fn family(&self) -> ChainFamily {
        self.network().family
    }

    /// Fetches a transaction and its logs. Fails with a transient error if it is not known.
    async fn get_transaction(&self, hash: &str) -> CcipResult<ChainTransaction>;

    /// Returns the timestamp, in seconds, of the given block.
    async fn get_block_timestamp(&self, block: BlockTag) -> CcipResult<u64>;

    /// Resolves a block tag into a block number.
    async fn get_block_number(&self, block: BlockTag) -> CcipResult<u64>;

    /// Returns the logs matching one page query, in ascending order.
    async fn get_logs(&self, query: &LogQuery) -> CcipResult<Vec<ChainLog>>;

    /// Reads the `typeAndVersion` of a protocol contract.
    async fn type_and_version(&self, address: &ChainAddress) -> CcipResult<TypeAndVersion>;

    /// Returns the destination selector an on-ramp of a single-lane version serves.
    async fn get_on_ramp_dest_selector(&self, on_ramp: &ChainAddress) -> CcipResult<u64>;

    /// Returns the router an on-ramp is registered on for `dest_selector`.
    async fn get_router_for_on_ramp(
        &self,
        on_ramp: &ChainAddress,
        dest_selector: u64,
    ) -> CcipResult<ChainAddress>;

    /// Returns the router an off-ramp is registered on for `source_selector`.
    async fn get_router_for_off_ramp(
        &self,
        off_ramp: &ChainAddress,
        source_selector: u64,
    ) -> CcipResult<ChainAddress>;

    /// Returns the off-ramps a router allow-lists for messages coming from `source_selector`.
    async fn get_off_ramps_for_router(
        &self,
        router: &ChainAddress,
        source_selector: u64,
    ) -> CcipResult<Vec<ChainAddress>>;

    /// Returns the on-ramp a router forwards messages for `dest_selector` to.
    async fn get_on_ramp_for_router(
        &self,
        router: &ChainAddress,
        dest_selector: u64,
    ) -> CcipResult<ChainAddress>;

    /// Returns the remote on-ramps an off-ramp accepts messages from, encoded in the family of
    /// `source_selector`.
    async fn get_on_ramps_for_off_ramp(
        &self,
        off_ramp: &ChainAddress,
        source_selector: u64,
    ) -> CcipResult<Vec<ChainAddress>>;

    /// Returns the contract holding commit reports for an off-ramp. Versions that commit
    /// through the off-ramp itself return the off-ramp.
    async fn get_commit_store_for_off_ramp(
        &self,
        off_ramp: &ChainAddress,
    ) -> CcipResult<ChainAddress>;

    /// Reads token metadata.
    async fn get_token_info(&self, token: &ChainAddress) -> CcipResult<TokenInfo>;

    /// Returns the balance of `holder` in `token`, or in the native coin when `token` is `None`.
    async fn get_balance(
        &self,
        holder: &ChainAddress,
        token: Option<&ChainAddress>,
    ) -> CcipResult<U256>;

    /// Estimates the gas the receiver consumes handling the message.
    async fn estimate_receive_execution(&self, request: &GasEstimateRequest) -> CcipResult<u64>;

    /// Signs and submits a send through `router`.
    async fn send_message(
        &self,
        router: &ChainAddress,
        message: &OutboundMessage,
        wallet: &dyn Wallet,
    ) -> CcipResult<ChainTransaction>;

    /// Signs and submits a manual execution of `report` on `off_ramp`.
    async fn execute_report(
        &self,
        off_ramp: &ChainAddress,
        report: &ExecutionReport,
        options: &ExecuteOptions,
        wallet: &dyn Wallet,
    ) -> CcipResult<ChainTransaction>;

    /// Decodes a send event emitted by this chain.
    fn decode_message(&self, log: &ChainLog) -> CcipResult<CcipMessage> {
        FamilyRegistry::global().get(self.family())?.decode_message(log)
    }

    /// Decodes a commit event emitted by this chain, keeping the reports of `lane`.
    fn decode_commits(&self, log: &ChainLog, lane: &Lane) -> CcipResult<Vec<CommitReport>> {
        FamilyRegistry::global().get(self.family())?.decode_commits(log, lane)
    }

    /// Decodes an execution state change emitted by this chain.
    fn decode_receipt(&self, log: &ChainLog) -> CcipResult<ExecutionReceipt> {
        FamilyRegistry::global().get(self.family())?.decode_receipt(log)
    }

    /// Returns the hasher producing the leaves this chain's verifier expects for `lane`.
    fn leaf_hasher(&self, lane: &Lane) -> CcipResult<Arc<dyn LeafHasher>> {
        FamilyRegistry::global().get(self.family())?.leaf_hasher(lane)
    }

    /// Releases the connection. Further calls may fail.
    async fn close(&self) {}
}

/// Opens [Chain] connections of one family.
#[async_trait]
pub trait ChainConnector: Debug + Send + Sync {
    /// Returns the family this connector serves.
    fn family(&self) -> ChainFamily;

    /// Connects to `endpoint`.
    async fn connect(&self, endpoint: &str) -> CcipResult<Arc<dyn Chain>>;
}
