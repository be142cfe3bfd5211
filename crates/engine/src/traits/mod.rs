//! Capability traits implemented outside the engine.

mod chain;
pub use chain::{
    Chain, ChainConnector, ExecuteOptions, GasEstimateRequest, LogQuery, OutboundMessage,
    TokenInfo,
};

mod index;
pub use index::{
    ExecutionInputs, IndexApi, IndexedMessage, IndexedVerifierResult, LaneInfo, LaneLatency,
};

mod wallet;
pub use wallet::{Reconnectable, Wallet};

mod attestation;
pub use attestation::{NoOffchainTokenData, OffchainTokenDataProvider};

mod hasher;
pub use hasher::LeafHasher;
