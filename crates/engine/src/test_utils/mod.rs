//! Test utilities for the engine: in-memory collaborators and EVM fixtures.

mod chain;
pub use chain::{
    RecordedExecution, TestChain, TestChainState, TestConnector, BLOCK_TIME, GENESIS_TIMESTAMP,
};

mod index;
pub use index::{TestIndex, TestIndexState};

mod wallet;
pub use wallet::TestWallet;

mod tracing;
pub use tracing::{CollectingLayer, TraceRecord, TraceStorage};

pub mod fixtures;
