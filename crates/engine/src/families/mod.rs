//! Per-family event codecs.
//!
//! Each [ChainFamily] encodes events, extra arguments and merkle leaves its own way. A
//! [FamilyCodec] captures those conventions without any transport, so the same decoding runs
//! on logs fetched by any [Chain](crate::traits::Chain) implementation.

use crate::{traits::LeafHasher, CcipError, CcipResult};
use alloy_primitives::{Bytes, B256};
use ccip_primitives::{
    CcipMessage, ChainFamily, ChainLog, CommitReport, ExecutionReceipt, ExtraArgs, Lane,
};
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, OnceLock},
};

pub mod evm;
pub use evm::EvmCodec;

mod json;
pub use json::JsonEventCodec;

/// Decoding and encoding conventions of one chain family.
pub trait FamilyCodec: Debug + Send + Sync {
    /// The family this codec speaks for.
    fn family(&self) -> ChainFamily;

    /// First topics of the events that announce a sent message.
    fn message_topics(&self) -> Vec<B256>;

    /// First topics of the events that announce a commit report.
    fn commit_topics(&self) -> Vec<B256>;

    /// First topics of the events that report an execution attempt.
    fn receipt_topics(&self) -> Vec<B256>;

    /// Decodes a send event into a message.
    fn decode_message(&self, log: &ChainLog) -> CcipResult<CcipMessage>;

    /// Decodes a message from the raw payload of a send event.
    fn decode_message_bytes(&self, data: &[u8]) -> CcipResult<CcipMessage>;

    /// Decodes the commit reports of a commit event that belong to `lane`.
    fn decode_commits(&self, log: &ChainLog, lane: &Lane) -> CcipResult<Vec<CommitReport>>;

    /// Decodes an execution event.
    fn decode_receipt(&self, log: &ChainLog) -> CcipResult<ExecutionReceipt>;

    /// Decodes an extra-args blob written by a sender of this family.
    fn decode_extra_args(&self, data: &[u8]) -> CcipResult<ExtraArgs>;

    /// Encodes extra arguments the way a sender of this family would.
    fn encode_extra_args(&self, args: &ExtraArgs) -> CcipResult<Bytes>;

    /// Returns the leaf hasher for messages of `lane` delivered to this family.
    fn leaf_hasher(&self, lane: &Lane) -> CcipResult<Arc<dyn LeafHasher>>;
}

/// The set of family codecs known to the engine.
#[derive(Debug, Clone)]
pub struct FamilyRegistry {
    codecs: HashMap<ChainFamily, Arc<dyn FamilyCodec>>,
}

impl Default for FamilyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(EvmCodec));
        for family in ChainFamily::ALL.into_iter().filter(|f| *f != ChainFamily::Evm) {
            registry.register(Arc::new(JsonEventCodec::new(family)));
        }
        registry
    }
}

impl FamilyRegistry {
    /// Creates a registry without any codec.
    pub fn empty() -> Self {
        Self { codecs: HashMap::new() }
    }

    /// Returns the process-wide registry holding the built-in codecs.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<FamilyRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::default)
    }

    /// Registers `codec`, replacing any codec previously registered for its family.
    pub fn register(&mut self, codec: Arc<dyn FamilyCodec>) {
        self.codecs.insert(codec.family(), codec);
    }

    /// Returns the codec of `family`.
    pub fn get(&self, family: ChainFamily) -> CcipResult<&Arc<dyn FamilyCodec>> {
        self.codecs.get(&family).ok_or(CcipError::Unsupported { family, what: "event decoding" })
    }

    /// Iterates the registered codecs in probing order.
    pub fn codecs(&self) -> impl Iterator<Item = &Arc<dyn FamilyCodec>> + '_ {
        ChainFamily::ALL.into_iter().filter_map(|family| self.codecs.get(&family))
    }
}
