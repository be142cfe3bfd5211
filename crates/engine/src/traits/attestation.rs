//! Off-chain token data needed by destination token pools.

use crate::CcipResult;
use alloy_primitives::Bytes;
use async_trait::async_trait;
use ccip_primitives::CcipRequest;
use core::fmt::Debug;

/// Fetches the off-chain data (attestations) required to release the tokens of a request.
#[async_trait]
pub trait OffchainTokenDataProvider: Debug + Send + Sync {
    /// Returns one entry per token transfer of `request.message`, empty where none is needed.
    async fn fetch(&self, request: &CcipRequest) -> CcipResult<Vec<Bytes>>;
}

/// A provider for lanes whose tokens need no off-chain data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOffchainTokenData;

#[async_trait]
impl OffchainTokenDataProvider for NoOffchainTokenData {
    async fn fetch(&self, request: &CcipRequest) -> CcipResult<Vec<Bytes>> {
        Ok(vec![Bytes::new(); request.message.token_amounts.len()])
    }
}
