//! Signers for testing.

use crate::{
    traits::{Chain, Reconnectable, Wallet},
    CcipResult,
};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// A signer that only carries an address.
///
/// A reconnectable wallet rebinds to a chain by suffixing its address with the network name.
#[derive(Debug, Default)]
pub struct TestWallet {
    address: String,
    reconnectable: bool,
    reconnects: AtomicUsize,
}

impl TestWallet {
    /// Creates a signer that cannot be rebound.
    pub fn new(address: &str) -> Self {
        Self { address: address.to_string(), ..Default::default() }
    }

    /// Creates a signer that can be rebound to other chains.
    pub fn reconnectable(address: &str) -> Self {
        Self { address: address.to_string(), reconnectable: true, ..Default::default() }
    }

    /// Returns how many times the signer was rebound.
    pub fn reconnects(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }
}

impl Wallet for TestWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn as_reconnectable(&self) -> Option<&dyn Reconnectable> {
        self.reconnectable.then_some(self as &dyn Reconnectable)
    }
}

#[async_trait]
impl Reconnectable for TestWallet {
    async fn reconnect(&self, chain: Arc<dyn Chain>) -> CcipResult<Arc<dyn Wallet>> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Self::new(&format!("{}@{}", self.address, chain.network().name))))
    }
}
