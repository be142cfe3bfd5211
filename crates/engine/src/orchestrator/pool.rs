//! Concurrent chain discovery and the connection pool it fills.

use crate::{
    traits::{Chain, ChainConnector},
    CcipError, CcipResult,
};
use ccip_primitives::{ChainFamily, ChainTransaction, NetworkInfo};
use futures::{future::join_all, stream::FuturesUnordered, StreamExt};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Attempt = JoinHandle<CcipResult<(Arc<dyn Chain>, ChainTransaction)>>;
type Connection = JoinHandle<CcipResult<Option<Arc<dyn Chain>>>>;

/// The chains connected while serving one request, keyed by chain selector.
///
/// The first connection registered for a selector is kept; later ones are closed. Connection
/// attempts that lose the discovery race are never aborted: they keep running and register
/// their chains when they finish, so a chain they reach can still serve as a destination.
#[derive(Debug, Default)]
pub struct ChainPool {
    chains: Mutex<HashMap<u64, Arc<dyn Chain>>>,
    pending: Mutex<Vec<Attempt>>,
    connecting: Mutex<Vec<Connection>>,
}

impl ChainPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `chain`, returning the connection kept for its selector.
    pub async fn insert(&self, chain: Arc<dyn Chain>) -> Arc<dyn Chain> {
        let selector = chain.network().chain_selector;
        let kept = {
            let mut chains = self.chains.lock().unwrap_or_else(PoisonError::into_inner);
            chains.entry(selector).or_insert_with(|| chain.clone()).clone()
        };
        if !Arc::ptr_eq(&kept, &chain) {
            debug!(
                target: "chain-discovery",
                "Closing duplicate connection to {}",
                chain.network().name
            );
            chain.close().await;
        }
        kept
    }

    /// Returns the connected chain of `selector`, if any.
    pub fn get(&self, selector: u64) -> Option<Arc<dyn Chain>> {
        self.chains.lock().unwrap_or_else(PoisonError::into_inner).get(&selector).cloned()
    }

    /// Returns the number of connected chains.
    pub fn len(&self) -> usize {
        self.chains.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no chain is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connects to every endpoint with every connector whose family recognizes `tx_hash`, and
    /// returns the first chain that knows the transaction, with the transaction.
    pub async fn find_transaction(
        self: &Arc<Self>,
        connectors: &[Arc<dyn ChainConnector>],
        endpoints: &[String],
        tx_hash: &str,
    ) -> CcipResult<(Arc<dyn Chain>, ChainTransaction)> {
        let families: Vec<ChainFamily> =
            ChainFamily::ALL.into_iter().filter(|family| family.is_tx_hash(tx_hash)).collect();
        if families.is_empty() {
            return Err(CcipError::InvalidArgument(format!(
                "{tx_hash} is not a transaction hash of any supported family"
            )));
        }

        let mut attempts = FuturesUnordered::new();
        for connector in connectors.iter().filter(|c| families.contains(&c.family())) {
            for endpoint in endpoints {
                attempts.push(self.spawn_attempt(connector.clone(), endpoint.clone(), tx_hash));
            }
        }
        if attempts.is_empty() {
            return Err(CcipError::InvalidArgument(format!(
                "no endpoint to connect to for a {} transaction",
                families.iter().map(ChainFamily::as_str).collect::<Vec<_>>().join(" or ")
            )));
        }
        debug!(
            target: "chain-discovery",
            "Racing {} connection attempts for {tx_hash}",
            attempts.len()
        );

        while let Some(joined) = attempts.next().await {
            match joined {
                Ok(Ok((chain, tx))) => {
                    info!(
                        target: "chain-discovery",
                        "Found {tx_hash} on {} at block {}",
                        chain.network().name,
                        tx.block_number
                    );
                    self.pending
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(attempts.into_iter());
                    return Ok((chain, tx));
                }
                Ok(Err(err)) => debug!(target: "chain-discovery", "Attempt failed: {err}"),
                Err(err) => warn!(target: "chain-discovery", "Attempt panicked: {err}"),
            }
        }
        Err(CcipError::TransactionNotFound(tx_hash.to_string()))
    }

    fn spawn_attempt(
        self: &Arc<Self>,
        connector: Arc<dyn ChainConnector>,
        endpoint: String,
        tx_hash: &str,
    ) -> Attempt {
        let (pool, tx_hash) = (self.clone(), tx_hash.to_string());
        tokio::spawn(async move {
            let chain = connector.connect(&endpoint).await?;
            let chain = pool.insert(chain).await;
            let tx = chain.get_transaction(&tx_hash).await?;
            Ok((chain, tx))
        })
    }

    /// Waits for the attempts that lost the discovery race.
    pub async fn settle(&self) {
        let pending =
            core::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let connecting =
            core::mem::take(&mut *self.connecting.lock().unwrap_or_else(PoisonError::into_inner));
        if pending.len() + connecting.len() > 0 {
            debug!(
                target: "chain-discovery",
                "Settling {} connection attempts",
                pending.len() + connecting.len()
            );
            tokio::join!(join_all(pending), join_all(connecting));
        }
    }

    /// Returns the chain of `selector`, waiting for in-flight attempts if it is not connected
    /// yet.
    pub async fn chain(&self, selector: u64) -> CcipResult<Arc<dyn Chain>> {
        if let Some(chain) = self.get(selector) {
            return Ok(chain);
        }
        self.settle().await;
        self.get(selector).ok_or(CcipError::ChainNotFound(selector))
    }

    /// Returns the chain of `selector`, connecting to it if neither the pool nor the attempts
    /// still in flight reach it.
    ///
    /// Only connectors of the selector's family are raced over `endpoints`. The first connection
    /// to the right network is kept; connections to other networks are closed.
    pub async fn find_chain(
        self: &Arc<Self>,
        connectors: &[Arc<dyn ChainConnector>],
        endpoints: &[String],
        selector: u64,
    ) -> CcipResult<Arc<dyn Chain>> {
        if let Ok(chain) = self.chain(selector).await {
            return Ok(chain);
        }
        let network = NetworkInfo::by_selector(selector)?;

        let mut attempts = FuturesUnordered::new();
        for connector in connectors.iter().filter(|c| c.family() == network.family) {
            for endpoint in endpoints {
                attempts.push(self.spawn_connection(connector.clone(), endpoint.clone(), selector));
            }
        }
        debug!(
            target: "chain-discovery",
            "Racing {} connection attempts for {}",
            attempts.len(),
            network.name
        );

        while let Some(joined) = attempts.next().await {
            match joined {
                Ok(Ok(Some(chain))) => {
                    info!(target: "chain-discovery", "Connected to {}", network.name);
                    self.connecting
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(attempts.into_iter());
                    return Ok(chain);
                }
                Ok(Ok(None)) => {}
                Ok(Err(err)) => debug!(target: "chain-discovery", "Attempt failed: {err}"),
                Err(err) => warn!(target: "chain-discovery", "Attempt panicked: {err}"),
            }
        }
        Err(CcipError::ChainNotFound(selector))
    }

    fn spawn_connection(
        self: &Arc<Self>,
        connector: Arc<dyn ChainConnector>,
        endpoint: String,
        selector: u64,
    ) -> Connection {
        let pool = self.clone();
        tokio::spawn(async move {
            let chain = connector.connect(&endpoint).await?;
            if chain.network().chain_selector != selector {
                chain.close().await;
                return Ok(None);
            }
            Ok(Some(pool.insert(chain).await))
        })
    }

    /// Waits for in-flight attempts, then closes every connection.
    pub async fn close(&self) {
        self.settle().await;
        let chains: Vec<_> = self
            .chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, chain)| chain)
            .collect();
        for chain in chains {
            chain.close().await;
        }
    }
}
