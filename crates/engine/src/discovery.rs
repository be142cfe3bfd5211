//! Off-ramp discovery.
//!
//! Finds the destination contract authorized to deliver the messages of a source on-ramp by
//! walking the router configuration of both chains: from the on-ramp to its source router, over
//! the reverse lane to the destination router, and back through the destination off-ramps until
//! one of them names the original on-ramp as a source.

use crate::{traits::Chain, CcipError, CcipResult};
use ccip_primitives::ChainAddress;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// `(source selector, dest selector, on-ramp)`
type DiscoveryKey = (u64, u64, ChainAddress);

/// Memoized off-ramp discovery.
///
/// Results are cached per `(source, dest, on-ramp)` triple without eviction; the key space is
/// bounded by the deployed lanes. Concurrent lookups of the same triple share one search, and a
/// failed search is not cached.
#[derive(Debug, Default)]
pub struct OffRampDiscovery {
    cache: Mutex<HashMap<DiscoveryKey, Arc<OnceCell<ChainAddress>>>>,
}

impl OffRampDiscovery {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the off-ramp on `dest` that delivers messages of `on_ramp` on `source`.
    pub async fn discover(
        &self,
        source: &dyn Chain,
        dest: &dyn Chain,
        on_ramp: &ChainAddress,
    ) -> CcipResult<ChainAddress> {
        let key = (source.network().chain_selector, dest.network().chain_selector, on_ramp.clone());
        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.entry(key).or_default().clone()
        };
        cell.get_or_try_init(|| search(source, dest, on_ramp)).await.cloned()
    }

    /// Returns the cached off-ramp of the triple, if a search completed.
    pub fn cached(&self, source: u64, dest: u64, on_ramp: &ChainAddress) -> Option<ChainAddress> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(&(source, dest, on_ramp.clone())).and_then(|cell| cell.get().cloned())
    }
}

async fn search(
    source: &dyn Chain,
    dest: &dyn Chain,
    on_ramp: &ChainAddress,
) -> CcipResult<ChainAddress> {
    let source_selector = source.network().chain_selector;
    let dest_selector = dest.network().chain_selector;
    debug!(
        target: "offramp-discovery",
        "Discovering off-ramp for {on_ramp} from {} to {}",
        source.network().name,
        dest.network().name
    );

    let source_router = source.get_router_for_on_ramp(on_ramp, dest_selector).await?;
    let reverse_off_ramps = source.get_off_ramps_for_router(&source_router, dest_selector).await?;

    let mut visited_routers = HashSet::new();
    for reverse_off_ramp in reverse_off_ramps {
        let dest_on_ramps =
            match source.get_on_ramps_for_off_ramp(&reverse_off_ramp, dest_selector).await {
                Ok(on_ramps) => on_ramps,
                Err(err) => {
                    warn!(
                        target: "offramp-discovery",
                        "Skipping off-ramp {reverse_off_ramp}: {err}"
                    );
                    continue;
                }
            };
        for dest_on_ramp in dest_on_ramps {
            let dest_router =
                match dest.get_router_for_on_ramp(&dest_on_ramp, source_selector).await {
                    Ok(router) => router,
                    Err(err) => {
                        warn!(
                            target: "offramp-discovery",
                            "Skipping on-ramp {dest_on_ramp}: {err}"
                        );
                        continue;
                    }
                };
            if !visited_routers.insert(dest_router.clone()) {
                continue;
            }
            if let Some(off_ramp) =
                closing_off_ramp(dest, &dest_router, source_selector, on_ramp).await
            {
                info!(target: "offramp-discovery", "Found off-ramp {off_ramp} for {on_ramp}");
                return Ok(off_ramp);
            }
        }
    }

    Err(CcipError::OffRampNotFound {
        on_ramp: on_ramp.to_string(),
        dest: dest.network().name.to_string(),
    })
}

/// Returns the off-ramp allow-listed on `router` that accepts messages from `on_ramp`.
async fn closing_off_ramp(
    dest: &dyn Chain,
    router: &ChainAddress,
    source_selector: u64,
    on_ramp: &ChainAddress,
) -> Option<ChainAddress> {
    let off_ramps = match dest.get_off_ramps_for_router(router, source_selector).await {
        Ok(off_ramps) => off_ramps,
        Err(err) => {
            warn!(target: "offramp-discovery", "Skipping router {router}: {err}");
            return None;
        }
    };
    for off_ramp in off_ramps {
        match dest.get_on_ramps_for_off_ramp(&off_ramp, source_selector).await {
            Ok(sources) if sources.contains(on_ramp) => return Some(off_ramp),
            Ok(_) => {}
            Err(err) => warn!(target: "offramp-discovery", "Skipping off-ramp {off_ramp}: {err}"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        fixtures::{
            connect_lane, DEST_ROUTER, FUJI, OFF_RAMP, ON_RAMP, SEPOLIA, SOURCE_OFF_RAMP,
            SOURCE_ROUTER,
        },
        CollectingLayer, TestChain, TraceStorage,
    };
    use alloy_primitives::address;
    use tracing::Level;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    fn chains() -> (TestChain, TestChain) {
        let (source, dest) = (TestChain::new(SEPOLIA), TestChain::new(FUJI));
        connect_lane(&source, &dest);
        (source, dest)
    }

    #[tokio::test]
    async fn test_discovers_off_ramp() {
        let (source, dest) = chains();
        let discovery = OffRampDiscovery::new();
        let off_ramp = discovery.discover(&source, &dest, &ON_RAMP.into()).await.unwrap();
        assert_eq!(off_ramp, OFF_RAMP.into());
        assert_eq!(discovery.cached(SEPOLIA, FUJI, &ON_RAMP.into()), Some(OFF_RAMP.into()));
    }

    #[tokio::test]
    async fn test_concurrent_calls_search_once() {
        let (source, dest) = chains();
        let discovery = OffRampDiscovery::new();
        let on_ramp: ChainAddress = ON_RAMP.into();
        let (a, b) = tokio::join!(
            discovery.discover(&source, &dest, &on_ramp),
            discovery.discover(&source, &dest, &on_ramp)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.calls("get_router_for_on_ramp"), 1);
        assert_eq!(dest.calls("get_on_ramps_for_off_ramp"), 1);

        discovery.discover(&source, &dest, &on_ramp).await.unwrap();
        assert_eq!(source.calls("get_router_for_on_ramp"), 1);
    }

    #[tokio::test]
    async fn test_failing_candidates_are_skipped() {
        let (source, dest) = chains();
        let broken = address!("00000000000000000000000000000000000000b3");
        let stale = address!("00000000000000000000000000000000000000b4");
        source
            .state()
            .router_off_ramps
            .insert((SOURCE_ROUTER.into(), FUJI), vec![broken.into(), SOURCE_OFF_RAMP.into()]);
        {
            let mut state = dest.state();
            state
                .router_off_ramps
                .insert((DEST_ROUTER.into(), SEPOLIA), vec![stale.into(), OFF_RAMP.into()]);
            state.off_ramp_sources.insert((stale.into(), SEPOLIA), vec![]);
        }

        let storage = TraceStorage::default();
        let layer = CollectingLayer::new(storage.clone());
        let _guard = tracing_subscriber::registry().with(layer).set_default();
        let off_ramp =
            OffRampDiscovery::new().discover(&source, &dest, &ON_RAMP.into()).await.unwrap();
        assert_eq!(off_ramp, OFF_RAMP.into());
        let warnings = storage.get_by_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Skipping off-ramp"));
    }

    #[tokio::test]
    async fn test_not_found_names_on_ramp_and_dest() {
        let (source, dest) = chains();
        dest.state().off_ramp_sources.insert((OFF_RAMP.into(), SEPOLIA), vec![]);
        let discovery = OffRampDiscovery::new();
        let err = discovery.discover(&source, &dest, &ON_RAMP.into()).await.unwrap_err();
        assert_eq!(
            err,
            CcipError::OffRampNotFound {
                on_ramp: ChainAddress::from(ON_RAMP).to_string(),
                dest: "avalanche-fuji-testnet".to_string(),
            }
        );
        assert_eq!(discovery.cached(SEPOLIA, FUJI, &ON_RAMP.into()), None);
    }
}
