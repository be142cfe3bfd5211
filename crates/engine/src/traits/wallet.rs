//! Signers consumed by the execution path.

use crate::{traits::Chain, CcipResult};
use async_trait::async_trait;
use core::fmt::Debug;
use std::sync::Arc;

/// An opaque signer able to authorize transactions on a chain.
///
/// Key management is the embedder's business; the engine only hands the wallet to
/// [Chain::execute_report] and [Chain::send_message].
pub trait Wallet: Debug + Send + Sync {
    /// Returns the signing account in its native textual encoding.
    fn address(&self) -> String;

    /// Returns the reconnect capability, if the signer is bound to a connection.
    fn as_reconnectable(&self) -> Option<&dyn Reconnectable> {
        None
    }
}

/// A signer bound to a specific chain connection that can rebind itself to another one.
#[async_trait]
pub trait Reconnectable: Send + Sync {
    /// Returns a signer bound to `chain`.
    async fn reconnect(&self, chain: Arc<dyn Chain>) -> CcipResult<Arc<dyn Wallet>>;
}
