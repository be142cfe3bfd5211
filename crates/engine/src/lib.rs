#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(any(test, feature = "test-utils")), warn(unused_crate_dependencies))]

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::{
        commit::CommitMatcher,
        discovery::OffRampDiscovery,
        errors::{CcipError, CcipResult, ErrorKind},
        logs::{CancelHandle, LogFilter, LogStream, Watch},
        orchestrator::{ChainPool, ManualExecOptions, ManualExecutor},
        retry::{with_retry, RetryConfig},
        traits::{Chain, ChainConnector, IndexApi, LeafHasher, Wallet},
    };
}

mod errors;
pub use errors::{CcipError, CcipResult, ErrorKind, IndexError, IndexResult};

pub mod codec;
pub mod commit;
pub mod discovery;
pub mod families;
pub mod logs;
pub mod orchestrator;
pub mod prover;
pub mod requests;
pub mod retry;
pub mod serde_utils;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
