//! The manual-execution orchestrator.
//!
//! [ManualExecutor] delivers a message the automated relayers have not delivered yet. It finds
//! the source chain among the caller's endpoints, rebuilds the request, proves it against the
//! destination's commit report (or attaches off-chain verifier results on lanes without
//! on-chain commits) and submits the execution report.

mod pool;
pub use pool::ChainPool;

mod options;
pub use options::{CommitSearch, ManualExecOptions};

mod executor;
pub use executor::{ManualExecution, ManualExecutor};
