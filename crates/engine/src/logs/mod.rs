//! Lazy, cancellable streaming of chain logs.

mod filter;
pub use filter::{CancelHandle, LogFilter, LogStreamConfig, Watch};

mod stream;
pub use stream::{block_at_or_after, LogStream};
