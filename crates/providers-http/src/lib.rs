#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod index;
pub use index::{HttpIndexClient, IndexConfig, DEFAULT_INDEX_URL};

mod cctp;
pub use cctp::{CctpAttestationProvider, IRIS_API_URL, IRIS_SANDBOX_API_URL};

mod http;

#[cfg(test)]
mod test_utils;
