#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod errors;
pub use errors::{PrimitivesError, PrimitivesResult};

mod family;
pub use family::{ChainFamily, Endianness};

mod address;
pub use address::ChainAddress;

mod network;
pub use network::{ChainId, NetworkInfo, NETWORKS};

mod version;
pub use version::{ProtocolVersion, TypeAndVersion};

mod lane;
pub use lane::Lane;

mod extra_args;
pub use extra_args::{ExtraArgs, DEFAULT_GAS_LIMIT};

mod message;
pub use message::{CcipMessage, MessageHeader, TokenTransfer};

mod commit;
pub use commit::CommitReport;

mod receipt;
pub use receipt::{ExecutionReceipt, ExecutionState};

mod report;
pub use report::{ExecutionReport, MerkleProofFields, ReportProof, VerifierResult};

mod request;
pub use request::{BlockTag, CcipRequest, ChainLog, ChainTransaction};
