//! Error types for the `ccip-primitives` crate.

use crate::ChainFamily;
use thiserror::Error;

/// An error produced while parsing or validating a primitive value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitivesError {
    /// The value is not a valid address for the given family.
    #[error("Invalid {family} address: {value}")]
    InvalidAddress {
        /// The family the address was parsed for.
        family: ChainFamily,
        /// The offending input.
        value: String,
    },
    /// No network matches the given key.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
    /// The chain family name is not recognized.
    #[error("Unknown chain family: {0}")]
    UnknownFamily(String),
    /// The protocol version string is not supported.
    #[error("Unsupported protocol version: {0}")]
    InvalidVersion(String),
    /// The block tag is neither a number nor a known finality tag.
    #[error("Invalid block tag: {0}")]
    InvalidBlockTag(String),
}

/// A [Result] alias for the [PrimitivesError] type.
pub type PrimitivesResult<T> = core::result::Result<T, PrimitivesError>;
