//! Protocol versions.

use crate::{PrimitivesError, PrimitivesResult};
use core::{fmt, str::FromStr};
use serde::Serialize;

/// A revision of the on-chain protocol contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProtocolVersion {
    /// v1.2.0
    #[serde(rename = "1.2.0")]
    V1_2,
    /// v1.5.0
    #[serde(rename = "1.5.0")]
    V1_5,
    /// v1.6.0
    #[serde(rename = "1.6.0")]
    V1_6,
    /// v2.0.0
    #[serde(rename = "2.0.0")]
    V2_0,
}

impl ProtocolVersion {
    /// Returns the semver string of the version.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V1_2 => "1.2.0",
            Self::V1_5 => "1.5.0",
            Self::V1_6 => "1.6.0",
            Self::V2_0 => "2.0.0",
        }
    }

    /// Whether messages of this version are proven against an on-chain commit report. Later
    /// versions rely on off-chain verifier results instead.
    pub const fn requires_onchain_commit(&self) -> bool {
        !matches!(self, Self::V2_0)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = PrimitivesError;

    /// Parses `1.5.0`, `1.5`, `v1.5.0` or a pre-release such as `1.6.0-dev`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s.trim().trim_start_matches('v');
        let core = core.split_once('-').map_or(core, |(core, _)| core);
        let mut parts = core.split('.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok());
        let minor = parts.next().and_then(|p| p.parse::<u32>().ok());
        match (major, minor) {
            (Some(1), Some(2)) => Ok(Self::V1_2),
            (Some(1), Some(5)) => Ok(Self::V1_5),
            (Some(1), Some(6)) => Ok(Self::V1_6),
            (Some(2), Some(0)) => Ok(Self::V2_0),
            _ => Err(PrimitivesError::InvalidVersion(s.to_string())),
        }
    }
}

/// The result of a contract's `typeAndVersion()` call, e.g. `EVM2EVMOnRamp 1.5.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAndVersion {
    /// The contract type name.
    pub contract_type: String,
    /// The protocol version.
    pub version: ProtocolVersion,
}

impl FromStr for TypeAndVersion {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (contract_type, version) = s
            .trim()
            .rsplit_once(' ')
            .ok_or_else(|| PrimitivesError::InvalidVersion(s.to_string()))?;
        Ok(Self { contract_type: contract_type.to_string(), version: version.parse()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!("1.5.0".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V1_5);
        assert_eq!("v1.2".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V1_2);
        assert_eq!("1.6.0-dev".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V1_6);
        assert_eq!("2.0.0".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V2_0);
        assert!("1.4.0".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn test_type_and_version() {
        let tnv: TypeAndVersion = "EVM2EVMOnRamp 1.5.0".parse().unwrap();
        assert_eq!(tnv.contract_type, "EVM2EVMOnRamp");
        assert_eq!(tnv.version, ProtocolVersion::V1_5);
        assert!("OnRamp".parse::<TypeAndVersion>().is_err());
    }

    #[test]
    fn test_onchain_commit_versions() {
        assert!(ProtocolVersion::V1_2.requires_onchain_commit());
        assert!(ProtocolVersion::V1_6.requires_onchain_commit());
        assert!(!ProtocolVersion::V2_0.requires_onchain_commit());
    }
}
