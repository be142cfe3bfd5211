//! Circle CCTP attestations for USDC transfers.

use crate::http::join;
use alloy_primitives::{keccak256, Bytes, B256};
use alloy_sol_types::{SolEvent, SolType};
use async_trait::async_trait;
use ccip_engine::{traits::OffchainTokenDataProvider, CcipError, CcipResult};
use ccip_primitives::{CcipRequest, ChainAddress, ChainLog, TokenTransfer};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Circle's production attestation service.
pub const IRIS_API_URL: &str = "https://iris-api.circle.com";

/// Circle's testnet attestation service.
pub const IRIS_SANDBOX_API_URL: &str = "https://iris-api-sandbox.circle.com";

mod abi {
    #![allow(missing_docs, unreachable_pub)]

    alloy_sol_types::sol! {
        event MessageSent(bytes message);

        struct MessageAndAttestation {
            bytes message;
            bytes attestation;
        }
    }
}
use abi::{MessageAndAttestation, MessageSent};

#[derive(Debug, Deserialize)]
struct AttestationResponse {
    status: String,
    #[serde(default)]
    attestation: Option<String>,
}

/// Fetches the Circle attestations that release USDC on the destination.
///
/// Each USDC transfer of a message burns through the CCTP `MessageTransmitter`, which emits one
/// `MessageSent` event ahead of the CCIP send event. The transfers are paired in order with the
/// last `MessageSent` events between the previous send event of the same on-ramp and the
/// request's own. The off-chain data of a transfer is the ABI-encoded
/// `(bytes message, bytes attestation)` tuple; other transfers get empty data.
#[derive(Debug, Clone)]
pub struct CctpAttestationProvider {
    base: String,
    inner: Client,
    usdc: HashSet<ChainAddress>,
}

impl CctpAttestationProvider {
    /// Creates a provider querying the attestation service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base: base_url.into(), inner: Client::new(), usdc: HashSet::new() }
    }

    /// Creates a provider for mainnet lanes.
    pub fn production() -> Self {
        Self::new(IRIS_API_URL)
    }

    /// Creates a provider for testnet lanes.
    pub fn sandbox() -> Self {
        Self::new(IRIS_SANDBOX_API_URL)
    }

    /// Treats transfers of `address`, a USDC token or its source pool, as CCTP transfers.
    pub fn with_usdc(mut self, address: impl Into<ChainAddress>) -> Self {
        self.usdc.insert(address.into());
        self
    }

    fn is_usdc(&self, transfer: &TokenTransfer) -> bool {
        [&transfer.token, &transfer.source_pool_address]
            .into_iter()
            .flatten()
            .any(|address| self.usdc.contains(address))
    }

    /// Returns the attestation of the CCTP `message`, failing with
    /// [CcipError::AttestationPending] until Circle has issued it.
    pub async fn attestation(&self, message: &[u8]) -> CcipResult<Bytes> {
        let message_hash = keccak256(message);
        let url = join(&self.base, &format!("v1/attestations/{message_hash}"));
        trace!(target: "cctp", "GET {url}");
        let service_error = |status: Option<StatusCode>, reason: String| {
            CcipError::AttestationService {
                message_hash,
                status: status.map(|status| status.as_u16()),
                reason,
            }
        };

        let response =
            self.inner.get(&url).send().await.map_err(|err| service_error(None, err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(target: "cctp", "Attestation of {message_hash} not known yet");
            return Err(CcipError::AttestationPending(message_hash));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(Some(status), body));
        }
        let body = response.bytes().await.map_err(|err| service_error(None, err.to_string()))?;
        let body: AttestationResponse = serde_json::from_slice(&body)
            .map_err(|err| service_error(Some(status), err.to_string()))?;

        if body.status != "complete" {
            debug!(target: "cctp", "Attestation of {message_hash} is {}", body.status);
            return Err(CcipError::AttestationPending(message_hash));
        }
        let attestation = body
            .attestation
            .ok_or_else(|| service_error(Some(status), "complete without attestation".into()))?;
        attestation
            .parse::<Bytes>()
            .map_err(|err| service_error(Some(status), format!("invalid attestation: {err}")))
    }
}

/// Returns the CCTP messages burned for `request`, in emission order.
fn burned_messages(request: &CcipRequest) -> CcipResult<Vec<Bytes>> {
    let send = &request.log;
    let is_send = |log: &ChainLog| log.address == send.address && log.topic0() == send.topic0();
    let previous_send = request
        .tx
        .logs
        .iter()
        .filter(|log| log.log_index < send.log_index && is_send(log))
        .map(|log| log.log_index)
        .max();

    request
        .tx
        .logs
        .iter()
        .filter(|log| {
            log.log_index < send.log_index
                && previous_send.map_or(true, |previous| log.log_index > previous)
                && log.topic0() == Some(MessageSent::SIGNATURE_HASH)
        })
        .map(|log| {
            MessageSent::decode_raw_log(log.topics.iter().copied(), log.data.as_ref(), true)
                .map(|event| event.message)
                .map_err(|err| CcipError::Decode(format!("MessageSent: {err}")))
        })
        .collect()
}

#[async_trait]
impl OffchainTokenDataProvider for CctpAttestationProvider {
    async fn fetch(&self, request: &CcipRequest) -> CcipResult<Vec<Bytes>> {
        let transfers = &request.message.token_amounts;
        let mut data = vec![Bytes::new(); transfers.len()];
        let usdc: Vec<usize> = transfers
            .iter()
            .enumerate()
            .filter(|(_, transfer)| self.is_usdc(transfer))
            .map(|(index, _)| index)
            .collect();
        if usdc.is_empty() {
            return Ok(data);
        }

        let burned = burned_messages(request)?;
        if burned.len() < usdc.len() {
            return Err(CcipError::Decode(format!(
                "{} USDC transfers but {} MessageSent events for message {} in {}",
                usdc.len(),
                burned.len(),
                request.message.message_id(),
                request.tx.hash
            )));
        }
        let burned = &burned[burned.len() - usdc.len()..];

        for (index, message) in usdc.into_iter().zip(burned) {
            let attestation = self.attestation(message).await?;
            debug!(
                target: "cctp",
                "Attested USDC transfer #{index} of {}",
                request.message.message_id()
            );
            data[index] = MessageAndAttestation::abi_encode(&MessageAndAttestation {
                message: message.clone(),
                attestation,
            })
            .into();
        }
        Ok(data)
    }
}
