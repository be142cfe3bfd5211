//! A `reqwest` client of the off-chain message index.

use crate::http::{join, retry_after};
use alloy_primitives::B256;
use async_trait::async_trait;
use ccip_engine::{
    retry::{with_retry, RetryConfig},
    traits::{ExecutionInputs, IndexApi, IndexedMessage, LaneInfo, LaneLatency},
    IndexError, IndexResult,
};
use core::time::Duration;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, trace};

/// The public CCIP message index.
pub const DEFAULT_INDEX_URL: &str = "https://api.ccip.chain.link";

/// Configuration of an [HttpIndexClient].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    /// The index API root.
    pub base_url: String,
    /// Per-request timeout.
    #[serde(rename = "timeoutMs", with = "ccip_engine::serde_utils::duration_ms")]
    pub timeout: Duration,
    /// Retries applied by the client to every call. Callers that retry index calls themselves
    /// should leave this at [RetryConfig::none].
    pub retry: RetryConfig,
    /// Set to false to opt out of the index. Every call then fails with
    /// [IndexError::Disabled].
    pub enabled: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDEX_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::none(),
            enabled: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageIdRecord {
    message_id: B256,
}

#[derive(Debug, Deserialize)]
struct MessageIdsResponse {
    data: Vec<MessageIdRecord>,
}

/// An [IndexApi] over the index's HTTP+JSON API.
///
/// | call                    | path                                           |
/// |-------------------------|------------------------------------------------|
/// | `get_message_by_id`     | `v1/messages/{messageId}`                      |
/// | `get_message_ids_in_tx` | `v1/messages?sourceTransactionHash={hash}`     |
/// | `get_execution_inputs`  | `v1/messages/{messageId}/execution-inputs`     |
/// | `get_lane_info`         | `v1/lanes/{source}/{dest}`                     |
/// | `get_lane_latency`      | `v1/lanes/{source}/{dest}/latency`             |
///
/// A 404 answers [IndexError::NotFound]. Other error statuses carry the response body and the
/// `Retry-After` hint.
#[derive(Debug, Clone)]
pub struct HttpIndexClient {
    base: String,
    inner: Client,
    retry: RetryConfig,
    enabled: bool,
}

impl HttpIndexClient {
    /// Creates a client from `config`.
    pub fn new(config: IndexConfig) -> IndexResult<Self> {
        let inner = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        Ok(Self { base: config.base_url, inner, retry: config.retry, enabled: config.enabled })
    }

    /// Returns the API root.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, key: &str) -> IndexResult<T> {
        if !self.enabled {
            return Err(IndexError::Disabled);
        }
        let url = join(&self.base, path);
        with_retry(&self.retry, path, || self.fetch(&url, key)).await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str, key: &str) -> IndexResult<T> {
        trace!(target: "index-client", "GET {url}");
        let response = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let message = response.text().await.unwrap_or_default();
            debug!(target: "index-client", "GET {url} answered {status}: {message}");
            return Err(IndexError::Http { status: status.as_u16(), message, retry_after });
        }

        let body = response.bytes().await.map_err(|err| IndexError::Transport(err.to_string()))?;
        serde_json::from_slice(&body).map_err(|err| IndexError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl IndexApi for HttpIndexClient {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn get_message_by_id(&self, message_id: B256) -> IndexResult<IndexedMessage> {
        self.get(&format!("v1/messages/{message_id}"), &message_id.to_string()).await
    }

    async fn get_message_ids_in_tx(&self, tx_hash: &str) -> IndexResult<Vec<B256>> {
        let response: MessageIdsResponse =
            self.get(&format!("v1/messages?sourceTransactionHash={tx_hash}"), tx_hash).await?;
        Ok(response.data.into_iter().map(|record| record.message_id).collect())
    }

    async fn get_execution_inputs(&self, message_id: B256) -> IndexResult<ExecutionInputs> {
        self.get(&format!("v1/messages/{message_id}/execution-inputs"), &message_id.to_string())
            .await
    }

    async fn get_lane_info(
        &self,
        source_selector: u64,
        dest_selector: u64,
    ) -> IndexResult<LaneInfo> {
        let lane = format!("{source_selector}/{dest_selector}");
        self.get(&format!("v1/lanes/{lane}"), &lane).await
    }

    async fn get_lane_latency(
        &self,
        source_selector: u64,
        dest_selector: u64,
    ) -> IndexResult<LaneLatency> {
        let lane = format!("{source_selector}/{dest_selector}");
        self.get(&format!("v1/lanes/{lane}/latency"), &lane).await
    }
}
