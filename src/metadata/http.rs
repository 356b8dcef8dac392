// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP(S) metadata fetcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, Instrument};
use url::Url;

use super::MetadataFetcher;
use crate::config::constants::METADATA_REQUEST_TIMEOUT;
use crate::errors::MetadataError;
use crate::spans;
use crate::transport::RetryPolicy;
use crate::types::ContentPointer;

/// Fetches metadata documents over HTTP(S).
///
/// On-chain documents are decoded locally. `ipfs://` pointers are served
/// through a gateway when one is configured. Transient failures are retried
/// per the [`RetryPolicy`].
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_market::metadata::HttpMetadataFetcher;
///
/// let fetcher = HttpMetadataFetcher::new(RetryPolicy::from_config(config.metadata_retry.clone()))
///     .with_timeout(config.metadata_timeout)
///     .with_ipfs_gateway("https://ipfs.io/ipfs/".parse()?);
/// ```
#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: Client,
    retry: RetryPolicy,
    timeout: Duration,
    ipfs_gateway: Option<Url>,
}

impl HttpMetadataFetcher {
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_client(Client::new(), retry)
    }

    pub fn with_client(client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            timeout: METADATA_REQUEST_TIMEOUT,
            ipfs_gateway: None,
        }
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gateway prefix that `ipfs://<cid>/<path>` is appended to
    pub fn with_ipfs_gateway(mut self, gateway: Url) -> Self {
        self.ipfs_gateway = Some(gateway);
        self
    }

    /// Maps a pointer URI to the URL actually requested
    fn locate(&self, uri: &str) -> Result<Url, MetadataError> {
        let url = Url::parse(uri).map_err(|e| MetadataError::invalid_pointer(uri, e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            "ipfs" => {
                let gateway = self
                    .ipfs_gateway
                    .as_ref()
                    .ok_or_else(|| MetadataError::invalid_pointer(uri, "no IPFS gateway configured"))?;
                let path = uri.trim_start_matches("ipfs://").trim_start_matches("ipfs/");
                gateway
                    .join(path)
                    .map_err(|e| MetadataError::invalid_pointer(uri, e.to_string()))
            }
            other => Err(MetadataError::invalid_pointer(
                uri,
                format!("unsupported scheme `{other}`"),
            )),
        }
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, MetadataError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MetadataError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                location: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MetadataError::network(url.as_str(), e))?;
        serde_json::from_slice(&body).map_err(|e| MetadataError::decode(url.as_str(), e))
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, pointer: &ContentPointer) -> Result<serde_json::Value, MetadataError> {
        match pointer {
            ContentPointer::OnChain(document) => serde_json::from_slice(document)
                .map_err(|e| MetadataError::decode(pointer.to_string(), e)),
            ContentPointer::Uri(uri) => {
                let url = self.locate(uri)?;
                debug!(url = %url, "Fetching metadata document");
                self.retry
                    .run("metadata fetch", || self.get_json(&url))
                    .instrument(spans::metadata_fetch(pointer))
                    .await
            }
        }
    }
}
