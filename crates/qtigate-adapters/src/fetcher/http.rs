//! HTTP asset fetcher using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::trace;

use qtigate_core::{
    application::{ApplicationError, FetchError, ports::{AssetFetcher, FetchResponse}},
    error::QtiGateResult,
};

/// Production fetcher.
///
/// Image bytes are never buffered: the body is only read when the response
/// is XML or untyped, which is how CDN error documents arrive.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with its own client.
    pub fn new() -> QtiGateResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("qtigate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApplicationError::ClientSetup {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Reuse an existing client (connection pool, proxy settings).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl AssetFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status().as_u16();
        let may_be_error_document = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("xml"));
        trace!(url, status, may_be_error_document, "fetched");

        let body = if may_be_error_document {
            Some(response.text().await.map_err(|e| map_reqwest_error(url, e))?)
        } else {
            None
        };
        Ok(FetchResponse { status, body })
    }
}
