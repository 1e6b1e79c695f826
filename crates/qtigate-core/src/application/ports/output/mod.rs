//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `qtigate-adapters` crate provides implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::application::error::{FetchError, ServiceError};

/// Port for the external assessment-content service.
///
/// Implemented by:
/// - `qtigate_adapters::content_service::HttpContentService` (production)
/// - `qtigate_adapters::content_service::InMemoryContentService` (testing, dry runs)
///
/// ## Design Notes
///
/// - There is no upsert: callers update first and create on `NotFound`
/// - `validate_item`/`validate_test` are opaque oracles keyed by the
///   document's declared identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn update_item(&self, identifier: &str, xml: &str) -> Result<(), ServiceError>;

    async fn create_item(&self, xml: &str) -> Result<(), ServiceError>;

    async fn delete_item(&self, identifier: &str) -> Result<(), ServiceError>;

    async fn update_stimulus(
        &self,
        identifier: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError>;

    async fn create_stimulus(
        &self,
        identifier: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError>;

    async fn delete_stimulus(&self, identifier: &str) -> Result<(), ServiceError>;

    /// Submit an item to the oracle; `Err` means it was not accepted.
    async fn validate_item(&self, xml: &str, identifier: &str) -> Result<(), ServiceError>;

    /// Submit a test to the oracle; `Err` means it was not accepted.
    async fn validate_test(&self, xml: &str, identifier: &str) -> Result<(), ServiceError>;
}

/// What a GET returned. The body is only kept when it might be an XML error document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl FetchResponse {
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Port for fetching referenced assets.
///
/// Implemented by:
/// - `qtigate_adapters::fetcher::ReqwestFetcher` (production)
/// - `qtigate_adapters::fetcher::StaticFetcher` (testing)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// GET `url`, giving up after `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}
