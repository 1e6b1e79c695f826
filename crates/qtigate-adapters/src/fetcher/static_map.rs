//! Canned-response fetcher for testing and dry runs.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;

use qtigate_core::application::{
    FetchError,
    ports::{AssetFetcher, FetchResponse},
};

/// Answers from a fixed URL → response map; unknown URLs get 404.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, FetchResponse>,
    requested: Arc<RwLock<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the response for `url`.
    pub fn with(mut self, url: impl Into<String>, response: FetchResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// Every URL requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        if let Ok(mut requested) = self.requested.write() {
            requested.push(url.to_string());
        }
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_urls_are_missing() {
        let fetcher = StaticFetcher::new().with("https://a/x.png", FetchResponse::new(200));
        let timeout = Duration::from_secs(1);
        assert_eq!(fetcher.fetch("https://a/x.png", timeout).await.unwrap().status, 200);
        assert_eq!(fetcher.fetch("https://a/y.png", timeout).await.unwrap().status, 404);
        assert_eq!(fetcher.requested(), vec!["https://a/x.png", "https://a/y.png"]);
    }
}
