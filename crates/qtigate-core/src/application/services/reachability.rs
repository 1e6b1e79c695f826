//! Reachability Validator - every referenced image must resolve.
//!
//! Workflow per unique image URL:
//! 1. GET with a bounded timeout
//! 2. Broken if 403/404, or 200 with a CDN `AccessDenied` XML body; a
//!    request that gets no answer is logged and skipped
//! 3. For a broken URL, try alternate extensions on the same base path and
//!    keep the first that answers 200 with a non-error body
//!
//! All broken URLs are reported together in one error.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::{
    application::{
        error::FetchError,
        ports::{AssetFetcher, FetchResponse},
        services::pipeline::AsyncValidator,
    },
    domain::{
        entities::ValidationContext,
        error::{BrokenImage, ValidationError},
        markup::static_regex,
    },
};

/// Default per-request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Extensions tried, in order, when an image is broken.
pub const DEFAULT_ALTERNATE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityOptions {
    pub timeout: Duration,
    pub alternate_extensions: Vec<String>,
}

impl Default for ReachabilityOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            alternate_extensions: DEFAULT_ALTERNATE_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
        }
    }
}

impl ReachabilityOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Unique absolute image URLs referenced by `src`/`href`: rasters first, then SVGs.
pub fn referenced_images(xml: &str) -> Vec<String> {
    let raster = static_regex!(
        r#"(?i)\b(?:src|href)\s*=\s*["'](https?://[^"'\s<>]+?\.(?:jpe?g|png|gif))["']"#
    );
    let vector = static_regex!(r#"(?i)\b(?:src|href)\s*=\s*["'](https?://[^"'\s<>]+?\.svg)["']"#);

    let mut urls: Vec<String> = Vec::new();
    for re in [raster, vector] {
        for caps in re.captures_iter(xml) {
            let url = caps[1].to_string();
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// CDN-style `<Error><Code>AccessDenied</Code>...</Error>` body.
pub fn is_access_denied(body: Option<&str>) -> bool {
    body.is_some_and(|b| static_regex!(r"(?s)<Error>.*<Code>AccessDenied</Code>").is_match(b))
}

/// URL without its file extension, and the extension (with dot) if any.
fn split_extension(url: &str) -> (&str, Option<&str>) {
    let last_segment = url.rfind('/').map_or(0, |i| i + 1);
    match url[last_segment..].rfind('.') {
        Some(dot) => {
            let (base, ext) = url.split_at(last_segment + dot);
            (base, Some(ext))
        }
        None => (url, None),
    }
}

enum Probe {
    Reachable,
    Broken(u16),
    Unanswered,
}

pub struct ReachabilityValidator {
    fetcher: Arc<dyn AssetFetcher>,
    options: ReachabilityOptions,
}

impl ReachabilityValidator {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, options: ReachabilityOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &ReachabilityOptions {
        &self.options
    }

    async fn probe(&self, url: &str) -> Probe {
        match self.fetcher.fetch(url, self.options.timeout).await {
            Ok(FetchResponse { status, body }) => {
                debug!(url, status, "image probed");
                match status {
                    403 | 404 => Probe::Broken(status),
                    200 if is_access_denied(body.as_deref()) => Probe::Broken(403),
                    _ => Probe::Reachable,
                }
            }
            Err(err @ (FetchError::Timeout { .. } | FetchError::Transport { .. })) => {
                warn!(url, error = %err, "image did not answer; skipping");
                Probe::Unanswered
            }
        }
    }

    /// First alternate extension that actually serves an image.
    async fn find_alternate(&self, url: &str) -> Option<String> {
        let (base, original) = split_extension(url);
        for ext in &self.options.alternate_extensions {
            if original.is_some_and(|o| o.eq_ignore_ascii_case(ext)) {
                continue;
            }
            let candidate = format!("{base}{ext}");
            match self.fetcher.fetch(&candidate, self.options.timeout).await {
                Ok(resp) if resp.status == 200 && !is_access_denied(resp.body.as_deref()) => {
                    debug!(url, alternate = %candidate, "alternate extension resolves");
                    return Some(candidate);
                }
                _ => {}
            }
        }
        None
    }

    /// Check every referenced image and report all broken ones.
    #[instrument(skip_all, fields(id = %ctx.id()))]
    pub async fn check(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
        let urls = referenced_images(xml);
        debug!(count = urls.len(), "checking referenced images");

        let mut broken = Vec::new();
        for url in urls {
            if let Probe::Broken(status) = self.probe(&url).await {
                let suggestion = self.find_alternate(&url).await;
                broken.push(BrokenImage {
                    url,
                    status,
                    suggestion,
                });
            }
        }

        if broken.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::BrokenImages { images: broken })
        }
    }
}

#[async_trait]
impl AsyncValidator for ReachabilityValidator {
    fn name(&self) -> &'static str {
        "reachability"
    }

    async fn validate(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
        self.check(xml, ctx).await
    }
}
