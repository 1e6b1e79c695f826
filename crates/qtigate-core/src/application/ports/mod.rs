//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `qtigate-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `ContentService`: The assessment-content store used as ground truth
//!   - `AssetFetcher`: Plain HTTP GET for referenced images
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - `ValidationPipeline::run` (see `services::pipeline`)

pub mod output;

pub use output::{AssetFetcher, ContentService, FetchResponse};

#[cfg(test)]
pub use output::{MockAssetFetcher, MockContentService};
