//! Application layer for qtigate.
//!
//! This layer contains:
//! - **Services**: The pipeline orchestrator and the network-bound validators
//! - **Ports**: Interface definitions (traits) for the content service and asset fetching
//! - **Errors**: Port and wiring error types
//!
//! The application layer coordinates the domain layer but contains no
//! content rules itself. All rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    AsyncValidator, GroundTruthValidator, ItemStrategy, ReachabilityOptions,
    ReachabilityValidator, ValidationPipeline, ValidationPipelineBuilder,
};

// Re-export port traits (for adapter implementation)
pub use ports::{AssetFetcher, ContentService, FetchResponse};

pub use error::{ApplicationError, FetchError, ServiceError};
