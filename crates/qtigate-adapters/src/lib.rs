//! Infrastructure adapters for qtigate.
//!
//! This crate implements the ports defined in `qtigate-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod content_service;
pub mod fetcher;

// Re-export commonly used adapters
pub use content_service::{HttpContentService, InMemoryContentService};
pub use fetcher::{ReqwestFetcher, StaticFetcher};
