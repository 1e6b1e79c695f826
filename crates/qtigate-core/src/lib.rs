//! qtigate Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the qtigate
//! QTI content validation pipeline, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           qtigate-cli (CLI)             │
//! │     (Drives the pipeline per file)      │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (ValidationPipeline, Reachability,     │
//! │   GroundTruth)                          │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │   (Driven: ContentService, AssetFetcher)│
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    qtigate-adapters (Infrastructure)    │
//! │ (HttpContentService, ReqwestFetcher...) │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │   (Content rules, SVG checks, results)  │
//! │              No I/O                     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use qtigate_core::prelude::*;
//!
//! # async fn demo(xml: &str) {
//! let pipeline = ValidationPipeline::offline();
//! let ctx = ValidationContext::new("item-042", RootTag::Item, "Adding fractions");
//!
//! let result = pipeline.run(xml, &ctx).await;
//! for error in result.errors() {
//!     eprintln!("{error}");
//! }
//! # }
//! ```

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        AsyncValidator, ItemStrategy, ReachabilityOptions, ValidationPipeline,
        ports::{AssetFetcher, ContentService, FetchResponse},
    };
    pub use crate::domain::{
        Diagnostic, ErrorCategory, RootTag, ValidationContext, ValidationError, ValidationResult,
    };
    pub use crate::error::{QtiGateError, QtiGateResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
