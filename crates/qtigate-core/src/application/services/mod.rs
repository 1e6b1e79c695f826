//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain rules and the ports to accomplish the
//! one use case: "validate this document before it reaches production".

pub mod ground_truth;
pub mod pipeline;
pub mod reachability;

pub use ground_truth::{GroundTruthValidator, ItemStrategy};
pub use pipeline::{AsyncValidator, ValidationPipeline, ValidationPipelineBuilder};
pub use reachability::{ReachabilityOptions, ReachabilityValidator};
