pub mod context;
pub mod report;

pub use context::ValidationContext;
pub use report::{Diagnostic, ValidationResult};
