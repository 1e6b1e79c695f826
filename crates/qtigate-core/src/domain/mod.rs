// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for qtigate.
//!
//! This module contains the pure content checks. All network access to the
//! asset CDN and the content service is handled via ports (traits) defined
//! in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: Rules see only the document text and its context
//! - **Text, not trees**: Documents are never parsed into a DOM, so malformed
//!   content can still be diagnosed
//! - **Immutable inputs**: Rules borrow the document and never repair it
//!
// Public API - what the world sees
pub mod entities;
pub mod error;
pub mod markup;
pub mod rules;
pub mod svg;
pub mod value_objects;

// Re-exports for convenience
pub use entities::{Diagnostic, ValidationContext, ValidationResult};

pub use error::{BrokenImage, ErrorCategory, ValidationError};

pub use rules::{CONTENT_RULES, ContentRule, RuleFn};

pub use svg::SvgDefect;

pub use value_objects::{
    CHOICE_BOUNDED_INTERACTIONS, INTERACTION_NAMES, QTI_PREFIX, RootTag, is_interaction_element,
};
