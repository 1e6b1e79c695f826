//! Content-service adapters.

mod http;
mod memory;

pub use http::HttpContentService;
pub use memory::InMemoryContentService;
