//! Asset fetcher adapters.

mod http;
mod static_map;

pub use http::ReqwestFetcher;
pub use static_map::StaticFetcher;
