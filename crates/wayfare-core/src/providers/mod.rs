//! Third-party data providers behind the response cache.

mod adapter;
mod endpoint;
mod http;

pub use adapter::{CachedProvider, DynProviderAdapter, ProviderAdapter};
pub use endpoint::ProviderEndpoint;
pub use http::{build_http_client, HttpJsonProvider};
