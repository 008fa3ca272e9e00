//! Provider adapter trait and its cached wrapper.

use crate::cache::{CacheLookup, CacheParams, ResponseCache};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A third-party data source, seen by the cache as `params -> JSON`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Endpoint label used to namespace this provider's cache entries.
    fn endpoint(&self) -> &str;

    /// Perform the live provider call.
    async fn fetch(&self, params: &CacheParams) -> Result<Value>;
}

/// Boxed adapter for heterogeneous collections.
pub type DynProviderAdapter = std::sync::Arc<dyn ProviderAdapter>;

/// A provider whose responses go through the response cache.
///
/// `fetch` checks the cache, calls the provider on a miss and stores the
/// result. Cache failures only cost latency.
pub struct CachedProvider<P> {
    inner: P,
    cache: ResponseCache,
}

impl<P: ProviderAdapter> CachedProvider<P> {
    pub fn new(inner: P, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    pub async fn fetch(&self, params: &CacheParams) -> Result<CacheLookup> {
        self.cache
            .fetch_through(self.inner.endpoint(), params, move || self.inner.fetch(params))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSource, SqliteCache};
    use crate::error::WayfareError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProviderAdapter for CountingProvider {
        fn endpoint(&self) -> &str {
            "unsplash"
        }

        async fn fetch(&self, params: &CacheParams) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match params.get("query") {
                Some(query) => Ok(json!({"urls": {"regular": format!("https://img/{}", query)}})),
                None => Err(WayfareError::Provider {
                    endpoint: "unsplash".into(),
                    status: Some(400),
                    message: "query is required".into(),
                }),
            }
        }
    }

    fn cached_provider() -> CachedProvider<CountingProvider> {
        let cache = ResponseCache::new(Arc::new(SqliteCache::in_memory().unwrap()));
        CachedProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            cache,
        )
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let provider = cached_provider();
        let params = CacheParams::new().with("query", "kyoto");

        let first = provider.fetch(&params).await.unwrap();
        let second = provider.fetch(&params).await.unwrap();

        assert_eq!(first.source, CacheSource::Miss);
        assert_eq!(second.source, CacheSource::Hit);
        assert_eq!(first.payload, second.payload);
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_errors_are_retried_live() {
        let provider = cached_provider();
        let params = CacheParams::new();

        assert!(provider.fetch(&params).await.is_err());
        assert!(provider.fetch(&params).await.is_err());
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }
}
