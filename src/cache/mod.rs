//! Cache layer
//!
//! Public aggregate responses (home page, sitemaps) are cached in-process.
//! Every content write clears the `public:` namespace.
//!
//! # Usage
//!
//! ```rust,ignore
//! use immoshift::cache::{create_cache, keys};
//!
//! let cache = create_cache(&config.cache);
//! cache.set(keys::HOME, &home).await?;
//! ```

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Shared cache handle
pub type Cache = MemoryCache;

/// Cache keys
pub mod keys {
    /// Namespace of everything derived from public content
    pub const PUBLIC_PREFIX: &str = "public:";
    pub const HOME: &str = "public:home";

    pub fn sitemap(section: &str) -> String {
        format!("public:sitemap:{}", section)
    }
}

/// Create a cache instance based on configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    Arc::new(MemoryCache::with_ttl(Duration::from_secs(config.ttl_seconds)))
}

/// Drop every cached public response after a content change
pub async fn invalidate_public(cache: &Cache) {
    cache.delete_prefix(keys::PUBLIC_PREFIX).await;
    tracing::debug!("Public cache invalidated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_uses_configured_ttl() {
        let cache = create_cache(&CacheConfig { ttl_seconds: 42 });
        assert_eq!(cache.ttl(), Duration::from_secs(42));
    }

    #[tokio::test]
    async fn test_invalidate_public() {
        let cache = create_cache(&CacheConfig::default());
        cache.set(keys::HOME, &"home").await.unwrap();
        cache.set(&keys::sitemap("all"), &"xml").await.unwrap();

        invalidate_public(&cache).await;

        assert!(cache.get::<String>(keys::HOME).await.unwrap().is_none());
        assert!(cache.get::<String>(&keys::sitemap("all")).await.unwrap().is_none());
    }
}
