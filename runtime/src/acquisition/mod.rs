//! HTTP acquisition: the shared client, the conditional-fetch cache, and
//! HTML extraction helpers used by discovery and thumbnail capture.

pub mod cache;
pub mod fetch;
pub mod http_client;
pub mod structured;

pub use cache::{cache_key, CacheEntry, CacheStore, FsCacheStore, MemoryCacheStore};
pub use fetch::{FetchCache, FetchError, FetchOutcome, Freshness, RetryPolicy, MAX_BACKOFF};
pub use http_client::{HttpClient, HttpResponse};
