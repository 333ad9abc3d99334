//! Conversion memoization with single-flight loading and LRU eviction.
//!
//! Assembled packages are cached by content hash so reconverting identical
//! archive bytes is free and idempotent. The backing store is a
//! `moka::future::Cache`, which gives three properties the converter's
//! callers rely on:
//!
//! - **Single-flight**: N concurrent requests for one key run exactly one
//!   conversion; the rest await the in-flight result.
//! - **Byte-budget LRU**: entries are weighed by atlas pixel memory and
//!   evicted when the configured budget is exceeded.
//! - **Observable eviction**: registered callbacks fire per evicted entry
//!   so render-side collaborators can release GPU textures.
//!
//! Cancelled or failed conversions are never published: moka caches only
//! successful loads, so the next request simply retries.

mod key;

pub use key::PackageKey;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use moka::future::Cache;
use moka::notification::RemovalCause;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::convert::{ConvertError, Converter};
use crate::package::SkinPackage;

/// Default package cache budget: atlas memory for a few dozen skins.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 256 * 1024 * 1024;

/// Default bound on conversions running at once during bulk requests.
pub const DEFAULT_MAX_CONCURRENT_CONVERSIONS: usize = 4;

/// Cache sizing and concurrency configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Byte budget for cached packages, weighed by
    /// [`SkinPackage::size_bytes`].
    pub max_size_bytes: u64,
    /// Upper bound on conversions running concurrently across all keys.
    pub max_concurrent_conversions: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_concurrent_conversions: DEFAULT_MAX_CONCURRENT_CONVERSIONS,
        }
    }
}

impl CacheConfig {
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    pub fn with_max_concurrent_conversions(mut self, limit: usize) -> Self {
        self.max_concurrent_conversions = limit.max(1);
        self
    }
}

/// Errors surfaced by cache lookups.
///
/// `Clone` because one failed in-flight conversion is shared by every
/// caller that was awaiting it.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The underlying conversion failed.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    /// The conversion task could not run to completion (runtime shutdown
    /// or a panic inside the pipeline).
    #[error("conversion task did not complete")]
    TaskFailed,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from cache.
    pub hits: u64,
    /// Conversions actually executed (coalesced waiters count neither as
    /// hit nor miss).
    pub misses: u64,
    /// Entries evicted by the byte budget or explicit invalidation.
    pub evictions: u64,
    /// Current weighted size in bytes.
    pub size_bytes: u64,
    /// Current number of cached packages.
    pub entry_count: u64,
}

/// Callback invoked with the key and weighed size of an evicted package.
pub type EvictionCallback = Box<dyn Fn(&PackageKey, u64) + Send + Sync>;

/// Memoizing front door to the conversion pipeline.
///
/// Explicitly constructed and passed by dependency injection - no global
/// instance - so tests and embedders can run any number of independent
/// caches with their own budgets.
pub struct ConversionCache {
    converter: Arc<Converter>,
    store: Cache<PackageKey, Arc<SkinPackage>>,
    limiter: Arc<Semaphore>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
    callbacks: Arc<RwLock<Vec<EvictionCallback>>>,
}

impl ConversionCache {
    /// Create a cache around a converter.
    pub fn new(converter: Converter, config: CacheConfig) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let callbacks: Arc<RwLock<Vec<EvictionCallback>>> = Arc::new(RwLock::new(Vec::new()));

        let listener_evictions = Arc::clone(&evictions);
        let listener_callbacks = Arc::clone(&callbacks);
        let store = Cache::builder()
            .max_capacity(config.max_size_bytes)
            .weigher(|_key: &PackageKey, package: &Arc<SkinPackage>| {
                package.size_bytes().min(u32::MAX as u64) as u32
            })
            .eviction_listener(move |key: Arc<PackageKey>, package, cause| {
                if cause == RemovalCause::Replaced {
                    return;
                }
                listener_evictions.fetch_add(1, Ordering::Relaxed);
                let size = package.size_bytes();
                debug!(key = %key, size, ?cause, "package evicted");
                for callback in listener_callbacks.read().iter() {
                    callback(&key, size);
                }
            })
            .build();

        Self {
            converter: Arc::new(converter),
            store,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_conversions.max(1))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
            callbacks,
        }
    }

    /// Get the package for an archive, converting on miss.
    ///
    /// Concurrent calls with the same bytes coalesce onto one conversion.
    /// The pipeline runs on the blocking thread pool, bounded by the
    /// configured conversion limit.
    pub async fn get(&self, bytes: &Bytes) -> Result<Arc<SkinPackage>, CacheError> {
        let key = PackageKey::for_bytes(bytes);

        if let Some(package) = self.store.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "package cache hit");
            return Ok(package);
        }

        let result = self
            .store
            .try_get_with(key, self.load(key, bytes))
            .await
            .map_err(|shared: Arc<CacheError>| (*shared).clone());

        // Let pending maintenance settle so the byte budget is enforced
        // promptly after inserts.
        self.store.run_pending_tasks().await;
        result
    }

    /// Run one conversion under the concurrency limit.
    async fn load(&self, key: PackageKey, bytes: &Bytes) -> Result<Arc<SkinPackage>, CacheError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| CacheError::TaskFailed)?;
        self.misses.fetch_add(1, Ordering::Relaxed);

        let converter = Arc::clone(&self.converter);
        let bytes = bytes.clone();
        let package = tokio::task::spawn_blocking(move || converter.convert(&bytes))
            .await
            .map_err(|join_error| {
                warn!(key = %key, %join_error, "conversion task failed");
                CacheError::TaskFailed
            })??;

        info!(key = %key, size = package.size_bytes(), "package converted");
        Ok(Arc::new(package))
    }

    /// Convert many archives, bounded by the configured concurrency limit.
    ///
    /// Distinct keys proceed in parallel; duplicate keys coalesce exactly
    /// like [`ConversionCache::get`]. Results keep input order.
    pub async fn get_many(&self, archives: &[Bytes]) -> Vec<Result<Arc<SkinPackage>, CacheError>> {
        futures::future::join_all(archives.iter().map(|bytes| self.get(bytes))).await
    }

    /// Register a callback observing evictions.
    ///
    /// Callbacks run on whatever task triggers eviction maintenance; keep
    /// them cheap and non-blocking.
    pub fn on_evict(&self, callback: impl Fn(&PackageKey, u64) + Send + Sync + 'static) {
        self.callbacks.write().push(Box::new(callback));
    }

    /// Drop one cached package, notifying eviction observers.
    pub async fn invalidate(&self, key: &PackageKey) {
        self.store.invalidate(key).await;
        self.store.run_pending_tasks().await;
    }

    /// Drop every cached package.
    pub async fn clear(&self) {
        self.store.invalidate_all();
        self.store.run_pending_tasks().await;
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size_bytes: self.store.weighted_size(),
            entry_count: self.store.entry_count(),
        }
    }
}
