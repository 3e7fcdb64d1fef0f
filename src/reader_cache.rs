//! The [ReaderCache] binds a [ResourceCache] to a factory, which is what asset subsystems actually talk to.
//!
//! Each subsystem keeps one per resource type, asks it for resources by key, and calls
//! [ReaderCache::garbage_collect] once per tick or on some coarser interval.
//!
//! There are two kinds of request:
//!
//! - [ReaderCache::momentary_request] is for resources used right away, like a sound effect.  The TTL starts
//!   immediately, so a caller who wants to keep the resource must keep the handle; holding it defers eviction.
//! - [ReaderCache::lifetime_request] is for resources held across many ticks, like the music of an area.  The TTL only
//!   starts once a sweep finds that nobody holds the resource any more.
//!
//! A factory reports a failed load by returning an absent handle, which is passed back to the caller and never cached,
//! so the next request tries again.  Logging the failure is up to the factory.
use log::debug;

use crate::*;

/// The engine's default TTL: 5 minutes.
pub const DEFAULT_TTL_MS: u64 = 300_000;

/// A factory for resource types which need to be named, e.g. to look a cache up in a [CacheRegistry].
pub type BoxedFactory<H> = Box<dyn FnMut(&str) -> H>;

#[derive(Debug, Clone, derive_builder::Builder)]
pub struct CacheConfig {
    /// Milliseconds an unreferenced entry survives before a sweep evicts it.
    #[builder(default = "DEFAULT_TTL_MS")]
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

pub struct ReaderCache<H, F, K = MonotonicClock> {
    cache: ResourceCache<H>,
    make: F,
    clock: K,
    ttl_ms: u64,
}

impl<H: CacheHandle, F: FnMut(&str) -> H> ReaderCache<H, F, MonotonicClock> {
    pub fn new(make: F, config: CacheConfig) -> ReaderCache<H, F, MonotonicClock> {
        ReaderCache::with_clock(make, config, MonotonicClock::new())
    }
}

impl<H: CacheHandle, F: FnMut(&str) -> H, K: Clock> ReaderCache<H, F, K> {
    pub fn with_clock(make: F, config: CacheConfig, clock: K) -> ReaderCache<H, F, K> {
        ReaderCache {
            cache: ResourceCache::new(),
            make,
            clock,
            ttl_ms: config.ttl_ms,
        }
    }

    /// Get a resource which will be used right away, loading it if necessary.
    pub fn momentary_request(&mut self, key: &str) -> H {
        self.request(key, Activation::Momentary)
    }

    /// Get a resource which the caller intends to hold for a while, loading it if necessary.
    pub fn lifetime_request(&mut self, key: &str) -> H {
        self.request(key, Activation::Lifetime)
    }

    fn request(&mut self, key: &str, activation: Activation) -> H {
        let now = self.clock.now();
        if let Some(x) = self.cache.try_get(key) {
            if x.is_loaded() {
                self.cache.touch(key, activation, now);
                return x;
            }
        }

        debug!("{}: requested", key);
        let made = (self.make)(key);
        if made.is_loaded() {
            // Replaces a null entry left by `put`.
            self.cache.remove(key);
            self.cache
                .insert(key.to_string(), made.clone(), activation, now);
        } else {
            debug!("{}: not loaded, not caching", key);
        }
        made
    }

    /// Cache a resource which was built somewhere other than the factory, replacing any existing entry.
    pub fn put(&mut self, key: &str, resource: H, activation: Activation) {
        let now = self.clock.now();
        self.cache.remove(key);
        self.cache
            .insert(key.to_string(), resource, activation, now);
    }

    /// Sweep the cache with the current time and TTL.  Returns how many entries were evicted.
    pub fn garbage_collect(&mut self) -> usize {
        let now = self.clock.now();
        self.cache.garbage_collect(now, self.ttl_ms)
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Change the TTL.  Takes effect on the next sweep.
    pub fn set_ttl_ms(&mut self, ttl_ms: u64) {
        self.ttl_ms = ttl_ms;
    }

    pub fn remove(&mut self, key: &str) -> Option<H> {
        self.cache.remove(key)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn resource_cache(&self) -> &ResourceCache<H> {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
