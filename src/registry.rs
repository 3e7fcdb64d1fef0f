//! A [CacheRegistry] owns the caches of an application, one per resource type, so they can be swept together every
//! tick and released together at shutdown.
//!
//! Subsystems find their cache by name and type with [CacheRegistry::get_mut].
use std::any::Any;

use log::{debug, info};

use crate::*;

/// Anything which can be swept and emptied by a [CacheRegistry].
pub trait Sweep: Any {
    /// Run one eviction sweep, returning how many entries were evicted.
    fn garbage_collect(&mut self) -> usize;

    /// Drop every entry.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<H, F, K> Sweep for ReaderCache<H, F, K>
where
    H: CacheHandle + 'static,
    F: FnMut(&str) -> H + 'static,
    K: Clock + 'static,
{
    fn garbage_collect(&mut self) -> usize {
        ReaderCache::garbage_collect(self)
    }

    fn clear(&mut self) {
        ReaderCache::clear(self)
    }

    fn len(&self) -> usize {
        ReaderCache::len(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
pub struct CacheRegistry {
    caches: Vec<(&'static str, Box<dyn Sweep>)>,
}

impl CacheRegistry {
    pub fn new() -> CacheRegistry {
        Default::default()
    }

    /// Take ownership of a cache.
    ///
    /// # Panics
    ///
    /// If a cache is already registered under `name`.
    pub fn register<S: Sweep>(&mut self, name: &'static str, cache: S) {
        assert!(
            self.caches.iter().all(|(n, _)| *n != name),
            "{}: cache registered twice",
            name
        );
        self.caches.push((name, Box::new(cache)));
    }

    /// Find the cache registered under `name`, if it is an `S`.
    pub fn get_mut<S: Sweep>(&mut self, name: &str) -> Option<&mut S> {
        self.caches
            .iter_mut()
            .find(|(n, _)| *n == name)
            .and_then(|(_, c)| c.as_any_mut().downcast_mut::<S>())
    }

    /// Sweep every cache.  Returns how many entries were evicted in total.
    pub fn garbage_collect(&mut self) -> usize {
        let mut evicted = 0;
        for (name, cache) in self.caches.iter_mut() {
            let n = cache.garbage_collect();
            if n > 0 {
                debug!("{}: evicted {} entries", name, n);
            }
            evicted += n;
        }
        evicted
    }

    /// Total entries across all caches.
    pub fn len(&self) -> usize {
        self.caches.iter().map(|(_, c)| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every entry of every cache, returning how many were released.  Resources still held elsewhere live on
    /// until their holders drop them.
    pub fn shutdown(&mut self) -> usize {
        let mut released = 0;
        for (name, cache) in self.caches.iter_mut() {
            if cache.is_empty() {
                continue;
            }
            let n = cache.len();
            cache.clear();
            info!("{}: released {} entries", name, n);
            released += n;
        }
        released
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
