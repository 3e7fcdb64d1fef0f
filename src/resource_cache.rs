//! The [ResourceCache] maps string keys to reference counted handles, and decides when to evict them.
//!
//! It never asks callers to release anything.  Instead a sweep looks at each stored handle: if anyone outside the
//! cache still holds a clone, the count is above 1 and the entry stays no matter how old it is.  Otherwise the entry is
//! evicted once it has gone unused for a TTL.
//!
//! Entries requested with [Activation::Lifetime] are marked [LastUsed::Active] rather than stamped with a time.  The
//! first sweep to find such an entry unreferenced stamps it with the sweep's time, so it gets one full TTL after its
//! holders let go rather than after it was requested.
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::{info, trace};

use crate::*;

type CacheHashMap<V> = HashMap<String, V, ahash::RandomState>;

/// When an entry was last used.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LastUsed {
    /// Requested by a long-lived holder; the next sweep checks whether it is still held before aging it.
    Active,
    At(Timestamp),
}

/// How a request intends to use the resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Activation {
    /// The resource is used right away.  Its TTL starts now.
    Momentary,
    /// The resource is held across many ticks.  Its TTL starts once a sweep finds nobody holding it.
    Lifetime,
}

impl Activation {
    fn last_used(self, now: Timestamp) -> LastUsed {
        match self {
            Activation::Momentary => LastUsed::At(now),
            Activation::Lifetime => LastUsed::Active,
        }
    }
}

#[derive(Debug)]
pub struct CacheEntry<H> {
    resource: H,
    last_used: LastUsed,
}

impl<H> CacheEntry<H> {
    pub fn resource(&self) -> &H {
        &self.resource
    }

    pub fn last_used(&self) -> LastUsed {
        self.last_used
    }
}

#[derive(Debug)]
pub struct ResourceCache<H> {
    entries: CacheHashMap<CacheEntry<H>>,
}

impl<H> Default for ResourceCache<H> {
    fn default() -> Self {
        ResourceCache {
            entries: Default::default(),
        }
    }
}

impl<H: CacheHandle> ResourceCache<H> {
    pub fn new() -> ResourceCache<H> {
        Default::default()
    }

    /// Get a new handle to a cached resource.  Doesn't count as a use; see [ResourceCache::touch].
    pub fn try_get(&self, key: &str) -> Option<H> {
        self.entries.get(key).map(|e| e.resource.clone())
    }

    /// Add a new entry.
    ///
    /// # Panics
    ///
    /// If `key` is already present.  Deduplicating requests is the caller's job.
    pub fn insert(&mut self, key: String, resource: H, activation: Activation, now: Timestamp) {
        match self.entries.entry(key) {
            Entry::Occupied(e) => panic!("{}: inserted into the cache twice", e.key()),
            Entry::Vacant(e) => {
                e.insert(CacheEntry {
                    resource,
                    last_used: activation.last_used(now),
                });
            }
        }
    }

    /// Record a use of an entry.  Returns false if the key isn't cached.
    pub fn touch(&mut self, key: &str, activation: Activation, now: Timestamp) -> bool {
        match self.entries.get_mut(key) {
            Some(e) => {
                e.last_used = activation.last_used(now);
                true
            }
            None => false,
        }
    }

    /// Evict every entry which nobody outside the cache holds and which has been unused for longer than `ttl`
    /// milliseconds.  Returns how many entries were evicted.
    ///
    /// Dropping an evicted entry releases the cache's handle, which destroys the resource if that was the last one.
    pub fn garbage_collect(&mut self, now: Timestamp, ttl: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            if entry.resource.is_loaded() && !entry.resource.is_unique() {
                return true;
            }

            match entry.last_used {
                LastUsed::Active => {
                    trace!("{}: unused", key);
                    entry.last_used = LastUsed::At(now);
                    true
                }
                LastUsed::At(t) if now > t.saturating_add(ttl) => {
                    info!("{}: purged", key);
                    false
                }
                LastUsed::At(_) => true,
            }
        });
        before - self.entries.len()
    }

    /// Remove an entry regardless of who holds it, returning the cache's handle.
    pub fn remove(&mut self, key: &str) -> Option<H> {
        self.entries.remove(key).map(|e| e.resource)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<H>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    type Handle = CompactLocalRc<String>;

    fn resource(s: &str) -> Handle {
        Handle::new(s.to_string())
    }

    #[test]
    fn try_get_does_not_touch() {
        let mut cache = ResourceCache::new();
        cache.insert("a".into(), resource("a"), Activation::Momentary, 10);

        let h = cache.try_get("a").expect("Should be cached");
        assert_eq!(&*h, "a");
        assert_eq!(h.ref_count(), 2);
        assert_eq!(cache.entry("a").unwrap().last_used(), LastUsed::At(10));
        assert!(cache.try_get("b").is_none());
    }

    #[test]
    #[should_panic(expected = "inserted into the cache twice")]
    fn duplicate_insert_panics() {
        let mut cache = ResourceCache::new();
        cache.insert("a".into(), resource("a"), Activation::Momentary, 0);
        cache.insert("a".into(), resource("a"), Activation::Lifetime, 0);
    }

    #[test]
    fn touch_sets_last_used() {
        let mut cache = ResourceCache::new();
        cache.insert("a".into(), resource("a"), Activation::Lifetime, 0);
        assert_eq!(cache.entry("a").unwrap().last_used(), LastUsed::Active);

        assert!(cache.touch("a", Activation::Momentary, 50));
        assert_eq!(cache.entry("a").unwrap().last_used(), LastUsed::At(50));
        assert!(cache.touch("a", Activation::Lifetime, 60));
        assert_eq!(cache.entry("a").unwrap().last_used(), LastUsed::Active);
        assert!(!cache.touch("missing", Activation::Momentary, 60));
    }

    #[test]
    fn eviction_waits_for_ttl() {
        let mut cache = ResourceCache::new();
        cache.insert("x".into(), resource("x"), Activation::Momentary, 0);

        assert_eq!(cache.garbage_collect(500, 1000), 0);
        // The TTL must be strictly exceeded.
        assert_eq!(cache.garbage_collect(1000, 1000), 0);
        assert!(cache.contains_key("x"));
        assert_eq!(cache.garbage_collect(1001, 1000), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn held_entries_are_never_evicted() {
        let mut cache = ResourceCache::new();
        cache.insert("y".into(), resource("y"), Activation::Lifetime, 0);
        cache.insert("z".into(), resource("z"), Activation::Momentary, 0);
        let held_y = cache.try_get("y").unwrap();
        let held_z = cache.try_get("z").unwrap();

        for now in &[0, 10_000, 1_000_000, u64::MAX] {
            assert_eq!(cache.garbage_collect(*now, 1000), 0);
        }
        // Being held keeps `Active` from being demoted.
        assert_eq!(cache.entry("y").unwrap().last_used(), LastUsed::Active);

        drop(held_z);
        assert_eq!(cache.garbage_collect(2000, 1000), 1);
        assert!(!cache.contains_key("z"));
        assert_eq!(&*held_y, "y");
    }

    #[test]
    fn active_entries_get_a_grace_period() {
        let mut cache = ResourceCache::new();
        cache.insert("y".into(), resource("y"), Activation::Lifetime, 0);

        // The first sweep only demotes.
        assert_eq!(cache.garbage_collect(5000, 1000), 0);
        assert_eq!(cache.entry("y").unwrap().last_used(), LastUsed::At(5000));
        assert_eq!(cache.garbage_collect(6000, 1000), 0);
        assert_eq!(cache.garbage_collect(6001, 1000), 1);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = ResourceCache::new();
        let outside = resource("a");
        cache.insert("a".into(), outside.clone(), Activation::Momentary, 0);
        cache.insert("b".into(), resource("b"), Activation::Momentary, 0);
        drop(outside);

        let removed = cache.remove("a").unwrap();
        assert!(removed.unique());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn null_handles_are_evictable() {
        let mut cache = ResourceCache::new();
        cache.insert("gone".into(), Handle::null(), Activation::Lifetime, 0);
        assert_eq!(cache.garbage_collect(0, 10), 0);
        assert_eq!(cache.garbage_collect(11, 10), 1);
    }

    #[test]
    fn keys_lists_entries() {
        let mut cache = ResourceCache::new();
        cache.insert("a".into(), resource("a"), Activation::Momentary, 0);
        cache.insert("b".into(), resource("b"), Activation::Momentary, 0);
        let mut keys = cache.keys().collect::<Vec<_>>();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[derive(Copy, Clone, Debug)]
    enum CacheCommand {
        Hold(u8),
        Release(u8),
        Touch(u8, bool),
        Sweep(u64),
    }

    fn cache_command_strat() -> impl Strategy<Value = CacheCommand> {
        prop_oneof![
            (0..8u8).prop_map(CacheCommand::Hold),
            (0..8u8).prop_map(CacheCommand::Release),
            (0..8u8, any::<bool>()).prop_map(|(k, l)| CacheCommand::Touch(k, l)),
            (0..3000u64).prop_map(CacheCommand::Sweep),
        ]
    }

    // However keys are held, touched and swept, an entry with an outside holder always survives, and an entry
    // evicted by a sweep was unheld and past its TTL.
    proptest! {
        #[test]
        fn held_entries_survive_sweeps(commands in prop::collection::vec(cache_command_strat(), 0..500)) {
            const TTL: u64 = 1000;
            let mut cache = ResourceCache::<Handle>::new();
            let mut held: Vec<Vec<Handle>> = vec![vec![]; 8];
            let mut now = 0u64;

            for k in 0..8u8 {
                cache.insert(k.to_string(), resource(&k.to_string()), Activation::Momentary, now);
            }

            for c in commands {
                match c {
                    CacheCommand::Hold(k) => {
                        if let Some(h) = cache.try_get(&k.to_string()) {
                            held[k as usize].push(h);
                        }
                    }
                    CacheCommand::Release(k) => {
                        held[k as usize].pop();
                    }
                    CacheCommand::Touch(k, lifetime) => {
                        let activation = if lifetime { Activation::Lifetime } else { Activation::Momentary };
                        cache.touch(&k.to_string(), activation, now);
                    }
                    CacheCommand::Sweep(dt) => {
                        now += dt;
                        let before = (0..8u8)
                            .map(|k| cache.entry(&k.to_string()).map(|e| e.last_used()))
                            .collect::<Vec<_>>();
                        cache.garbage_collect(now, TTL);

                        for k in 0..8usize {
                            let present = cache.contains_key(&k.to_string());
                            if !held[k].is_empty() {
                                prop_assert!(before[k].is_none() || present);
                            }
                            if before[k].is_some() && !present {
                                prop_assert!(held[k].is_empty());
                                match before[k] {
                                    Some(LastUsed::At(t)) => prop_assert!(now > t + TTL),
                                    other => prop_assert!(false, "Evicted entry was {:?}", other),
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
