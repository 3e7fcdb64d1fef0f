//! Counting strategies for [Shared](crate::Shared) handles.
//!
//! A [PlainCount] is a bare integer and is only good for ownership graphs which never leave one thread.  An
//! [AtomicCount] may be incremented and decremented from any thread.  The two must never be mixed for the same object,
//! which the type system enforces by making the count a type parameter of the handle.
use std::cell::Cell;
use std::sync::atomic::{self, AtomicUsize, Ordering};

mod sealed {
    pub trait Sealed {}
}

/// Past this many references we assume something is leaking handles and abort, as `std` does.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// A strong count embedded in the allocation of a shared handle.
pub trait Count: sealed::Sealed {
    /// A count for a freshly created handle.
    fn one() -> Self;

    fn increment(&self);

    /// Decrement, returning true if this call released the last reference.
    fn decrement(&self) -> bool;

    fn get(&self) -> usize;
}

/// Single-threaded count.
#[derive(Debug)]
pub struct PlainCount(Cell<usize>);

impl sealed::Sealed for PlainCount {}

impl Count for PlainCount {
    fn one() -> PlainCount {
        PlainCount(Cell::new(1))
    }

    fn increment(&self) {
        let cur = self.0.get();
        if cur >= MAX_REFCOUNT {
            std::process::abort();
        }
        self.0.set(cur + 1);
    }

    fn decrement(&self) -> bool {
        let cur = self.0.get();
        debug_assert!(cur > 0, "Count decremented past zero");
        self.0.set(cur - 1);
        cur == 1
    }

    fn get(&self) -> usize {
        self.0.get()
    }
}

/// Thread-safe count.
#[derive(Debug)]
pub struct AtomicCount(AtomicUsize);

impl sealed::Sealed for AtomicCount {}

impl Count for AtomicCount {
    fn one() -> AtomicCount {
        AtomicCount(AtomicUsize::new(1))
    }

    fn increment(&self) {
        // A new reference can only be made from an existing one, so nothing needs to be ordered here.
        if self.0.fetch_add(1, Ordering::Relaxed) > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    fn decrement(&self) -> bool {
        if self.0.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }

        // Every other handle's use of the payload happens-before the destruction that follows.
        atomic::fence(Ordering::Acquire);
        true
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<C: Count>() {
        let c = C::one();
        assert_eq!(c.get(), 1);
        c.increment();
        c.increment();
        assert_eq!(c.get(), 3);
        assert!(!c.decrement());
        assert!(!c.decrement());
        assert!(c.decrement());
        assert_eq!(c.get(), 0);
    }

    #[test]
    fn plain_count() {
        exercise::<PlainCount>();
    }

    #[test]
    fn atomic_count() {
        exercise::<AtomicCount>();
    }

    #[test]
    fn atomic_count_across_threads() {
        let count = std::sync::Arc::new(AtomicCount::one());
        let threads = (0..4)
            .map(|_| {
                let count = count.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        count.increment();
                    }
                    for _ in 0..1000 {
                        assert!(!count.decrement());
                    }
                })
            })
            .collect::<Vec<_>>();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(count.get(), 1);
        assert!(count.decrement());
    }
}
