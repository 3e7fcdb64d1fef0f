//! The seams between the caches and the rest of an engine.
//!
//! [CacheHandle] is what the caches store.  They infer liveness from its reference count: a handle whose count is
//! exactly 1 is only held by the cache.
//!
//! [Vfs] and [Decoder] are how a [Loader](crate::Loader) gets from a string key to a decoded resource.
use std::io::{Error, Read};

use crate::*;

/// A cloneable, reference counted handle to a resource which may be absent.
///
/// An absent handle is how a failed load is reported, and is never stored by a
/// [ReaderCache](crate::ReaderCache).
pub trait CacheHandle: Clone {
    /// Does this handle point at a resource?
    fn is_loaded(&self) -> bool;

    /// How many handles share the resource.  0 for an absent handle.
    fn ref_count(&self) -> usize;

    fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> CacheHandle for Shared<T, C, L> {
    fn is_loaded(&self) -> bool {
        !self.is_null()
    }

    fn ref_count(&self) -> usize {
        Shared::ref_count(self)
    }
}

impl<T: ?Sized> CacheHandle for Option<std::sync::Arc<T>> {
    fn is_loaded(&self) -> bool {
        self.is_some()
    }

    fn ref_count(&self) -> usize {
        self.as_ref().map_or(0, std::sync::Arc::strong_count)
    }
}

impl<T: ?Sized> CacheHandle for Option<std::rc::Rc<T>> {
    fn is_loaded(&self) -> bool {
        self.is_some()
    }

    fn ref_count(&self) -> usize {
        self.as_ref().map_or(0, std::rc::Rc::strong_count)
    }
}

/// "open" a "file" and return a reader over it.
pub trait Vfs {
    type Reader: Read;

    /// Open a file.
    fn open(&self, key: &str) -> Result<Self::Reader, Error>;
}

/// A `Decoder` knows how to get from a reader to a decoded representation in memory.
pub trait Decoder {
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    fn decode<R: Read>(&self, reader: R) -> Result<Self::Output, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_handles() {
        let a = Some(std::sync::Arc::new(1u32));
        assert!(a.is_loaded());
        assert!(a.is_unique());
        let b = a.clone();
        assert_eq!(b.ref_count(), 2);

        let none: Option<std::rc::Rc<str>> = None;
        assert!(!none.is_loaded());
        assert_eq!(none.ref_count(), 0);
        assert!(!none.is_unique());
    }

    #[test]
    fn shared_handles() {
        let a = CompactLocalRc::new(1u32);
        let b = a.clone();
        assert!(CacheHandle::is_loaded(&b));
        assert_eq!(CacheHandle::ref_count(&a), 2);
        assert!(!CacheHandle::is_loaded(&LocalRc::<u32>::null()));
    }
}
