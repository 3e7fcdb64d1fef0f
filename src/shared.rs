//! [Shared] is a reference counted handle, generic over how it counts and how it lays out its allocation.
//!
//! The count is a [Count]: [PlainCount] for handles which never leave one thread, [AtomicCount] for everything else.
//!
//! The allocation is a [Layout]:
//!
//! - [Separate] puts the payload in its own `Box` and the count in a small control block next to an optional custom
//!   deleter.  This is the only layout which works for unsized payloads such as `dyn Trait`, `str` or slices.
//! - [Compact] puts the count and the payload in one allocation.  This saves an allocation and an indirection on every
//!   access, but the payload must be sized and the handle always allocates the payload itself.
//!
//! A handle may also be null, which is how the caches in this crate represent a failed load.  Dereferencing a null
//! handle is a bug and panics; use [Shared::get] when null is expected.
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::*;

mod sealed {
    pub trait Sealed {}
}

mod blocks {
    use std::ptr::NonNull;

    pub struct CompactBlock<T, C> {
        pub(super) count: C,
        pub(super) value: T,
    }

    pub(super) enum Deleter<T: ?Sized> {
        Drop,
        Custom(Box<dyn FnOnce(Box<T>) + Send>),
    }

    pub struct Control<T: ?Sized, C> {
        pub(super) count: C,
        pub(super) deleter: Deleter<T>,
    }

    pub struct SeparateBlock<T: ?Sized, C> {
        pub(super) value: NonNull<T>,
        pub(super) control: NonNull<Control<T, C>>,
    }

    impl<T: ?Sized, C> Clone for SeparateBlock<T, C> {
        fn clone(&self) -> Self {
            *self
        }
    }

    impl<T: ?Sized, C> Copy for SeparateBlock<T, C> {}
}

use blocks::*;

/// How a [Shared] handle lays out its payload and count in memory.
///
/// This is sealed: the only implementations are [Compact] and [Separate].
pub trait Layout<T: ?Sized, C: Count>: sealed::Sealed {
    #[doc(hidden)]
    type Block: Copy;

    #[doc(hidden)]
    /// # Safety
    ///
    /// `block` must point at a live allocation.
    unsafe fn count(block: &Self::Block) -> &C;

    #[doc(hidden)]
    /// # Safety
    ///
    /// `block` must point at a live allocation.
    unsafe fn value(block: &Self::Block) -> &T;

    #[doc(hidden)]
    /// # Safety
    ///
    /// Must be called exactly once, by the handle whose decrement released the last reference.
    unsafe fn destroy(block: Self::Block);

    #[doc(hidden)]
    fn address(block: &Self::Block) -> *const ();
}

/// Payload and count share one allocation.  Requires a sized payload and supports no custom deleter.
#[derive(Debug)]
pub enum Compact {}

/// Payload and count are allocated separately.  Supports unsized payloads and custom deleters.
#[derive(Debug)]
pub enum Separate {}

impl sealed::Sealed for Compact {}
impl sealed::Sealed for Separate {}

impl<T, C: Count> Layout<T, C> for Compact {
    type Block = NonNull<CompactBlock<T, C>>;

    unsafe fn count(block: &Self::Block) -> &C {
        &(*block.as_ptr()).count
    }

    unsafe fn value(block: &Self::Block) -> &T {
        &(*block.as_ptr()).value
    }

    unsafe fn destroy(block: Self::Block) {
        drop(Box::from_raw(block.as_ptr()));
    }

    fn address(block: &Self::Block) -> *const () {
        block.as_ptr() as *const ()
    }
}

impl<T: ?Sized, C: Count> Layout<T, C> for Separate {
    type Block = SeparateBlock<T, C>;

    unsafe fn count(block: &Self::Block) -> &C {
        &(*block.control.as_ptr()).count
    }

    unsafe fn value(block: &Self::Block) -> &T {
        &*block.value.as_ptr()
    }

    unsafe fn destroy(block: Self::Block) {
        let control = Box::from_raw(block.control.as_ptr());
        let value = Box::from_raw(block.value.as_ptr());
        let Control { deleter, .. } = *control;
        match deleter {
            Deleter::Drop => drop(value),
            Deleter::Custom(d) => d(value),
        }
    }

    fn address(block: &Self::Block) -> *const () {
        block.control.as_ptr() as *const ()
    }
}

/// A reference counted handle to a heap value.
///
/// Cloning increments the count, dropping decrements it, and the handle whose decrement takes the count to zero
/// destroys the payload.  See the module docs for the meaning of `C` and `L`.
pub struct Shared<T: ?Sized, C: Count = AtomicCount, L: Layout<T, C> = Separate> {
    block: Option<L::Block>,
    _marker: PhantomData<(C, Box<T>)>,
}

/// Single-threaded handle supporting unsized payloads.
pub type LocalRc<T> = Shared<T, PlainCount, Separate>;
/// Single-threaded handle with the count colocated with the payload.
pub type CompactLocalRc<T> = Shared<T, PlainCount, Compact>;
/// Thread-safe handle supporting unsized payloads.
pub type SyncRc<T> = Shared<T, AtomicCount, Separate>;
/// Thread-safe handle with the count colocated with the payload.
pub type CompactSyncRc<T> = Shared<T, AtomicCount, Compact>;

// Only the atomic count makes it sound to share or move the count between threads.  The payload may be dropped on
// whichever thread drops the last handle, and the custom deleter is `Send`.
unsafe impl<T: ?Sized + Send + Sync, L: Layout<T, AtomicCount>> Send for Shared<T, AtomicCount, L> {}
unsafe impl<T: ?Sized + Send + Sync, L: Layout<T, AtomicCount>> Sync for Shared<T, AtomicCount, L> {}

impl<T, C: Count> Shared<T, C, Compact> {
    pub fn new(value: T) -> Shared<T, C, Compact> {
        let block = Box::new(CompactBlock {
            count: C::one(),
            value,
        });
        Shared::from_block(NonNull::from(Box::leak(block)))
    }
}

impl<T, C: Count> Shared<T, C, Separate> {
    pub fn new(value: T) -> Shared<T, C, Separate> {
        Shared::from_box(Box::new(value))
    }
}

impl<T: ?Sized, C: Count> Shared<T, C, Separate> {
    /// Take ownership of an already allocated payload.
    ///
    /// This is how to build handles to trait objects: box the concrete value as `Box<dyn Trait>` first.
    pub fn from_box(value: Box<T>) -> Shared<T, C, Separate> {
        Shared::with_control(value, Deleter::Drop)
    }

    /// Take ownership of a payload which is destroyed by `deleter` instead of by being dropped.
    pub fn with_deleter<D>(value: Box<T>, deleter: D) -> Shared<T, C, Separate>
    where
        D: FnOnce(Box<T>) + Send + 'static,
    {
        Shared::with_control(value, Deleter::Custom(Box::new(deleter)))
    }

    fn with_control(value: Box<T>, deleter: Deleter<T>) -> Shared<T, C, Separate> {
        let control = Box::new(Control {
            count: C::one(),
            deleter,
        });
        Shared::from_block(SeparateBlock {
            value: NonNull::from(Box::leak(value)),
            control: NonNull::from(Box::leak(control)),
        })
    }
}

impl<T: ?Sized, C: Count> From<Box<T>> for Shared<T, C, Separate> {
    fn from(value: Box<T>) -> Self {
        Shared::from_box(value)
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> Shared<T, C, L> {
    fn from_block(block: L::Block) -> Shared<T, C, L> {
        Shared {
            block: Some(block),
            _marker: PhantomData,
        }
    }

    /// A handle to nothing.  Its reference count is 0.
    pub fn null() -> Shared<T, C, L> {
        Shared {
            block: None,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.block.is_none()
    }

    /// Borrow the payload, or `None` for a null handle.
    pub fn get(&self) -> Option<&T> {
        // Safe: we hold a reference, so the allocation outlives the borrow of self.
        self.block.as_ref().map(|b| unsafe { L::value(b) })
    }

    /// The number of handles sharing this payload, or 0 for a null handle.
    pub fn ref_count(&self) -> usize {
        self.block
            .as_ref()
            .map_or(0, |b| unsafe { L::count(b) }.get())
    }

    /// Is this the only handle to the payload?
    pub fn unique(&self) -> bool {
        self.ref_count() == 1
    }

    /// Move the reference out of this handle, leaving it null.
    pub fn take(&mut self) -> Shared<T, C, L> {
        Shared {
            block: self.block.take(),
            _marker: PhantomData,
        }
    }

    /// Drop this handle's reference, leaving it null.
    pub fn reset(&mut self) {
        drop(self.take());
    }

    /// Do both handles refer to the same allocation?  Two null handles are equal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.block.as_ref().map(L::address) == other.block.as_ref().map(L::address)
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> Clone for Shared<T, C, L> {
    fn clone(&self) -> Self {
        if let Some(b) = self.block.as_ref() {
            unsafe { L::count(b) }.increment();
        }
        Shared {
            block: self.block,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> Drop for Shared<T, C, L> {
    fn drop(&mut self) {
        if let Some(b) = self.block.take() {
            if unsafe { L::count(&b) }.decrement() {
                unsafe { L::destroy(b) };
            }
        }
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> Default for Shared<T, C, L> {
    fn default() -> Self {
        Shared::null()
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> Deref for Shared<T, C, L> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(x) => x,
            None => panic!("Dereferenced a null shared handle"),
        }
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> PartialEq for Shared<T, C, L> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: ?Sized, C: Count, L: Layout<T, C>> Eq for Shared<T, C, L> {}

impl<T: ?Sized + fmt::Debug, C: Count, L: Layout<T, C>> fmt::Debug for Shared<T, C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(x) => f
                .debug_struct("Shared")
                .field("ref_count", &self.ref_count())
                .field("value", &x)
                .finish(),
            None => f.write_str("Shared(null)"),
        }
    }
}
