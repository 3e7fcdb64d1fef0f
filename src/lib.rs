//! Reference counted handles and a cache which uses their counts to decide when load-once assets may be dropped.
//!
//! Decoded images, sound samples and songs are expensive to load, used from many places, and should go away some time
//! after nothing uses them.  Asking every user to acquire and release them is fragile: one forgotten release and the
//! asset lives forever, one extra release and it dies while still in use.  This crate avoids the protocol entirely.
//! The cache stores a reference counted handle per key, and the count embedded in that handle already says whether
//! anyone else holds the asset.
//!
//! [Shared] is the handle.  It is generic over its [Count] ([PlainCount] or [AtomicCount]) and its [Layout]
//! ([Separate] for trait objects and custom deleters, [Compact] to save an allocation for concrete types).  The aliases
//! [LocalRc], [CompactLocalRc], [SyncRc] and [CompactSyncRc] cover the four combinations.  [Exclusive] is the
//! move-only counterpart for parts of a resource with exactly one owner.
//!
//! [ResourceCache] is the keyed store and the eviction sweep:
//!
//! - An entry whose handle is held outside the cache is never evicted.
//! - An entry nobody else holds is evicted once it has been unused for longer than the TTL.
//! - An entry requested for its lifetime only starts aging when a sweep first finds it unheld.
//!
//! [ReaderCache] binds a [ResourceCache] to a factory and is what asset subsystems use.  A [Loader] can build such a
//! factory from a [Vfs] and a [Decoder], and a [CacheRegistry] owns an application's caches, sweeping them each tick and
//! releasing them at shutdown.
//!
//! None of the caches are synchronized.  Each one belongs to one thread; loads done elsewhere should be handed to that
//! thread as [SyncRc] or [CompactSyncRc] handles.
mod clock;
mod count;
mod exclusive;
mod filesystem_vfs;
mod loader;
mod reader_cache;
mod registry;
mod resource_cache;
mod shared;
mod traits;

pub use clock::*;
pub use count::*;
pub use exclusive::*;
pub use filesystem_vfs::*;
pub use loader::*;
pub use reader_cache::*;
pub use registry::*;
pub use resource_cache::*;
pub use shared::*;
pub use traits::*;
