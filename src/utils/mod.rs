pub mod key_locks;
pub mod tag_cache;

pub use key_locks::KeyLocks;
pub use tag_cache::TagCache;
