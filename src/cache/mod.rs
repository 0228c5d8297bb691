//! Cache Module
//!
//! Named response stores, their entries and on-disk snapshots.

mod entry;
mod key;
mod snapshot;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{CachedEntry, StoredResponse};
pub use key::CacheKey;
pub use snapshot::{EntrySnapshot, Snapshot, StoreSnapshot};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStorage;

// == Public Constants ==
/// Maximum body size a store accepts for a single entry
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10 MB
