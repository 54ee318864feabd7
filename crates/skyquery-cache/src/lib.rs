//! Response cache for SkyQuery.
//!
//! Maps an exact query string to the result blob fetched for it, enforcing a
//! single store-wide time-to-live. `FileCache` persists entries across
//! restarts; `MemoryCache` keeps them in-process.

pub mod clock;
pub mod file;
pub mod memory;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileCache;
pub use memory::MemoryCache;
pub use store::{cache_key, CacheEntry, CacheStore, Payload, DEFAULT_TTL};
