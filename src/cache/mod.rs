mod disk;

pub use disk::{CacheEntry, CacheStats, DiskCache};
pub(crate) use disk::human_readable_size;
