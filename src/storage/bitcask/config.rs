use std::{path::Path, time};

use bytesize::ByteSize;

use super::Bitcask;

/// Configuration for a `Bitcask` instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub(super) bucket_count: usize,
    pub(super) max_data_file_size: ByteSize,
    pub(super) max_hint_file_size: ByteSize,
    pub(super) cache_capacity: usize,
    pub(super) sync: SyncStrategy,
}

/// Control how data is synchronized to disk.
#[derive(Debug, Clone, Copy)]
pub enum SyncStrategy {
    /// Data is flushed to the OS on every write but not forced to stable storage.
    None,
    /// `fsync` after every write.
    Every,
    /// `fsync` at the given interval.
    Interval(time::Duration),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_count: 107,
            max_data_file_size: ByteSize::mib(64),
            max_hint_file_size: ByteSize::mib(32),
            cache_capacity: 100,
            sync: SyncStrategy::None,
        }
    }
}

impl Config {
    /// Open (or create and open) a `Bitcask` database at the given path with
    /// the configured options.
    pub fn open<P>(self, path: P) -> Result<Bitcask, crate::Error>
    where
        P: AsRef<Path> + std::fmt::Debug,
    {
        Bitcask::open(path, self)
    }

    /// Set the number of buckets in the striped index map. Default `107`.
    pub fn bucket_count(&mut self, bucket_count: usize) -> &mut Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Set the max size of a single data segment. Default `64MiB`.
    pub fn max_data_file_size(&mut self, max_data_file_size: ByteSize) -> &mut Self {
        self.max_data_file_size = max_data_file_size;
        self
    }

    /// Set the max size of a single hint segment. Default `32MiB`.
    pub fn max_hint_file_size(&mut self, max_hint_file_size: ByteSize) -> &mut Self {
        self.max_hint_file_size = max_hint_file_size;
        self
    }

    /// Set the number of entries held by the LRU read cache. Default `100`.
    pub fn cache_capacity(&mut self, cache_capacity: usize) -> &mut Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Set the synchronization strategy. Default `SyncStrategy::None`.
    pub fn sync(&mut self, sync: SyncStrategy) -> &mut Self {
        self.sync = sync;
        self
    }
}
