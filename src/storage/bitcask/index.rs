use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::Error;

/// Addressing information for the most recent live `DataRecord` of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub timestamp: i64,
    pub file_id: u32,
    pub offset: u64,
}

/// A concurrent `key -> IndexEntry` map striped into a fixed number of
/// buckets, each guarded by its own reader/writer lock. The bucket for a key
/// is `(sum of squared byte values) mod bucket_count` -- this is the only
/// hash this map is allowed to use, since the wire-compatible hint replay
/// order depends on bucket contents being independent of insertion order.
pub struct StripedMap {
    buckets: Vec<RwLock<HashMap<Bytes, IndexEntry>>>,
}

impl StripedMap {
    pub fn new(bucket_count: usize) -> Self {
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, || RwLock::new(HashMap::new()));
        Self { buckets }
    }

    fn bucket_of(&self, key: &[u8]) -> usize {
        let sum: u64 = key.iter().map(|&b| (b as u64) * (b as u64)).sum();
        (sum % self.buckets.len() as u64) as usize
    }

    pub fn set(&self, key: Bytes, entry: IndexEntry) {
        let bucket = self.bucket_of(&key);
        self.buckets[bucket].write().insert(key, entry);
    }

    pub fn get(&self, key: &[u8]) -> Result<IndexEntry, Error> {
        let bucket = self.bucket_of(key);
        self.buckets[bucket]
            .read()
            .get(key)
            .copied()
            .ok_or(Error::NotFound)
    }

    pub fn del(&self, key: &[u8]) -> Result<IndexEntry, Error> {
        let bucket = self.bucket_of(key);
        self.buckets[bucket]
            .write()
            .remove(key)
            .ok_or(Error::NotFound)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        let bucket = self.bucket_of(key);
        self.buckets[bucket].read().contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.buckets.iter().map(|b| b.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&self) {
        for bucket in &self.buckets {
            bucket.write().clear();
        }
    }

    /// A flat snapshot of every live key and its index entry, taken one
    /// bucket at a time (not under a single global lock).
    pub fn snapshot(&self) -> Vec<(Bytes, IndexEntry)> {
        let mut out = Vec::with_capacity(self.size());
        for bucket in &self.buckets {
            out.extend(bucket.read().iter().map(|(k, v)| (k.clone(), *v)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let map = StripedMap::new(107);
        let entry = IndexEntry {
            timestamp: 1,
            file_id: 0,
            offset: 0,
        };
        map.set(Bytes::from_static(b"alpha"), entry);
        assert_eq!(map.get(b"alpha").unwrap(), entry);
    }

    #[test]
    fn missing_key_is_not_found() {
        let map = StripedMap::new(107);
        assert!(map.get(b"missing").unwrap_err().is_not_found());
    }

    #[test]
    fn del_removes_key() {
        let map = StripedMap::new(107);
        let entry = IndexEntry {
            timestamp: 1,
            file_id: 0,
            offset: 0,
        };
        map.set(Bytes::from_static(b"k"), entry);
        assert_eq!(map.del(b"k").unwrap(), entry);
        assert!(!map.has(b"k"));
    }

    #[test]
    fn bucket_index_always_in_range() {
        let map = StripedMap::new(107);
        for key in ["", "a", "ab", "a much longer key than the others"] {
            let bucket = map.bucket_of(key.as_bytes());
            assert!(bucket < 107);
        }
    }

    #[test]
    fn size_tracks_insertions_and_deletions() {
        let map = StripedMap::new(107);
        for i in 0..50u32 {
            map.set(
                Bytes::from(format!("k{i}")),
                IndexEntry {
                    timestamp: 0,
                    file_id: 0,
                    offset: i as u64,
                },
            );
        }
        assert_eq!(map.size(), 50);
        map.del(b"k0").unwrap();
        assert_eq!(map.size(), 49);
    }
}
