use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::Error;

const HEAD: usize = 0;
const TAIL: usize = 1;

#[derive(Debug, Clone)]
struct Node {
    key: Bytes,
    value: Bytes,
    prev: usize,
    next: usize,
}

impl Node {
    fn empty() -> Self {
        Self {
            key: Bytes::new(),
            value: Bytes::new(),
            prev: 0,
            next: 0,
        }
    }
}

struct Inner {
    capacity: usize,
    nodes: Vec<Node>,
    free: Vec<usize>,
    table: HashMap<Bytes, usize>,
}

impl Inner {
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn push_front(&mut self, idx: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[idx].prev = HEAD;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[HEAD].next = idx;
    }

    fn move_to_front(&mut self, idx: usize) {
        self.unlink(idx);
        self.push_front(idx);
    }
}

/// A bounded LRU cache backed by a fixed node arena (`Vec<Node>`) addressed
/// by index rather than a pointer-chasing doubly linked list: nodes `2..N+2`
/// are the live slots, `0`/`1` are permanent head/tail sentinels, and
/// eviction reuses a slot instead of freeing and reallocating.
pub struct LruCache {
    inner: Mutex<Inner>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        let mut nodes = vec![Node::empty(), Node::empty()];
        nodes[HEAD].next = TAIL;
        nodes[TAIL].prev = HEAD;
        Self {
            inner: Mutex::new(Inner {
                capacity,
                nodes,
                free: Vec::new(),
                table: HashMap::with_capacity(capacity),
            }),
        }
    }

    pub fn set(&self, key: Bytes, value: Bytes) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.table.get(&key) {
            inner.nodes[idx].value = value;
            inner.move_to_front(idx);
            return;
        }

        if inner.table.len() < inner.capacity {
            let node = Node {
                key: key.clone(),
                value,
                prev: HEAD,
                next: HEAD,
            };
            let idx = if let Some(idx) = inner.free.pop() {
                inner.nodes[idx] = node;
                idx
            } else {
                inner.nodes.push(node);
                inner.nodes.len() - 1
            };
            inner.push_front(idx);
            inner.table.insert(key, idx);
        } else {
            let lru = inner.nodes[TAIL].prev;
            let old_key = inner.nodes[lru].key.clone();
            inner.table.remove(&old_key);
            inner.unlink(lru);
            inner.nodes[lru].key = key.clone();
            inner.nodes[lru].value = value;
            inner.push_front(lru);
            inner.table.insert(key, lru);
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Bytes, Error> {
        let mut inner = self.inner.lock();
        let idx = *inner.table.get(key).ok_or(Error::NotFound)?;
        inner.move_to_front(idx);
        Ok(inner.nodes[idx].value.clone())
    }

    pub fn del(&self, key: &[u8]) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let idx = inner.table.remove(key).ok_or(Error::NotFound)?;
        inner.unlink(idx);
        inner.free.push(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = LruCache::new(2);
        cache.set(Bytes::from_static(b"a"), Bytes::from_static(b"1"));
        assert_eq!(cache.get(b"a").unwrap(), Bytes::from_static(b"1"));
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let cache = LruCache::new(2);
        cache.set(Bytes::from_static(b"a"), Bytes::from_static(b"1"));
        cache.set(Bytes::from_static(b"b"), Bytes::from_static(b"2"));
        cache.get(b"a").unwrap();
        cache.set(Bytes::from_static(b"c"), Bytes::from_static(b"3"));
        assert!(cache.get(b"b").is_err());
        assert_eq!(cache.get(b"a").unwrap(), Bytes::from_static(b"1"));
        assert_eq!(cache.get(b"c").unwrap(), Bytes::from_static(b"3"));
    }

    #[test]
    fn del_then_reinsert_reuses_slot() {
        let cache = LruCache::new(2);
        cache.set(Bytes::from_static(b"a"), Bytes::from_static(b"1"));
        cache.del(b"a").unwrap();
        assert!(cache.get(b"a").is_err());
        cache.set(Bytes::from_static(b"b"), Bytes::from_static(b"2"));
        cache.set(Bytes::from_static(b"c"), Bytes::from_static(b"3"));
        assert_eq!(cache.get(b"b").unwrap(), Bytes::from_static(b"2"));
        assert_eq!(cache.get(b"c").unwrap(), Bytes::from_static(b"3"));
    }

    #[test]
    fn update_existing_key_moves_to_front_without_growing() {
        let cache = LruCache::new(1);
        cache.set(Bytes::from_static(b"a"), Bytes::from_static(b"1"));
        cache.set(Bytes::from_static(b"a"), Bytes::from_static(b"2"));
        assert_eq!(cache.get(b"a").unwrap(), Bytes::from_static(b"2"));
    }
}
