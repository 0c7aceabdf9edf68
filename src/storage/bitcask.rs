//! A Bitcask-style append-only key-value engine: an in-memory striped index
//! points at the most recent record for each key across a set of append-only
//! data segments, with a parallel hint log for fast recovery and an LRU
//! cache sitting in front of reads.

pub mod cache;
pub mod config;
pub mod env;
pub mod index;
pub mod log;

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

pub use config::{Config, SyncStrategy};

use crate::Error;
use cache::LruCache;
use env::{Environment, FileLock};
use index::{IndexEntry, StripedMap};
use log::{read_data_file, read_hint_file, segment_path, DataRecord, HintRecord, SegmentReader, SegmentWriter};

const DATA_DIR: &str = "data";
const INDEX_DIR: &str = "index";
const LOCK_FILE: &str = "LOCK";
const DATA_PREFIX: &str = "data";
const HINT_PREFIX: &str = "hint";

/// An open Bitcask database. Holds the process-wide advisory lock on its
/// directory for as long as it lives.
pub struct Bitcask {
    path: PathBuf,
    env: Environment,
    index: StripedMap,
    cache: LruCache,
    reader: SegmentReader,
    disk_lock: RwLock<()>,
    data: parking_lot::Mutex<SegmentWriter>,
    hint: parking_lot::Mutex<SegmentWriter>,
    max_data_file_size: u64,
    max_hint_file_size: u64,
    sync: SyncStrategy,
    _lock: FileLock,
}

impl Bitcask {
    /// Open (and if necessary create) a database directory, replaying its
    /// hint logs to rebuild the in-memory index.
    #[instrument(skip(config))]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(path: P, config: Config) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let env = Environment;

        if !env.exists(&path) {
            env.create_dir(&path)?;
        }
        let lock = env.lock(path.join(LOCK_FILE))?;

        let index_dir = path.join(INDEX_DIR);
        let index_files = if env.exists(&index_dir) {
            env.children(&index_dir)?
        } else {
            env.create_dir(&index_dir)?;
            Vec::new()
        };

        let data_dir = path.join(DATA_DIR);
        let data_files = if env.exists(&data_dir) {
            env.children(&data_dir)?
        } else {
            env.create_dir(&data_dir)?;
            Vec::new()
        };

        let index = StripedMap::new(config.bucket_count);
        replay(&index, &index_dir, &data_dir, &index_files, &data_files)?;

        let hint_id = env.max_id(&index_files, HINT_PREFIX) as u32;
        let active_id = env.max_id(&data_files, DATA_PREFIX) as u32;

        let max_data_file_size = config.max_data_file_size.as_u64();
        let max_hint_file_size = config.max_hint_file_size.as_u64();

        let data_writer =
            SegmentWriter::with_sync(&data_dir, DATA_PREFIX, active_id, max_data_file_size, config.sync)?;
        let hint_writer =
            SegmentWriter::with_sync(&index_dir, HINT_PREFIX, hint_id, max_hint_file_size, config.sync)?;

        info!(keys = index.size(), "opened bitcask database");

        Ok(Self {
            path,
            env,
            index,
            cache: LruCache::new(config.cache_capacity),
            reader: SegmentReader::new(&data_dir),
            disk_lock: RwLock::new(()),
            data: parking_lot::Mutex::new(data_writer),
            hint: parking_lot::Mutex::new(hint_writer),
            max_data_file_size,
            max_hint_file_size,
            sync: config.sync,
            _lock: lock,
        })
    }

    pub fn set(&self, key: Bytes, value: Bytes) -> Result<(), Error> {
        let timestamp = self.env.timestamp();
        let record = DataRecord {
            timestamp,
            key: key.clone(),
            value: value.clone(),
        };

        let (file_id, offset) = {
            let _guard = self.disk_lock.write();
            let (file_id, offset) = self.data.lock().append_data(&record)?;
            let hint = HintRecord {
                timestamp,
                key: key.clone(),
                file_id,
                offset,
                valid: true,
            };
            self.hint.lock().append_hint(&hint)?;
            (file_id, offset)
        };

        self.index.set(
            key.clone(),
            IndexEntry {
                timestamp,
                file_id,
                offset,
            },
        );
        self.cache.set(key, value);
        debug!(file_id, offset, "set");
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Bytes, Error> {
        if let Ok(value) = self.cache.get(key) {
            return Ok(value);
        }

        let entry = self.index.get(key)?;
        let _guard = self.disk_lock.read();
        self.reader.read_value(entry.file_id, entry.offset)
    }

    pub fn del(&self, key: &[u8]) -> Result<(), Error> {
        let _ = self.cache.del(key);

        let entry = self.index.get(key)?;
        let timestamp = self.env.timestamp();
        let hint = HintRecord {
            timestamp,
            key: Bytes::copy_from_slice(key),
            file_id: entry.file_id,
            offset: entry.offset,
            valid: false,
        };
        {
            let _guard = self.disk_lock.write();
            self.hint.lock().append_hint(&hint)?;
        }
        self.index.del(key)?;
        Ok(())
    }

    /// Compact the store down to exactly its live key set. Not safe to call
    /// concurrently with `set`/`del`/`get` from other callers -- the engine
    /// does not itself serialize against that, matching the manual,
    /// externally-synchronized contract of the store this descends from.
    #[instrument(skip(self))]
    pub fn merge(&self) -> Result<(), Error> {
        let snapshot = self.index.snapshot();
        info!(keys = snapshot.len(), "starting merge");
        let mut live = Vec::with_capacity(snapshot.len());
        for (key, _) in &snapshot {
            let value = self.get(key)?;
            live.push((key.clone(), value));
        }

        let data_dir = self.path.join(DATA_DIR);
        let index_dir = self.path.join(INDEX_DIR);
        for name in self.env.children(&data_dir)? {
            fs::remove_file(data_dir.join(&name)).map_err(Error::Io)?;
        }
        for name in self.env.children(&index_dir)? {
            fs::remove_file(index_dir.join(&name)).map_err(Error::Io)?;
        }

        *self.data.lock() =
            SegmentWriter::with_sync(&data_dir, DATA_PREFIX, 0, self.max_data_file_size, self.sync)?;
        *self.hint.lock() =
            SegmentWriter::with_sync(&index_dir, HINT_PREFIX, 0, self.max_hint_file_size, self.sync)?;
        self.index.clear();

        let rewritten = live.len();
        for (key, value) in live {
            self.set(key, value)?;
        }
        info!(rewritten, "merge complete");
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn close(self) {
        // Writers and the lock are released by `Drop`.
    }
}

/// Rebuild the index by replaying hint segments in ascending id order, in
/// on-disk append order within each segment. If a data segment has no
/// corresponding hint segment at all, scan that data segment directly so a
/// crash between writing the active data segment and its active hint
/// segment does not silently lose entries.
fn replay(
    index: &StripedMap,
    index_dir: &Path,
    data_dir: &Path,
    index_files: &[String],
    data_files: &[String],
) -> Result<(), Error> {
    let mut hint_ids: Vec<u32> = index_files
        .iter()
        .filter_map(|name| name.strip_prefix(HINT_PREFIX))
        .filter_map(|suffix| suffix.parse().ok())
        .collect();
    hint_ids.sort_unstable();

    for id in &hint_ids {
        let path = segment_path(index_dir, HINT_PREFIX, *id);
        for record in read_hint_file(&path)? {
            apply_hint(index, record);
        }
    }

    let mut data_ids: Vec<u32> = data_files
        .iter()
        .filter_map(|name| name.strip_prefix(DATA_PREFIX))
        .filter_map(|suffix| suffix.parse().ok())
        .collect();
    data_ids.sort_unstable();

    for id in data_ids {
        if hint_ids.binary_search(&id).is_err() {
            let path = segment_path(data_dir, DATA_PREFIX, id);
            for (offset, record) in read_data_file(&path)? {
                index.set(
                    record.key,
                    IndexEntry {
                        timestamp: record.timestamp,
                        file_id: id,
                        offset,
                    },
                );
            }
        }
    }

    Ok(())
}

fn apply_hint(index: &StripedMap, record: HintRecord) {
    if record.valid {
        index.set(
            record.key,
            IndexEntry {
                timestamp: record.timestamp,
                file_id: record.file_id,
                offset: record.offset,
            },
        );
    } else {
        let _ = index.del(&record.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open(dir: &Path) -> Bitcask {
        Config::default().open(dir).unwrap()
    }

    #[test]
    fn set_then_get_same_process() {
        let dir = tempdir().unwrap();
        let db = open(dir.path());
        db.set(Bytes::from_static(b"alpha"), Bytes::from_static(b"1")).unwrap();
        assert_eq!(db.get(b"alpha").unwrap(), Bytes::from_static(b"1"));
    }

    #[test]
    fn recovery_preserves_live_keys() {
        let dir = tempdir().unwrap();
        {
            let db = open(dir.path());
            db.set(Bytes::from_static(b"alpha"), Bytes::from_static(b"1")).unwrap();
            db.close();
        }
        let db = open(dir.path());
        assert_eq!(db.get(b"alpha").unwrap(), Bytes::from_static(b"1"));
    }

    #[test]
    fn delete_then_reopen_key_stays_gone() {
        let dir = tempdir().unwrap();
        {
            let db = open(dir.path());
            db.set(Bytes::from_static(b"x"), Bytes::from_static(b"y")).unwrap();
            db.del(b"x").unwrap();
            db.close();
        }
        let db = open(dir.path());
        assert!(db.get(b"x").unwrap_err().is_not_found());
    }

    #[test]
    fn merge_keeps_latest_value_and_collapses_segments() {
        let dir = tempdir().unwrap();
        let db = open(dir.path());
        db.set(Bytes::from_static(b"k"), Bytes::from_static(b"a")).unwrap();
        db.set(Bytes::from_static(b"k"), Bytes::from_static(b"b")).unwrap();
        db.merge().unwrap();
        assert_eq!(db.get(b"k").unwrap(), Bytes::from_static(b"b"));

        let data_files = db.env.children(&dir.path().join(DATA_DIR)).unwrap();
        assert_eq!(data_files.len(), 1);
    }

    #[test]
    fn second_open_on_same_directory_is_an_io_error() {
        let dir = tempdir().unwrap();
        let _first = open(dir.path());
        let second = Config::default().open(dir.path());
        assert!(second.is_err());
    }

    #[test]
    fn concurrent_writers_on_disjoint_keys_all_land() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempdir().unwrap();
        let db = Arc::new(open(dir.path()));
        let mut handles = Vec::new();
        for t in 0..20 {
            let db = db.clone();
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    let key = Bytes::from(format!("t{t}-{i}"));
                    db.set(key, Bytes::from_static(b"v")).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(db.size(), 2000);
    }
}
