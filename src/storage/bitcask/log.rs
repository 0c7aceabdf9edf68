use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::Error;
use super::SyncStrategy;

/// A fully-decoded on-disk data record. `crc` and `magic` are always zero:
/// this format reserves the bytes but does not compute or verify them.
pub struct DataRecord {
    pub timestamp: i64,
    pub key: Bytes,
    pub value: Bytes,
}

impl DataRecord {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        w.write_i64::<LittleEndian>(self.timestamp)?;
        w.write_u32::<LittleEndian>(self.key.len() as u32)?;
        w.write_u32::<LittleEndian>(self.value.len() as u32)?;
        w.write_all(&self.key)?;
        w.write_all(&self.value)?;
        w.write_u32::<LittleEndian>(0)?; // crc
        w.write_u32::<LittleEndian>(0)?; // magic
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let timestamp = r.read_i64::<LittleEndian>()?;
        let key_size = r.read_u32::<LittleEndian>()? as usize;
        let value_size = r.read_u32::<LittleEndian>()? as usize;
        let mut key = vec![0u8; key_size];
        r.read_exact(&mut key)?;
        let mut value = vec![0u8; value_size];
        r.read_exact(&mut value)?;
        let _crc = r.read_u32::<LittleEndian>()?;
        let _magic = r.read_u32::<LittleEndian>()?;
        Ok(Self {
            timestamp,
            key: Bytes::from(key),
            value: Bytes::from(value),
        })
    }

    /// Decode only the value, having already seeked to the record's start.
    fn decode_value_only<R: Read>(r: &mut R) -> Result<Bytes, Error> {
        let _timestamp = r.read_i64::<LittleEndian>()?;
        let key_size = r.read_u32::<LittleEndian>()? as usize;
        let value_size = r.read_u32::<LittleEndian>()? as usize;
        let mut skip = vec![0u8; key_size];
        r.read_exact(&mut skip)?;
        let mut value = vec![0u8; value_size];
        r.read_exact(&mut value)?;
        Ok(Bytes::from(value))
    }
}

/// A fully-decoded hint record: addressing information for one key, plus a
/// tombstone flag.
pub struct HintRecord {
    pub timestamp: i64,
    pub key: Bytes,
    pub file_id: u32,
    pub offset: u64,
    pub valid: bool,
}

impl HintRecord {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        w.write_i64::<LittleEndian>(self.timestamp)?;
        w.write_u32::<LittleEndian>(self.key.len() as u32)?;
        w.write_all(&self.key)?;
        w.write_u32::<LittleEndian>(self.file_id)?;
        w.write_u64::<LittleEndian>(self.offset)?;
        w.write_u8(self.valid as u8)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let timestamp = r.read_i64::<LittleEndian>()?;
        let key_size = r.read_u32::<LittleEndian>()? as usize;
        let mut key = vec![0u8; key_size];
        r.read_exact(&mut key)?;
        let file_id = r.read_u32::<LittleEndian>()?;
        let offset = r.read_u64::<LittleEndian>()?;
        let valid = r.read_u8()? != 0;
        Ok(Self {
            timestamp,
            key: Bytes::from(key),
            file_id,
            offset,
            valid,
        })
    }
}

/// A rolling append-only writer for one stream (data or hint), enforcing a
/// per-file size cap: once an append would exceed the cap, the current
/// segment is sealed, the id bumped, and the append retried against a fresh
/// segment.
pub struct SegmentWriter {
    dir: PathBuf,
    prefix: &'static str,
    max_size: u64,
    active_id: u32,
    active_size: u64,
    writer: BufWriter<File>,
    sync: SyncStrategy,
    last_sync: Instant,
}

impl SegmentWriter {
    pub fn open(dir: &Path, prefix: &'static str, id: u32, max_size: u64) -> Result<Self, Error> {
        Self::with_sync(dir, prefix, id, max_size, SyncStrategy::None)
    }

    pub fn with_sync(
        dir: &Path,
        prefix: &'static str,
        id: u32,
        max_size: u64,
        sync: SyncStrategy,
    ) -> Result<Self, Error> {
        let (writer, size) = open_append(&segment_path(dir, prefix, id))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix,
            max_size,
            active_id: id,
            active_size: size,
            writer,
            sync,
            last_sync: Instant::now(),
        })
    }

    pub fn active_id(&self) -> u32 {
        self.active_id
    }

    fn roll(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        let sealed_id = self.active_id;
        self.active_id += 1;
        let (writer, size) = open_append(&segment_path(&self.dir, self.prefix, self.active_id))?;
        self.writer = writer;
        self.active_size = size;
        debug!(prefix = self.prefix, sealed_id, new_id = self.active_id, "rolled segment");
        Ok(())
    }

    /// Flush to the OS, then honor the configured sync strategy.
    fn sync(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        match self.sync {
            SyncStrategy::None => {}
            SyncStrategy::Every => {
                self.writer.get_ref().sync_data()?;
                self.last_sync = Instant::now();
            }
            SyncStrategy::Interval(interval) => {
                if self.last_sync.elapsed() >= interval {
                    self.writer.get_ref().sync_data()?;
                    self.last_sync = Instant::now();
                }
            }
        }
        Ok(())
    }

    pub fn append_data(&mut self, record: &DataRecord) -> Result<(u32, u64), Error> {
        if self.active_size >= self.max_size {
            self.roll()?;
        }
        let offset = self.active_size;
        record.encode(&mut self.writer)?;
        self.sync()?;
        let len = 8 + 4 + 4 + record.key.len() as u64 + record.value.len() as u64 + 4 + 4;
        self.active_size += len;
        Ok((self.active_id, offset))
    }

    pub fn append_hint(&mut self, record: &HintRecord) -> Result<(), Error> {
        if self.active_size >= self.max_size {
            self.roll()?;
        }
        record.encode(&mut self.writer)?;
        self.sync()?;
        let len = 8 + 4 + record.key.len() as u64 + 4 + 8 + 1;
        self.active_size += len;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<(BufWriter<File>, u64), Error> {
    let file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;
    let size = file.metadata()?.len();
    Ok((BufWriter::new(file), size))
}

pub fn segment_path(dir: &Path, prefix: &str, id: u32) -> PathBuf {
    dir.join(format!("{prefix}{id}"))
}

/// Reads values out of sealed or active data segments, keeping a small
/// per-thread cache of open read handles keyed by segment id.
pub struct SegmentReader {
    dir: PathBuf,
    handles: Mutex<HashMap<u32, BufReader<File>>>,
}

impl SegmentReader {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn read_value(&self, file_id: u32, offset: u64) -> Result<Bytes, Error> {
        let mut handles = self.handles.lock();
        let reader = match handles.entry(file_id) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let file = OpenOptions::new()
                    .read(true)
                    .open(segment_path(&self.dir, "data", file_id))?;
                e.insert(BufReader::new(file))
            }
        };
        reader.seek(SeekFrom::Start(offset))?;
        DataRecord::decode_value_only(reader)
    }
}

/// Read every hint record out of one hint segment, in on-disk order.
pub fn read_hint_file(path: &Path) -> Result<Vec<HintRecord>, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    loop {
        match HintRecord::decode(&mut reader) {
            Ok(record) => records.push(record),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(records)
}

/// Read every data record out of one data segment, in on-disk order,
/// pairing each with the offset it starts at. Used only when a data
/// segment's hint segment is entirely missing.
pub fn read_data_file(path: &Path) -> Result<Vec<(u64, DataRecord)>, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut offset = 0u64;
    loop {
        let start = offset;
        match DataRecord::decode(&mut reader) {
            Ok(record) => {
                offset += 8 + 4 + 4 + record.key.len() as u64 + record.value.len() as u64 + 4 + 4;
                records.push((start, record));
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(records)
}
