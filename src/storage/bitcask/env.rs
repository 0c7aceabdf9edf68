use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fs4::fs_std::FileExt;
use tracing::error;

use crate::Error;

/// Filesystem primitives the engine needs on top of `std::fs`: directory
/// creation, advisory whole-file locking, and a little bookkeeping for
/// scanning segment ids out of a directory listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Environment;

impl Environment {
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().exists()
    }

    pub fn create_dir<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    pub fn children<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>, Error> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        Ok(names)
    }

    /// Largest numeric suffix following `prefix` among `names`, or `0` if
    /// none match.
    pub fn max_id(&self, names: &[String], prefix: &str) -> u64 {
        names
            .iter()
            .filter_map(|name| name.strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
    }

    pub fn timestamp(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs() as i64
    }

    pub fn lock<P: AsRef<Path>>(&self, path: P) -> Result<FileLock, Error> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        if let Err(err) = file.try_lock_exclusive() {
            error!(path = %path.display(), cause = %err, "failed to acquire database lock");
            return Err(err.into());
        }
        Ok(FileLock { file, path })
    }
}

/// A held advisory exclusive lock on a file. Released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    pub fn unlock(self) -> Result<(), Error> {
        self.file.unlock()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
