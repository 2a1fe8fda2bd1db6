//! File-backed store for spilling large buffers to disk.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::{check_range, BackingStore};

/// A [`BackingStore`] kept in a regular file of exactly `capacity` bytes.
///
/// The file is created (or truncated) by [`BackingStore::init`]. Its contents
/// are scratch space: nothing is recovered across restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    capacity: usize,
    file: Option<File>,
}

impl FileStore {
    /// Creates a store that will live at `path` once initialized.
    pub fn new(path: impl AsRef<Path>, capacity: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capacity,
            file: None,
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seek_to(&mut self, offset: usize, len: usize) -> io::Result<&mut File> {
        check_range(self.capacity, offset, len)?;
        let file = self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "store: file not initialized")
        })?;
        file.seek(SeekFrom::Start(offset as u64))?;
        Ok(file)
    }
}

impl BackingStore for FileStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn init(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.set_len(self.capacity as u64)?;
        debug!("file store ready at {} ({} bytes)", self.path.display(), self.capacity);
        self.file = Some(file);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
        self.seek_to(offset, data.len())?.write_all(data)
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        self.seek_to(offset, buf.len())?.read_exact(buf)
    }
}
