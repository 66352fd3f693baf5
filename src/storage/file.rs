// Byte-level file abstraction. Out of scope as a design artifact per the
// specification (an arbitrary external collaborator), but a concrete
// implementation is required for the crate to build and be tested; grounded
// in original_source's `PosixFile` (referenced from
// `task-4-btree/src/external_sort.cc`) and in the teacher's `DiskManager`
// (src/storage/disk.rs) for the Rust idiom.

use std::fs::{File as StdFile, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
}

/// Minimal page-addressed file contract used by segments and external sort.
pub trait File: Send + Sync {
    fn size(&self) -> Result<u64>;
    fn resize(&self, new_size: u64) -> Result<()>;
    fn read_block(&self, offset: u64, len: usize, dst: &mut [u8]) -> Result<()>;
    fn write_block(&self, src: &[u8], offset: u64, len: usize) -> Result<()>;
    fn mode(&self) -> FileMode;
}

/// A `File` backed by a single OS file descriptor, serialized by an internal
/// mutex so callers don't need to coordinate seeks across threads.
pub struct PosixFile {
    handle: Mutex<StdFile>,
    mode: FileMode,
    path: PathBuf,
}

impl PosixFile {
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        match mode {
            FileMode::Read => {
                options.read(true).create(true).write(true);
            }
            FileMode::Write => {
                options.read(true).write(true).create(true);
            }
        }
        let handle = options.open(&path)?;
        Ok(Self {
            handle: Mutex::new(handle),
            mode,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl File for PosixFile {
    fn size(&self) -> Result<u64> {
        let handle = self.handle.lock().unwrap();
        Ok(handle.metadata()?.len())
    }

    fn resize(&self, new_size: u64) -> Result<()> {
        let handle = self.handle.lock().unwrap();
        handle.set_len(new_size)?;
        Ok(())
    }

    fn read_block(&self, offset: u64, len: usize, dst: &mut [u8]) -> Result<()> {
        debug_assert!(dst.len() >= len);
        let mut handle = self.handle.lock().unwrap();
        handle.seek(SeekFrom::Start(offset))?;
        handle.read_exact(&mut dst[..len])?;
        Ok(())
    }

    fn write_block(&self, src: &[u8], offset: u64, len: usize) -> Result<()> {
        debug_assert!(src.len() >= len);
        let mut handle = self.handle.lock().unwrap();
        handle.seek(SeekFrom::Start(offset))?;
        handle.write_all(&src[..len])?;
        Ok(())
    }

    fn mode(&self) -> FileMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_beyond_eof_after_resize_is_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let f = PosixFile::open(dir.path().join("data"), FileMode::Write).unwrap();
        f.resize(16).unwrap();
        let mut buf = [0xFFu8; 16];
        f.read_block(0, 16, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let f = PosixFile::open(dir.path().join("data"), FileMode::Write).unwrap();
        f.resize(8).unwrap();
        f.write_block(&[1, 2, 3, 4, 5, 6, 7, 8], 0, 8).unwrap();
        let mut buf = [0u8; 8];
        f.read_block(0, 8, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
