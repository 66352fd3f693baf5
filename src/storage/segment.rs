// Segment file management: maps a page id to a (segment file, byte offset)
// and implements `buffer::PageStore` for `BufferPool`. Grounded in
// original_source's `get_segment_id`/`get_segment_page_id` split and in the
// teacher's `DiskManager::with_config` (data-directory + page-size
// construction, src/storage/disk.rs).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::PageStore;
use crate::common::{page_number, segment_id, PageId};
use crate::error::Result;
use crate::storage::file::{File, FileMode, PosixFile};

/// Opens one file per segment id, named by its decimal representation,
/// under a configured data directory. Segment files are created lazily on
/// first access.
pub struct SegmentFileManager {
    data_dir: PathBuf,
    files: Mutex<HashMap<u16, Arc<PosixFile>>>,
}

impl SegmentFileManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            files: Mutex::new(HashMap::new()),
        })
    }

    pub fn segment_file(&self, segment: u16) -> Result<Arc<PosixFile>> {
        let mut files = self.files.lock();
        if let Some(f) = files.get(&segment) {
            return Ok(f.clone());
        }
        let path = self.data_dir.join(segment.to_string());
        let f = Arc::new(PosixFile::open(path, FileMode::Write)?);
        files.insert(segment, f.clone());
        Ok(f)
    }

    /// Number of whole pages currently persisted in `segment`'s file.
    pub fn page_count(&self, segment: u16, page_size: usize) -> Result<u64> {
        let f = self.segment_file(segment)?;
        Ok(f.size()? / page_size as u64)
    }
}

impl PageStore for SegmentFileManager {
    fn read_page(&self, page_id: PageId, page_size: usize, buf: &mut [u8]) -> Result<()> {
        let f = self.segment_file(segment_id(page_id))?;
        let offset = page_number(page_id) * page_size as u64;
        let size = f.size()?;
        if offset + page_size as u64 > size {
            buf.iter_mut().for_each(|b| *b = 0);
            return Ok(());
        }
        f.read_block(offset, page_size, buf)
    }

    fn write_page(&self, page_id: PageId, page_size: usize, buf: &[u8]) -> Result<()> {
        let f = self.segment_file(segment_id(page_id))?;
        let offset = page_number(page_id) * page_size as u64;
        let needed = offset + page_size as u64;
        if f.size()? < needed {
            f.resize(needed)?;
        }
        f.write_block(buf, offset, page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::make_page_id;

    #[test]
    fn unwritten_page_reads_as_zero_and_grows_file_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SegmentFileManager::new(dir.path()).unwrap();
        let page = make_page_id(3, 5);
        let mut buf = [0xFFu8; 128];
        mgr.read_page(page, 128, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 128]);

        let payload = [7u8; 128];
        mgr.write_page(page, 128, &payload).unwrap();
        let mut readback = [0u8; 128];
        mgr.read_page(page, 128, &mut readback).unwrap();
        assert_eq!(readback, payload);
    }

    #[test]
    fn segments_are_isolated_files() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SegmentFileManager::new(dir.path()).unwrap();
        mgr.write_page(make_page_id(1, 0), 64, &[1u8; 64]).unwrap();
        mgr.write_page(make_page_id(2, 0), 64, &[2u8; 64]).unwrap();
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        mgr.read_page(make_page_id(1, 0), 64, &mut a).unwrap();
        mgr.read_page(make_page_id(2, 0), 64, &mut b).unwrap();
        assert_eq!(a, [1u8; 64]);
        assert_eq!(b, [2u8; 64]);
    }
}
