// Fixed-memory buffer pool with two-queue (FIFO + LRU) eviction.
//
// Grounded in examples/original_source/task-2-buffer-manager's
// `BufferManager` (fifoQueue/lruQueue/fixPage/unfixPage, `get_segment_id`/
// `get_segment_page_id` address split) and in the teacher's
// `BufferPoolConfig` / frame-table shape (src/buffer/manager.rs,
// src/buffer/page_cache.rs), generalized to the synchronous, parallel-thread
// model this spec requires (no tokio, no per-core pools).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::buffer::frame::{Frame, FrameLease, FrameState, INVALID_PAGE_ID};
use crate::common::PageId;
use crate::error::{PagebaseError, Result};

/// The collaborator that knows how to load/flush a single page to its
/// backing segment file. Implemented by `storage::segment::SegmentFileManager`;
/// kept as a trait here so the buffer pool has no upward dependency on the
/// storage layer.
pub trait PageStore: Send + Sync {
    fn read_page(&self, page_id: PageId, page_size: usize, buf: &mut [u8]) -> Result<()>;
    fn write_page(&self, page_id: PageId, page_size: usize, buf: &[u8]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    pub page_count: usize,
    pub page_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            page_count: 1000,
            page_size: 4096,
        }
    }
}

/// Queue membership, protected by a single mutex. Lookup is O(1) via
/// `page_table`; list-to-list moves are a linear scan over at most
/// `page_count` entries (the design note in the spec permits this -- the
/// contract only requires FIFO-then-LRU victim order, not O(1) moves).
struct Queues {
    page_table: HashMap<PageId, usize>,
    fifo: VecDeque<usize>,
    lru: VecDeque<usize>,
    free: Vec<usize>,
}

impl Queues {
    fn remove_from_lists(&mut self, idx: usize) {
        if let Some(pos) = self.fifo.iter().position(|&i| i == idx) {
            self.fifo.remove(pos);
        } else if let Some(pos) = self.lru.iter().position(|&i| i == idx) {
            self.lru.remove(pos);
        }
    }

    fn resident_count(&self) -> usize {
        self.fifo.len() + self.lru.len()
    }
}

pub struct BufferPool {
    frames: Vec<Frame>,
    queues: Mutex<Queues>,
    io_mutex: Mutex<()>,
    store: Box<dyn PageStore>,
    page_size: usize,
    page_count: usize,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig, store: Box<dyn PageStore>) -> Self {
        let frames = (0..config.page_count)
            .map(|_| Frame::new(config.page_size))
            .collect();
        let queues = Queues {
            page_table: HashMap::with_capacity(config.page_count),
            fifo: VecDeque::with_capacity(config.page_count),
            lru: VecDeque::with_capacity(config.page_count),
            free: (0..config.page_count).rev().collect(),
        };
        Self {
            frames,
            queues: Mutex::new(queues),
            io_mutex: Mutex::new(()),
            store,
            page_size: config.page_size,
            page_count: config.page_count,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Pins `page_id`, loading it from its segment file on first use, and
    /// returns a guard that releases the latch (and propagates `dirty`) on
    /// drop or on an explicit call to `FrameGuard::unfix`.
    pub fn fix(&self, page_id: PageId, exclusive: bool) -> Result<FrameGuard<'_>> {
        let (frame_idx, needs_load) = self.reserve(page_id)?;
        let frame = &self.frames[frame_idx];

        if needs_load {
            self.load(frame, page_id)?;
            frame.set_state(FrameState::Clean);
        }

        let lease = if exclusive {
            FrameLease::Exclusive(frame.content.write())
        } else {
            FrameLease::Shared(frame.content.read())
        };

        Ok(FrameGuard {
            pool: self,
            frame_idx,
            lease: Some(lease),
            page_id,
        })
    }

    /// Creates a brand-new page (always exclusive, never read from disk) and
    /// pins it, for segment page-allocation paths that don't want a
    /// spurious disk read of garbage/zero bytes.
    pub fn fix_new(&self, page_id: PageId) -> Result<FrameGuard<'_>> {
        let (frame_idx, _needs_load) = self.reserve(page_id)?;
        let frame = &self.frames[frame_idx];
        {
            let mut data = frame.content.write();
            data.iter_mut().for_each(|b| *b = 0);
        }
        frame.set_state(FrameState::Clean);
        let lease = FrameLease::Exclusive(frame.content.write());
        Ok(FrameGuard {
            pool: self,
            frame_idx,
            lease: Some(lease),
            page_id,
        })
    }

    /// Finds or creates a frame for `page_id`, pins it, and updates queue
    /// membership. Returns whether the caller still needs to load page
    /// contents from disk. No frame latch is taken or awaited here -- only
    /// `queues` is held, consistent with "queue mutexes first, then at most
    /// one frame latch".
    fn reserve(&self, page_id: PageId) -> Result<(usize, bool)> {
        let mut q = self.queues.lock();

        if let Some(&idx) = q.page_table.get(&page_id) {
            self.frames[idx].pin();
            q.remove_from_lists(idx);
            q.lru.push_back(idx);
            trace!(page_id, frame = idx, "buffer pool hit, promoted to LRU");
            return Ok((idx, false));
        }

        let idx = if let Some(idx) = q.free.pop() {
            idx
        } else {
            match self.find_victim(&q) {
                Some(idx) => idx,
                None => {
                    debug!(page_count = self.page_count, "buffer pool full");
                    return Err(PagebaseError::BufferFull);
                }
            }
        };

        let victim_page = self.frames[idx].page_id();
        if victim_page != INVALID_PAGE_ID {
            q.remove_from_lists(idx);
            q.page_table.remove(&victim_page);
            self.frames[idx].set_state(FrameState::Evicting);
        }

        self.frames[idx].set_page_id(page_id);
        self.frames[idx].pin();
        self.frames[idx].set_state(FrameState::Loading);
        q.page_table.insert(page_id, idx);
        q.fifo.push_back(idx);
        drop(q);

        if victim_page != INVALID_PAGE_ID && self.frames[idx].is_dirty() {
            self.flush_locked(&self.frames[idx], victim_page)?;
        }

        Ok((idx, true))
    }

    /// First frame in FIFO with pin count 0; failing that, first in LRU.
    fn find_victim(&self, q: &Queues) -> Option<usize> {
        q.fifo
            .iter()
            .find(|&&idx| self.frames[idx].pin_count() == 0)
            .or_else(|| {
                q.lru
                    .iter()
                    .find(|&&idx| self.frames[idx].pin_count() == 0)
            })
            .copied()
    }

    fn load(&self, frame: &Frame, page_id: PageId) -> Result<()> {
        let mut data = frame.content.write();
        let _io = self.io_mutex.lock();
        self.store.read_page(page_id, self.page_size, &mut data)?;
        Ok(())
    }

    fn flush_locked(&self, frame: &Frame, page_id: PageId) -> Result<()> {
        let data = frame.content.read();
        let _io = self.io_mutex.lock();
        self.store.write_page(page_id, self.page_size, &data)?;
        drop(data);
        frame.clear_dirty();
        Ok(())
    }

    /// Flushes a resident, currently-unpinned page without evicting it.
    fn flush_resident(&self, idx: usize) -> Result<()> {
        let frame = &self.frames[idx];
        if frame.is_dirty() {
            let page_id = frame.page_id();
            self.flush_locked(frame, page_id)?;
        }
        Ok(())
    }

    fn unfix(&self, frame_idx: usize, dirty: bool) {
        let frame = &self.frames[frame_idx];
        if dirty {
            frame.mark_dirty();
        }
        frame.unpin();
    }

    /// Writes back every dirty resident frame. Called from `Drop`.
    fn flush_all(&self) {
        let q = self.queues.lock();
        let resident: Vec<usize> = q.fifo.iter().chain(q.lru.iter()).copied().collect();
        drop(q);
        for idx in resident {
            if let Err(e) = self.flush_resident(idx) {
                tracing::error!(frame = idx, error = %e, "failed to flush dirty frame on shutdown");
            }
        }
    }

    /// Page ids resident in the FIFO list, in FIFO order. Not thread-safe
    /// against concurrent `fix`/`unfix`, matching the original contract.
    pub fn fifo_list(&self) -> Vec<PageId> {
        let q = self.queues.lock();
        q.fifo.iter().map(|&idx| self.frames[idx].page_id()).collect()
    }

    /// Page ids resident in the LRU list, in LRU order.
    pub fn lru_list(&self) -> Vec<PageId> {
        let q = self.queues.lock();
        q.lru.iter().map(|&idx| self.frames[idx].page_id()).collect()
    }

    pub fn resident_count(&self) -> usize {
        self.queues.lock().resident_count()
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.flush_all();
    }
}

/// RAII lease returned by `BufferPool::fix`. Dropping it is equivalent to
/// `unfix(frame, dirty=false)`; call `unfix` explicitly to propagate a dirty
/// write.
pub struct FrameGuard<'a> {
    pool: &'a BufferPool,
    frame_idx: usize,
    lease: Option<FrameLease<'a>>,
    page_id: PageId,
}

impl<'a> FrameGuard<'a> {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        self.lease.as_ref().unwrap().data()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.lease.as_mut().unwrap().data_mut()
    }

    pub fn is_exclusive(&self) -> bool {
        self.lease.as_ref().unwrap().is_exclusive()
    }

    /// Releases the latch and records the dirty bit, consuming the guard.
    pub fn unfix(mut self, dirty: bool) {
        self.release(dirty);
    }

    fn release(&mut self, dirty: bool) {
        if self.lease.take().is_some() {
            self.pool.unfix(self.frame_idx, dirty);
        }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.release(false);
    }
}
