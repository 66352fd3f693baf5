use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use crate::common::PageId;

pub const INVALID_PAGE_ID: PageId = u64::MAX;

/// Lifecycle of a frame, per the buffer-pool state machine: `Empty -> Loading
/// -> Clean -> Dirty -> Evicting -> Empty`. Transitions into `Loading` and
/// `Evicting` happen while the frame is still reachable through the page
/// table, so a concurrent lookup sees the in-flight state and blocks on the
/// frame's latch rather than racing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameState {
    Empty = 0,
    Loading = 1,
    Clean = 2,
    Dirty = 3,
    Evicting = 4,
}

impl FrameState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => FrameState::Empty,
            1 => FrameState::Loading,
            2 => FrameState::Clean,
            3 => FrameState::Dirty,
            4 => FrameState::Evicting,
            _ => unreachable!("invalid frame state"),
        }
    }
}

/// One resident page slot. `content` is both the page's byte buffer and its
/// reader-writer latch: a shared lock gives read access to the page, an
/// exclusive lock gives read-write access, and lock acquisition order w.r.t.
/// the pool's queue mutex is fixed by `BufferPool::fix` (queues first, then
/// at most one frame latch, never both at once while blocked).
pub struct Frame {
    pub content: RwLock<Vec<u8>>,
    page_id: AtomicU64,
    pin_count: AtomicU64,
    dirty: AtomicBool,
    state: AtomicU8,
}

impl Frame {
    pub fn new(page_size: usize) -> Self {
        Self {
            content: RwLock::new(vec![0u8; page_size]),
            page_id: AtomicU64::new(INVALID_PAGE_ID),
            pin_count: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            state: AtomicU8::new(FrameState::Empty as u8),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id.load(Ordering::Acquire)
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id, Ordering::Release);
    }

    pub fn pin_count(&self) -> u64 {
        self.pin_count.load(Ordering::Acquire)
    }

    pub fn pin(&self) -> u64 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn unpin(&self) -> u64 {
        self.pin_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
        self.state.store(FrameState::Dirty as u8, Ordering::Release);
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    pub fn state(&self) -> FrameState {
        FrameState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: FrameState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn reset_empty(&self) {
        self.page_id.store(INVALID_PAGE_ID, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.state.store(FrameState::Empty as u8, Ordering::Release);
    }
}

/// A pinned lease on a frame's content, shared or exclusive.
pub enum FrameLease<'a> {
    Shared(RwLockReadGuard<'a, Vec<u8>>),
    Exclusive(RwLockWriteGuard<'a, Vec<u8>>),
}

impl<'a> FrameLease<'a> {
    pub fn data(&self) -> &[u8] {
        match self {
            FrameLease::Shared(g) => g,
            FrameLease::Exclusive(g) => g,
        }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        match self {
            FrameLease::Shared(_) => {
                panic!("data_mut() called on a shared frame lease; fix(page, exclusive=true)")
            }
            FrameLease::Exclusive(g) => g,
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, FrameLease::Exclusive(_))
    }
}
