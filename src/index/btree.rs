// Disk-backed clustered B-tree with latch-coupled traversal. Grounded in
// original_source's `BTree<K, V, Cmp, PageSize>` (referenced from
// task-4-btree/test/btree_test.cc: `tree.root`, `LeafNode::kCapacity`,
// `InnerNode`, `tree.insert`/`tree.lookup`) and in the teacher's
// `BPlusTree` latch-crabbing style (the previous revision of this file),
// rebuilt over buffer-pool pages instead of in-memory `Arc<RwLock<Node>>`
// links.
//
// Insert holds the whole root-to-leaf path exclusively to handle split
// propagation in one pass, simpler than optimistic descent; lookup
// latch-couples with shared latches, fixing a child before releasing its
// parent. Erase reuses insert's whole-path exclusive hold rather than a
// separate optimistic scheme, since it never merges or redistributes and
// the extra pessimism costs little here.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::RwLock;

use crate::buffer::BufferPool;
use crate::common::{make_page_id, PageId};
use crate::error::Result;

const NODE_HEADER_SIZE: usize = 4;
const CHILD_SIZE: usize = 8;

/// A key or value type with a fixed on-page byte width.
pub trait FixedCodec: Copy {
    const SIZE: usize;
    fn encode(&self, buf: &mut [u8]);
    fn decode(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_codec_int {
    ($t:ty) => {
        impl FixedCodec for $t {
            const SIZE: usize = std::mem::size_of::<$t>();
            fn encode(&self, buf: &mut [u8]) {
                buf[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }
            fn decode(buf: &[u8]) -> Self {
                <$t>::from_le_bytes(buf[..Self::SIZE].try_into().unwrap())
            }
        }
    };
}

impl_fixed_codec_int!(u64);
impl_fixed_codec_int!(i64);
impl_fixed_codec_int!(u32);
impl_fixed_codec_int!(i32);

fn leaf_capacity(page_size: usize, key_size: usize, value_size: usize) -> usize {
    (page_size - NODE_HEADER_SIZE) / (key_size + value_size)
}

fn inner_capacity(page_size: usize, key_size: usize) -> usize {
    let avail = page_size - NODE_HEADER_SIZE;
    avail.saturating_sub(CHILD_SIZE) / (key_size + CHILD_SIZE)
}

fn is_leaf(buf: &[u8]) -> bool {
    buf[0] == 1
}

fn set_is_leaf(buf: &mut [u8], leaf: bool) {
    buf[0] = leaf as u8;
}

fn node_count(buf: &[u8]) -> u16 {
    u16::from_le_bytes(buf[2..4].try_into().unwrap())
}

fn set_node_count(buf: &mut [u8], count: u16) {
    buf[2..4].copy_from_slice(&count.to_le_bytes());
}

struct LeafNode<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

struct InnerNode<K> {
    keys: Vec<K>,
    children: Vec<PageId>,
}

/// A clustered B-tree index over a dedicated segment, keyed by `K` with
/// fixed-size values `V`.
pub struct BTree<'a, K, V> {
    segment_id: u16,
    pool: &'a BufferPool,
    root: RwLock<Option<PageId>>,
    next_page: AtomicU64,
    leaf_cap: usize,
    inner_cap: usize,
    leaf_values_offset: usize,
    inner_children_offset: usize,
    cmp: Box<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: FixedCodec + Ord, V: FixedCodec> BTree<'a, K, V> {
    pub fn new(segment_id: u16, pool: &'a BufferPool) -> Self {
        Self::with_comparator(segment_id, pool, |a: &K, b: &K| a.cmp(b))
    }
}

impl<'a, K: FixedCodec, V: FixedCodec> BTree<'a, K, V> {
    pub fn with_comparator(
        segment_id: u16,
        pool: &'a BufferPool,
        cmp: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        let page_size = pool.page_size();
        let leaf_cap = leaf_capacity(page_size, K::SIZE, V::SIZE);
        let inner_cap = inner_capacity(page_size, K::SIZE);
        Self {
            segment_id,
            pool,
            root: RwLock::new(None),
            next_page: AtomicU64::new(0),
            leaf_cap,
            inner_cap,
            leaf_values_offset: NODE_HEADER_SIZE + leaf_cap * K::SIZE,
            inner_children_offset: NODE_HEADER_SIZE + inner_cap * K::SIZE,
            cmp: Box::new(cmp),
            _marker: PhantomData,
        }
    }

    pub fn root(&self) -> Option<PageId> {
        *self.root.read()
    }

    pub fn leaf_capacity(&self) -> usize {
        self.leaf_cap
    }

    pub fn inner_capacity(&self) -> usize {
        self.inner_cap
    }

    fn alloc_page(&self) -> PageId {
        let no = self.next_page.fetch_add(1, AtomicOrdering::SeqCst);
        make_page_id(self.segment_id, no)
    }

    fn init_leaf(&self, buf: &mut [u8]) {
        set_is_leaf(buf, true);
        set_node_count(buf, 0);
    }

    fn init_inner(&self, buf: &mut [u8]) {
        set_is_leaf(buf, false);
        set_node_count(buf, 0);
    }

    fn read_leaf(&self, buf: &[u8]) -> LeafNode<K, V> {
        let count = node_count(buf) as usize;
        let mut keys = Vec::with_capacity(count);
        for i in 0..count {
            let off = NODE_HEADER_SIZE + i * K::SIZE;
            keys.push(K::decode(&buf[off..off + K::SIZE]));
        }
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            let off = self.leaf_values_offset + i * V::SIZE;
            values.push(V::decode(&buf[off..off + V::SIZE]));
        }
        LeafNode { keys, values }
    }

    fn write_leaf(&self, buf: &mut [u8], node: &LeafNode<K, V>) {
        debug_assert!(node.keys.len() <= self.leaf_cap);
        set_is_leaf(buf, true);
        set_node_count(buf, node.keys.len() as u16);
        for (i, k) in node.keys.iter().enumerate() {
            let off = NODE_HEADER_SIZE + i * K::SIZE;
            k.encode(&mut buf[off..off + K::SIZE]);
        }
        for (i, v) in node.values.iter().enumerate() {
            let off = self.leaf_values_offset + i * V::SIZE;
            v.encode(&mut buf[off..off + V::SIZE]);
        }
    }

    fn read_inner(&self, buf: &[u8]) -> InnerNode<K> {
        let count = node_count(buf) as usize;
        let mut keys = Vec::with_capacity(count);
        for i in 0..count {
            let off = NODE_HEADER_SIZE + i * K::SIZE;
            keys.push(K::decode(&buf[off..off + K::SIZE]));
        }
        let mut children = Vec::with_capacity(count + 1);
        for i in 0..=count {
            let off = self.inner_children_offset + i * CHILD_SIZE;
            children.push(u64::from_le_bytes(buf[off..off + CHILD_SIZE].try_into().unwrap()));
        }
        InnerNode { keys, children }
    }

    fn write_inner(&self, buf: &mut [u8], node: &InnerNode<K>) {
        debug_assert!(node.keys.len() <= self.inner_cap);
        debug_assert_eq!(node.children.len(), node.keys.len() + 1);
        set_is_leaf(buf, false);
        set_node_count(buf, node.keys.len() as u16);
        for (i, k) in node.keys.iter().enumerate() {
            let off = NODE_HEADER_SIZE + i * K::SIZE;
            k.encode(&mut buf[off..off + K::SIZE]);
        }
        for (i, c) in node.children.iter().enumerate() {
            let off = self.inner_children_offset + i * CHILD_SIZE;
            buf[off..off + CHILD_SIZE].copy_from_slice(&c.to_le_bytes());
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let mut root_guard = self.root.write();
        let root_id = match *root_guard {
            Some(id) => id,
            None => {
                let page_id = self.alloc_page();
                let mut guard = self.pool.fix_new(page_id)?;
                self.init_leaf(guard.data_mut());
                self.write_leaf(
                    guard.data_mut(),
                    &LeafNode {
                        keys: vec![key],
                        values: vec![value],
                    },
                );
                guard.unfix(true);
                *root_guard = Some(page_id);
                return Ok(());
            }
        };

        if let Some((sep, new_child)) = self.insert_recursive(root_id, key, value)? {
            let new_root_id = self.alloc_page();
            let mut guard = self.pool.fix_new(new_root_id)?;
            self.init_inner(guard.data_mut());
            self.write_inner(
                guard.data_mut(),
                &InnerNode {
                    keys: vec![sep],
                    children: vec![root_id, new_child],
                },
            );
            guard.unfix(true);
            *root_guard = Some(new_root_id);
        }
        Ok(())
    }

    /// Returns `Some((separator, new_right_sibling))` if `page_id` split and
    /// the split must propagate to its parent.
    fn insert_recursive(&self, page_id: PageId, key: K, value: V) -> Result<Option<(K, PageId)>> {
        let mut guard = self.pool.fix(page_id, true)?;

        if is_leaf(guard.data()) {
            let mut node = self.read_leaf(guard.data());
            let pos = node.keys.partition_point(|k| (self.cmp)(k, &key) == Ordering::Less);
            if pos < node.keys.len() && (self.cmp)(&node.keys[pos], &key) == Ordering::Equal {
                node.values[pos] = value;
                self.write_leaf(guard.data_mut(), &node);
                guard.unfix(true);
                return Ok(None);
            }
            node.keys.insert(pos, key);
            node.values.insert(pos, value);

            if node.keys.len() <= self.leaf_cap {
                self.write_leaf(guard.data_mut(), &node);
                guard.unfix(true);
                return Ok(None);
            }

            let split_at = node.keys.len() / 2;
            let right_keys = node.keys.split_off(split_at);
            let right_values = node.values.split_off(split_at);
            self.write_leaf(guard.data_mut(), &node);
            guard.unfix(true);

            let sep = right_keys[0];
            let new_page = self.alloc_page();
            let mut rguard = self.pool.fix_new(new_page)?;
            self.init_leaf(rguard.data_mut());
            self.write_leaf(
                rguard.data_mut(),
                &LeafNode {
                    keys: right_keys,
                    values: right_values,
                },
            );
            rguard.unfix(true);
            return Ok(Some((sep, new_page)));
        }

        let mut node = self.read_inner(guard.data());
        let child_idx = node.keys.partition_point(|k| (self.cmp)(k, &key) == Ordering::Less);
        let child_id = node.children[child_idx];

        let Some((sep, new_child)) = self.insert_recursive(child_id, key, value)? else {
            guard.unfix(false);
            return Ok(None);
        };

        node.keys.insert(child_idx, sep);
        node.children.insert(child_idx + 1, new_child);

        if node.keys.len() <= self.inner_cap {
            self.write_inner(guard.data_mut(), &node);
            guard.unfix(true);
            return Ok(None);
        }

        let split_at = node.keys.len() / 2;
        let mut right_keys = node.keys.split_off(split_at);
        let median = right_keys.remove(0);
        let left_keys = node.keys;
        let right_children = node.children.split_off(split_at + 1);
        let left_children = node.children;

        self.write_inner(
            guard.data_mut(),
            &InnerNode {
                keys: left_keys,
                children: left_children,
            },
        );
        guard.unfix(true);

        let new_page = self.alloc_page();
        let mut rguard = self.pool.fix_new(new_page)?;
        self.init_inner(rguard.data_mut());
        self.write_inner(
            rguard.data_mut(),
            &InnerNode {
                keys: right_keys,
                children: right_children,
            },
        );
        rguard.unfix(true);
        Ok(Some((median, new_page)))
    }

    pub fn lookup(&self, key: K) -> Result<Option<V>> {
        let root_id = match *self.root.read() {
            Some(id) => id,
            None => return Ok(None),
        };
        let mut guard = self.pool.fix(root_id, false)?;
        loop {
            if is_leaf(guard.data()) {
                let node = self.read_leaf(guard.data());
                let pos = node.keys.partition_point(|k| (self.cmp)(k, &key) == Ordering::Less);
                if pos < node.keys.len() && (self.cmp)(&node.keys[pos], &key) == Ordering::Equal {
                    return Ok(Some(node.values[pos]));
                }
                return Ok(None);
            }
            let node = self.read_inner(guard.data());
            let child_idx = node.keys.partition_point(|k| (self.cmp)(k, &key) == Ordering::Less);
            let child_id = node.children[child_idx];
            // Fix the child before the parent guard is dropped by reassignment.
            guard = self.pool.fix(child_id, false)?;
        }
    }

    pub fn erase(&self, key: K) -> Result<bool> {
        let root_id = match *self.root.read() {
            Some(id) => id,
            None => return Ok(false),
        };
        self.erase_recursive(root_id, key)
    }

    fn erase_recursive(&self, page_id: PageId, key: K) -> Result<bool> {
        let mut guard = self.pool.fix(page_id, true)?;

        if is_leaf(guard.data()) {
            let mut node = self.read_leaf(guard.data());
            let pos = node.keys.partition_point(|k| (self.cmp)(k, &key) == Ordering::Less);
            let found = pos < node.keys.len() && (self.cmp)(&node.keys[pos], &key) == Ordering::Equal;
            if found {
                node.keys.remove(pos);
                node.values.remove(pos);
                self.write_leaf(guard.data_mut(), &node);
            }
            guard.unfix(found);
            return Ok(found);
        }

        let node = self.read_inner(guard.data());
        let child_idx = node.keys.partition_point(|k| (self.cmp)(k, &key) == Ordering::Less);
        let child_id = node.children[child_idx];
        let found = self.erase_recursive(child_id, key)?;
        guard.unfix(false);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferPool, BufferPoolConfig, PageStore};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct MemStore {
        pages: Mutex<HashMap<PageId, Vec<u8>>>,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                pages: Mutex::new(HashMap::new()),
            }
        }
    }

    impl PageStore for MemStore {
        fn read_page(&self, page_id: PageId, _page_size: usize, buf: &mut [u8]) -> Result<()> {
            if let Some(data) = self.pages.lock().get(&page_id) {
                buf.copy_from_slice(data);
            } else {
                buf.iter_mut().for_each(|b| *b = 0);
            }
            Ok(())
        }

        fn write_page(&self, page_id: PageId, _page_size: usize, buf: &[u8]) -> Result<()> {
            self.pages.lock().insert(page_id, buf.to_vec());
            Ok(())
        }
    }

    fn pool(page_count: usize, page_size: usize) -> BufferPool {
        BufferPool::new(
            BufferPoolConfig {
                page_count,
                page_size,
            },
            Box::new(MemStore::new()),
        )
    }

    #[test]
    fn insert_into_empty_tree_creates_leaf_root() {
        let pool = pool(64, 128);
        let tree: BTree<u64, u64> = BTree::new(0, &pool);
        assert!(tree.root().is_none());
        tree.insert(42, 21).unwrap();
        assert!(tree.root().is_some());
        assert_eq!(tree.lookup(42).unwrap(), Some(21));
    }

    #[test]
    fn filling_a_leaf_then_one_more_splits_the_root() {
        let pool = pool(64, 128);
        let tree: BTree<u64, u64> = BTree::new(0, &pool);
        let cap = tree.leaf_capacity() as u64;
        for i in 0..cap {
            tree.insert(i, i * 2).unwrap();
        }
        let root_before = tree.root().unwrap();
        tree.insert(424242, 42).unwrap();
        assert_ne!(tree.root().unwrap(), root_before, "root split must allocate a new root page");
        for i in 0..cap {
            assert_eq!(tree.lookup(i).unwrap(), Some(i * 2));
        }
        assert_eq!(tree.lookup(424242).unwrap(), Some(42));
    }

    #[test]
    fn lookup_on_empty_tree_returns_none() {
        let pool = pool(8, 128);
        let tree: BTree<u64, u64> = BTree::new(0, &pool);
        assert_eq!(tree.lookup(1).unwrap(), None);
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let pool = pool(8, 128);
        let tree: BTree<u64, u64> = BTree::new(0, &pool);
        tree.insert(1, 100).unwrap();
        tree.insert(1, 200).unwrap();
        assert_eq!(tree.lookup(1).unwrap(), Some(200));
    }

    #[test]
    fn erase_removes_key_without_rebalancing() {
        let pool = pool(8, 128);
        let tree: BTree<u64, u64> = BTree::new(0, &pool);
        tree.insert(1, 10).unwrap();
        tree.insert(2, 20).unwrap();
        assert!(tree.erase(1).unwrap());
        assert_eq!(tree.lookup(1).unwrap(), None);
        assert_eq!(tree.lookup(2).unwrap(), Some(20));
        assert!(!tree.erase(1).unwrap());
    }

    #[test]
    fn many_inserts_across_multiple_splits_remain_searchable() {
        let pool = pool(256, 128);
        let tree: BTree<u64, u64> = BTree::new(0, &pool);
        for i in 0..500u64 {
            tree.insert(i, i * 3).unwrap();
        }
        for i in 0..500u64 {
            assert_eq!(tree.lookup(i).unwrap(), Some(i * 3));
        }
        assert_eq!(tree.lookup(999).unwrap(), None);
    }
}
