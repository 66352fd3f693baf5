//! Disk-backed clustered B-tree index over buffer-pool pages.

pub mod btree;

pub use btree::{BTree, FixedCodec};
