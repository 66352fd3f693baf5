//! Disk-backed segment layer: segment files, the slotted-page record
//! format, the SP segment that implements it, the free-space index that
//! helps SP pick pages, and the schema segment that persists the catalog.

pub mod file;
pub mod fsi_segment;
pub mod schema;
pub mod schema_segment;
pub mod segment;
pub mod slotted_page;
pub mod sp_segment;

pub use file::{File, FileMode, PosixFile};
pub use fsi_segment::FsiSegment;
pub use schema::{Catalog, Column, Table, Type};
pub use schema_segment::{LoadedSchema, SchemaHeader, SchemaSegment};
pub use segment::SegmentFileManager;
pub use sp_segment::SpSegment;
