// Persists the catalog as a length-prefixed JSON document spanning a
// contiguous prefix of a dedicated segment's pages. Grounded in
// original_source's `SchemaSegment` (task-3-slotted-pages/src/schema_segment.cc,
// which serializes via a hand-rolled text format) reworked to use
// `serde_json`, matching the teacher's catalog persistence style
// (src/catalog/mod.rs uses `serde`/`serde_json` for its own snapshotting).
//
// Header (22 bytes, little-endian): `payload_len: u64`, `sp_segment_id: u16`,
// `fsi_segment_id: u16`, `sp_page_count: u64`, 2 reserved bytes.

use crate::buffer::BufferPool;
use crate::common::make_page_id;
use crate::error::Result;
use crate::storage::schema::Catalog;

pub const HEADER_SIZE: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaHeader {
    pub sp_segment_id: u16,
    pub fsi_segment_id: u16,
    pub sp_page_count: u64,
}

pub struct LoadedSchema {
    pub catalog: Catalog,
    pub header: SchemaHeader,
}

pub struct SchemaSegment<'a> {
    segment_id: u16,
    pool: &'a BufferPool,
}

impl<'a> SchemaSegment<'a> {
    pub fn new(segment_id: u16, pool: &'a BufferPool) -> Self {
        Self { segment_id, pool }
    }

    pub fn write(&self, catalog: &Catalog, header: &SchemaHeader) -> Result<()> {
        let payload = serde_json::to_vec(catalog)?;
        let page_size = self.pool.page_size();

        let mut full = Vec::with_capacity(HEADER_SIZE + payload.len());
        full.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        full.extend_from_slice(&header.sp_segment_id.to_le_bytes());
        full.extend_from_slice(&header.fsi_segment_id.to_le_bytes());
        full.extend_from_slice(&header.sp_page_count.to_le_bytes());
        full.extend_from_slice(&[0u8; 2]);
        full.extend_from_slice(&payload);

        let page_count = full.len().div_ceil(page_size).max(1);
        for page_no in 0..page_count {
            let page_id = make_page_id(self.segment_id, page_no as u64);
            let mut guard = self.pool.fix_new(page_id)?;
            let start = page_no * page_size;
            let end = (start + page_size).min(full.len());
            guard.data_mut()[..end - start].copy_from_slice(&full[start..end]);
            guard.unfix(true);
        }
        Ok(())
    }

    pub fn read(&self) -> Result<LoadedSchema> {
        let page_size = self.pool.page_size();
        let header_bytes = {
            let guard = self.pool.fix(make_page_id(self.segment_id, 0), false)?;
            guard.data()[..HEADER_SIZE].to_vec()
        };

        let payload_len = u64::from_le_bytes(header_bytes[0..8].try_into().unwrap()) as usize;
        let sp_segment_id = u16::from_le_bytes(header_bytes[8..10].try_into().unwrap());
        let fsi_segment_id = u16::from_le_bytes(header_bytes[10..12].try_into().unwrap());
        let sp_page_count = u64::from_le_bytes(header_bytes[12..20].try_into().unwrap());

        let total_len = HEADER_SIZE + payload_len;
        let page_count = total_len.div_ceil(page_size).max(1);
        let mut payload = Vec::with_capacity(payload_len);

        for page_no in 0..page_count {
            let page_id = make_page_id(self.segment_id, page_no as u64);
            let guard = self.pool.fix(page_id, false)?;
            let data = guard.data();
            let page_start = page_no * page_size;
            let page_end = (page_start + page_size).min(total_len);
            let slice_start = if page_no == 0 { HEADER_SIZE } else { 0 };
            let slice_end = page_end - page_start;
            payload.extend_from_slice(&data[slice_start..slice_end]);
        }

        let catalog = if payload_len == 0 {
            Catalog::default()
        } else {
            serde_json::from_slice(&payload)?
        };

        Ok(LoadedSchema {
            catalog,
            header: SchemaHeader {
                sp_segment_id,
                fsi_segment_id,
                sp_page_count,
            },
        })
    }
}
