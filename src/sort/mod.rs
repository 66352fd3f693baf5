//! External K-way merge sort over arrays of 64-bit values, with no scratch
//! file of its own: `output` is grown to twice its final size and its
//! second half is used as run storage for the merge phase, then truncated
//! down to the final size once the merge is done.
//!
//! Grounded in original_source's `external_sort`
//! (task-4-btree/src/external_sort.cc), the version of this routine that
//! actually reuses the output file this way (`output.resize(2 *
//! output_size)`, runs written at `output_size + i * run_bytes`, merged
//! result written back to the front of the file). This implementation
//! keeps that file-reuse structure but, per the original's own comment
//! that the small-`mem_size` run-count-reduction loop is "ok to omit as
//! mem_size usually is large enough", does not replicate the iterative
//! 2-way run-halving fallback for when `num_runs` itself doesn't fit in
//! memory — `elems_per_run` is simply floored at 1 in that case, so
//! correctness holds but per-run buffering no longer strictly respects
//! `mem_bytes` at extreme run counts.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::error::Result;
use crate::storage::file::File;

fn bytes_to_u64s(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

fn u64s_to_bytes(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// A partially-loaded run living in `output`'s run area, starting at
/// `base_offset` and holding `total` values.
struct RunCursor {
    base_offset: u64,
    total: usize,
    read_pos: usize,
    buffer: VecDeque<u64>,
}

impl RunCursor {
    fn fill(&mut self, output: &dyn File, elems_per_run: usize) -> Result<()> {
        let remaining = self.total - self.read_pos;
        let n = remaining.min(elems_per_run.max(1));
        if n == 0 {
            return Ok(());
        }
        let mut bytes = vec![0u8; n * 8];
        output.read_block(self.base_offset + (self.read_pos * 8) as u64, bytes.len(), &mut bytes)?;
        self.buffer.extend(bytes_to_u64s(&bytes));
        self.read_pos += n;
        Ok(())
    }

    fn pop(&mut self, output: &dyn File, elems_per_run: usize) -> Result<Option<u64>> {
        if self.buffer.is_empty() {
            self.fill(output, elems_per_run)?;
        }
        Ok(self.buffer.pop_front())
    }
}

fn flush(buf: &mut Vec<u64>, output: &dyn File, pos: &mut u64) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let bytes = u64s_to_bytes(buf);
    output.write_block(&bytes, *pos, bytes.len())?;
    *pos += bytes.len() as u64;
    buf.clear();
    Ok(())
}

/// Sorts `num_values` 64-bit values read from `input` and writes them in
/// ascending order to `output`, using at most `mem_bytes` of value buffers
/// at once. `output` itself is grown and used as run scratch space during
/// the merge phase; no other file is touched.
pub fn external_sort(input: &dyn File, num_values: usize, output: &dyn File, mem_bytes: usize) -> Result<()> {
    output.resize(0)?;
    if num_values == 0 {
        return Ok(());
    }

    let num_mem_values = (mem_bytes / 8).max(1);
    if num_values <= num_mem_values {
        let mut buf = vec![0u8; num_values * 8];
        input.read_block(0, buf.len(), &mut buf)?;
        let mut values = bytes_to_u64s(&buf);
        values.sort_unstable();
        let out_bytes = u64s_to_bytes(&values);
        output.resize(out_bytes.len() as u64)?;
        output.write_block(&out_bytes, 0, out_bytes.len())?;
        return Ok(());
    }

    let output_size = (num_values * 8) as u64;
    output.resize(2 * output_size)?;

    // Phase 1: sort each `num_mem_values`-sized block of `input` in memory
    // and append it as a run in the second half of `output`.
    let mut run_lens = Vec::new();
    let mut idx = 0usize;
    while idx < num_values {
        let take = num_mem_values.min(num_values - idx);
        let mut buf = vec![0u8; take * 8];
        input.read_block((idx * 8) as u64, buf.len(), &mut buf)?;
        let mut values = bytes_to_u64s(&buf);
        values.sort_unstable();
        let run_bytes = u64s_to_bytes(&values);
        output.write_block(&run_bytes, output_size + (idx * 8) as u64, run_bytes.len())?;
        run_lens.push(take);
        idx += take;
    }

    // Phase 2: n-way merge straight out of the run area, writing the
    // merged result to the front of `output`. Each run keeps a small
    // buffered window sized to share `mem_bytes` across all runs plus the
    // output block.
    let num_runs = run_lens.len();
    let elems_per_run = ((mem_bytes / 8) / (num_runs + 1)).max(1);

    let mut cursors = Vec::with_capacity(num_runs);
    let mut run_offset = output_size;
    for &len in &run_lens {
        cursors.push(RunCursor {
            base_offset: run_offset,
            total: len,
            read_pos: 0,
            buffer: VecDeque::new(),
        });
        run_offset += (num_mem_values * 8) as u64;
    }

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
    for (i, cursor) in cursors.iter_mut().enumerate() {
        if let Some(v) = cursor.pop(output, elems_per_run)? {
            heap.push(Reverse((v, i)));
        }
    }

    let mut out_buf: Vec<u64> = Vec::with_capacity(elems_per_run);
    let mut out_pos: u64 = 0;

    while let Some(Reverse((v, run_idx))) = heap.pop() {
        out_buf.push(v);
        if let Some(next) = cursors[run_idx].pop(output, elems_per_run)? {
            heap.push(Reverse((next, run_idx)));
        }
        if out_buf.len() == elems_per_run {
            flush(&mut out_buf, output, &mut out_pos)?;
        }
    }
    flush(&mut out_buf, output, &mut out_pos)?;

    output.resize(output_size)?;
    Ok(())
}
