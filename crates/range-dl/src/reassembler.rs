//! Reassembly of planned chunks into one contiguous buffer

use crate::error::{Result, TransferError};
use crate::types::Chunk;

/// Sum of the sizes of loaded chunks
pub fn loaded_bytes(chunks: &[Chunk]) -> u64 {
    chunks
        .iter()
        .filter(|c| c.is_loaded())
        .map(|c| c.size_bytes())
        .sum()
}

/// Copy every chunk's bytes to its planned offset.
///
/// Chunks without data leave a zero-filled gap of their declared size.
/// Output depends only on each chunk's range, never on list or completion order.
pub fn reassemble(chunks: &[Chunk], total_bytes: u64) -> Vec<u8> {
    let mut buffer = vec![0u8; total_bytes as usize];
    for chunk in chunks {
        let Some(data) = chunk.data() else {
            continue;
        };
        let start = chunk.byte_range_start() as usize;
        if start >= buffer.len() {
            continue;
        }
        let span = std::cmp::min(chunk.size_bytes() as usize, buffer.len() - start);
        let len = std::cmp::min(span, data.len());
        buffer[start..start + len].copy_from_slice(&data[..len]);
    }
    buffer
}

/// Reassemble and fail with `ReassemblyIncomplete` when chunks are missing
pub fn reassemble_checked(chunks: &[Chunk], total_bytes: u64) -> Result<Vec<u8>> {
    let loaded = loaded_bytes(chunks);
    if loaded < total_bytes {
        return Err(TransferError::ReassemblyIncomplete {
            loaded_bytes: loaded,
            total_bytes,
        });
    }
    Ok(reassemble(chunks, total_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PriorityLevel;
    use crate::planner::plan;

    fn source(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn loaded_plan(data: &[u8], chunk_size: u64) -> Vec<Chunk> {
        let mut chunks = plan(data.len() as u64, chunk_size, PriorityLevel::Medium).unwrap();
        for chunk in &mut chunks {
            let start = chunk.byte_range_start() as usize;
            let end = chunk.byte_range_end() as usize;
            chunk.mark_loaded(data[start..=end].to_vec());
        }
        chunks
    }

    #[test]
    fn reassembles_in_planned_order_regardless_of_list_order() {
        let data = source(1000);
        let chunks = loaded_plan(&data, 128);

        let mut reversed = chunks.clone();
        reversed.reverse();
        let mut shuffled = chunks.clone();
        shuffled.swap(0, 5);
        shuffled.swap(2, 7);

        assert_eq!(reassemble(&chunks, 1000), data);
        assert_eq!(reassemble(&reversed, 1000), data);
        assert_eq!(reassemble(&shuffled, 1000), data);
    }

    #[test]
    fn reassembly_is_idempotent() {
        let data = source(300);
        let chunks = loaded_plan(&data, 64);
        let first = reassemble(&chunks, 300);
        let second = reassemble(&chunks, 300);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_chunk_leaves_zero_gap() {
        let data = vec![0xAB; 400];
        let mut chunks = loaded_plan(&data, 100);
        chunks[2].mark_failed("HTTP 500");

        let buffer = reassemble(&chunks, 400);
        assert!(buffer[..200].iter().all(|b| *b == 0xAB));
        assert!(buffer[200..300].iter().all(|b| *b == 0));
        assert!(buffer[300..].iter().all(|b| *b == 0xAB));
        assert_eq!(loaded_bytes(&chunks), 300);
    }

    #[test]
    fn checked_reassembly_reports_shortfall() {
        let data = vec![1u8; 400];
        let mut chunks = loaded_plan(&data, 100);
        chunks[3].mark_failed("timeout");

        match reassemble_checked(&chunks, 400) {
            Err(TransferError::ReassemblyIncomplete {
                loaded_bytes,
                total_bytes,
            }) => {
                assert_eq!(loaded_bytes, 300);
                assert_eq!(total_bytes, 400);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        chunks[3].mark_loaded(vec![1u8; 100]);
        assert_eq!(reassemble_checked(&chunks, 400).unwrap(), data);
    }
}
