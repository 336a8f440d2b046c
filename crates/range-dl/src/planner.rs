//! Chunk planning - split an asset into ranged chunks with priorities

use log::debug;

use crate::config::{PriorityLevel, FIRST_CHUNK_PRIORITY};
use crate::error::{Result, TransferError};
use crate::types::Chunk;

/// Split `total_bytes` into `ceil(total / chunk_size)` contiguous chunks.
///
/// Chunk 0 always gets [`FIRST_CHUNK_PRIORITY`]; every other chunk gets the
/// priority derived from `priority_level`.
pub fn plan(total_bytes: u64, chunk_size_bytes: u64, priority_level: PriorityLevel) -> Result<Vec<Chunk>> {
    if total_bytes == 0 {
        return Err(TransferError::InvalidInput(
            "total size is zero or unknown".to_string(),
        ));
    }
    if chunk_size_bytes == 0 {
        return Err(TransferError::InvalidInput(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let total_chunks = total_bytes.div_ceil(chunk_size_bytes);
    let rest_priority = priority_level.chunk_priority();

    let chunks: Vec<Chunk> = (0..total_chunks)
        .map(|i| {
            let start = i * chunk_size_bytes;
            let end = std::cmp::min(start + chunk_size_bytes - 1, total_bytes - 1);
            let priority = if i == 0 {
                FIRST_CHUNK_PRIORITY
            } else {
                rest_priority
            };
            Chunk::new(i as usize, start, end, priority)
        })
        .collect();

    debug!(
        "chunk_plan: total_bytes={} chunk_size={} chunks={} priority={}",
        total_bytes,
        chunk_size_bytes,
        chunks.len(),
        priority_level
    );
    Ok(chunks)
}
