//! In-memory chunk source shared by the transfer tests

use std::collections::HashSet;
use std::sync::Mutex;

use range_dl::{CancellationToken, Chunk, ChunkSource, Result, TransferError};

pub fn asset(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8 + 1).collect()
}

pub struct MemorySource {
    data: Vec<u8>,
    report_size: bool,
    failing: Mutex<HashSet<usize>>,
    stall_on: Mutex<Option<usize>>,
    requests: Mutex<Vec<usize>>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            report_size: true,
            failing: Mutex::new(HashSet::new()),
            stall_on: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn without_size(mut self) -> Self {
        self.report_size = false;
        self
    }

    pub fn fail_chunk(&self, id: usize) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Chunk `id` blocks until its token is cancelled
    pub fn stall_on(&self, id: Option<usize>) {
        *self.stall_on.lock().unwrap() = id;
    }

    pub fn requests(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, id: usize) -> usize {
        self.requests().iter().filter(|r| **r == id).count()
    }
}

impl ChunkSource for MemorySource {
    async fn probe_size(&self) -> Result<u64> {
        Ok(if self.report_size {
            self.data.len() as u64
        } else {
            0
        })
    }

    async fn fetch_chunk(&self, chunk: &Chunk, token: &CancellationToken) -> Result<Vec<u8>> {
        if token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        self.requests.lock().unwrap().push(chunk.id());

        let stall = *self.stall_on.lock().unwrap() == Some(chunk.id());
        if stall {
            token.cancelled().await;
            return Err(TransferError::Cancelled);
        }
        if self.failing.lock().unwrap().contains(&chunk.id()) {
            return Err(TransferError::ChunkFetch {
                chunk_id: chunk.id(),
                message: "HTTP 500".to_string(),
            });
        }

        let start = chunk.byte_range_start() as usize;
        let end = chunk.byte_range_end() as usize;
        Ok(self.data[start..=end].to_vec())
    }

    fn label(&self) -> &str {
        "memory"
    }
}
