//! Chunk and progress types owned by a transfer

use serde::{Deserialize, Serialize};

use crate::config::BYTES_PER_MB;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStage {
    #[default]
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "downloading")]
    Downloading,
    #[serde(rename = "parsing")]
    Parsing,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStage::Idle => write!(f, "idle"),
            TransferStage::Downloading => write!(f, "downloading"),
            TransferStage::Parsing => write!(f, "parsing"),
            TransferStage::Complete => write!(f, "complete"),
            TransferStage::Error => write!(f, "error"),
        }
    }
}

/// A planned byte range of the asset.
///
/// The id and range are fixed at plan time; only the load state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    id: usize,
    byte_range_start: u64,
    byte_range_end: u64,
    priority: u8,
    loaded: bool,
    data: Option<Vec<u8>>,
    error: Option<String>,
}

impl Chunk {
    /// Create a chunk covering `start..=end`
    pub fn new(id: usize, byte_range_start: u64, byte_range_end: u64, priority: u8) -> Self {
        Self {
            id,
            byte_range_start,
            byte_range_end,
            priority,
            loaded: false,
            data: None,
            error: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn byte_range_start(&self) -> u64 {
        self.byte_range_start
    }

    /// Inclusive end offset
    pub fn byte_range_end(&self) -> u64 {
        self.byte_range_end
    }

    pub fn size_bytes(&self) -> u64 {
        self.byte_range_end - self.byte_range_start + 1
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Range` header value for this chunk
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.byte_range_start, self.byte_range_end)
    }

    /// Store fetched bytes and clear any earlier failure
    pub fn mark_loaded(&mut self, data: Vec<u8>) {
        self.loaded = true;
        self.data = Some(data);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.loaded = false;
        self.data = None;
        self.error = Some(error.into());
    }
}

/// Snapshot of transfer progress handed to observers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferProgress {
    pub stage: TransferStage,
    pub paused: bool,
    pub percentage: f64,
    pub bytes_loaded: u64,
    pub bytes_total: u64,
    pub time_elapsed_sec: f64,
    pub eta_sec: f64,
    pub current_chunk_index: usize,
    pub total_chunks: usize,
    pub speed_mbps: f64,
}

impl TransferProgress {
    /// Recompute percentage, speed and ETA from byte counts and elapsed time
    pub(crate) fn recompute(&mut self, time_elapsed_sec: f64) {
        self.bytes_loaded = self.bytes_loaded.min(self.bytes_total);
        self.time_elapsed_sec = time_elapsed_sec;
        self.percentage = if self.bytes_total > 0 {
            (self.bytes_loaded as f64 / self.bytes_total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        self.speed_mbps = if time_elapsed_sec > 0.0 {
            self.bytes_loaded as f64 / BYTES_PER_MB / time_elapsed_sec
        } else {
            0.0
        };
        let remaining_mb = (self.bytes_total - self.bytes_loaded) as f64 / BYTES_PER_MB;
        self.eta_sec = if self.speed_mbps > 0.0 {
            remaining_mb / self.speed_mbps
        } else {
            0.0
        };
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.stage, TransferStage::Complete | TransferStage::Error)
    }
}
