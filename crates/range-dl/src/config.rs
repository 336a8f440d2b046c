//! Transfer configuration and priority constants

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};

/// Default chunk size (512 KiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 512 * 1024;

/// Priority assigned to chunk 0 so playable content arrives first
pub const FIRST_CHUNK_PRIORITY: u8 = 10;

/// Bytes per megabyte used for speed reporting
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Caller-selected priority for every chunk after the first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityLevel {
    #[serde(rename = "low")]
    Low,
    #[default]
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl PriorityLevel {
    pub fn chunk_priority(self) -> u8 {
        match self {
            PriorityLevel::High => 8,
            PriorityLevel::Medium => 5,
            PriorityLevel::Low => 2,
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityLevel::Low => write!(f, "low"),
            PriorityLevel::Medium => write!(f, "medium"),
            PriorityLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub chunk_size_bytes: u64,
    pub priority_level: PriorityLevel,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            priority_level: PriorityLevel::Medium,
        }
    }
}

impl TransferConfig {
    pub fn with_chunk_size(mut self, chunk_size_bytes: u64) -> Self {
        self.chunk_size_bytes = chunk_size_bytes;
        self
    }

    pub fn with_priority(mut self, priority_level: PriorityLevel) -> Self {
        self.priority_level = priority_level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_bytes == 0 {
            return Err(TransferError::InvalidInput(
                "chunk_size_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
