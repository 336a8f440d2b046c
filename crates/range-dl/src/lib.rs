//! Resumable HTTP download engine built on byte-range chunks
//!
//! Provides chunked transfer of a single large asset with:
//! - Chunk planning with first-chunk-first priority
//! - Ranged fetches that honor a structured cancellation token
//! - Reassembly in planned byte order, independent of completion order
//! - Pause/Resume/Cancel with progress, speed and ETA reporting

mod config;
mod downloader;
mod error;
mod events;
mod planner;
mod reassembler;
mod transfer;
mod types;

pub use config::{
    PriorityLevel, TransferConfig, BYTES_PER_MB, DEFAULT_CHUNK_SIZE, FIRST_CHUNK_PRIORITY,
};
pub use downloader::{ChunkSource, HttpChunkSource};
pub use error::{Result, TransferError};
pub use events::{ChannelEvents, NoopEvents, TransferEvent, TransferEvents};
pub use planner::plan;
pub use reassembler::{loaded_bytes, reassemble, reassemble_checked};
pub use transfer::{ProgressiveTransfer, ThroughputSink, TransferBuilder, TransferOutcome};
pub use types::{Chunk, TransferProgress, TransferStage};

pub use tokio_util::sync::CancellationToken;
