//! Error taxonomy for chunked transfers

use thiserror::Error;

/// Result type for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Error, Debug)]
pub enum TransferError {
    /// The size probe could not determine the asset length
    #[error("Asset size unknown: server did not report a length")]
    SizeUnknown,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single chunk failed; the transfer continues with the others
    #[error("Chunk {chunk_id} failed: {message}")]
    ChunkFetch { chunk_id: usize, message: String },

    /// Expected outcome of pause/cancel, never reported as a failure
    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Reassembly incomplete: {loaded_bytes} of {total_bytes} bytes loaded")]
    ReassemblyIncomplete { loaded_bytes: u64, total_bytes: u64 },

    #[error("All {failed} chunks failed")]
    AllChunksFailed { failed: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TransferError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }

    /// Whether this error ends the transfer in the `Error` stage
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransferError::SizeUnknown
                | TransferError::InvalidInput(_)
                | TransferError::ReassemblyIncomplete { .. }
                | TransferError::AllChunksFailed { .. }
                | TransferError::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::TransferError;

    #[test]
    fn cancelled_is_not_fatal() {
        assert!(TransferError::Cancelled.is_cancelled());
        assert!(!TransferError::Cancelled.is_fatal());
        let chunk = TransferError::ChunkFetch {
            chunk_id: 3,
            message: "416".to_string(),
        };
        assert!(!chunk.is_fatal());
        assert!(!chunk.is_cancelled());
        assert!(TransferError::SizeUnknown.is_fatal());
    }

    #[test]
    fn messages_carry_context() {
        let err = TransferError::ReassemblyIncomplete {
            loaded_bytes: 90,
            total_bytes: 100,
        };
        assert_eq!(err.to_string(), "Reassembly incomplete: 90 of 100 bytes loaded");
        let err = TransferError::ChunkFetch {
            chunk_id: 2,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Chunk 2 failed: boom");
    }
}
