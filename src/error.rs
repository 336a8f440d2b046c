use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Transfer(#[from] range_dl::TransferError),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl LoaderError {
    /// Pause/cancel outcomes are not failures
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoaderError::Transfer(e) if e.is_cancelled())
    }
}
