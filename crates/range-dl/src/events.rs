//! Observer interface for transfer progress and completion

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::TransferError;
use crate::types::TransferProgress;

/// Receives transfer notifications. Snapshots are immutable copies.
pub trait TransferEvents: Send + Sync {
    fn on_progress_update(&self, progress: &TransferProgress);

    fn on_load_complete(&self) {}

    fn on_load_error(&self, _error: &TransferError) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl TransferEvents for NoopEvents {
    fn on_progress_update(&self, _progress: &TransferProgress) {}
}

/// Event payload forwarded by [`ChannelEvents`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TransferEvent {
    Progress(TransferProgress),
    LoadComplete,
    LoadError { message: String },
}

/// Forwards events over an unbounded channel; a dropped receiver is ignored
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    sender: mpsc::UnboundedSender<TransferEvent>,
}

impl ChannelEvents {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl TransferEvents for ChannelEvents {
    fn on_progress_update(&self, progress: &TransferProgress) {
        let _ = self.sender.send(TransferEvent::Progress(progress.clone()));
    }

    fn on_load_complete(&self) {
        let _ = self.sender.send(TransferEvent::LoadComplete);
    }

    fn on_load_error(&self, error: &TransferError) {
        let _ = self.sender.send(TransferEvent::LoadError {
            message: error.to_string(),
        });
    }
}
