//! Caller-owned destinations for pass failures

use crate::error::CoreError;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, warn};

/// Receives every failure and conflict raised by a pass.
///
/// `report` is called inline from the controller loop and must not block.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: CoreError);
}

/// Logs each error as it is reported
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, error: CoreError) {
        if error.is_recoverable() {
            warn!("{}", error);
        } else {
            error!("{}", error);
        }
    }
}

/// Bounded queue of errors; drops and logs when the reader falls behind
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<CoreError>,
}

impl ChannelSink {
    /// Create a sink holding at most `capacity` unread errors
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CoreError>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ErrorSink for ChannelSink {
    fn report(&self, error: CoreError) {
        match self.tx.try_send(error) {
            Ok(()) => {}
            Err(TrySendError::Full(error)) => {
                warn!("Error channel full, dropping: {}", error);
            }
            Err(TrySendError::Closed(error)) => {
                error!("Error channel closed: {}", error);
            }
        }
    }
}
