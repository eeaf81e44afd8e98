//! Error handling for image sync operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("unmarshal status: {0}")]
    DecodeStatus(#[source] serde_json::Error),
    #[error("unmarshal error: {0}")]
    DecodeError(#[source] serde_json::Error),
    /// Error reported by the engine inside the status stream
    #[error("returned error: {0}")]
    Remote(String),
    #[error("scanner: {0}")]
    Stream(#[source] std::io::Error),
    #[error("cancelled")]
    Cancelled,
    #[error("new engine client: {0}")]
    ClientConstruction(String),
    #[error("{operation}: engine responded {status}: {message}")]
    Engine {
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("[{command}] {image}: {source}")]
    Image {
        command: String,
        image: String,
        #[source]
        source: Box<SyncError>,
    },
}

/// Coarse category of a [`SyncError`], independent of context wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    Remote,
    StreamIo,
    Cancelled,
    ClientConstruction,
    Operation,
    Config,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::DecodeStatus(_) | SyncError::DecodeError(_) => ErrorKind::Decode,
            SyncError::Remote(_) => ErrorKind::Remote,
            SyncError::Stream(_) => ErrorKind::StreamIo,
            SyncError::Cancelled => ErrorKind::Cancelled,
            SyncError::ClientConstruction(_) => ErrorKind::ClientConstruction,
            SyncError::Engine { .. } | SyncError::Transport { .. } => ErrorKind::Operation,
            SyncError::Config(_) => ErrorKind::Config,
            SyncError::Image { source, .. } => source.kind(),
        }
    }

    /// Attach the command and image that failed
    pub fn in_image(self, command: &str, image: &str) -> Self {
        SyncError::Image {
            command: command.to_string(),
            image: image.to_string(),
            source: Box::new(self),
        }
    }
}
