//! Error types for lazycut.

use thiserror::Error;

/// Main error type for lazycut operations.
#[derive(Error, Debug)]
pub enum LazycutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid width/height/fps or similar request parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed decode-stream header or frame size.
    #[error("Framing error: {0}")]
    Framing(String),

    /// An external process could not be spawned or exited unsuccessfully.
    #[error("Process error: {0}")]
    Process(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Render timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A newer request replaced this one before it produced a result.
    #[error("Render superseded by a newer request")]
    Superseded,

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl LazycutError {
    /// True when the error is an orderly end of a pipe rather than a failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Result type alias for lazycut operations.
pub type Result<T> = std::result::Result<T, LazycutError>;
