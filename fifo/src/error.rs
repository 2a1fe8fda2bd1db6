//! Error types for FIFO operations.

use std::io;

/// Result type alias for FIFO operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for FIFO operations.
///
/// Shortfalls of space or data are never reported here: they block until
/// resolved. Only store failures, misconfiguration, deadlines and shutdown
/// surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store failed to prepare, read or write.
    #[error("fifo: store error: {0}")]
    Store(#[from] io::Error),

    /// The backing store did not read back what was written to it.
    #[error("fifo: store self-test failed")]
    SelfTest,

    /// Invalid configuration.
    #[error("fifo: invalid config: {0}")]
    InvalidConfig(String),

    /// The deadline passed before the transfer completed.
    #[error("fifo: timed out after {transferred} bytes")]
    Timeout {
        /// Bytes moved before the deadline.
        transferred: usize,
    },

    /// The FIFO was closed before the transfer completed.
    #[error("fifo: closed after {transferred} bytes")]
    Closed {
        /// Bytes moved before the FIFO was closed.
        transferred: usize,
    },
}

impl Error {
    /// Returns the number of bytes moved before an interrupted transfer
    /// gave up, or zero for errors unrelated to a transfer.
    pub fn transferred(&self) -> usize {
        match self {
            Error::Timeout { transferred } | Error::Closed { transferred } => *transferred,
            _ => 0,
        }
    }
}
