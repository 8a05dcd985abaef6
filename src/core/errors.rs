/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Bridge errors
///
/// Cancellation is deliberately absent: a cancelled source read is reported
/// as "no data produced" and surfaces to the consumer as end-of-stream.
#[derive(Error, Debug, Diagnostic)]
pub enum BridgeError {
    #[error("Chunk queue already completed; no further chunks may be added")]
    #[diagnostic(
        code(bridge::already_completed),
        help("The producer signaled completion and then kept writing. Stop the fill loop before signaling.")
    )]
    AlreadyCompleted,

    #[error("Source read failed: {0}")]
    #[diagnostic(
        code(bridge::source_read_failed),
        help("The upstream byte source reported an I/O error. No chunk was enqueued for this attempt.")
    )]
    SourceReadFailed(#[source] io::Error),

    #[error("Invalid bridge configuration: {0}")]
    #[diagnostic(
        code(bridge::invalid_config),
        help("Chunk size must lie within the MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE bounds.")
    )]
    InvalidConfig(String),

    #[error("Failed to spawn bridge thread: {0}")]
    #[diagnostic(code(bridge::thread_spawn_failed))]
    ThreadSpawnFailed(#[source] io::Error),

    #[error("Fill loop thread panicked")]
    #[diagnostic(
        code(bridge::fill_thread_panicked),
        help("Completion was still signaled; the consumer observed an early end-of-stream.")
    )]
    FillThreadPanicked,
}

impl BridgeError {
    /// Returns true for errors caused by misuse of the bridge rather than I/O
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, BridgeError::AlreadyCompleted | BridgeError::InvalidConfig(_))
    }
}

impl From<BridgeError> for io::Error {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::SourceReadFailed(e) | BridgeError::ThreadSpawnFailed(e) => e,
            BridgeError::AlreadyCompleted => io::Error::new(io::ErrorKind::BrokenPipe, err),
            BridgeError::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            BridgeError::FillThreadPanicked => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

/// Result alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
