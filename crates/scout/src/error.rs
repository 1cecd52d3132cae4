use std::io;

/// Errors that end a console session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The agent invocation failed.
    #[error(transparent)]
    Agent(#[from] scout_core::Error),
    /// Checkpoints could not be read back for display.
    #[error("failed to list checkpoints: {0}")]
    Store(#[from] scout_core::checkpoint::Error),
    /// Reading input or writing output failed.
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
}
