use std::io;

use thiserror::Error;

/// Errors raised by the concurrency demos.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DemoError {
    /// A withdrawal asked for more than the account holds.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount the caller tried to withdraw.
        requested: u64,

        /// The balance at the time of the check.
        available: u64,
    },

    /// The other side of a channel or pipe is gone.
    #[error("the other end of the channel has disconnected")]
    Disconnected,

    /// A demo thread could not be started.
    #[error("failed to start demo thread: {0}")]
    ThreadSpawn(io::Error),

    /// A demo thread panicked.
    #[error("demo thread '{0}' panicked")]
    ThreadPanicked(&'static str),

    /// The cooperative runtime could not be created.
    #[error("failed to create async runtime: {0}")]
    Runtime(io::Error),
}

/// A specialized `Result` type for demo operations.
pub(crate) type Result<T> = std::result::Result<T, DemoError>;
