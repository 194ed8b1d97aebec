use std::io;

use thiserror::Error;

use crate::Strategy;

/// Errors that abort a strategy runner before it can produce a [`RunResult`][crate::RunResult].
///
/// Failures of individual units of work are not represented here - workloads degrade them to
/// the sentinel result and the batch continues. Everything in this enum is fatal for the run
/// that raised it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// The runner could not allocate its worker threads.
    #[error("failed to create worker thread pool: {source}")]
    PoolCreation {
        /// The error reported by the operating system.
        source: io::Error,
    },

    /// A worker process could not be started.
    #[error("failed to spawn worker process {worker}: {source}")]
    WorkerSpawn {
        /// Index of the worker within the pool.
        worker: usize,

        /// The error reported by the operating system.
        source: io::Error,
    },

    /// One or more pool threads panicked while executing the workload.
    #[error("{count} worker thread(s) panicked")]
    WorkerPanicked {
        /// How many threads panicked.
        count: usize,
    },

    /// A worker process terminated before it was told to shut down, or shut down uncleanly.
    #[error("worker process {worker} exited unexpectedly ({status})")]
    WorkerExited {
        /// Index of the worker within the pool.
        worker: usize,

        /// Human-readable exit status of the process.
        status: String,
    },

    /// A worker process sent or received a frame that could not be processed.
    #[error("protocol failure talking to worker process {worker}: {source}")]
    Protocol {
        /// Index of the worker within the pool.
        worker: usize,

        /// The underlying framing problem.
        source: FrameError,
    },

    /// A worker process refused a request, typically because it could not decode the input.
    #[error("worker process {worker} rejected a request: {message}")]
    WorkerRejected {
        /// Index of the worker within the pool.
        worker: usize,

        /// The reason given by the worker.
        message: String,
    },

    /// The workload cannot be reconstructed inside a separate process.
    #[error("workload '{workload}' cannot be executed in worker processes")]
    NotProcessSafe {
        /// Name of the workload.
        workload: String,
    },

    /// The cooperative runner could not build its event loop.
    #[error("failed to create cooperative runtime: {source}")]
    RuntimeUnavailable {
        /// The error reported while building the runtime.
        source: io::Error,
    },
}

/// Errors that occur while reading or writing worker-process frames.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The underlying pipe failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A message could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(serde_json::Error),

    /// A frame payload could not be deserialized into the expected message type.
    #[error("failed to decode frame: {0}")]
    Decode(serde_json::Error),

    /// The announced frame length exceeds the maximum.
    #[error("frame too large: {size} bytes (max {max} bytes)")]
    TooLarge {
        /// Announced size of the frame.
        size: usize,

        /// Largest accepted size.
        max: usize,
    },

    /// A frame announced a zero-length payload.
    #[error("zero-length frame")]
    Empty,

    /// The stream ended cleanly before a new frame started.
    #[error("end of stream")]
    EndOfStream,
}

/// Errors returned by the [`Benchmark`][crate::Benchmark] driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BenchmarkError {
    /// One of the strategy runners failed fatally, aborting the benchmark.
    #[error("{strategy} runner failed: {source}")]
    Runner {
        /// The strategy whose runner failed.
        strategy: Strategy,

        /// Why the runner failed.
        source: RunnerError,
    },
}

/// Errors raised by I/O workloads before they are degraded to the sentinel result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub(crate) enum WorkloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket failure: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("invalid WebSocket URL '{0}'")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out")]
    TimedOut,

    #[error("connection closed by peer")]
    Closed,
}

impl From<tungstenite::Error> for WorkloadError {
    fn from(error: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}

/// A specialized `Result` type for runner operations.
pub(crate) type Result<T> = std::result::Result<T, RunnerError>;
