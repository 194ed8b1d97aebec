//! The worker side of the multi-process strategy.
//!
//! A worker process reads [`Request`] frames from its stdin and answers each `Invoke` with one
//! [`Response`] frame on its stdout, until it receives `Shutdown` (the poison pill).

use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::framing::{read_frame, write_frame};
use crate::{
    FibonacciSum, FrameError, HttpFetch, SumOfSquares, WebSocketEcho, WebSocketEchoOptions,
    Workload, WorkloadSpec,
};

/// A message from the parent process to a worker.
///
/// Externally tagged, so that outputs such as `u128` survive deserialization.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[expect(
    clippy::exhaustive_enums,
    reason = "a new message is a protocol change on both sides"
)]
pub enum Request<I> {
    /// Execute the workload for one input.
    Invoke {
        /// Position of the input in the input set.
        index: usize,

        /// The input value.
        input: I,
    },

    /// No more work will arrive; the worker exits without replying.
    Shutdown,
}

/// A message from a worker to the parent process.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[expect(
    clippy::exhaustive_enums,
    reason = "a new message is a protocol change on both sides"
)]
pub enum Response<O> {
    /// The workload produced `output` for the input at `index`.
    Completed {
        /// Position of the input in the input set.
        index: usize,

        /// The workload output.
        output: O,
    },

    /// The worker could not process a request and is about to exit.
    Rejected {
        /// Why the request was rejected.
        message: String,
    },
}

/// Serves requests for `workload` until a `Shutdown` request arrives.
///
/// Returns the number of units executed.
///
/// # Errors
///
/// Returns an error if the request stream breaks, ends without a `Shutdown` request, or carries
/// a request that does not decode as an input of `workload`. Undecodable requests are answered
/// with a `Rejected` response before the error is returned.
pub fn serve<W, R, Wr>(workload: &W, mut reader: R, mut writer: Wr) -> Result<usize, FrameError>
where
    W: Workload,
    R: Read,
    Wr: Write,
{
    let mut served = 0_usize;

    loop {
        match read_frame::<_, Request<W::Input>>(&mut reader) {
            Ok(Request::Invoke { index, input }) => {
                let output = workload.invoke(&input);
                trace!(index, ?output, "unit completed in worker");

                write_frame(&mut writer, &Response::Completed { index, output })?;
                served = served.saturating_add(1);
            }
            Ok(Request::Shutdown) => {
                debug!(
                    workload = workload.name(),
                    served,
                    "worker received shutdown"
                );
                return Ok(served);
            }
            Err(FrameError::Decode(error)) => {
                let response = Response::<W::Output>::Rejected {
                    message: error.to_string(),
                };

                // The parent may already be gone; the decode error is what matters.
                drop(write_frame(&mut writer, &response));

                return Err(FrameError::Decode(error));
            }
            Err(error) => return Err(error),
        }
    }
}

/// Builds the workload described by `spec` and serves requests for it.
///
/// This is the entry point of a worker process.
///
/// # Errors
///
/// See [`serve()`].
pub fn serve_spec<R, Wr>(spec: &WorkloadSpec, reader: R, writer: Wr) -> Result<usize, FrameError>
where
    R: Read,
    Wr: Write,
{
    match spec {
        WorkloadSpec::FibonacciSum => serve(&FibonacciSum, reader, writer),
        WorkloadSpec::SumOfSquares => serve(&SumOfSquares, reader, writer),
        WorkloadSpec::HttpFetch { timeout_ms } => serve(
            &HttpFetch::with_timeout(Duration::from_millis(*timeout_ms)),
            reader,
            writer,
        ),
        WorkloadSpec::WebSocketEcho {
            url,
            message,
            messages_per_connection,
            timeout_ms,
        } => {
            let workload = WebSocketEcho::new(WebSocketEchoOptions {
                url: url.clone(),
                message: message.clone(),
                messages_per_connection: *messages_per_connection,
                timeout: Duration::from_millis(*timeout_ms),
            });

            serve(&workload, reader, writer)
        }
    }
}
