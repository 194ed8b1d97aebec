use std::fmt::{Debug, Display};
use std::future::Future;
use std::iter::Sum;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Whether a workload spends its time computing or waiting on the network.
///
/// The classification only drives the default pool sizes of the parallel runners (see
/// [`RunnerConfig::for_kind()`][crate::RunnerConfig::for_kind]). It never changes how a runner
/// executes the workload.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a workload either computes or waits, there is no third kind"
)]
pub enum WorkloadKind {
    /// Pure, deterministic computation with no I/O.
    #[display("CPU-bound")]
    Cpu,

    /// Blocking or awaitable network operations that may fail transiently.
    #[display("I/O-bound")]
    Io,
}

/// A unit of work that can be executed by every strategy runner.
///
/// A workload maps one input value to one output value. Implementations must be safe to invoke
/// concurrently from multiple threads and must not rely on shared mutable state.
///
/// CPU workloads are expected to be deterministic, which is what makes the cross-strategy
/// equivalence check meaningful. I/O workloads must not fail: any error is logged and the unit
/// resolves to the sentinel result, `Output::default()`, so that one failed unit never aborts
/// the batch it belongs to.
///
/// # Example
///
/// ```
/// use strategy_bench::{Runner, SequentialRunner, Workload, WorkloadKind};
///
/// struct Double;
///
/// impl Workload for Double {
///     type Input = u64;
///     type Output = u64;
///
///     fn name(&self) -> &str {
///         "double"
///     }
///
///     fn kind(&self) -> WorkloadKind {
///         WorkloadKind::Cpu
///     }
///
///     fn invoke(&self, input: &u64) -> u64 {
///         input * 2
///     }
/// }
///
/// let run = SequentialRunner.run(&Double, &[1, 2, 3]).unwrap();
/// assert_eq!(run.results(), &[2, 4, 6]);
/// ```
pub trait Workload: Sync {
    /// The value each unit of work starts from.
    type Input: Debug + Send + Sync + Serialize + DeserializeOwned;

    /// The scalar each unit of work produces. `Default::default()` is the sentinel result.
    type Output: Copy
        + Debug
        + Default
        + Display
        + Eq
        + Send
        + Sum
        + Serialize
        + DeserializeOwned;

    /// Short human-readable name, used in logs and reports.
    fn name(&self) -> &str;

    /// Classification of the workload.
    fn kind(&self) -> WorkloadKind;

    /// Executes one unit of work on the calling thread.
    fn invoke(&self, input: &Self::Input) -> Self::Output;

    /// Executes one unit of work as a cooperative task.
    ///
    /// The default implementation calls [`invoke()`](Self::invoke) without ever suspending, so a
    /// CPU-bound workload gains nothing from cooperative scheduling. I/O workloads override this
    /// to suspend on their network operations.
    fn invoke_async(&self, input: &Self::Input) -> impl Future<Output = Self::Output> {
        async move { self.invoke(input) }
    }

    /// Reduces the ordered results of one run to a single comparable value.
    ///
    /// Defaults to the sum of all results.
    fn aggregate(&self, results: &[Self::Output]) -> Self::Output {
        results.iter().copied().sum()
    }

    /// Unit of the aggregate, for reporting (e.g. "bytes"). Empty by default.
    fn unit(&self) -> &'static str {
        ""
    }

    /// Describes how to rebuild this workload inside a worker process.
    ///
    /// Workloads that return `None` (the default) cannot be executed by the
    /// [`MultiProcessRunner`][crate::MultiProcessRunner].
    fn spec(&self) -> Option<WorkloadSpec> {
        None
    }
}

/// Serializable description of a built-in workload, sent to worker processes so they can
/// construct an identical workload on their side of the process boundary.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "workload", rename_all = "snake_case")]
#[non_exhaustive]
pub enum WorkloadSpec {
    /// See [`FibonacciSum`][crate::FibonacciSum].
    FibonacciSum,

    /// See [`SumOfSquares`][crate::SumOfSquares].
    SumOfSquares,

    /// See [`HttpFetch`][crate::HttpFetch].
    HttpFetch {
        /// Per-request timeout.
        timeout_ms: u64,
    },

    /// See [`WebSocketEcho`][crate::WebSocketEcho].
    WebSocketEcho {
        /// Echo endpoint.
        url: String,

        /// Text sent on every round trip.
        message: String,

        /// Round trips per connection.
        messages_per_connection: u32,

        /// Timeout for connecting and for each receive.
        timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    struct Triple;

    impl Workload for Triple {
        type Input = u32;
        type Output = u64;

        fn name(&self) -> &str {
            "triple"
        }

        fn kind(&self) -> WorkloadKind {
            WorkloadKind::Cpu
        }

        fn invoke(&self, input: &u32) -> u64 {
            u64::from(*input) * 3
        }
    }

    #[test]
    fn default_aggregate_is_sum() {
        assert_eq!(Triple.aggregate(&[3, 6, 9]), 18);
        assert_eq!(Triple.aggregate(&[]), 0);
    }

    #[test]
    fn default_async_invoke_matches_sync() {
        assert_eq!(block_on(Triple.invoke_async(&7)), Triple.invoke(&7));
    }

    #[test]
    fn default_workload_is_not_process_safe() {
        assert!(Triple.spec().is_none());
        assert_eq!(Triple.unit(), "");
    }

    #[test]
    fn spec_serializes_with_tag() {
        let spec = WorkloadSpec::HttpFetch { timeout_ms: 1500 };

        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"workload":"http_fetch","timeout_ms":1500}"#);

        let parsed: WorkloadSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn kind_display() {
        assert_eq!(WorkloadKind::Cpu.to_string(), "CPU-bound");
        assert_eq!(WorkloadKind::Io.to_string(), "I/O-bound");
    }
}
