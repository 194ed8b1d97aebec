use std::time::Instant;

use futures::future::join_all;
use tracing::debug;

use crate::error::Result;
use crate::{RunResult, Runner, RunnerError, Strategy, Workload};

/// Runs every unit as a cooperative task on a single-threaded event loop.
///
/// All tasks are started together and the runner waits for all of them. Tasks only yield to each
/// other when the workload suspends, so a workload that never suspends (every CPU-bound workload)
/// runs its units one after another on the calling thread, just like the sequential runner.
///
/// The event loop is created when [`run()`](Runner::run) starts and torn down before it returns.
/// There is no pool size: every input gets its own task.
///
/// # Example
///
/// ```
/// use strategy_bench::{CooperativeRunner, Runner, SumOfSquares};
///
/// let run = CooperativeRunner.run(&SumOfSquares, &[3, 4]).unwrap();
///
/// assert_eq!(run.results(), &[5, 14]);
/// assert_eq!(run.workers(), 2);
/// ```
#[derive(Clone, Copy, Debug, Default)]
#[expect(
    clippy::exhaustive_structs,
    reason = "intentionally a stateless unit struct"
)]
pub struct CooperativeRunner;

impl Runner for CooperativeRunner {
    fn strategy(&self) -> Strategy {
        Strategy::Cooperative
    }

    fn run<W: Workload>(&self, workload: &W, inputs: &[W::Input]) -> Result<RunResult<W::Output>> {
        let start = Instant::now();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| RunnerError::RuntimeUnavailable { source })?;

        debug!(
            workload = workload.name(),
            tasks = inputs.len(),
            "cooperative run started"
        );

        // join_all yields the outputs in the order the futures were given, not completion order.
        let results = runtime.block_on(join_all(
            inputs.iter().map(|input| workload.invoke_async(input)),
        ));

        // Tears down the event loop, including any tasks a workload spawned onto it.
        drop(runtime);

        let elapsed = start.elapsed();

        debug!(workload = workload.name(), ?elapsed, "cooperative run finished");

        Ok(RunResult::new(Strategy::Cooperative, inputs.len(), results, elapsed))
    }
}
