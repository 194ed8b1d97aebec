use std::num::NonZero;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::{RunResult, Runner, RunnerError, Strategy, Workload};

/// Distributes units across a fixed-size pool of worker threads.
///
/// The pool is created when [`run()`](Runner::run) starts and every thread is joined before it
/// returns. Outputs are returned in input order regardless of which thread finished first.
///
/// No speedup is assumed for CPU-bound workloads; the runner simply measures what happens.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use strategy_bench::{FibonacciSum, MultiThreadRunner, Runner};
///
/// let runner = MultiThreadRunner::new(nz!(2));
/// let run = runner.run(&FibonacciSum, &[10, 11, 12]).unwrap();
///
/// assert_eq!(run.results(), &[288, 466, 754]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct MultiThreadRunner {
    threads: NonZero<usize>,
}

impl MultiThreadRunner {
    /// Creates a runner that uses up to `threads` worker threads.
    ///
    /// Fewer threads are started if there are fewer inputs than threads.
    #[must_use]
    pub fn new(threads: NonZero<usize>) -> Self {
        Self { threads }
    }

    /// Maximum number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> NonZero<usize> {
        self.threads
    }
}

enum Command<'a, I, O> {
    Execute {
        index: usize,
        input: &'a I,
        result_tx: oneshot::Sender<O>,
    },
    Shutdown,
}

impl Runner for MultiThreadRunner {
    fn strategy(&self) -> Strategy {
        Strategy::MultiThread
    }

    fn run<W: Workload>(&self, workload: &W, inputs: &[W::Input]) -> Result<RunResult<W::Output>> {
        let start = Instant::now();

        if inputs.is_empty() {
            return Ok(RunResult::new(Strategy::MultiThread, 0, Vec::new(), start.elapsed()));
        }

        let worker_count = self.threads.get().min(inputs.len());

        debug!(
            workload = workload.name(),
            inputs = inputs.len(),
            worker_count,
            "multi-threaded run started"
        );

        let (command_tx, command_rx) = mpsc::channel::<Command<'_, W::Input, W::Output>>();
        let command_rx = Mutex::new(command_rx);

        let (result_txs, result_rxs): (Vec<_>, Vec<_>) = inputs
            .iter()
            .map(|_| oneshot::channel::<W::Output>())
            .unzip();

        let pool_outcome = thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(worker_count);
            let mut spawn_error = None;

            for worker_index in 0..worker_count {
                let command_rx = &command_rx;

                let spawned = thread::Builder::new()
                    .name(format!("strategy-bench-t{worker_index}"))
                    .spawn_scoped(scope, move || {
                        worker_entrypoint(workload, command_rx, worker_index);
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        spawn_error = Some(source);
                        break;
                    }
                }
            }

            if spawn_error.is_none() {
                for (index, (input, result_tx)) in inputs.iter().zip(result_txs).enumerate() {
                    command_tx
                        .send(Command::Execute {
                            index,
                            input,
                            result_tx,
                        })
                        .expect("command receiver outlives the worker scope");
                }
            }

            // One poison pill per started worker. Queued after all the work, so every worker
            // drains the queue before it sees one.
            for _ in &handles {
                command_tx
                    .send(Command::Shutdown)
                    .expect("command receiver outlives the worker scope");
            }

            let panicked = handles
                .into_iter()
                .map(thread::ScopedJoinHandle::join)
                .filter(std::result::Result::is_err)
                .count();

            if let Some(source) = spawn_error {
                return Err(RunnerError::PoolCreation { source });
            }

            if panicked > 0 {
                return Err(RunnerError::WorkerPanicked { count: panicked });
            }

            Ok(())
        });

        // Any commands still queued (because their worker died) release their result senders here.
        drop(command_rx);
        pool_outcome?;

        let mut results = Vec::with_capacity(inputs.len());

        for result_rx in result_rxs {
            let output = result_rx
                .recv()
                .map_err(|_disconnected| RunnerError::WorkerPanicked { count: 1 })?;
            results.push(output);
        }

        let elapsed = start.elapsed();

        debug!(workload = workload.name(), ?elapsed, "multi-threaded run finished");

        Ok(RunResult::new(Strategy::MultiThread, worker_count, results, elapsed))
    }
}

#[cfg_attr(test, mutants::skip)] // Mutating the worker loop hangs every run.
fn worker_entrypoint<W: Workload>(
    workload: &W,
    command_rx: &Mutex<mpsc::Receiver<Command<'_, W::Input, W::Output>>>,
    worker_index: usize,
) {
    loop {
        // The lock is only held while taking the next command, never while executing it.
        let command = command_rx.lock().recv();

        match command {
            Ok(Command::Execute {
                index,
                input,
                result_tx,
            }) => {
                let output = workload.invoke(input);
                trace!(worker_index, index, "unit completed");

                // The caller only stops listening if it has already given up on the run.
                drop(result_tx.send(output));
            }
            Ok(Command::Shutdown) | Err(_) => break,
        }
    }
}
