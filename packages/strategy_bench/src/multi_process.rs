use std::ffi::OsString;
use std::io::{BufReader, BufWriter};
use std::num::NonZero;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::framing::{read_frame, write_frame};
use crate::worker::{Request, Response};
use crate::{FrameError, RunResult, Runner, RunnerError, Strategy, Workload};

/// Distributes units across a fixed-size pool of worker processes.
///
/// Each worker is a separate OS process with its own memory, started as
/// `<program> worker --spec <json>` where the JSON is the workload's
/// [`WorkloadSpec`][crate::WorkloadSpec]. By default `<program>` is the current executable, which
/// is expected to dispatch the `worker` subcommand to [`serve_spec()`][crate::serve_spec] (the
/// `strategy_bench` binary does this).
///
/// Units are handed out one at a time to whichever worker is free and outputs are stored by
/// input index, so the returned order always matches the input order. The pool lives only for
/// the duration of [`run()`](Runner::run): every worker is either shut down through the poison
/// pill and reaped, or killed and reaped if the run fails.
#[derive(Clone, Debug)]
pub struct MultiProcessRunner {
    processes: NonZero<usize>,
    program: Option<PathBuf>,
}

impl MultiProcessRunner {
    /// Creates a runner that uses up to `processes` worker processes.
    ///
    /// Fewer processes are started if there are fewer inputs than processes.
    #[must_use]
    pub fn new(processes: NonZero<usize>) -> Self {
        Self {
            processes,
            program: None,
        }
    }

    /// Uses `program` as the worker executable instead of the current executable.
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Maximum number of worker processes.
    #[must_use]
    pub fn process_count(&self) -> NonZero<usize> {
        self.processes
    }

    fn resolve_program(&self) -> Result<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => std::env::current_exe()
                .map_err(|source| RunnerError::WorkerSpawn { worker: 0, source }),
        }
    }
}

impl Runner for MultiProcessRunner {
    fn strategy(&self) -> Strategy {
        Strategy::MultiProcess
    }

    fn run<W: Workload>(&self, workload: &W, inputs: &[W::Input]) -> Result<RunResult<W::Output>> {
        let spec = workload.spec().ok_or_else(|| RunnerError::NotProcessSafe {
            workload: workload.name().to_string(),
        })?;

        let start = Instant::now();

        if inputs.is_empty() {
            return Ok(RunResult::new(Strategy::MultiProcess, 0, Vec::new(), start.elapsed()));
        }

        let spec_json = serde_json::to_string(&spec).map_err(|e| RunnerError::Protocol {
            worker: 0,
            source: FrameError::Encode(e),
        })?;

        let program = self.resolve_program()?;
        let worker_count = self.processes.get().min(inputs.len());

        debug!(
            workload = workload.name(),
            inputs = inputs.len(),
            worker_count,
            program = %program.display(),
            "multi-process run started"
        );

        // If any spawn fails, the workers already started are killed as the vector drops.
        let mut workers = (0..worker_count)
            .map(|index| WorkerProcess::spawn(index, &program, &spec_json))
            .collect::<Result<Vec<_>>>()?;

        let next_index = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<W::Output>>> = Mutex::new(vec![None; inputs.len()]);

        let feeder_outcomes = thread::scope(|scope| {
            let next_index = &next_index;
            let slots = &slots;

            let mut handles = Vec::with_capacity(workers.len());
            let mut spawn_error = None;

            for worker in &mut workers {
                let spawned = thread::Builder::new()
                    .name(format!("strategy-bench-p{}", worker.index))
                    .spawn_scoped(scope, move || {
                        let outcome = worker.feed(inputs, next_index, slots);

                        if outcome.is_err() {
                            // Stop handing out work, the run is lost anyway.
                            next_index.store(inputs.len(), Ordering::Relaxed);
                        }

                        outcome
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        next_index.store(inputs.len(), Ordering::Relaxed);
                        spawn_error = Some(RunnerError::PoolCreation { source });
                        break;
                    }
                }
            }

            let mut outcomes = handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(RunnerError::WorkerPanicked { count: 1 }))
                })
                .collect::<Vec<_>>();

            outcomes.extend(spawn_error.map(Err));
            outcomes
        });

        for outcome in feeder_outcomes {
            outcome?;
        }

        for worker in &mut workers {
            worker.shut_down()?;
        }

        let results = slots
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| RunnerError::Protocol {
                    worker: 0,
                    source: FrameError::Io(std::io::Error::other(format!(
                        "no worker produced a result for input {index}"
                    ))),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let elapsed = start.elapsed();

        debug!(workload = workload.name(), ?elapsed, "multi-process run finished");

        Ok(RunResult::new(Strategy::MultiProcess, worker_count, results, elapsed))
    }
}

/// One child process of the pool, together with the pipes used to talk to it.
///
/// Dropping a worker that has not been shut down kills and reaps the child.
#[derive(Debug)]
struct WorkerProcess {
    index: usize,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    reaped: bool,
}

impl WorkerProcess {
    fn spawn(index: usize, program: &Path, spec_json: &str) -> Result<Self> {
        let mut child = Command::new(program)
            .args(worker_args(spec_json))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RunnerError::WorkerSpawn {
                worker: index,
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            // Both pipes were requested above, so this only happens if the platform lies.
            drop(child.kill());
            drop(child.wait());

            return Err(RunnerError::WorkerSpawn {
                worker: index,
                source: std::io::Error::other("worker process pipes unavailable"),
            });
        };

        trace!(worker = index, pid = child.id(), "worker process started");

        Ok(Self {
            index,
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
            reaped: false,
        })
    }

    /// Pulls inputs from the shared cursor until none remain, storing each output in its slot.
    fn feed<I, O>(
        &mut self,
        inputs: &[I],
        next_index: &AtomicUsize,
        slots: &Mutex<Vec<Option<O>>>,
    ) -> Result<()>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        loop {
            let index = next_index.fetch_add(1, Ordering::Relaxed);

            let Some(input) = inputs.get(index) else {
                return Ok(());
            };

            self.send(&Request::Invoke { index, input })?;

            match self.receive::<O>()? {
                Response::Completed {
                    index: completed,
                    output,
                } if completed == index => {
                    if let Some(slot) = slots.lock().get_mut(index) {
                        *slot = Some(output);
                    }
                }
                Response::Completed {
                    index: completed, ..
                } => {
                    return Err(self.protocol_error(format!(
                        "expected result for input {index}, got input {completed}"
                    )));
                }
                Response::Rejected { message } => {
                    return Err(RunnerError::WorkerRejected {
                        worker: self.index,
                        message,
                    });
                }
            }
        }
    }

    fn send<T: Serialize>(&mut self, request: &T) -> Result<()> {
        write_frame(&mut self.stdin, request).map_err(|source| self.frame_error(source))
    }

    fn receive<O: DeserializeOwned>(&mut self) -> Result<Response<O>> {
        read_frame(&mut self.stdout).map_err(|source| self.frame_error(source))
    }

    fn frame_error(&mut self, source: FrameError) -> RunnerError {
        match source {
            FrameError::EndOfStream => {
                let status = self.reap();
                RunnerError::WorkerExited {
                    worker: self.index,
                    status,
                }
            }
            FrameError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                let status = self.reap();
                RunnerError::WorkerExited {
                    worker: self.index,
                    status,
                }
            }
            source => RunnerError::Protocol {
                worker: self.index,
                source,
            },
        }
    }

    fn protocol_error(&self, message: String) -> RunnerError {
        RunnerError::Protocol {
            worker: self.index,
            source: FrameError::Io(std::io::Error::other(message)),
        }
    }

    /// Sends the poison pill and waits for the process to exit cleanly.
    fn shut_down(&mut self) -> Result<()> {
        self.send(&Request::<()>::Shutdown)?;

        let status = self.child.wait().map_err(|source| RunnerError::Protocol {
            worker: self.index,
            source: FrameError::Io(source),
        })?;
        self.reaped = true;

        trace!(worker = self.index, %status, "worker process exited");

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::WorkerExited {
                worker: self.index,
                status: status.to_string(),
            })
        }
    }

    /// Waits for a process that has already closed its stdout, returning a description of how it
    /// exited.
    fn reap(&mut self) -> String {
        self.reaped = true;

        match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(error) => format!("exit status unavailable: {error}"),
        }
    }
}

impl Drop for WorkerProcess {
    #[cfg_attr(test, mutants::skip)] // Impractical to test that stray processes do not linger.
    fn drop(&mut self) {
        if self.reaped {
            return;
        }

        warn!(
            worker = self.index,
            "killing worker process that was not shut down"
        );

        drop(self.child.kill());
        drop(self.child.wait());
    }
}

fn worker_args(spec_json: &str) -> [OsString; 3] {
    ["worker".into(), "--spec".into(), spec_json.into()]
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;
    use crate::{FibonacciSum, WorkloadKind};

    struct Unregistered;

    impl Workload for Unregistered {
        type Input = u64;
        type Output = u64;

        fn name(&self) -> &str {
            "unregistered"
        }

        fn kind(&self) -> WorkloadKind {
            WorkloadKind::Cpu
        }

        fn invoke(&self, input: &u64) -> u64 {
            *input
        }
    }

    #[test]
    fn workload_without_spec_is_rejected() {
        let error = MultiProcessRunner::new(nz!(2))
            .run(&Unregistered, &[1, 2])
            .unwrap_err();

        assert!(matches!(
            error,
            RunnerError::NotProcessSafe { workload } if workload == "unregistered"
        ));
    }

    #[test]
    fn empty_input_set_starts_no_processes() {
        let runner = MultiProcessRunner::new(nz!(2)).program("/definitely/not/a/program");

        let result = runner.run(&FibonacciSum, &[]).unwrap();

        assert!(result.results().is_empty());
        assert_eq!(result.workers(), 0);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn missing_program_is_spawn_error() {
        let runner = MultiProcessRunner::new(nz!(2)).program("/definitely/not/a/program");

        let error = runner.run(&FibonacciSum, &[1, 2, 3]).unwrap_err();

        assert!(matches!(error, RunnerError::WorkerSpawn { worker: 0, .. }));
    }

    #[test]
    fn worker_arguments() {
        let args = worker_args(r#"{"workload":"fibonacci_sum"}"#);

        assert_eq!(args[0], "worker");
        assert_eq!(args[1], "--spec");
        assert_eq!(args[2], r#"{"workload":"fibonacci_sum"}"#);
    }
}
