use std::num::NonZero;

use new_zealand::nz;

use crate::WorkloadKind;

const DEFAULT_PROCESSES: NonZero<usize> = nz!(4);
const DEFAULT_CPU_THREADS: NonZero<usize> = nz!(4);

// I/O-bound threads spend most of their time blocked, so many more of them are useful.
const DEFAULT_IO_THREADS: NonZero<usize> = nz!(20);

/// Pool sizes used by the parallel runners.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use strategy_bench::{RunnerConfig, WorkloadKind};
///
/// let config = RunnerConfig::for_kind(WorkloadKind::Io).threads(nz!(10));
///
/// assert_eq!(config.thread_count().get(), 10);
/// assert_eq!(config.process_count().get(), 4);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunnerConfig {
    processes: NonZero<usize>,
    threads: NonZero<usize>,
}

impl RunnerConfig {
    /// Default pool sizes for a workload of the given kind.
    ///
    /// Both kinds use 4 worker processes. CPU-bound workloads use 4 threads, I/O-bound
    /// workloads use 20.
    #[must_use]
    pub fn for_kind(kind: WorkloadKind) -> Self {
        let threads = match kind {
            WorkloadKind::Cpu => DEFAULT_CPU_THREADS,
            WorkloadKind::Io => DEFAULT_IO_THREADS,
        };

        Self {
            processes: DEFAULT_PROCESSES,
            threads,
        }
    }

    /// Sets the number of worker processes used by the multi-process runner.
    #[must_use]
    pub fn processes(mut self, count: NonZero<usize>) -> Self {
        self.processes = count;
        self
    }

    /// Sets the number of worker threads used by the multi-threaded runner.
    #[must_use]
    pub fn threads(mut self, count: NonZero<usize>) -> Self {
        self.threads = count;
        self
    }

    /// Number of worker processes.
    #[must_use]
    pub fn process_count(&self) -> NonZero<usize> {
        self.processes
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> NonZero<usize> {
        self.threads
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::for_kind(WorkloadKind::Cpu)
    }
}
