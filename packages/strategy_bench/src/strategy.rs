use std::str::FromStr;
use std::time::Duration;

use crate::Workload;
use crate::error::Result;

/// One of the four execution strategies compared by the harness.
///
/// Displays as the variant name, which is also how reports label each strategy.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "the four strategies are the whole comparison"
)]
pub enum Strategy {
    /// Every unit runs in input order on the calling thread.
    Sequential,

    /// Units are distributed across a pool of worker processes.
    MultiProcess,

    /// Units are distributed across a pool of worker threads.
    MultiThread,

    /// Units run as cooperative tasks on a single-threaded event loop.
    Cooperative,
}

impl Strategy {
    /// All strategies, in the order the benchmark driver executes them.
    pub const ALL: [Self; 4] = [
        Self::Sequential,
        Self::MultiProcess,
        Self::MultiThread,
        Self::Cooperative,
    ];

    /// What a single concurrency slot of this strategy is called in reports.
    #[must_use]
    pub fn slot_name(self) -> &'static str {
        match self {
            Self::Sequential => "thread",
            Self::MultiProcess => "processes",
            Self::MultiThread => "threads",
            Self::Cooperative => "tasks",
        }
    }
}

/// The error returned when parsing an unknown strategy name.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown strategy '{0}' (expected sequential, multiprocess, multithread or cooperative)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "sequential" => Ok(Self::Sequential),
            "multiprocess" | "process" | "processes" => Ok(Self::MultiProcess),
            "multithread" | "thread" | "threads" => Ok(Self::MultiThread),
            "cooperative" | "async" => Ok(Self::Cooperative),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// The outcome of executing one workload over one input set with one strategy.
///
/// `results()[i]` is always the output produced for `inputs[i]`, whatever order the units
/// actually completed in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunResult<O> {
    strategy: Strategy,
    workers: usize,
    results: Vec<O>,
    elapsed: Duration,
}

impl<O> RunResult<O> {
    pub(crate) fn new(
        strategy: Strategy,
        workers: usize,
        results: Vec<O>,
        elapsed: Duration,
    ) -> Self {
        Self {
            strategy,
            workers,
            results,
            elapsed,
        }
    }

    /// The strategy that produced this result.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// How many concurrency slots (threads, processes or tasks) executed the units.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Outputs in input order.
    #[must_use]
    pub fn results(&self) -> &[O] {
        &self.results
    }

    /// Consumes the result, returning the outputs in input order.
    #[must_use]
    pub fn into_results(self) -> Vec<O> {
        self.results
    }

    /// Wall-clock time of the whole run, including acquiring and releasing the runner's
    /// concurrency resources.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// An execution strategy.
///
/// Runners are stateless configuration. Every concurrency resource a runner needs (threads,
/// processes, an event loop) is acquired inside [`run()`](Self::run) and released before it
/// returns, on success and on failure alike.
pub trait Runner {
    /// The strategy this runner implements.
    fn strategy(&self) -> Strategy;

    /// Executes `workload` once for every input and returns the outputs in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner's concurrency resources cannot be created or a worker
    /// fails fatally. Failures of individual units never cause an error.
    fn run<W: Workload>(&self, workload: &W, inputs: &[W::Input]) -> Result<RunResult<W::Output>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!("Sequential".parse(), Ok(Strategy::Sequential));
        assert_eq!("multi-process".parse(), Ok(Strategy::MultiProcess));
        assert_eq!("multi_thread".parse(), Ok(Strategy::MultiThread));
        assert_eq!("threads".parse(), Ok(Strategy::MultiThread));
        assert_eq!("async".parse(), Ok(Strategy::Cooperative));
        assert_eq!("COOPERATIVE".parse(), Ok(Strategy::Cooperative));
    }

    #[test]
    fn parse_rejects_unknown() {
        let error = "greenthreads".parse::<Strategy>().unwrap_err();
        assert!(error.to_string().contains("greenthreads"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse(), Ok(strategy));
        }
    }

    #[test]
    fn run_result_accessors() {
        let result = RunResult::new(
            Strategy::MultiThread,
            4,
            vec![1_u64, 2, 3],
            Duration::from_millis(5),
        );

        assert_eq!(result.strategy(), Strategy::MultiThread);
        assert_eq!(result.workers(), 4);
        assert_eq!(result.results(), &[1, 2, 3]);
        assert_eq!(result.elapsed(), Duration::from_millis(5));
        assert_eq!(result.into_results(), vec![1, 2, 3]);
    }
}
