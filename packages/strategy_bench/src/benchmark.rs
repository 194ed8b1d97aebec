use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    BenchmarkError, CooperativeRunner, MultiProcessRunner, MultiThreadRunner, RunResult, Runner,
    RunnerConfig, SequentialRunner, Strategy, Workload, WorkloadKind,
};

/// Runs one workload over one input set under several strategies and checks that they agree.
///
/// Strategies run one after another, never overlapping, each on the same input set. Every run is
/// reduced with [`Workload::aggregate()`] and the aggregates are compared exactly.
///
/// # Example
///
/// ```
/// use strategy_bench::{Benchmark, RunnerConfig, Strategy, SumOfSquares, Workload};
///
/// let benchmark = Benchmark::new(RunnerConfig::for_kind(SumOfSquares.kind()));
/// let report = benchmark
///     .run_only(Strategy::MultiThread, &SumOfSquares, &[10, 20, 30])
///     .unwrap();
///
/// assert_eq!(report.outcomes().len(), 1);
/// assert!(report.all_equivalent());
/// ```
#[derive(Clone, Debug)]
pub struct Benchmark {
    config: RunnerConfig,
    worker_program: Option<PathBuf>,
}

impl Benchmark {
    /// Creates a driver that sizes the parallel runners according to `config`.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            worker_program: None,
        }
    }

    /// Uses `program` as the executable for multi-process workers instead of the current
    /// executable.
    #[must_use]
    pub fn worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(program.into());
        self
    }

    /// The pool sizes used by the parallel runners.
    #[must_use]
    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    /// Runs every strategy in [`Strategy::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal runner error. Strategies after the failing one are not run.
    pub fn run_all<W: Workload>(
        &self,
        workload: &W,
        inputs: &[W::Input],
    ) -> Result<BenchmarkReport<W::Output>, BenchmarkError> {
        let outcomes = Strategy::ALL
            .into_iter()
            .map(|strategy| self.run_strategy(strategy, workload, inputs))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BenchmarkReport::new(workload, inputs.len(), outcomes))
    }

    /// Runs a single strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner fails fatally.
    pub fn run_only<W: Workload>(
        &self,
        strategy: Strategy,
        workload: &W,
        inputs: &[W::Input],
    ) -> Result<BenchmarkReport<W::Output>, BenchmarkError> {
        let outcome = self.run_strategy(strategy, workload, inputs)?;

        Ok(BenchmarkReport::new(workload, inputs.len(), vec![outcome]))
    }

    fn run_strategy<W: Workload>(
        &self,
        strategy: Strategy,
        workload: &W,
        inputs: &[W::Input],
    ) -> Result<StrategyOutcome<W::Output>, BenchmarkError> {
        info!(%strategy, workload = workload.name(), inputs = inputs.len(), "running strategy");

        let run = match strategy {
            Strategy::Sequential => SequentialRunner.run(workload, inputs),
            Strategy::MultiProcess => self.multi_process_runner().run(workload, inputs),
            Strategy::MultiThread => {
                MultiThreadRunner::new(self.config.thread_count()).run(workload, inputs)
            }
            Strategy::Cooperative => CooperativeRunner.run(workload, inputs),
        }
        .map_err(|source| BenchmarkError::Runner { strategy, source })?;

        let aggregate = workload.aggregate(run.results());

        debug!(
            %strategy,
            workers = run.workers(),
            elapsed = ?run.elapsed(),
            %aggregate,
            "strategy finished"
        );

        Ok(StrategyOutcome { run, aggregate })
    }

    fn multi_process_runner(&self) -> MultiProcessRunner {
        let runner = MultiProcessRunner::new(self.config.process_count());

        match &self.worker_program {
            Some(program) => runner.program(program.clone()),
            None => runner,
        }
    }
}

/// The result of one strategy within a benchmark, together with its aggregate.
#[derive(Clone, Debug)]
pub struct StrategyOutcome<O> {
    run: RunResult<O>,
    aggregate: O,
}

impl<O: Copy> StrategyOutcome<O> {
    /// The full run result, including the ordered per-input results.
    #[must_use]
    pub fn run(&self) -> &RunResult<O> {
        &self.run
    }

    /// The run's results reduced to a single value.
    #[must_use]
    pub fn aggregate(&self) -> O {
        self.aggregate
    }
}

/// Everything measured by one benchmark invocation.
#[derive(Clone, Debug)]
pub struct BenchmarkReport<O> {
    workload: String,
    kind: WorkloadKind,
    unit: &'static str,
    input_count: usize,
    outcomes: Vec<StrategyOutcome<O>>,
    all_equivalent: bool,
}

impl<O: Copy + Eq> BenchmarkReport<O> {
    fn new<W>(workload: &W, input_count: usize, outcomes: Vec<StrategyOutcome<O>>) -> Self
    where
        W: Workload<Output = O>,
    {
        let all_equivalent = match outcomes.split_first() {
            Some((first, rest)) => rest
                .iter()
                .all(|outcome| outcome.aggregate == first.aggregate),
            None => false,
        };

        Self {
            workload: workload.name().to_string(),
            kind: workload.kind(),
            unit: workload.unit(),
            input_count,
            outcomes,
            all_equivalent,
        }
    }

    /// Name of the workload that was measured.
    #[must_use]
    pub fn workload(&self) -> &str {
        &self.workload
    }

    /// Classification of the workload that was measured.
    #[must_use]
    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Unit of the aggregates, possibly empty.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// Number of inputs every strategy processed.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// One outcome per strategy, in execution order.
    #[must_use]
    pub fn outcomes(&self) -> &[StrategyOutcome<O>] {
        &self.outcomes
    }

    /// Whether every strategy produced exactly the same aggregate.
    ///
    /// False if no strategy ran.
    #[must_use]
    pub fn all_equivalent(&self) -> bool {
        self.all_equivalent
    }

    /// Whether every strategy produced exactly the same per-input results, in the same order.
    ///
    /// Stricter than [`all_equivalent()`](Self::all_equivalent): I/O workloads may agree on the
    /// aggregate while individual units differ.
    #[must_use]
    pub fn results_identical(&self) -> bool {
        match self.outcomes.split_first() {
            Some((first, rest)) => rest
                .iter()
                .all(|outcome| outcome.run.results() == first.run.results()),
            None => false,
        }
    }

    /// Sum of the elapsed time of every strategy.
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.outcomes
            .iter()
            .map(|outcome| outcome.run.elapsed())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use new_zealand::nz;

    use super::*;
    use crate::{RunnerError, SumOfSquares};

    /// Returns a different value on every call, so no two strategies ever agree.
    #[derive(Default)]
    struct Drifting {
        calls: AtomicU64,
    }

    impl Workload for Drifting {
        type Input = u64;
        type Output = u64;

        fn name(&self) -> &str {
            "drifting"
        }

        fn kind(&self) -> WorkloadKind {
            WorkloadKind::Io
        }

        fn invoke(&self, input: &u64) -> u64 {
            input + self.calls.fetch_add(1, Ordering::Relaxed)
        }
    }

    fn outcome(strategy: Strategy, results: Vec<u64>) -> StrategyOutcome<u64> {
        let aggregate = results.iter().sum();

        StrategyOutcome {
            run: RunResult::new(strategy, 1, results, Duration::from_millis(10)),
            aggregate,
        }
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn run_only_executes_one_strategy() {
        testing::with_watchdog(|| {
            let benchmark = Benchmark::new(RunnerConfig::default().threads(nz!(2)));

            let report = benchmark
                .run_only(Strategy::MultiThread, &SumOfSquares, &[3, 4, 5])
                .unwrap();

            assert_eq!(report.workload(), "sum_of_squares");
            assert_eq!(report.kind(), WorkloadKind::Cpu);
            assert_eq!(report.input_count(), 3);
            assert_eq!(report.outcomes().len(), 1);

            let outcome = report.outcomes().first().unwrap();
            assert_eq!(outcome.run().strategy(), Strategy::MultiThread);
            assert_eq!(outcome.run().workers(), 2);
            assert_eq!(outcome.aggregate(), 5 + 14 + 30);
            assert!(report.all_equivalent());
        });
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn mismatch_is_a_verdict_not_an_error() {
        let benchmark = Benchmark::new(RunnerConfig::default());
        let workload = Drifting::default();

        let first = benchmark
            .run_only(Strategy::Sequential, &workload, &[1, 2])
            .unwrap();
        let second = benchmark
            .run_only(Strategy::Cooperative, &workload, &[1, 2])
            .unwrap();

        assert_ne!(
            first.outcomes().first().unwrap().aggregate(),
            second.outcomes().first().unwrap().aggregate()
        );
    }

    #[test]
    fn runner_failure_names_the_strategy() {
        let benchmark = Benchmark::new(RunnerConfig::default());

        // Drifting has no worker-process description.
        let error = benchmark
            .run_only(Strategy::MultiProcess, &Drifting::default(), &[1])
            .unwrap_err();

        let BenchmarkError::Runner { strategy, source } = error;
        assert_eq!(strategy, Strategy::MultiProcess);
        assert!(matches!(source, RunnerError::NotProcessSafe { .. }));
    }

    #[test]
    fn equivalence_compares_aggregates() {
        let report = BenchmarkReport::new(
            &SumOfSquares,
            2,
            vec![
                StrategyOutcome {
                    run: RunResult::new(Strategy::Sequential, 1, vec![1_u128, 2], Duration::ZERO),
                    aggregate: 3,
                },
                StrategyOutcome {
                    run: RunResult::new(Strategy::MultiThread, 2, vec![2, 1], Duration::ZERO),
                    aggregate: 3,
                },
            ],
        );

        assert!(report.all_equivalent());
        assert!(!report.results_identical());
    }

    #[test]
    fn differing_aggregates_are_not_equivalent() {
        let report = BenchmarkReport::new(
            &Drifting::default(),
            2,
            vec![
                outcome(Strategy::Sequential, vec![1, 2]),
                outcome(Strategy::Cooperative, vec![1, 0]),
            ],
        );

        assert!(!report.all_equivalent());
        assert!(!report.results_identical());
        assert_eq!(report.total_elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn empty_report_is_not_equivalent() {
        let report = BenchmarkReport::<u64>::new(&Drifting::default(), 0, Vec::new());

        assert!(!report.all_equivalent());
        assert!(!report.results_identical());
    }
}
