//! Every runner must produce the same ordered results for the same deterministic workload.
//!
//! The multi-process runner starts the `strategy_bench` binary built for these tests as its
//! worker program.

use std::num::NonZero;
use std::time::Duration;

use new_zealand::nz;
use strategy_bench::{
    Benchmark, CooperativeRunner, FibonacciSum, MultiProcessRunner, MultiThreadRunner, Reporter,
    Runner, RunnerConfig, SequentialRunner, Strategy, SumOfSquares, Workload, fibonacci,
};

const WORKER_PROGRAM: &str = env!("CARGO_BIN_EXE_strategy_bench");

// Worker processes take a moment to start, especially on loaded CI machines.
const PROCESS_TEST_TIMEOUT: Duration = Duration::from_secs(60);

fn multi_process(processes: NonZero<usize>) -> MultiProcessRunner {
    MultiProcessRunner::new(processes).program(WORKER_PROGRAM)
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn all_runners_agree_on_fibonacci_sum() {
    testing::with_watchdog_timeout(PROCESS_TEST_TIMEOUT, || {
        let inputs: Vec<u64> = (15..=22).collect();
        let expected: Vec<u64> = inputs
            .iter()
            .map(|n| fibonacci(*n) + fibonacci(n + 1) + fibonacci(n + 2))
            .collect();

        let sequential = SequentialRunner.run(&FibonacciSum, &inputs).unwrap();
        let processes = multi_process(nz!(4)).run(&FibonacciSum, &inputs).unwrap();
        let threads = MultiThreadRunner::new(nz!(4))
            .run(&FibonacciSum, &inputs)
            .unwrap();
        let cooperative = CooperativeRunner.run(&FibonacciSum, &inputs).unwrap();

        assert_eq!(sequential.results(), expected.as_slice());
        assert_eq!(processes.results(), expected.as_slice());
        assert_eq!(threads.results(), expected.as_slice());
        assert_eq!(cooperative.results(), expected.as_slice());

        assert_eq!(processes.workers(), 4);
        assert_eq!(processes.strategy(), Strategy::MultiProcess);
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn outputs_wider_than_u64_cross_the_process_boundary() {
    testing::with_watchdog_timeout(PROCESS_TEST_TIMEOUT, || {
        let inputs = [10_000_000_u64, 10_000_001];

        let sequential = SequentialRunner.run(&SumOfSquares, &inputs).unwrap();
        let processes = multi_process(nz!(2)).run(&SumOfSquares, &inputs).unwrap();

        assert_eq!(processes.results(), sequential.results());
        assert!(
            processes
                .results()
                .iter()
                .all(|output| *output > u128::from(u64::MAX))
        );
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn pool_size_does_not_change_results() {
    testing::with_watchdog_timeout(PROCESS_TEST_TIMEOUT, || {
        let inputs: Vec<u64> = (0..6).map(|i| 1_000 + i * 250).collect();
        let expected = SequentialRunner.run(&SumOfSquares, &inputs).unwrap();

        // The last size exceeds the input count, so the pools are capped.
        for size in [nz!(1), nz!(2), nz!(4), nz!(9)] {
            let threads = MultiThreadRunner::new(size)
                .run(&SumOfSquares, &inputs)
                .unwrap();
            let processes = multi_process(size).run(&SumOfSquares, &inputs).unwrap();

            assert_eq!(threads.results(), expected.results(), "{size} threads");
            assert_eq!(processes.results(), expected.results(), "{size} processes");

            let capped = size.get().min(inputs.len());
            assert_eq!(threads.workers(), capped);
            assert_eq!(processes.workers(), capped);
        }
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn repeated_runs_are_identical() {
    testing::with_watchdog_timeout(PROCESS_TEST_TIMEOUT, || {
        let inputs: Vec<u64> = (10..16).collect();
        let runner = multi_process(nz!(3));

        let first = runner.run(&FibonacciSum, &inputs).unwrap();
        let second = runner.run(&FibonacciSum, &inputs).unwrap();

        assert_eq!(first.results(), second.results());
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn benchmark_runs_every_strategy_in_order() {
    testing::with_watchdog_timeout(PROCESS_TEST_TIMEOUT, || {
        let inputs: Vec<u64> = (18..=21).collect();
        let benchmark = Benchmark::new(RunnerConfig::for_kind(FibonacciSum.kind()))
            .worker_program(WORKER_PROGRAM);

        let report = benchmark.run_all(&FibonacciSum, &inputs).unwrap();

        let strategies: Vec<Strategy> = report
            .outcomes()
            .iter()
            .map(|outcome| outcome.run().strategy())
            .collect();
        assert_eq!(strategies, Strategy::ALL.to_vec());

        assert!(report.all_equivalent());
        assert!(report.results_identical());
        assert_eq!(report.input_count(), 4);

        let expected: u64 = FibonacciSum.aggregate(
            SequentialRunner
                .run(&FibonacciSum, &inputs)
                .unwrap()
                .results(),
        );
        assert!(
            report
                .outcomes()
                .iter()
                .all(|outcome| outcome.aggregate() == expected)
        );

        let text = Reporter::new(&report).to_string();
        assert!(text.contains("MultiProcess (4 processes)"));
        assert!(text.contains("Cooperative (4 tasks)"));
        assert!(text.contains("Verification - all strategies produced the same aggregate: true"));
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn empty_input_set_is_equivalent_across_strategies() {
    testing::with_watchdog_timeout(PROCESS_TEST_TIMEOUT, || {
        let benchmark = Benchmark::new(RunnerConfig::default()).worker_program(WORKER_PROGRAM);

        let report = benchmark.run_all(&FibonacciSum, &[]).unwrap();

        assert_eq!(report.outcomes().len(), 4);
        assert!(report.all_equivalent());
        assert!(
            report
                .outcomes()
                .iter()
                .all(|outcome| outcome.aggregate() == 0)
        );
    });
}
