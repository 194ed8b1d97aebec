use std::fmt::{self, Display};

use crate::BenchmarkReport;

/// Formats a [`BenchmarkReport`] as human-readable text.
///
/// The exact layout is meant for people, not for parsing.
///
/// # Example
///
/// ```
/// use strategy_bench::{Benchmark, Reporter, RunnerConfig, Strategy, SumOfSquares};
///
/// let report = Benchmark::new(RunnerConfig::default())
///     .run_only(Strategy::Sequential, &SumOfSquares, &[4])
///     .unwrap();
///
/// let text = Reporter::new(&report).to_string();
/// assert!(text.contains("Sequential (1 thread)"));
/// assert!(text.contains("aggregate 14"));
/// ```
#[derive(Debug)]
pub struct Reporter<'a, O> {
    report: &'a BenchmarkReport<O>,
}

impl<'a, O> Reporter<'a, O> {
    /// Creates a reporter for `report`.
    #[must_use]
    pub fn new(report: &'a BenchmarkReport<O>) -> Self {
        Self { report }
    }
}

impl<O: Copy + Display + Eq> Display for Reporter<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;

        writeln!(
            f,
            "{} ({}), {} inputs",
            report.workload(),
            report.kind(),
            report.input_count()
        )?;

        for outcome in report.outcomes() {
            let run = outcome.run();

            writeln!(
                f,
                "{} ({} {}): {:.2} seconds, aggregate {}",
                run.strategy(),
                run.workers(),
                run.strategy().slot_name(),
                run.elapsed().as_secs_f64(),
                outcome.aggregate()
            )?;
        }

        writeln!(
            f,
            "Verification - all strategies produced the same aggregate: {}",
            report.all_equivalent()
        )?;

        if let Some(first) = report.outcomes().first() {
            let unit = report.unit();

            if unit.is_empty() {
                write!(f, "Total: {}", first.aggregate())?;
            } else {
                write!(f, "Total {unit}: {}", first.aggregate())?;
            }
        }

        Ok(())
    }
}
