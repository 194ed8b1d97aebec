use std::time::Instant;

use tracing::debug;

use crate::error::Result;
use crate::{RunResult, Runner, Strategy, Workload};

/// Executes every unit in input order on the calling thread.
///
/// This is the baseline for both correctness and speed: elapsed time is the full serial sum of
/// the per-input latencies.
#[derive(Clone, Copy, Debug, Default)]
#[expect(
    clippy::exhaustive_structs,
    reason = "intentionally a stateless unit struct"
)]
pub struct SequentialRunner;

impl Runner for SequentialRunner {
    fn strategy(&self) -> Strategy {
        Strategy::Sequential
    }

    fn run<W: Workload>(&self, workload: &W, inputs: &[W::Input]) -> Result<RunResult<W::Output>> {
        debug!(
            workload = workload.name(),
            inputs = inputs.len(),
            "sequential run started"
        );

        let start = Instant::now();
        let results = inputs.iter().map(|input| workload.invoke(input)).collect();
        let elapsed = start.elapsed();

        debug!(workload = workload.name(), ?elapsed, "sequential run finished");

        Ok(RunResult::new(Strategy::Sequential, 1, results, elapsed))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    use super::*;
    use crate::WorkloadKind;

    /// Records which thread and in which order each input was processed.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u32, ThreadId)>>,
    }

    impl Workload for Recorder {
        type Input = u32;
        type Output = u32;

        fn name(&self) -> &str {
            "recorder"
        }

        fn kind(&self) -> WorkloadKind {
            WorkloadKind::Cpu
        }

        fn invoke(&self, input: &u32) -> u32 {
            self.seen
                .lock()
                .unwrap()
                .push((*input, thread::current().id()));
            input + 100
        }
    }

    #[test]
    fn runs_in_order_on_calling_thread() {
        let recorder = Recorder::default();

        let result = SequentialRunner.run(&recorder, &[3, 1, 2]).unwrap();

        assert_eq!(result.results(), &[103, 101, 102]);
        assert_eq!(result.workers(), 1);
        assert_eq!(result.strategy(), Strategy::Sequential);

        let seen = recorder.seen.into_inner().unwrap();
        let order: Vec<u32> = seen.iter().map(|(input, _)| *input).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert!(seen.iter().all(|(_, id)| *id == thread::current().id()));
    }

    #[test]
    fn empty_input_set() {
        let result = SequentialRunner.run(&Recorder::default(), &[]).unwrap();

        assert!(result.results().is_empty());
    }
}
