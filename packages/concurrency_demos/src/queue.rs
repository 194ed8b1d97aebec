use std::sync::mpsc;
use std::thread;

use strategy_bench::sum_of_squares;
use tracing::{debug, trace};

use crate::DemoError;
use crate::error::Result;

/// Result delivered through the shared queue by one worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct WorkerResult {
    /// Which worker produced the value.
    pub worker: usize,

    /// The computed value.
    pub value: u128,
}

/// Starts `workers` threads that each compute [`sum_of_squares(n)`][sum_of_squares] and push
/// the result onto one shared queue.
///
/// The caller collects exactly one result per worker, in whatever order they arrive, and only
/// then joins the workers.
///
/// # Errors
///
/// Returns an error if a worker cannot be started, panics or disappears without delivering its
/// result.
///
/// # Example
///
/// ```
/// use concurrency_demos::collect_via_queue;
///
/// let results = collect_via_queue(3, 4).unwrap();
///
/// assert_eq!(results.len(), 3);
/// assert!(results.iter().all(|result| result.value == 14));
/// ```
pub fn collect_via_queue(workers: usize, n: u64) -> Result<Vec<WorkerResult>> {
    let (result_tx, result_rx) = mpsc::channel();

    thread::scope(|scope| {
        let handles = (0..workers)
            .map(|worker| {
                let result_tx = result_tx.clone();

                thread::Builder::new()
                    .name(format!("queue-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        trace!(worker, "queue worker started");

                        let value = sum_of_squares(n);

                        deliver(&result_tx, WorkerResult { worker, value });
                    })
                    .map_err(DemoError::ThreadSpawn)
            })
            .collect::<Result<Vec<_>>>()?;

        // Only the workers hold senders now, so a lost worker shows up as a disconnect.
        drop(result_tx);

        let results = (0..handles.len())
            .map(|_| {
                result_rx
                    .recv()
                    .map_err(|_disconnected| DemoError::Disconnected)
            })
            .collect::<Result<Vec<_>>>()?;

        for handle in handles {
            handle
                .join()
                .map_err(|_panic| DemoError::ThreadPanicked("queue-worker"))?;
        }

        debug!(workers, n, "all queue results collected");

        Ok(results)
    })
}

/// Pushes one result onto the shared queue.
///
/// Returns `false` if the collector is gone. It only goes away once it has given up on the demo,
/// so the result is discarded.
fn deliver(result_tx: &mpsc::Sender<WorkerResult>, result: WorkerResult) -> bool {
    let delivered = result_tx.send(result).is_ok();

    if !delivered {
        debug!(worker = result.worker, "collector gone, result discarded");
    }

    delivered
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[cfg_attr(miri, ignore)]
    #[test]
    fn collects_one_result_per_worker() {
        testing::with_watchdog(|| {
            let results = collect_via_queue(4, 10).unwrap();

            assert_eq!(results.len(), 4);
            assert!(results.iter().all(|result| result.value == 285));

            let workers: HashSet<usize> = results.iter().map(|result| result.worker).collect();
            assert_eq!(workers, (0..4).collect());
        });
    }

    #[test]
    fn delivery_to_departed_collector_is_discarded() {
        let (result_tx, result_rx) = mpsc::channel();
        let result = WorkerResult {
            worker: 3,
            value: 14,
        };

        assert!(deliver(&result_tx, result));
        assert_eq!(result_rx.recv().unwrap(), result);

        drop(result_rx);
        assert!(!deliver(&result_tx, result));
    }

    #[test]
    fn no_workers_no_results() {
        assert!(collect_via_queue(0, 10).unwrap().is_empty());
    }
}
