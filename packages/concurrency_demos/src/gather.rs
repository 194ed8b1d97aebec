use std::time::Duration;

use futures::future;
use tracing::info;

use crate::DemoError;
use crate::error::Result;

/// Runs two tasks that each sleep for `delay` and then produce a greeting, cooperatively on a
/// single thread.
///
/// Both tasks sleep at the same time, so the whole call takes about one `delay` rather than two.
/// The greetings are returned in the order the tasks were created, not the order they finished.
///
/// # Errors
///
/// Returns [`DemoError::Runtime`] if the async runtime cannot be created.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use concurrency_demos::gather_greetings;
///
/// let greetings = gather_greetings(Duration::from_millis(10)).unwrap();
///
/// assert_eq!(greetings, ["Hello", "World"]);
/// ```
pub fn gather_greetings(delay: Duration) -> Result<Vec<String>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(DemoError::Runtime)?;

    let (hello, world) =
        runtime.block_on(future::join(greet("Hello", delay), greet("World", delay)));

    Ok(vec![hello, world])
}

async fn greet(word: &'static str, delay: Duration) -> String {
    tokio::time::sleep(delay).await;

    info!(word, "task woke up");
    word.to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[cfg_attr(miri, ignore)]
    #[test]
    fn sleeps_overlap() {
        testing::with_watchdog(|| {
            let delay = Duration::from_millis(300);

            let started = Instant::now();
            let greetings = gather_greetings(delay).unwrap();
            let elapsed = started.elapsed();

            assert_eq!(greetings, ["Hello", "World"]);
            assert!(elapsed >= delay);
            assert!(elapsed < delay.saturating_mul(2), "took {elapsed:?}");
        });
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn zero_delay() {
        testing::with_watchdog(|| {
            assert_eq!(
                gather_greetings(Duration::ZERO).unwrap(),
                ["Hello", "World"]
            );
        });
    }
}
