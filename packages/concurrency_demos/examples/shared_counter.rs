//! Increments a shared counter from many threads, with and without a lock.
//!
//! Run with: `cargo run --example shared_counter`.

use concurrency_demos::{count_with_lock, count_without_lock};
use tracing_subscriber::EnvFilter;

const THREADS: usize = 10;
const INCREMENTS: u64 = 1_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let expected = (THREADS as u64).saturating_mul(INCREMENTS);

    let locked = count_with_lock(THREADS, INCREMENTS).expect("counter threads should complete");
    println!("Counter with lock: {locked} (expected {expected})");

    let unlocked =
        count_without_lock(THREADS, INCREMENTS).expect("counter threads should complete");
    println!("Counter without lock: {unlocked} (expected {expected})");

    if unlocked < expected {
        println!("{} increments were lost", expected.saturating_sub(unlocked));
    }
}
