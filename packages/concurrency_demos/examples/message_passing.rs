//! Moves data between threads through a shared queue, a bounded producer/consumer channel and a
//! duplex pipe.
//!
//! Run with: `cargo run --example message_passing`.

use std::time::Duration;

use concurrency_demos::{collect_via_queue, exchange_over_pipe, produce_and_consume};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Queue results:");
    for result in collect_via_queue(4, 10_000_000).expect("queue workers should complete") {
        println!("  worker {}: {}", result.worker, result.value);
    }

    println!("Producer and consumer:");
    let items: Vec<String> = (0..5).map(|i| format!("Item {i}")).collect();
    for item in produce_and_consume(items, 2, Duration::from_millis(100))
        .expect("producer and consumer should complete")
    {
        println!("  consumed {item}");
    }

    println!("Pipe:");
    for message in exchange_over_pipe().expect("pipe threads should complete") {
        println!("  received {message:?}");
    }
}
