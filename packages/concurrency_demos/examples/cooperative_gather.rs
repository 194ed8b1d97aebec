//! Runs two sleeping tasks on one thread and shows that their sleeps overlap.
//!
//! Run with: `cargo run --example cooperative_gather`.

use std::time::{Duration, Instant};

use concurrency_demos::gather_greetings;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .init();

    let started = Instant::now();
    let greetings = gather_greetings(Duration::from_secs(1)).expect("runtime should start");

    println!("{}", greetings.join(" "));
    println!("Took {:.2} seconds", started.elapsed().as_secs_f64());
}
