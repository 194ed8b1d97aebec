//! Compares sequential, multi-process, multi-threaded and cooperative execution of the same
//! workload.
//!
//! A [`Workload`] maps each input of an input set to one output. A [`Runner`] executes a workload
//! over the whole input set with one execution strategy and returns the outputs in input order,
//! together with the wall-clock time the strategy took. The [`Benchmark`] driver runs several
//! strategies over the same input set, reduces each run with [`Workload::aggregate()`] and checks
//! that every strategy produced the same aggregate.
//!
//! # Quick start
//!
//! ```
//! use strategy_bench::{Benchmark, FibonacciSum, Reporter, RunnerConfig, Strategy, Workload};
//!
//! let benchmark = Benchmark::new(RunnerConfig::for_kind(FibonacciSum.kind()));
//! let report = benchmark
//!     .run_only(Strategy::Cooperative, &FibonacciSum, &[10, 11, 12])
//!     .unwrap();
//!
//! assert!(report.all_equivalent());
//! println!("{}", Reporter::new(&report));
//! ```
//!
//! # Strategies
//!
//! | Strategy | Runner | Concurrency |
//! |----------|--------|-------------|
//! | Sequential | [`SequentialRunner`] | none, the calling thread runs every unit in order |
//! | MultiProcess | [`MultiProcessRunner`] | a pool of worker processes, default 4 |
//! | MultiThread | [`MultiThreadRunner`] | a pool of worker threads, default 4 (CPU) or 20 (I/O) |
//! | Cooperative | [`CooperativeRunner`] | one task per input on a single-threaded event loop |
//!
//! # Workloads
//!
//! CPU-bound: [`FibonacciSum`] and [`SumOfSquares`]. I/O-bound: [`HttpFetch`] and
//! [`WebSocketEcho`]. I/O workloads never fail: a failed unit is logged and resolves to
//! `Output::default()`, so one bad request does not abort its batch.
//!
//! # Worker processes
//!
//! The multi-process runner re-executes the current binary as `<binary> worker --spec <json>`.
//! Any binary that uses the multi-process runner must dispatch that subcommand to
//! [`serve_spec()`], passing its stdin and stdout. The `strategy_bench` binary does exactly that.
//! Only workloads that describe themselves through [`Workload::spec()`] can be sent to worker
//! processes.

mod benchmark;
mod config;
mod cooperative;
mod cpu_workloads;
mod error;
mod framing;
mod http_fetch;
mod multi_process;
mod multi_thread;
mod report;
mod sequential;
mod strategy;
mod websocket_echo;
mod worker;
mod workload;

pub use benchmark::*;
pub use config::*;
pub use cooperative::*;
pub use cpu_workloads::*;
pub use error::{BenchmarkError, FrameError, RunnerError};
pub use framing::*;
pub use http_fetch::*;
pub use multi_process::*;
pub use multi_thread::*;
pub use report::*;
pub use sequential::*;
pub use strategy::*;
pub use websocket_echo::*;
pub use worker::*;
pub use workload::*;
