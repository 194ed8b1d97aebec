#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the strategy benchmark.
//!
//! Also serves as the worker process of the multi-process strategy (`strategy_bench worker`).
//! Logs go to stderr because a worker's stdout carries protocol frames.

use std::io;
use std::num::NonZero;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use argh::FromArgs;
use strategy_bench::{
    Benchmark, BenchmarkError, BenchmarkReport, DEFAULT_CONNECTIONS, DEFAULT_ECHO_MESSAGE,
    DEFAULT_ECHO_URL, DEFAULT_HTTP_TIMEOUT, DEFAULT_MESSAGES_PER_CONNECTION, FibonacciSum,
    HttpFetch, Reporter, RunnerConfig, SAMPLE_URLS, Strategy, SumOfSquares, WebSocketEcho,
    WebSocketEchoOptions, Workload, WorkloadSpec, serve_spec,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "strategy_bench=info";

/// Compare sequential, multi-process, multi-threaded and cooperative execution of the same
/// workload.
#[derive(FromArgs)]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Cpu(CpuArgs),
    Http(HttpArgs),
    Ws(WsArgs),
    Worker(WorkerArgs),
}

/// Benchmark a CPU-bound workload.
#[derive(FromArgs)]
#[argh(subcommand, name = "cpu")]
struct CpuArgs {
    /// workload to run (fibonacci, squares)
    #[argh(option, default = "CpuWorkload::Fibonacci")]
    workload: CpuWorkload,

    /// first input (default 35 for fibonacci, 10000000 for squares)
    #[argh(option)]
    first: Option<u64>,

    /// number of consecutive inputs
    #[argh(option, default = "4")]
    count: u64,

    /// run only this strategy (sequential, multiprocess, multithread, cooperative)
    #[argh(option)]
    strategy: Option<Strategy>,

    /// number of worker processes
    #[argh(option)]
    processes: Option<NonZero<usize>>,

    /// number of worker threads
    #[argh(option)]
    threads: Option<NonZero<usize>>,
}

/// Benchmark downloading URLs over HTTP.
#[derive(FromArgs)]
#[argh(subcommand, name = "http")]
struct HttpArgs {
    /// URL to download, may be repeated (default: a set of GitHub API endpoints)
    #[argh(option)]
    url: Vec<String>,

    /// how many times the URL list is repeated to form the input set
    #[argh(option, default = "5")]
    repeat: usize,

    /// per-request timeout in milliseconds
    #[argh(option)]
    timeout_ms: Option<u64>,

    /// run only this strategy (sequential, multiprocess, multithread, cooperative)
    #[argh(option)]
    strategy: Option<Strategy>,

    /// number of worker processes
    #[argh(option)]
    processes: Option<NonZero<usize>>,

    /// number of worker threads
    #[argh(option)]
    threads: Option<NonZero<usize>>,
}

/// Benchmark WebSocket echo round trips.
#[derive(FromArgs)]
#[argh(subcommand, name = "ws")]
struct WsArgs {
    /// echo endpoint (ws:// or wss://)
    #[argh(option, default = "DEFAULT_ECHO_URL.to_string()")]
    url: String,

    /// text sent on every round trip
    #[argh(option, default = "DEFAULT_ECHO_MESSAGE.to_string()")]
    message: String,

    /// round trips per connection
    #[argh(option, default = "DEFAULT_MESSAGES_PER_CONNECTION")]
    messages: u32,

    /// number of connections, one input each
    #[argh(option, default = "DEFAULT_CONNECTIONS")]
    connections: u64,

    /// timeout for connecting and for each receive, in milliseconds
    #[argh(option)]
    timeout_ms: Option<u64>,

    /// run only this strategy (sequential, multiprocess, multithread, cooperative)
    #[argh(option)]
    strategy: Option<Strategy>,

    /// number of worker processes
    #[argh(option)]
    processes: Option<NonZero<usize>>,

    /// number of worker threads
    #[argh(option)]
    threads: Option<NonZero<usize>>,
}

/// Serve a multi-process benchmark over stdin/stdout (used internally).
#[derive(FromArgs)]
#[argh(subcommand, name = "worker")]
struct WorkerArgs {
    /// JSON description of the workload to serve
    #[argh(option)]
    spec: String,
}

#[derive(Clone, Copy, Debug)]
enum CpuWorkload {
    Fibonacci,
    Squares,
}

impl FromStr for CpuWorkload {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fibonacci" | "fib" => Ok(Self::Fibonacci),
            "squares" | "sum-of-squares" => Ok(Self::Squares),
            _ => Err(format!("unknown CPU workload '{s}' (expected fibonacci or squares)")),
        }
    }
}

/// Options shared by every benchmark subcommand.
#[derive(Clone, Copy, Debug)]
struct RunOptions {
    strategy: Option<Strategy>,
    processes: Option<NonZero<usize>>,
    threads: Option<NonZero<usize>>,
}

#[cfg_attr(test, mutants::skip)] // Process entry point, exercised by the integration tests.
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    match args.command {
        Command::Cpu(args) => run_cpu(&args),
        Command::Http(args) => run_http(args),
        Command::Ws(args) => run_ws(args),
        Command::Worker(args) => run_worker(&args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_cpu(args: &CpuArgs) -> ExitCode {
    let options = RunOptions {
        strategy: args.strategy,
        processes: args.processes,
        threads: args.threads,
    };

    match args.workload {
        CpuWorkload::Fibonacci => {
            let first = args.first.unwrap_or(35);
            let inputs: Vec<u64> = (first..first.saturating_add(args.count)).collect();

            run_benchmark(options, &FibonacciSum, &inputs)
        }
        CpuWorkload::Squares => {
            let first = args.first.unwrap_or(10_000_000);
            let inputs: Vec<u64> = (first..first.saturating_add(args.count)).collect();

            run_benchmark(options, &SumOfSquares, &inputs)
        }
    }
}

fn run_http(args: HttpArgs) -> ExitCode {
    let options = RunOptions {
        strategy: args.strategy,
        processes: args.processes,
        threads: args.threads,
    };

    let urls: Vec<String> = if args.url.is_empty() {
        SAMPLE_URLS.iter().map(|url| (*url).to_string()).collect()
    } else {
        args.url
    };

    let inputs: Vec<String> = urls
        .iter()
        .cycle()
        .take(urls.len().saturating_mul(args.repeat))
        .cloned()
        .collect();

    let timeout = args
        .timeout_ms
        .map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_millis);

    run_benchmark(options, &HttpFetch::with_timeout(timeout), &inputs)
}

fn run_ws(args: WsArgs) -> ExitCode {
    let options = RunOptions {
        strategy: args.strategy,
        processes: args.processes,
        threads: args.threads,
    };

    let mut echo_options = WebSocketEchoOptions {
        url: args.url,
        message: args.message,
        messages_per_connection: args.messages,
        ..WebSocketEchoOptions::default()
    };

    if let Some(timeout_ms) = args.timeout_ms {
        echo_options.timeout = Duration::from_millis(timeout_ms);
    }

    run_benchmark(
        options,
        &WebSocketEcho::new(echo_options),
        &WebSocketEcho::inputs(args.connections),
    )
}

fn run_benchmark<W: Workload>(options: RunOptions, workload: &W, inputs: &[W::Input]) -> ExitCode {
    let mut config = RunnerConfig::for_kind(workload.kind());

    if let Some(processes) = options.processes {
        config = config.processes(processes);
    }

    if let Some(threads) = options.threads {
        config = config.threads(threads);
    }

    let benchmark = Benchmark::new(config);

    info!(
        workload = workload.name(),
        kind = %workload.kind(),
        inputs = inputs.len(),
        processes = config.process_count().get(),
        threads = config.thread_count().get(),
        "starting benchmark"
    );

    let outcome = match options.strategy {
        Some(strategy) => benchmark.run_only(strategy, workload, inputs),
        None => benchmark.run_all(workload, inputs),
    };

    report_outcome(outcome)
}

fn report_outcome<O>(outcome: Result<BenchmarkReport<O>, BenchmarkError>) -> ExitCode
where
    O: Copy + std::fmt::Display + Eq,
{
    match outcome {
        Ok(report) => {
            println!("{}", Reporter::new(&report));

            if report.all_equivalent() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "benchmark failed");
            ExitCode::FAILURE
        }
    }
}

fn run_worker(args: &WorkerArgs) -> ExitCode {
    let spec: WorkloadSpec = match serde_json::from_str(&args.spec) {
        Ok(spec) => spec,
        Err(e) => {
            error!(error = %e, "invalid workload description");
            return ExitCode::FAILURE;
        }
    };

    match serve_spec(&spec, io::stdin().lock(), io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "worker stopped");
            ExitCode::FAILURE
        }
    }
}
