//! End-to-end tests of the `strategy_bench` binary.

use std::io::Write;
use std::process::{Command, Stdio};

use strategy_bench::{Request, Response, read_frame, write_frame};

const BINARY: &str = env!("CARGO_BIN_EXE_strategy_bench");

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn cpu_benchmark_reports_agreement() {
    testing::with_watchdog_timeout(std::time::Duration::from_secs(60), || {
        let output = Command::new(BINARY)
            .args(["cpu", "--first", "15", "--count", "3", "--processes", "2"])
            .output()
            .unwrap();

        let stdout = String::from_utf8(output.stdout).unwrap();

        assert!(output.status.success(), "stdout: {stdout}");
        assert!(stdout.contains("fibonacci_sum (CPU-bound), 3 inputs"));
        assert!(stdout.contains("Sequential (1 thread)"));
        assert!(stdout.contains("MultiProcess (2 processes)"));
        assert!(stdout.contains("MultiThread (3 threads)"));
        assert!(stdout.contains("Cooperative (3 tasks)"));
        assert!(stdout.contains("Verification - all strategies produced the same aggregate: true"));
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn single_strategy_can_be_selected() {
    let output = Command::new(BINARY)
        .args([
            "cpu",
            "--workload",
            "squares",
            "--first",
            "4",
            "--count",
            "1",
            "--strategy",
            "multi-thread",
        ])
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(output.status.success());
    assert!(stdout.contains("MultiThread (1 threads): "));
    assert!(stdout.contains("aggregate 14"));
    assert!(!stdout.contains("Sequential"));
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn unknown_strategy_is_rejected() {
    let output = Command::new(BINARY)
        .args(["cpu", "--strategy", "greenthreads"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn worker_mode_speaks_the_frame_protocol() {
    testing::with_watchdog(|| {
        let mut child = Command::new(BINARY)
            .args(["worker", "--spec", r#"{"workload":"fibonacci_sum"}"#])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();

        let mut stdin = child.stdin.take().unwrap();
        let mut stdout = child.stdout.take().unwrap();

        let request = Request::Invoke {
            index: 5,
            input: 10_u64,
        };
        write_frame(&mut stdin, &request).unwrap();

        let response: Response<u64> = read_frame(&mut stdout).unwrap();
        assert!(matches!(
            response,
            Response::Completed {
                index: 5,
                output: 288,
            }
        ));

        write_frame(&mut stdin, &Request::<u64>::Shutdown).unwrap();
        stdin.flush().unwrap();

        assert!(child.wait().unwrap().success());
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn worker_mode_rejects_unknown_workload() {
    let output = Command::new(BINARY)
        .args(["worker", "--spec", r#"{"workload":"mystery"}"#])
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot start processes.
fn worker_exits_with_failure_when_parent_disappears() {
    // A closed stdin without the poison pill is an unexpected end of stream.
    let output = Command::new(BINARY)
        .args(["worker", "--spec", r#"{"workload":"sum_of_squares"}"#])
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
}
