use crate::{Workload, WorkloadKind, WorkloadSpec};

/// Naive doubly-recursive Fibonacci, with `fibonacci(0) == 0` and `fibonacci(1) == 1`.
///
/// Deliberately exponential: it exists to burn CPU time.
#[must_use]
pub fn fibonacci(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }

    fibonacci(n.wrapping_sub(1)).wrapping_add(fibonacci(n.wrapping_sub(2)))
}

/// Sum of `i * i` for every `i` in `0..n`.
///
/// Computed in `u128` because the conventional inputs overflow `u64`.
#[must_use]
pub fn sum_of_squares(n: u64) -> u128 {
    (0..u128::from(n)).map(|i| i.wrapping_mul(i)).sum()
}

/// CPU-bound workload computing `fibonacci(n) + fibonacci(n + 1) + fibonacci(n + 2)`.
///
/// The conventional input set is `35..=38`, which takes a few seconds per input.
#[derive(Clone, Copy, Debug, Default)]
#[expect(
    clippy::exhaustive_structs,
    reason = "intentionally a stateless unit struct"
)]
pub struct FibonacciSum;

impl FibonacciSum {
    /// The conventional input set for this workload.
    #[must_use]
    pub fn default_inputs() -> Vec<u64> {
        (35..=38).collect()
    }
}

impl Workload for FibonacciSum {
    type Input = u64;
    type Output = u64;

    fn name(&self) -> &str {
        "fibonacci_sum"
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Cpu
    }

    fn invoke(&self, input: &u64) -> u64 {
        (*input..input.saturating_add(3)).map(fibonacci).sum()
    }

    fn spec(&self) -> Option<WorkloadSpec> {
        Some(WorkloadSpec::FibonacciSum)
    }
}

/// CPU-bound workload computing [`sum_of_squares()`] of each input.
///
/// The conventional input set is four values just above ten million.
#[derive(Clone, Copy, Debug, Default)]
#[expect(
    clippy::exhaustive_structs,
    reason = "intentionally a stateless unit struct"
)]
pub struct SumOfSquares;

impl SumOfSquares {
    /// The conventional input set for this workload.
    #[must_use]
    pub fn default_inputs() -> Vec<u64> {
        (10_000_000..10_000_004).collect()
    }
}

impl Workload for SumOfSquares {
    type Input = u64;
    type Output = u128;

    fn name(&self) -> &str {
        "sum_of_squares"
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Cpu
    }

    fn invoke(&self, input: &u64) -> u128 {
        sum_of_squares(*input)
    }

    fn spec(&self) -> Option<WorkloadSpec> {
        Some(WorkloadSpec::SumOfSquares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibonacci_small_values() {
        let values: Vec<u64> = (0..10).map(fibonacci).collect();

        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn fibonacci_sum_adds_three_consecutive_terms() {
        // 55 + 89 + 144
        assert_eq!(FibonacciSum.invoke(&10), 288);
        assert_eq!(FibonacciSum.invoke(&0), 2);
    }

    #[test]
    fn sum_of_squares_values() {
        assert_eq!(sum_of_squares(0), 0);
        assert_eq!(sum_of_squares(1), 0);
        assert_eq!(sum_of_squares(4), 14);
        assert_eq!(SumOfSquares.invoke(&10), 285);
    }

    #[test]
    fn sum_of_squares_exceeds_u64_without_overflowing() {
        let n: u64 = 10_000_000;

        // (n - 1) n (2n - 1) / 6
        let wide = u128::from(n);
        let expected = (wide - 1) * wide * (2 * wide - 1) / 6;

        let actual = sum_of_squares(n);
        assert_eq!(actual, expected);
        assert!(actual > u128::from(u64::MAX));
    }

    #[test]
    fn default_inputs() {
        assert_eq!(FibonacciSum::default_inputs(), vec![35, 36, 37, 38]);
        assert_eq!(
            SumOfSquares::default_inputs(),
            vec![10_000_000, 10_000_001, 10_000_002, 10_000_003]
        );
    }

    #[test]
    fn cpu_workloads_are_process_safe() {
        assert_eq!(FibonacciSum.spec(), Some(WorkloadSpec::FibonacciSum));
        assert_eq!(SumOfSquares.spec(), Some(WorkloadSpec::SumOfSquares));
        assert_eq!(FibonacciSum.kind(), WorkloadKind::Cpu);
    }
}
