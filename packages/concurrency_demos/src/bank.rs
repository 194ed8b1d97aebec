use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::DemoError;
use crate::error::Result;

/// Simulated processing time between checking the balance and storing the new one.
pub const DEFAULT_WITHDRAW_DELAY: Duration = Duration::from_millis(100);

/// A bank account that supports withdrawals from multiple threads.
pub trait Account: Sync {
    /// Withdraws `amount` and returns the balance this withdrawal left behind.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::InsufficientBalance`] if the balance seen by the check is smaller
    /// than `amount`.
    fn withdraw(&self, amount: u64) -> Result<u64>;

    /// The current balance.
    fn balance(&self) -> u64;
}

/// An account that holds its lock for the whole withdrawal.
///
/// Withdrawals are serialized: the second one sees the balance left by the first.
#[derive(Debug)]
pub struct LockedAccount {
    balance: Mutex<u64>,
    delay: Duration,
}

impl LockedAccount {
    /// Creates an account with [`DEFAULT_WITHDRAW_DELAY`].
    #[must_use]
    pub fn new(balance: u64) -> Self {
        Self::with_delay(balance, DEFAULT_WITHDRAW_DELAY)
    }

    /// Creates an account with a custom withdrawal delay.
    #[must_use]
    pub fn with_delay(balance: u64, delay: Duration) -> Self {
        Self {
            balance: Mutex::new(balance),
            delay,
        }
    }
}

impl Account for LockedAccount {
    fn withdraw(&self, amount: u64) -> Result<u64> {
        let mut balance = self.balance.lock();

        let remaining = balance
            .checked_sub(amount)
            .ok_or(DemoError::InsufficientBalance {
                requested: amount,
                available: *balance,
            })?;

        thread::sleep(self.delay);
        *balance = remaining;

        debug!(amount, remaining, "locked withdrawal completed");
        Ok(remaining)
    }

    fn balance(&self) -> u64 {
        *self.balance.lock()
    }
}

/// An account that releases its lock between checking the balance and storing the new one.
///
/// Two concurrent withdrawals can both pass the check against the same starting balance. The
/// later write then silently replaces the earlier one: money leaves the account twice but the
/// balance only reflects one withdrawal.
#[derive(Debug)]
pub struct RacyAccount {
    balance: Mutex<u64>,
    delay: Duration,
}

impl RacyAccount {
    /// Creates an account with [`DEFAULT_WITHDRAW_DELAY`].
    #[must_use]
    pub fn new(balance: u64) -> Self {
        Self::with_delay(balance, DEFAULT_WITHDRAW_DELAY)
    }

    /// Creates an account with a custom withdrawal delay.
    #[must_use]
    pub fn with_delay(balance: u64, delay: Duration) -> Self {
        Self {
            balance: Mutex::new(balance),
            delay,
        }
    }
}

impl Account for RacyAccount {
    fn withdraw(&self, amount: u64) -> Result<u64> {
        let observed = *self.balance.lock();

        let remaining = observed
            .checked_sub(amount)
            .ok_or(DemoError::InsufficientBalance {
                requested: amount,
                available: observed,
            })?;

        thread::sleep(self.delay);
        *self.balance.lock() = remaining;

        debug!(amount, observed, remaining, "racy withdrawal completed");
        Ok(remaining)
    }

    fn balance(&self) -> u64 {
        *self.balance.lock()
    }
}

/// Performs one withdrawal per entry of `amounts`, each on its own thread, all released at the
/// same moment.
///
/// Returns the outcome of each withdrawal in the order of `amounts`.
///
/// # Errors
///
/// Returns an error if a thread cannot be started or panics. Rejected withdrawals are reported
/// in the returned list, not as an error.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use concurrency_demos::{LockedAccount, withdraw_concurrently};
///
/// let account = LockedAccount::with_delay(1000, Duration::from_millis(10));
/// let outcomes = withdraw_concurrently(&account, &[500, 700]).unwrap();
///
/// // Exactly one of the two withdrawals fits into the balance.
/// assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
/// ```
pub fn withdraw_concurrently<A: Account>(
    account: &A,
    amounts: &[u64],
) -> Result<Vec<Result<u64>>> {
    // Writers hold the gate closed; every withdrawal thread waits for a read guard.
    let gate = RwLock::new(());

    thread::scope(|scope| {
        let gate = &gate;
        let closed = gate.write();

        let handles = amounts
            .iter()
            .enumerate()
            .map(|(index, amount)| {
                thread::Builder::new()
                    .name(format!("withdraw-{index}"))
                    .spawn_scoped(scope, move || {
                        drop(gate.read());
                        account.withdraw(*amount)
                    })
                    .map_err(DemoError::ThreadSpawn)
            })
            .collect::<Result<Vec<_>>>();

        drop(closed);

        let outcomes = handles?
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_panic| DemoError::ThreadPanicked("withdraw"))
            })
            .collect::<Result<Vec<_>>>()?;

        for outcome in &outcomes {
            if let Err(error) = outcome {
                warn!(%error, "withdrawal rejected");
            }
        }

        Ok(outcomes)
    })
}
