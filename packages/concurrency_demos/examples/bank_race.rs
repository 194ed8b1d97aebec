//! Withdraws from one bank account on two threads at once.
//!
//! The locked account rejects whichever withdrawal comes second. The racy account lets both
//! through and then loses one of the balance updates.
//!
//! Run with: `cargo run --example bank_race`.

use concurrency_demos::{Account, LockedAccount, RacyAccount, withdraw_concurrently};
use tracing_subscriber::EnvFilter;

const STARTING_BALANCE: u64 = 1000;
const WITHDRAWALS: [u64; 2] = [500, 700];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Locked account:");
    run(&LockedAccount::new(STARTING_BALANCE));

    println!();
    println!("Racy account:");
    run(&RacyAccount::new(STARTING_BALANCE));
}

fn run(account: &impl Account) {
    let outcomes =
        withdraw_concurrently(account, &WITHDRAWALS).expect("withdrawal threads should complete");

    for (amount, outcome) in WITHDRAWALS.iter().zip(outcomes) {
        match outcome {
            Ok(remaining) => println!("  withdrew {amount}, left {remaining}"),
            Err(error) => println!("  could not withdraw {amount}: {error}"),
        }
    }

    println!("  final balance: {}", account.balance());
}
