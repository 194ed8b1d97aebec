//! Small demonstrations of what goes right and wrong when work runs concurrently.
//!
//! Each module is one self-contained scenario built on OS threads, channels and a
//! single-threaded async runtime:
//!
//! * [`count_with_lock()`] and [`count_without_lock()`] increment a shared counter from many
//!   threads, with and without mutual exclusion.
//! * [`LockedAccount`] and [`RacyAccount`] withdraw from a bank balance with a simulated delay
//!   between checking and updating it.
//! * [`collect_via_queue()`] gathers results from worker threads over a shared channel.
//! * [`produce_and_consume()`] connects a producer and a consumer through a bounded channel and
//!   stops the consumer with a poison pill.
//! * [`pipe()`] creates a duplex channel whose receiver sees end-of-stream once the other end
//!   is gone.
//! * [`gather_greetings()`] runs two sleeping tasks cooperatively on one thread.
//!
//! The scenarios log what they do with `tracing`. The programs in the package's `examples`
//! directory install a subscriber and print the outcome.

mod bank;
mod counter;
mod error;
mod gather;
mod pipe;
mod producer_consumer;
mod queue;

pub use bank::*;
pub use counter::*;
pub use error::*;
pub use gather::*;
pub use pipe::*;
pub use producer_consumer::*;
pub use queue::*;
