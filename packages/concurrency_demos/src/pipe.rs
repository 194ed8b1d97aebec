use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, trace};

use crate::DemoError;
use crate::error::Result;

/// One end of a duplex pipe created by [`pipe()`].
///
/// Each end can both send to and receive from the other end. Dropping an end closes both
/// directions: the other end then sees end-of-stream once it has drained any messages already
/// in flight.
#[derive(Debug)]
pub struct PipeEnd<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> PipeEnd<T> {
    /// Sends a message to the other end.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Disconnected`] if the other end has been dropped.
    pub fn send(&self, message: T) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_disconnected| DemoError::Disconnected)
    }

    /// Waits for the next message from the other end.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Disconnected`] once the other end has been dropped and every message
    /// it sent has been received.
    pub fn recv(&self) -> Result<T> {
        self.rx
            .recv()
            .map_err(|_disconnected| DemoError::Disconnected)
    }

    /// Receives messages until the other end is dropped.
    pub fn drain(&self) -> Vec<T> {
        self.rx.iter().collect()
    }
}

/// Creates a connected pair of pipe ends.
///
/// # Example
///
/// ```
/// use concurrency_demos::pipe;
///
/// let (left, right) = pipe();
///
/// left.send("ping").unwrap();
/// assert_eq!(right.recv().unwrap(), "ping");
///
/// right.send("pong").unwrap();
/// assert_eq!(left.recv().unwrap(), "pong");
///
/// drop(right);
/// assert!(left.recv().is_err());
/// ```
#[must_use]
pub fn pipe<T>() -> (PipeEnd<T>, PipeEnd<T>) {
    let (left_tx, right_rx) = mpsc::channel();
    let (right_tx, left_rx) = mpsc::channel();

    (
        PipeEnd {
            tx: left_tx,
            rx: left_rx,
        },
        PipeEnd {
            tx: right_tx,
            rx: right_rx,
        },
    )
}

/// The kinds of message exchanged by [`exchange_over_pipe()`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PipeMessage {
    /// A line of text.
    Text(String),

    /// A list of numbers.
    Numbers(Vec<i64>),

    /// A small keyed record.
    Map(BTreeMap<String, i64>),
}

/// The messages the sender side of [`exchange_over_pipe()`] sends, in order.
#[must_use]
pub fn sample_messages() -> Vec<PipeMessage> {
    vec![
        PipeMessage::Text("Hello from the sender".to_string()),
        PipeMessage::Numbers(vec![1, 2, 3, 4, 5]),
        PipeMessage::Map(BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)])),
    ]
}

/// Runs a sender thread and a receiver thread on the two ends of a [`pipe()`].
///
/// The sender sends [`sample_messages()`] and then drops its end. The receiver reads until it
/// sees end-of-stream and returns everything it received.
///
/// # Errors
///
/// Returns an error if a thread cannot be started, panics or the sender finds the pipe closed.
pub fn exchange_over_pipe() -> Result<Vec<PipeMessage>> {
    let (sender_end, receiver_end) = pipe::<PipeMessage>();

    thread::scope(|scope| {
        let sender = thread::Builder::new()
            .name("pipe-sender".to_string())
            .spawn_scoped(scope, move || -> Result<()> {
                for message in sample_messages() {
                    trace!(?message, "sending");
                    sender_end.send(message)?;
                }

                // Dropping the end is what tells the receiver there is nothing more.
                drop(sender_end);
                Ok(())
            })
            .map_err(DemoError::ThreadSpawn)?;

        let receiver = thread::Builder::new()
            .name("pipe-receiver".to_string())
            .spawn_scoped(scope, move || {
                let mut received = Vec::new();

                loop {
                    match receiver_end.recv() {
                        Ok(message) => {
                            trace!(?message, "received");
                            received.push(message);
                        }
                        Err(DemoError::Disconnected) => break,
                        Err(other) => return Err(other),
                    }
                }

                debug!(count = received.len(), "pipe reached end of stream");
                Ok(received)
            })
            .map_err(DemoError::ThreadSpawn)?;

        sender
            .join()
            .map_err(|_panic| DemoError::ThreadPanicked("pipe-sender"))??;

        receiver
            .join()
            .map_err(|_panic| DemoError::ThreadPanicked("pipe-receiver"))?
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_directions_work() {
        let (left, right) = pipe();

        left.send(1).unwrap();
        right.send(2).unwrap();

        assert_eq!(right.recv().unwrap(), 1);
        assert_eq!(left.recv().unwrap(), 2);
    }

    #[test]
    fn messages_in_flight_survive_the_sender() {
        let (left, right) = pipe();

        left.send("a").unwrap();
        left.send("b").unwrap();
        drop(left);

        assert_eq!(right.drain(), vec!["a", "b"]);
        assert!(matches!(right.recv(), Err(DemoError::Disconnected)));
        assert!(matches!(right.send("c"), Err(DemoError::Disconnected)));
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn receiver_gets_everything_then_end_of_stream() {
        testing::with_watchdog(|| {
            let received = exchange_over_pipe().unwrap();

            assert_eq!(received, sample_messages());
        });
    }
}
