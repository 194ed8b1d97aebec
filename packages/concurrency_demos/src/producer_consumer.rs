use std::fmt::Debug;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::DemoError;
use crate::error::Result;

/// What travels from the producer to the consumer.
#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a message is either an item or the poison pill"
)]
pub enum Message<T> {
    /// One produced item.
    Item(T),

    /// No more items will follow. The consumer exits when it receives this.
    Stop,
}

/// Runs a producer thread and a consumer thread connected by a bounded queue of `capacity`
/// messages.
///
/// The producer sends every item, pausing `pause` after each one. Once the producer has
/// finished, the coordinating thread sends [`Message::Stop`] and waits for the consumer, which
/// returns everything it consumed.
///
/// # Errors
///
/// Returns an error if a thread cannot be started, a thread panics or the queue disconnects
/// before the poison pill is delivered.
pub fn produce_and_consume<T>(items: Vec<T>, capacity: usize, pause: Duration) -> Result<Vec<T>>
where
    T: Debug + Send,
{
    let (message_tx, message_rx) = mpsc::sync_channel::<Message<T>>(capacity);

    thread::scope(|scope| {
        let consumer = thread::Builder::new()
            .name("consumer".to_string())
            .spawn_scoped(scope, move || consume(&message_rx))
            .map_err(DemoError::ThreadSpawn)?;

        let producer_tx = message_tx.clone();
        let producer = thread::Builder::new()
            .name("producer".to_string())
            .spawn_scoped(scope, move || produce(items, &producer_tx, pause))
            .map_err(DemoError::ThreadSpawn);

        // If the producer never started, the consumer still needs its poison pill to exit.
        let produced = producer.and_then(|producer| {
            producer
                .join()
                .map_err(|_panic| DemoError::ThreadPanicked("producer"))?
        });

        message_tx
            .send(Message::Stop)
            .map_err(|_disconnected| DemoError::Disconnected)?;

        let consumed = consumer
            .join()
            .map_err(|_panic| DemoError::ThreadPanicked("consumer"))??;

        let produced = produced?;
        debug!(
            produced,
            consumed = consumed.len(),
            "producer and consumer finished"
        );

        Ok(consumed)
    })
}

fn produce<T: Debug>(
    items: Vec<T>,
    message_tx: &mpsc::SyncSender<Message<T>>,
    pause: Duration,
) -> Result<usize> {
    let mut produced = 0_usize;

    for item in items {
        trace!(?item, "producing");

        message_tx
            .send(Message::Item(item))
            .map_err(|_disconnected| DemoError::Disconnected)?;
        produced = produced.wrapping_add(1);

        thread::sleep(pause);
    }

    Ok(produced)
}

fn consume<T: Debug>(message_rx: &mpsc::Receiver<Message<T>>) -> Result<Vec<T>> {
    let mut consumed = Vec::new();

    loop {
        let message = message_rx
            .recv()
            .map_err(|_disconnected| DemoError::Disconnected)?;

        match message {
            Message::Item(item) => {
                trace!(?item, "consumed");
                consumed.push(item);
            }
            Message::Stop => return Ok(consumed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg_attr(miri, ignore)]
    #[test]
    fn consumer_drains_everything_before_the_poison_pill() {
        testing::with_watchdog(|| {
            let items: Vec<String> = (0..5).map(|i| format!("Item {i}")).collect();

            let consumed =
                produce_and_consume(items.clone(), 2, Duration::from_millis(5)).unwrap();

            assert_eq!(consumed, items);
        });
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn rendezvous_queue_works() {
        testing::with_watchdog(|| {
            let consumed = produce_and_consume(vec![1, 2, 3], 0, Duration::ZERO).unwrap();

            assert_eq!(consumed, vec![1, 2, 3]);
        });
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn nothing_to_produce() {
        testing::with_watchdog(|| {
            let consumed = produce_and_consume(Vec::<u32>::new(), 1, Duration::ZERO).unwrap();

            assert!(consumed.is_empty());
        });
    }

    #[test]
    fn consumer_stops_at_the_pill() {
        let (message_tx, message_rx) = mpsc::channel();

        message_tx.send(Message::Item(1)).unwrap();
        message_tx.send(Message::Stop).unwrap();
        message_tx.send(Message::Item(2)).unwrap();

        assert_eq!(consume(&message_rx).unwrap(), vec![1]);
    }

    #[test]
    fn consumer_without_pill_sees_disconnect() {
        let (message_tx, message_rx) = mpsc::channel();

        message_tx.send(Message::Item(1)).unwrap();
        drop(message_tx);

        assert!(matches!(consume(&message_rx), Err(DemoError::Disconnected)));
    }
}
