//! Fan-out of published values to channel subscribers

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// A set of channel subscribers
///
/// Every subscriber sees every value published after it subscribed, in
/// publish order. Subscribers whose receiver was dropped are pruned on the
/// next publish.
#[derive(Debug)]
pub struct Subscribers<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    /// Create an empty subscriber set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    /// Send a value to every live subscriber
    pub fn publish(&self, value: T) {
        self.lock().retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Number of registered subscribers (including not yet pruned ones)
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<T>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_sees_values_in_order() {
        let subs = Subscribers::new();
        let a = subs.subscribe();
        subs.publish(1);
        let b = subs.subscribe();
        subs.publish(2);
        subs.publish(3);

        assert_eq!(a.try_iter().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(b.try_iter().collect::<Vec<_>>(), [2, 3]);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let subs = Subscribers::new();
        let keep = subs.subscribe();
        drop(subs.subscribe());
        assert_eq!(subs.len(), 2);

        subs.publish("x");
        assert_eq!(subs.len(), 1);
        assert_eq!(keep.try_recv(), Ok("x"));
    }
}
