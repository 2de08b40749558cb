//! Observable state with snapshot-on-subscribe.
//!
//! [`StateBus`] wraps a [`tokio::sync::broadcast`] channel plus the
//! current value. Publication and subscription take the same lock, so a
//! subscriber sees the value current at subscription time followed by
//! every later update, in order, with nothing missed in between.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

/// Broadcast bus for successive values of a state `T`.
///
/// Each receiver buffers at most `capacity` updates. A receiver that falls
/// further behind gets [`broadcast::error::RecvError::Lagged`] with the
/// number of skipped updates, then continues with the oldest one still
/// buffered; [`StateBus::current`] always holds the latest value.
#[derive(Debug, Clone)]
pub struct StateBus<T> {
    current: Arc<Mutex<T>>,
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> StateBus<T> {
    /// Creates a bus holding `initial` with the given channel capacity.
    #[must_use]
    pub fn new(initial: T, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            current: Arc::new(Mutex::new(initial)),
            sender,
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn current(&self) -> T {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `change` and publishes the result.
    ///
    /// Returns the number of receivers that got the update.
    pub fn update(&self, change: impl FnOnce(&mut T)) -> usize {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut current);
        self.sender.send(current.clone()).unwrap_or(0)
    }

    /// Current state plus a receiver for every later update, subject to
    /// the capacity limit described on [`StateBus`].
    #[must_use]
    pub fn subscribe(&self) -> (T, broadcast::Receiver<T>) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        (current.clone(), self.sender.subscribe())
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
