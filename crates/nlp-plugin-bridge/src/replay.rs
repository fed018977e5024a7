//! Bounded FIFO holding messages until a binding can take them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;

/// Bounded queue that evicts its oldest entry when full.
///
/// # Examples
///
/// ```
/// use nlp_plugin_bridge::ReplayBuffer;
///
/// let buffer = ReplayBuffer::new(2);
/// assert_eq!(buffer.push(1), None);
/// assert_eq!(buffer.push(2), None);
/// assert_eq!(buffer.push(3), Some(1));
/// assert_eq!(buffer.try_pop(), Some(2));
/// assert_eq!(buffer.dropped(), 1);
/// ```
#[derive(Debug)]
pub struct ReplayBuffer<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    dropped: AtomicU64,
    available: Notify,
}

impl<T> ReplayBuffer<T> {
    /// Creates a buffer holding at most `capacity` items.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            available: Notify::new(),
        }
    }

    /// Appends `item`, returning the evicted oldest entry if the buffer was full.
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut items = self.lock();
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.available.notify_one();
        evicted
    }

    /// Puts an item taken by [`pop`](Self::pop) back at the front.
    ///
    /// If newer items filled the buffer in the meantime, `item` is the
    /// oldest one and is dropped instead.
    pub fn push_front(&self, item: T) -> Option<T> {
        let rejected = {
            let mut items = self.lock();
            if items.len() >= self.capacity {
                Some(item)
            } else {
                items.push_front(item);
                None
            }
        };
        if rejected.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.available.notify_one();
        rejected
    }

    /// Removes the oldest item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes the oldest item, waiting until one is available.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.available.notified();
            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    /// Number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of buffered items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items evicted since creation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discards every buffered item, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let count = items.len();
        items.clear();
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_evicts_oldest_when_full() {
        let buffer = ReplayBuffer::new(8);
        for i in 1..=9 {
            let evicted = buffer.push(i);
            assert_eq!(evicted, if i == 9 { Some(1) } else { None });
        }
        assert_eq!(buffer.len(), 8);
        let drained: Vec<_> = std::iter::from_fn(|| buffer.try_pop()).collect();
        assert_eq!(drained, (2..=9).collect::<Vec<_>>());
        assert_eq!(buffer.dropped(), 1);
    }

    #[test]
    fn test_push_front_restores_order() {
        let buffer = ReplayBuffer::new(3);
        buffer.push("a");
        buffer.push("b");
        let first = buffer.try_pop().unwrap();
        assert_eq!(buffer.push_front(first), None);
        assert_eq!(buffer.try_pop(), Some("a"));
        assert_eq!(buffer.try_pop(), Some("b"));
    }

    #[test]
    fn test_push_front_when_full_drops_requeued() {
        let buffer = ReplayBuffer::new(2);
        buffer.push(1);
        let taken = buffer.try_pop().unwrap();
        buffer.push(2);
        buffer.push(3);
        assert_eq!(buffer.push_front(taken), Some(1));
        assert_eq!(buffer.dropped(), 1);
        assert_eq!(buffer.try_pop(), Some(2));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let buffer = ReplayBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(1);
        assert_eq!(buffer.push(2), Some(1));
    }

    #[test]
    fn test_clear() {
        let buffer = ReplayBuffer::new(4);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.clear(), 2);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let buffer = Arc::new(ReplayBuffer::new(4));
        let waiter = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        buffer.push(42);
        assert_eq!(waiter.await.unwrap(), 42);
    }
}
