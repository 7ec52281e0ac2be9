//! The outbound playback queue.
//!
//! Shared by three actors: the agent connector pushes produced audio, the
//! delivery loop pops frames for transmission, and the interrupt path drains
//! everything at once. Pushing never blocks; popping is a cancellable wait.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

/// FIFO queue of opaque audio frames awaiting delivery to the caller.
pub struct PlaybackQueue {
    frames: Mutex<VecDeque<Bytes>>,
    notify: Notify,
    capacity: Option<usize>,
}

impl PlaybackQueue {
    /// Creates a queue. `None` grows without bound; `Some(n)` keeps at most
    /// `n` frames, dropping the oldest to make room for new audio.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueues one frame. Never blocks and never fails.
    pub fn push(&self, frame: Bytes) {
        let mut frames = self.frames.lock();
        if let Some(capacity) = self.capacity {
            while frames.len() >= capacity {
                frames.pop_front();
                warn!(capacity, "playback queue full; dropped oldest frame");
            }
        }
        frames.push_back(frame);
        drop(frames);
        self.notify.notify_one();
    }

    /// Dequeues the next frame, waiting until one arrives.
    ///
    /// Cancel-safe: the caller selects this against a shutdown signal. The
    /// notification future is created before the queue is checked, so a push
    /// landing between the check and the await still wakes the consumer.
    pub async fn pop(&self) -> Bytes {
        loop {
            let notified = self.notify.notified();
            if let Some(frame) = self.frames.lock().pop_front() {
                return frame;
            }
            notified.await;
        }
    }

    /// Removes and returns every queued frame, without waiting for new
    /// arrivals. Atomic with respect to `push` and `pop`.
    pub fn drain(&self) -> Vec<Bytes> {
        self.frames.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn pops_in_fifo_order() {
        let queue = PlaybackQueue::new(None);
        queue.push(Bytes::from_static(b"one"));
        queue.push(Bytes::from_static(b"two"));
        queue.push(Bytes::from_static(b"three"));

        assert_eq!(queue.pop().await, Bytes::from_static(b"one"));
        assert_eq!(queue.pop().await, Bytes::from_static(b"two"));
        assert_eq!(queue.pop().await, Bytes::from_static(b"three"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn bounded_queue_drops_oldest() {
        let queue = PlaybackQueue::new(Some(2));
        queue.push(Bytes::from_static(b"one"));
        queue.push(Bytes::from_static(b"two"));
        queue.push(Bytes::from_static(b"three"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().await, Bytes::from_static(b"two"));
        assert_eq!(queue.pop().await, Bytes::from_static(b"three"));
    }

    #[test]
    fn drain_returns_everything_in_order() {
        let queue = PlaybackQueue::new(None);
        queue.push(Bytes::from_static(b"one"));
        queue.push(Bytes::from_static(b"two"));

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_returns_nothing() {
        let queue = PlaybackQueue::new(None);
        assert!(queue.drain().is_empty());
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let queue = Arc::new(PlaybackQueue::new(None));

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(Bytes::from_static(b"late"));

        let frame = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("pop should complete once a frame arrives")
            .unwrap();
        assert_eq!(frame, Bytes::from_static(b"late"));
    }
}
