//! Single-slot, latest-wins frame channel.
//!
//! # Why not a queue? (for beginners)
//!
//! A bounded queue of video frames fills up whenever the consumer is slower
//! than the producer.  From then on the consumer only ever sees frames that
//! are several intervals old, and the producer either blocks or drops the
//! *newest* frame.  For live video the opposite is wanted: the newest frame
//! is the only one worth looking at.
//!
//! [`FrameChannel`] therefore holds at most one frame.  [`push`] never
//! blocks; if a frame is still waiting it is discarded and replaced.
//! [`pop`] blocks until a frame is available.  A consumer always receives
//! the most recent frame produced before it woke up.
//!
//! The channel is lossy.  [`dropped_frames`] reports how many frames were
//! replaced before anyone consumed them.
//!
//! # Shutdown
//!
//! [`close`] discards the buffered frame and wakes every blocked consumer;
//! [`pop`] then returns `None`.  Frames pushed after `close` are ignored.
//!
//! [`push`]: FrameChannel::push
//! [`pop`]: FrameChannel::pop
//! [`close`]: FrameChannel::close
//! [`dropped_frames`]: FrameChannel::dropped_frames

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::frame::Frame;

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    closed: bool,
    dropped: u64,
}

/// A single-slot, latest-wins frame buffer shared between one producer and
/// any number of consumers.
#[derive(Default)]
pub struct FrameChannel {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl FrameChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `frame`, replacing any unconsumed frame.  Never blocks on a
    /// consumer.
    pub fn push(&self, frame: Frame) {
        let mut slot = self.lock();
        if slot.closed {
            return;
        }
        if slot.frame.replace(frame).is_some() {
            slot.dropped += 1;
        }
        drop(slot);
        self.ready.notify_one();
    }

    /// Blocks until a frame is available and takes it.
    ///
    /// Returns `None` once the channel is closed.
    pub fn pop(&self) -> Option<Frame> {
        let mut slot = self.lock();
        loop {
            if slot.closed {
                return None;
            }
            if let Some(frame) = slot.frame.take() {
                return Some(frame);
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`pop`](Self::pop) but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Frame> {
        let slot = self.lock();
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |s| !s.closed && s.frame.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        if slot.closed {
            return None;
        }
        slot.frame.take()
    }

    /// Takes the buffered frame without blocking.
    pub fn try_pop(&self) -> Option<Frame> {
        let mut slot = self.lock();
        if slot.closed {
            return None;
        }
        slot.frame.take()
    }

    /// Discards the buffered frame and releases every blocked consumer.
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        slot.frame = None;
        drop(slot);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of frames replaced before they were consumed.
    pub fn dropped_frames(&self) -> u64 {
        self.lock().dropped
    }

    // A panic while holding the lock cannot leave `Slot` half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::PixelFormat;
    use std::sync::Arc;
    use std::thread;

    fn frame(seq: u64) -> Frame {
        Frame::new(vec![0u8; 4], 1, 1, PixelFormat::Rgba8888)
            .expect("valid frame")
            .with_sequence(seq)
    }

    #[test]
    fn test_pop_returns_only_the_last_of_many_pushes() {
        // Arrange
        let channel = FrameChannel::new();

        // Act
        for seq in 0..10 {
            channel.push(frame(seq));
        }

        // Assert
        assert_eq!(channel.pop().map(|f| f.sequence()), Some(9));
        assert!(channel.try_pop().is_none(), "older frames must not be queued");
        assert_eq!(channel.dropped_frames(), 9);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        // Arrange
        let channel = Arc::new(FrameChannel::new());
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.pop().map(|f| f.sequence()))
        };

        // Act
        thread::sleep(Duration::from_millis(50));
        channel.push(frame(42));

        // Assert
        assert_eq!(consumer.join().expect("consumer panicked"), Some(42));
    }

    #[test]
    fn test_close_releases_blocked_consumer() {
        // Arrange
        let channel = Arc::new(FrameChannel::new());
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.pop())
        };

        // Act
        thread::sleep(Duration::from_millis(50));
        channel.close();

        // Assert
        assert!(consumer.join().expect("consumer panicked").is_none());
        assert!(channel.is_closed());
    }

    #[test]
    fn test_close_discards_buffered_frame_and_ignores_later_pushes() {
        let channel = FrameChannel::new();
        channel.push(frame(1));

        channel.close();
        channel.push(frame(2));

        assert!(channel.try_pop().is_none());
        assert!(channel.pop().is_none());
    }

    #[test]
    fn test_pop_timeout_returns_none_when_empty() {
        let channel = FrameChannel::new();
        assert!(channel.pop_timeout(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn test_pop_timeout_returns_buffered_frame() {
        let channel = FrameChannel::new();
        channel.push(frame(3));
        let popped = channel.pop_timeout(Duration::from_millis(20));
        assert_eq!(popped.map(|f| f.sequence()), Some(3));
    }

    #[test]
    fn test_consumer_never_sees_older_frame_than_previous() {
        // Arrange
        let channel = Arc::new(FrameChannel::new());
        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for seq in 0..2_000 {
                    channel.push(frame(seq));
                }
                channel.close();
            })
        };

        // Act
        let mut seen = Vec::new();
        while let Some(f) = channel.pop() {
            seen.push(f.sequence());
        }
        producer.join().expect("producer panicked");

        // Assert
        for pair in seen.windows(2) {
            assert!(pair[1] > pair[0], "frames must arrive in increasing order");
        }
    }
}
