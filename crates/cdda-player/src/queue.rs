//! Bounded sample queue between the engine thread and the cpal callback.
//!
//! The engine pushes whole sectors without blocking; the output callback drains the
//! queue without blocking. Capacity and fill level are tracked in frames so the sink
//! can report queued duration.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Thread-safe bounded queue of interleaved `i16` samples.
///
/// ## Design
/// - **Single producer / single consumer** in practice (engine writes, callback reads),
///   but all methods are safe from any thread.
/// - **Bounded** by `max_buffered_samples`; pushes are all-or-nothing.
/// - A `closed` flag stored under the same mutex rejects late pushes after shutdown.
pub struct SharedAudio {
    channels: usize,
    inner: Mutex<SharedInner>,
    max_buffered_samples: usize,
}

struct SharedInner {
    queue: VecDeque<i16>,
    closed: bool,
}

/// Compute a queue capacity in **samples** for a `(rate, channels, millis)` target.
///
/// Zero durations fall back to one second.
pub fn calc_max_buffered_samples(rate_hz: u32, channels: usize, millis: u64) -> usize {
    let millis = if millis == 0 { 1000 } else { millis };
    let frames = (u64::from(rate_hz) * millis).div_ceil(1000) as usize;
    frames.saturating_mul(channels)
}

impl SharedAudio {
    pub fn new(channels: usize, max_buffered_samples: usize) -> Self {
        Self {
            channels,
            inner: Mutex::new(SharedInner {
                queue: VecDeque::with_capacity(max_buffered_samples),
                closed: false,
            }),
            max_buffered_samples,
        }
    }

    /// Maximum buffered frames (capacity) for this queue.
    pub fn max_frames(&self) -> usize {
        self.max_buffered_samples / self.channels
    }

    /// Current buffered frames (best-effort snapshot).
    pub fn len_frames(&self) -> usize {
        let g = self.inner.lock().unwrap();
        g.queue.len() / self.channels
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Push all of `samples` if they fit, otherwise nothing.
    ///
    /// Returns the number of **frames** accepted (either all or zero).
    pub fn try_push(&self, samples: &[i16]) -> usize {
        let mut g = self.inner.lock().unwrap();
        if g.closed || g.queue.len() + samples.len() > self.max_buffered_samples {
            return 0;
        }
        g.queue.extend(samples.iter().copied());
        samples.len() / self.channels
    }

    /// Pop up to `max_frames` whole frames without waiting.
    ///
    /// Returns `None` if the queue is currently empty.
    pub fn pop_nonblocking(&self, max_frames: usize) -> Option<Vec<i16>> {
        let mut g = self.inner.lock().unwrap();
        let take_frames = (g.queue.len() / self.channels).min(max_frames);
        let take_samples = take_frames * self.channels;
        if take_samples == 0 {
            return None;
        }
        Some(g.queue.drain(..take_samples).collect())
    }

    /// Drop everything buffered (used after an underrun or stream fault).
    pub fn clear(&self) {
        self.inner.lock().unwrap().queue.clear();
    }

    /// Reject further pushes. Idempotent.
    pub fn close(&self) {
        let mut g = self.inner.lock().unwrap();
        g.closed = true;
        g.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn calc_max_buffered_samples_rounds_up_and_falls_back() {
        assert_eq!(calc_max_buffered_samples(44_100, 2, 1000), 88_200);
        assert_eq!(calc_max_buffered_samples(44_100, 2, 0), 88_200);
        assert_eq!(calc_max_buffered_samples(44_100, 2, 1), 90);
    }

    #[test]
    fn try_push_is_all_or_nothing() {
        let q = SharedAudio::new(2, 8);
        assert_eq!(q.try_push(&[1, 2, 3, 4, 5, 6]), 3);
        assert_eq!(q.try_push(&[7, 8, 9, 10]), 0);
        assert_eq!(q.len_frames(), 3);
        assert_eq!(q.try_push(&[7, 8]), 1);
        assert_eq!(q.len_frames(), 4);
    }

    #[test]
    fn pop_nonblocking_empty() {
        let q = SharedAudio::new(2, 16);
        assert!(q.pop_nonblocking(4).is_none());
    }

    #[test]
    fn pop_nonblocking_returns_whole_frames_in_order() {
        let q = SharedAudio::new(2, 64);
        q.try_push(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(q.pop_nonblocking(2).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(q.pop_nonblocking(8).unwrap(), vec![5, 6]);
        assert!(q.pop_nonblocking(8).is_none());
    }

    #[test]
    fn clear_keeps_queue_open() {
        let q = SharedAudio::new(2, 16);
        q.try_push(&[1, 2]);
        q.clear();
        assert_eq!(q.len_frames(), 0);
        assert_eq!(q.try_push(&[3, 4]), 1);
    }

    #[test]
    fn close_rejects_pushes() {
        let q = SharedAudio::new(2, 16);
        q.try_push(&[1, 2]);
        q.close();
        q.close();
        assert!(q.is_closed());
        assert_eq!(q.len_frames(), 0);
        assert_eq!(q.try_push(&[3, 4]), 0);
    }

    #[test]
    fn producer_and_consumer_threads_share_the_queue() {
        let q = Arc::new(SharedAudio::new(2, 1024));
        let consumer = q.clone();
        let handle = thread::spawn(move || {
            let mut got = 0usize;
            while got < 100 {
                if let Some(v) = consumer.pop_nonblocking(16) {
                    got += v.len() / 2;
                } else {
                    thread::yield_now();
                }
            }
            got
        });
        let mut pushed = 0;
        while pushed < 100 {
            pushed += q.try_push(&[0, 0]);
        }
        assert_eq!(handle.join().unwrap(), 100);
    }
}
