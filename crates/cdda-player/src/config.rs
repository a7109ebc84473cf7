use std::time::Duration;

use crate::status::StatusFormat;

/// Playback tuning parameters shared by the engine and the output sink.
#[derive(Clone, Debug)]
pub struct PlaybackConfig {
    /// Flow-control target: the engine waits after each write until the sink
    /// holds at most this much unplayed audio.
    pub max_buffered: Duration,
    /// Sleep between two `queued_duration` polls while waiting on flow control.
    pub poll_interval: Duration,
    /// Consecutive polls without the queued duration decreasing before the wait gives up.
    pub stall_polls: u32,
    /// Sleep between command polls while paused.
    pub pause_poll_interval: Duration,
    /// Capacity of the sink queue.
    pub queue_duration: Duration,
    /// Status line format.
    pub status_format: StatusFormat,
}

impl Default for PlaybackConfig {
    /// Defaults tuned for a responsive command loop on common devices.
    fn default() -> Self {
        Self {
            max_buffered: Duration::from_millis(250),
            poll_interval: Duration::from_millis(5),
            stall_polls: 200,
            pause_poll_interval: Duration::from_millis(20),
            queue_duration: Duration::from_millis(1000),
            status_format: StatusFormat::Text,
        }
    }
}
