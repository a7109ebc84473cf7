//! Audio sink (CPAL output stream).
//!
//! [`AudioSink`] is the write side the playback engine pushes sectors into.
//! [`CpalSink`] implements it with a bounded [`SharedAudio`] queue drained by the CPAL
//! callback. The callback:
//! - refills from the shared queue without blocking
//! - converts CD `i16` samples to the device sample format
//! - outputs silence (and counts an underrun) when the queue runs dry

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, StreamTrait};
use thiserror::Error;

use crate::config::PlaybackConfig;
use crate::device;
use crate::queue::{SharedAudio, calc_max_buffered_samples};
use crate::sector::{CHANNELS, FRAMES_PER_SECTOR, PcmBlock, SAMPLE_RATE_HZ};

/// Failure reported by an [`AudioSink`] write or reset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The output stream reported an error and needs a reset.
    #[error("output stream faulted")]
    Faulted,
    /// The device refused to (re)start.
    #[error("output device error: {0}")]
    Device(String),
}

/// PCM output the engine writes sectors to.
pub trait AudioSink {
    /// Submit one block; returns the number of frames accepted.
    fn write(&mut self, block: &PcmBlock) -> Result<usize, SinkError>;
    /// Audio already written but not yet played.
    fn queued_duration(&self) -> Duration;
    /// Discard buffered audio and restart the output after an underrun or fault.
    fn reset(&mut self) -> Result<(), SinkError>;
}

/// Shared flags between the sink and its CPAL callback.
#[derive(Default)]
struct StreamFlags {
    faulted: AtomicBool,
    underrun_events: AtomicU64,
    underrun_frames: AtomicU64,
    played_frames: AtomicU64,
}

/// CPAL-backed sink carrying 44.1 kHz stereo audio.
pub struct CpalSink {
    stream: cpal::Stream,
    queue: Arc<SharedAudio>,
    flags: Arc<StreamFlags>,
}

impl CpalSink {
    /// Build and start an output stream on `device` using a CD-compatible `config`
    /// (see [`device::pick_cdda_config`]).
    pub fn open(
        device: &cpal::Device,
        config: &cpal::SupportedStreamConfig,
        playback: &PlaybackConfig,
    ) -> Result<Self> {
        let mut stream_config: cpal::StreamConfig = config.clone().into();
        if let Some(buf) = device::pick_buffer_size(config) {
            stream_config.buffer_size = buf;
        }
        let queue = Arc::new(SharedAudio::new(
            CHANNELS,
            queue_capacity_samples(playback.queue_duration, playback.max_buffered),
        ));
        let flags = Arc::new(StreamFlags::default());

        tracing::info!(
            sample_format = ?config.sample_format(),
            buffer_size = ?stream_config.buffer_size,
            queue_frames = queue.max_frames(),
            "output stream config"
        );

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(device, &stream_config, &queue, &flags)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(device, &stream_config, &queue, &flags)?,
            cpal::SampleFormat::I32 => build_stream::<i32>(device, &stream_config, &queue, &flags)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(device, &stream_config, &queue, &flags)?,
            other => return Err(anyhow!("Unsupported sample format: {other:?}")),
        };
        stream.play()?;

        Ok(Self {
            stream,
            queue,
            flags,
        })
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, block: &PcmBlock) -> Result<usize, SinkError> {
        if self.flags.faulted.load(Ordering::Relaxed) {
            return Err(SinkError::Faulted);
        }
        Ok(self.queue.try_push(block.samples()))
    }

    fn queued_duration(&self) -> Duration {
        frames_to_duration(self.queue.len_frames())
    }

    fn reset(&mut self) -> Result<(), SinkError> {
        tracing::debug!(queued_frames = self.queue.len_frames(), "resetting output stream");
        self.queue.clear();
        self.flags.faulted.store(false, Ordering::Relaxed);
        self.stream
            .play()
            .map_err(|e| SinkError::Device(e.to_string()))
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            tracing::debug!("stream pause on close failed: {e}");
        }
        self.queue.close();
        tracing::debug!(
            played_frames = self.flags.played_frames.load(Ordering::Relaxed),
            underrun_events = self.flags.underrun_events.load(Ordering::Relaxed),
            underrun_frames = self.flags.underrun_frames.load(Ordering::Relaxed),
            "output stream closed"
        );
    }
}

/// Queue capacity: the configured duration, but always room for the flow-control
/// target plus two sectors so a write never bounces off a full queue in steady state.
fn queue_capacity_samples(queue_duration: Duration, max_buffered: Duration) -> usize {
    let sector = Duration::from_millis(1000 / 75 + 1);
    let millis = queue_duration.max(max_buffered + sector * 2).as_millis() as u64;
    calc_max_buffered_samples(SAMPLE_RATE_HZ, CHANNELS, millis)
}

fn frames_to_duration(frames: usize) -> Duration {
    Duration::from_micros(frames as u64 * 1_000_000 / u64::from(SAMPLE_RATE_HZ))
}

/// Type-specialized stream builder for CPAL sample formats.
///
/// The callback drains the queue a sector at a time, writes interleaved stereo into
/// the device buffer, and fills any shortfall with silence.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<SharedAudio>,
    flags: &Arc<StreamFlags>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let channels_out = usize::from(config.channels);
    let queue_cb = queue.clone();
    let flags_cb = flags.clone();
    let flags_err = flags.clone();
    let mut pending: Vec<i16> = Vec::new();
    let mut pos = 0usize;
    let mut starved = true;

    let err_fn = move |err| {
        tracing::warn!("stream error: {err}");
        flags_err.faulted.store(true, Ordering::Relaxed);
    };

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let frames = data.len() / channels_out;
            let mut filled = 0usize;

            for frame in 0..frames {
                if pos >= pending.len() {
                    pos = 0;
                    match queue_cb.pop_nonblocking(FRAMES_PER_SECTOR) {
                        Some(v) => pending = v,
                        None => {
                            pending.clear();
                            if !starved {
                                flags_cb.underrun_events.fetch_add(1, Ordering::Relaxed);
                                flags_cb
                                    .underrun_frames
                                    .fetch_add((frames - frame) as u64, Ordering::Relaxed);
                                starved = true;
                            }
                            let silence = <T as cpal::Sample>::from_sample::<i16>(0);
                            data[frame * channels_out..].fill(silence);
                            break;
                        }
                    }
                }
                starved = false;
                let out = &mut data[frame * channels_out..(frame + 1) * channels_out];
                for (ch, slot) in out.iter_mut().enumerate() {
                    let sample = if ch < CHANNELS { pending[pos + ch] } else { 0 };
                    *slot = <T as cpal::Sample>::from_sample::<i16>(sample);
                }
                pos += CHANNELS;
                filled += 1;
            }

            if filled > 0 {
                flags_cb.played_frames.fetch_add(filled as u64, Ordering::Relaxed);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
