//! Output device discovery and CD-format negotiation.
//!
//! Thin wrappers around CPAL for:
//! - listing available output devices
//! - selecting either the default device or a device by substring match
//! - finding an output config that plays 44.1 kHz stereo without resampling

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

use crate::sector::{CHANNELS, SAMPLE_RATE_HZ};

/// Output device whose name contains `needle` (case-insensitive); the host default otherwise.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let Some(needle) = needle else {
        return host
            .default_output_device()
            .context("no default output device");
    };
    host.output_devices()
        .context("cannot enumerate output devices")?
        .find(|d| device_label(d).is_some_and(|name| matches_device_name(&name, needle)))
        .ok_or_else(|| anyhow!("no output device matches {needle:?}"))
}

fn device_label(device: &cpal::Device) -> Option<String> {
    device.description().ok().map(|d| d.name().to_string())
}

/// Choose an output config that carries CD audio as-is (44.1 kHz, 2 channels).
///
/// Among matching ranges the best sample format wins (F32 > I32 > I16 > U16).
/// Fails when the device cannot be configured for CD audio.
pub fn pick_cdda_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_output_configs()
        .context("cannot query output configs")?
        .collect();
    if ranges.is_empty() {
        return Err(anyhow!("No supported output configs"));
    }

    let best = ranges
        .into_iter()
        .filter(|r| {
            supports_cdda(
                r.channels(),
                r.min_sample_rate(),
                r.max_sample_rate(),
                r.sample_format(),
            )
        })
        .min_by_key(|r| sample_format_rank(r.sample_format()))
        .ok_or_else(|| {
            anyhow!("output device cannot play {SAMPLE_RATE_HZ} Hz {CHANNELS}-channel audio")
        })?;

    Ok(best.with_sample_rate(SAMPLE_RATE_HZ))
}

/// Prefer a fixed buffer size if the device advertises one.
///
/// Returns `None` when the device only supports the default buffer size.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            // About 100 ms at 44.1 kHz; small enough that queued_duration tracks real time.
            const TARGET_FRAMES: u32 = 4_096;
            Some(cpal::BufferSize::Fixed(TARGET_FRAMES.clamp(*min, *max)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

fn supports_cdda(channels: u16, min_rate: u32, max_rate: u32, format: cpal::SampleFormat) -> bool {
    usize::from(channels) == CHANNELS
        && (min_rate..=max_rate).contains(&SAMPLE_RATE_HZ)
        && sample_format_rank(format) < 10
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

/// Print output devices to stdout, marking the default and any that cannot play CD audio.
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let default = host.default_output_device().and_then(|d| device_label(&d));
    let devices = host
        .output_devices()
        .context("cannot enumerate output devices")?;
    for (i, d) in devices.enumerate() {
        let name = device_label(&d).unwrap_or_else(|| "(unnamed)".to_string());
        let is_default = default.as_deref() == Some(name.as_str());
        println!(
            "{}",
            device_line(i, &name, is_default, pick_cdda_config(&d).is_ok())
        );
    }
    Ok(())
}

fn device_line(index: usize, name: &str, is_default: bool, plays_cdda: bool) -> String {
    let mut line = format!("#{index}: {name}");
    if is_default {
        line.push_str(" (default)");
    }
    if !plays_cdda {
        line.push_str(" [no 44.1 kHz stereo output]");
    }
    line
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}
