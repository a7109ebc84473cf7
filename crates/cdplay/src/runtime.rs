//! cdplay runtime helpers.
//!
//! Wires the drive, output device, stdin commands and status output into a playback
//! session, and implements the metadata query.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use cpal::traits::DeviceTrait;

use cdda_player::command::{DEFAULT_MAX_LINE, StdinCommands};
use cdda_player::device;
use cdda_player::drive::{CdDrive, CdSectorSource};
use cdda_player::engine::{PlaybackEngine, PlaybackOutcome};
use cdda_player::sink::CpalSink;
use cdda_player::status::{StatusReporter, to_spaced_json};

use crate::config::{InfoConfig, PlayConfig};
use crate::metadata::{CddbClient, DiscInfo};

/// List output devices and print them to stdout.
pub fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    device::list_devices(&host)
}

/// Play one track until it finishes or is stopped.
///
/// Drive and track problems are reported before the output device is touched.
/// `interrupt` is polled by the command channel and maps to `stop`.
pub fn run_play(config: PlayConfig, interrupt: Arc<AtomicBool>) -> Result<PlaybackOutcome> {
    let drive = CdDrive::open(config.drive.as_deref())?;
    tracing::info!(drive = %drive.device_name(), "cd drive");

    let track = drive.check_track(config.track)?;
    let bounds = drive.track_bounds(track)?;
    tracing::info!(
        track,
        first = bounds.first,
        last = bounds.last,
        sectors = bounds.len(),
        correction = config.correction.level(),
        "track selected"
    );
    drive.set_speed(config.speed);

    let host = cpal::default_host();
    let device = device::pick_device(&host, config.device.as_deref())?;
    tracing::info!(device = %device.description()?, "output device");
    let stream_config = device::pick_cdda_config(&device)?;
    let sink = CpalSink::open(&device, &stream_config, &config.playback)
        .context("cannot open audio output")?;

    let source = CdSectorSource::new(drive, config.correction, config.max_retries);
    let commands = StdinCommands::spawn(DEFAULT_MAX_LINE).with_interrupt(interrupt);
    let reporter = StatusReporter::new(config.playback.status_format, std::io::stdout());

    let engine = PlaybackEngine::new(
        source,
        sink,
        commands,
        reporter,
        u32::from(track),
        bounds,
        config.playback,
    );
    Ok(engine.run()?)
}

/// Print the disc's metadata document to stdout.
///
/// A failed or empty CDDB lookup still prints the table-of-contents fields.
pub fn run_info(config: InfoConfig) -> Result<()> {
    let toc = {
        let drive = CdDrive::open(config.drive.as_deref())?;
        tracing::info!(drive = %drive.device_name(), "cd drive");
        drive.toc()?
    };
    let mut info = DiscInfo::from_toc(&toc);
    tracing::info!(discid = %info.discid, tracks = info.track_count, "disc identified");

    if config.offline {
        tracing::debug!("offline; skipping cddb lookup");
    } else {
        let client = CddbClient::new(&config.cddb_url, config.timeout);
        match client.lookup(&toc) {
            Ok(Some(entry)) => info.apply(entry),
            Ok(None) => tracing::info!(discid = %info.discid, "no cddb entry for disc"),
            Err(e) => tracing::warn!("cddb lookup failed: {e:#}"),
        }
    }

    println!("{}", to_spaced_json(&info).context("cannot encode disc info")?);
    Ok(())
}
