//! cdplay: play one audio CD track, controlled by commands on stdin.
//!
//! ## Playback
//! Sectors are read from the drive (optionally verified by re-reading), written to a CPAL
//! output stream at 44.1 kHz stereo, and paced so only a short backlog is ever queued.
//! Between sectors one stdin line is decoded: `pause`, `resume`, `stop`, `status`,
//! `seek <sectors>` (relative) and `jump <sectors>` (from the start of the track).
//! Status lines go to stdout; logs go to stderr.
//!
//! ## Modes
//! - `play`: play a track.
//! - `info`: print the disc's table of contents and CDDB metadata as JSON.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cdplay::cli::{Args, Command};
use cdplay::config::{InfoConfig, PlayConfig};
use cdplay::runtime;

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,cdplay=info,cdda_player=info")
        }))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cdplay: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.list_devices {
        return runtime::list_devices();
    }

    match args.cmd {
        Some(Command::Play(play)) => {
            let config = PlayConfig::try_from(play)?;
            let interrupt = install_interrupt_handler();
            let outcome = runtime::run_play(config, interrupt)?;
            tracing::debug!(?outcome, "session ended");
            Ok(())
        }
        Some(Command::Info(info)) => runtime::run_info(InfoConfig::from(info)),
        None => Ok(()),
    }
}

/// First Ctrl-C asks the engine to stop at the next iteration; a second one exits at once.
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let seen = AtomicBool::new(false);
    let flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if seen.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        flag.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!("cannot install Ctrl-C handler: {e}");
    }
    interrupt
}
