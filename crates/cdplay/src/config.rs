use std::time::Duration;

use anyhow::{Result, anyhow};

pub use cdda_player::config::PlaybackConfig;
use cdda_player::sector::CorrectionMode;
use cdda_player::status::StatusFormat;

use crate::cli::{InfoArgs, PlayArgs};

#[derive(Clone, Debug)]
pub struct PlayConfig {
    pub track: u32,
    pub correction: CorrectionMode,
    pub drive: Option<String>,
    pub device: Option<String>,
    pub speed: i32,
    pub max_retries: u32,
    pub playback: PlaybackConfig,
}

#[derive(Clone, Debug)]
pub struct InfoConfig {
    pub drive: Option<String>,
    pub cddb_url: String,
    pub offline: bool,
    pub timeout: Duration,
}

impl TryFrom<PlayArgs> for PlayConfig {
    type Error = anyhow::Error;

    fn try_from(args: PlayArgs) -> Result<Self> {
        let correction = CorrectionMode::from_level(args.correction).ok_or_else(|| {
            anyhow!(
                "invalid correction level {} (expected 0, 1 or 2)",
                args.correction
            )
        })?;
        let playback = PlaybackConfig {
            max_buffered: Duration::from_millis(args.max_buffer_ms),
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            stall_polls: args.stall_polls.max(1),
            queue_duration: Duration::from_millis(args.queue_ms),
            status_format: if args.json {
                StatusFormat::Json
            } else {
                StatusFormat::Text
            },
            ..PlaybackConfig::default()
        };
        Ok(Self {
            track: args.track,
            correction,
            drive: normalize_name(args.drive),
            device: normalize_name(args.device),
            speed: args.speed,
            max_retries: args.max_retries,
            playback,
        })
    }
}

impl From<InfoArgs> for InfoConfig {
    fn from(args: InfoArgs) -> Self {
        Self {
            drive: normalize_name(args.drive),
            cddb_url: args.cddb_url.trim_end_matches('/').to_string(),
            offline: args.offline,
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
        }
    }
}

/// Treat blank names as "use the default".
fn normalize_name(name: Option<String>) -> Option<String> {
    name.and_then(|name| {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
