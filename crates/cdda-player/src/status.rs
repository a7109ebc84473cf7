//! Playback status lines.
//!
//! Formatting is a pure function of the state handed in by the engine; the
//! [`StatusReporter`] only adds "write one line and flush".

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

/// Engine playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status line flavour, chosen at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFormat {
    /// `Status: playing, track 3, time: 100 of 900`
    #[default]
    Text,
    /// `{"status": "playing", "track": 3, "sector": 100, "length": 900}`
    Json,
}

#[derive(Serialize)]
struct StatusLine {
    status: PlaybackState,
    track: u32,
    sector: i64,
    length: i64,
}

/// JSON formatter that puts a space after `:` and `,` on a single line.
pub struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize `value` as single-line JSON with [`SpacedFormatter`].
pub fn to_spaced_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut ser)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Format one status line (no trailing newline).
///
/// `elapsed` is the position relative to the first sector of the track and
/// `total` is `last - first`.
pub fn format_status(
    format: StatusFormat,
    state: PlaybackState,
    track: u32,
    elapsed: i64,
    total: i64,
) -> String {
    match format {
        StatusFormat::Text => {
            format!("Status: {state}, track {track}, time: {elapsed} of {total}")
        }
        StatusFormat::Json => {
            let line = StatusLine {
                status: state,
                track,
                sector: elapsed,
                length: total,
            };
            to_spaced_json(&line).unwrap_or_else(|e| {
                tracing::warn!("status serialization failed: {e}");
                String::new()
            })
        }
    }
}

/// Emits status lines to an output stream (stdout in the CLI).
pub struct StatusReporter<W: Write> {
    format: StatusFormat,
    out: W,
}

impl<W: Write> StatusReporter<W> {
    pub fn new(format: StatusFormat, out: W) -> Self {
        Self { format, out }
    }

    /// Write one status line and flush. Output failures are logged, never fatal.
    pub fn report(&mut self, state: PlaybackState, track: u32, elapsed: i64, total: i64) {
        let line = format_status(self.format, state, track, elapsed, total);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            tracing::warn!("status output failed: {e}");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
