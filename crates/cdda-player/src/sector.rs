//! Sector-level audio model.
//!
//! A CD-DA sector carries 1/75 s of 16-bit little-endian stereo audio at 44.1 kHz.
//! [`SectorSource`] is the read side the playback engine pulls from; the libcdio
//! implementation lives in [`crate::drive`].

use std::fmt;

use thiserror::Error;

/// Logical sector number as used by libcdio.
pub type Lsn = i32;

/// Raw bytes per audio sector.
pub const SECTOR_BYTES: usize = 2352;
/// Interleaved stereo frames per sector.
pub const FRAMES_PER_SECTOR: usize = 588;
/// Interleaved `i16` samples per sector.
pub const SAMPLES_PER_SECTOR: usize = FRAMES_PER_SECTOR * CHANNELS;
/// Sectors played per second.
pub const SECTORS_PER_SECOND: u32 = 75;
/// CD-DA sample rate.
pub const SAMPLE_RATE_HZ: u32 = 44_100;
/// CD-DA channel count.
pub const CHANNELS: usize = 2;

/// Sector range of the track being played (both ends inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackBounds {
    pub first: Lsn,
    pub last: Lsn,
}

impl TrackBounds {
    pub fn new(first: Lsn, last: Lsn) -> Self {
        Self { first, last }
    }

    /// Clamp an arbitrary target into the track.
    ///
    /// Targets below `first` land on `first`, targets above `last` land on `last`.
    pub fn clamp(&self, target: i64) -> Lsn {
        if target < i64::from(self.first) {
            self.first
        } else if target > i64::from(self.last) {
            self.last
        } else {
            target as Lsn
        }
    }

    /// Number of sectors in the track.
    pub fn len(&self) -> u32 {
        (i64::from(self.last) - i64::from(self.first) + 1).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

/// One sector of interleaved PCM audio.
#[derive(Clone, PartialEq, Eq)]
pub struct PcmBlock {
    samples: Box<[i16]>,
}

impl PcmBlock {
    /// Decode a raw 2352-byte sector (little-endian `i16`, interleaved L/R).
    pub fn from_le_bytes(raw: &[u8]) -> Self {
        let samples = raw
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { samples }
    }

    /// A sector of digital silence.
    pub fn silence() -> Self {
        Self {
            samples: vec![0i16; SAMPLES_PER_SECTOR].into_boxed_slice(),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Stereo frames carried by this block.
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }
}

impl fmt::Debug for PcmBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmBlock")
            .field("frames", &self.frames())
            .finish()
    }
}

/// Read-reliability policy applied by the drive source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorrectionMode {
    /// Single read per sector, no verification.
    #[default]
    Disabled,
    /// Verified reads; an unrecoverable sector is replaced by silence.
    FullSkip,
    /// Verified reads; an unrecoverable sector aborts playback.
    Full,
}

impl CorrectionMode {
    /// Map the command-line correction level (0, 1, 2).
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Disabled),
            1 => Some(Self::FullSkip),
            2 => Some(Self::Full),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::FullSkip => 1,
            Self::Full => 2,
        }
    }
}

/// Unrecoverable read failure reported by a [`SectorSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The drive rejected the read of `sector`.
    #[error("sector {sector} unreadable after {attempts} attempt(s)")]
    Unreadable { sector: Lsn, attempts: u32 },
    /// Reads succeeded but never agreed with each other.
    #[error("sector {sector} could not be verified after {attempts} reads")]
    Unverified { sector: Lsn, attempts: u32 },
    #[error("gave up at sector {sector} after skipping {skipped} sectors in a row")]
    TooManySkips { sector: Lsn, skipped: u32 },
}

/// Sequential sector reader.
///
/// `read` returns the block at the cursor and moves the cursor forward by one.
/// `seek` repositions the cursor; callers are responsible for keeping it inside the track.
pub trait SectorSource {
    fn seek(&mut self, sector: Lsn);
    fn read(&mut self) -> Result<PcmBlock, ReadError>;
    fn cursor(&self) -> Lsn;
}
