//! Optical drive access via libcdio.
//!
//! [`CdDrive`] owns the libcdio handle (released on drop) and answers table-of-contents
//! questions. [`CdSectorSource`] layers the correction policy on top of raw sector reads.

use std::ffi::{CStr, CString};
use std::ptr;

use thiserror::Error;

use crate::sector::{
    CorrectionMode, Lsn, PcmBlock, ReadError, SECTOR_BYTES, SectorSource, TrackBounds,
};

/// Consecutive skipped sectors tolerated in [`CorrectionMode::FullSkip`].
pub const MAX_CONSECUTIVE_SKIPS: u32 = 10;

const LEADOUT_TRACK: u8 = 0xAA;

/// Failures while opening the drive or resolving a track.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriveError {
    /// libcdio could not open the device (or found no default drive).
    #[error("cannot open cd drive {}", .device.as_deref().unwrap_or("(default)"))]
    Open { device: Option<String> },
    #[error("disc has no readable tracks")]
    NoTracks,
    /// The requested track is outside the disc's track range.
    #[error("track number out of range ({first} - {last})")]
    TrackOutOfRange { track: u32, first: u8, last: u8 },
    #[error("track {track} is not an audio track")]
    NotAudio { track: u8 },
    /// libcdio returned an invalid sector address for a track.
    #[error("drive reported no sector range for track {track}")]
    InvalidAddress { track: u8 },
}

/// One entry of the disc table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub number: u8,
    pub start: Lsn,
    pub audio: bool,
}

/// Table of contents: tracks in disc order plus the lead-out address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toc {
    pub first_track: u8,
    pub tracks: Vec<TocEntry>,
    pub leadout: Lsn,
}

/// Raw sector reads, without any correction.
///
/// Errors carry the driver return code.
pub trait RawSectorRead {
    fn read_raw(&mut self, sector: Lsn, buf: &mut [u8]) -> Result<(), i32>;
}

/// An open libcdio device.
pub struct CdDrive {
    cdio: *mut libcdio_sys::CdIo_t,
    device: Option<String>,
}

impl CdDrive {
    /// Open `device`, or the drive libcdio picks when `None`.
    pub fn open(device: Option<&str>) -> Result<Self, DriveError> {
        let open_err = || DriveError::Open {
            device: device.map(str::to_string),
        };
        let source = device
            .map(|d| CString::new(d).map_err(|_| open_err()))
            .transpose()?;
        let source_ptr = source.as_ref().map_or(ptr::null(), |s| s.as_ptr());

        // SAFETY: `source_ptr` is null or a valid NUL-terminated string that outlives the call.
        let cdio = unsafe { libcdio_sys::cdio_open(source_ptr, libcdio_sys::driver_id_t_DRIVER_DEVICE) };
        if cdio.is_null() {
            return Err(open_err());
        }
        Ok(Self {
            cdio,
            device: device.map(str::to_string),
        })
    }

    /// Device path actually opened.
    pub fn device_name(&self) -> String {
        if let Some(d) = &self.device {
            return d.clone();
        }
        let key = c"source";
        // SAFETY: the handle is open; libcdio owns the returned string.
        let arg = unsafe { libcdio_sys::cdio_get_arg(self.cdio, key.as_ptr()) };
        if arg.is_null() {
            return "(default)".to_string();
        }
        // SAFETY: non-null pointer to a NUL-terminated string owned by the handle.
        unsafe { CStr::from_ptr(arg) }.to_string_lossy().into_owned()
    }

    pub fn first_track(&self) -> Result<u8, DriveError> {
        // SAFETY: the handle is open for the lifetime of `self`.
        let first = unsafe { libcdio_sys::cdio_get_first_track_num(self.cdio) };
        if first == 0 || first == 0xFF {
            return Err(DriveError::NoTracks);
        }
        Ok(first)
    }

    pub fn track_count(&self) -> Result<u8, DriveError> {
        // SAFETY: the handle is open for the lifetime of `self`.
        let count = unsafe { libcdio_sys::cdio_get_num_tracks(self.cdio) };
        if count == 0 || count == 0xFF {
            return Err(DriveError::NoTracks);
        }
        Ok(count)
    }

    pub fn last_track(&self) -> Result<u8, DriveError> {
        let first = self.first_track()?;
        let count = self.track_count()?;
        Ok(first.saturating_add(count - 1))
    }

    /// Validate `track` against the disc and return it as a libcdio track number.
    pub fn check_track(&self, track: u32) -> Result<u8, DriveError> {
        let first = self.first_track()?;
        let last = self.last_track()?;
        if track < u32::from(first) || track > u32::from(last) {
            return Err(DriveError::TrackOutOfRange { track, first, last });
        }
        Ok(track as u8)
    }

    pub fn is_audio(&self, track: u8) -> bool {
        // SAFETY: the handle is open for the lifetime of `self`.
        let format = unsafe { libcdio_sys::cdio_get_track_format(self.cdio, track) };
        format == libcdio_sys::track_format_t_TRACK_FORMAT_AUDIO
    }

    /// Sector range of an audio track.
    pub fn track_bounds(&self, track: u8) -> Result<TrackBounds, DriveError> {
        if !self.is_audio(track) {
            return Err(DriveError::NotAudio { track });
        }
        // SAFETY: the handle is open for the lifetime of `self`.
        let (first, last) = unsafe {
            (
                libcdio_sys::cdio_get_track_lsn(self.cdio, track),
                libcdio_sys::cdio_get_track_last_lsn(self.cdio, track),
            )
        };
        let bounds = TrackBounds::new(first, last);
        if first < 0 || bounds.is_empty() {
            return Err(DriveError::InvalidAddress { track });
        }
        Ok(bounds)
    }

    /// Best-effort drive speed request.
    pub fn set_speed(&self, speed: i32) {
        // SAFETY: the handle is open for the lifetime of `self`.
        let rc = unsafe { libcdio_sys::cdio_set_speed(self.cdio, speed) };
        if rc != 0 {
            tracing::warn!(speed, code = rc, "drive speed request rejected");
        }
    }

    /// Read the table of contents.
    pub fn toc(&self) -> Result<Toc, DriveError> {
        let first_track = self.first_track()?;
        let last = self.last_track()?;
        let mut tracks = Vec::new();
        for number in first_track..=last {
            // SAFETY: the handle is open for the lifetime of `self`.
            let start = unsafe { libcdio_sys::cdio_get_track_lsn(self.cdio, number) };
            if start < 0 {
                return Err(DriveError::InvalidAddress { track: number });
            }
            tracks.push(TocEntry {
                number,
                start,
                audio: self.is_audio(number),
            });
        }
        // SAFETY: the handle is open for the lifetime of `self`.
        let leadout = unsafe { libcdio_sys::cdio_get_track_lsn(self.cdio, LEADOUT_TRACK) };
        if leadout < 0 {
            return Err(DriveError::InvalidAddress { track: LEADOUT_TRACK });
        }
        Ok(Toc {
            first_track,
            tracks,
            leadout,
        })
    }
}

impl RawSectorRead for CdDrive {
    fn read_raw(&mut self, sector: Lsn, buf: &mut [u8]) -> Result<(), i32> {
        debug_assert!(buf.len() >= SECTOR_BYTES);
        // SAFETY: `buf` holds at least one raw sector and the handle is open.
        let rc = unsafe {
            libcdio_sys::cdio_read_audio_sector(self.cdio, buf.as_mut_ptr().cast(), sector)
        };
        if rc == 0 { Ok(()) } else { Err(rc) }
    }
}

impl Drop for CdDrive {
    fn drop(&mut self) {
        // SAFETY: the handle came from `cdio_open` and is destroyed exactly once.
        unsafe { libcdio_sys::cdio_destroy(self.cdio) };
        tracing::debug!("cd drive closed");
    }
}

/// Error-correcting sector reader over a raw drive.
pub struct CdSectorSource<R: RawSectorRead = CdDrive> {
    drive: R,
    mode: CorrectionMode,
    max_retries: u32,
    cursor: Lsn,
    consecutive_skips: u32,
    scratch: Vec<u8>,
    previous: Vec<u8>,
}

impl<R: RawSectorRead> CdSectorSource<R> {
    /// `max_retries` bounds the reads spent on one sector in the verifying modes (minimum 2).
    pub fn new(drive: R, mode: CorrectionMode, max_retries: u32) -> Self {
        Self {
            drive,
            mode,
            max_retries: max_retries.max(2),
            cursor: 0,
            consecutive_skips: 0,
            scratch: vec![0u8; SECTOR_BYTES],
            previous: vec![0u8; SECTOR_BYTES],
        }
    }

    fn read_once(&mut self, sector: Lsn) -> Result<PcmBlock, ReadError> {
        match self.drive.read_raw(sector, &mut self.scratch) {
            Ok(()) => Ok(PcmBlock::from_le_bytes(&self.scratch)),
            Err(code) => {
                tracing::warn!(sector, code, "sector read failed");
                Err(ReadError::Unreadable {
                    sector,
                    attempts: 1,
                })
            }
        }
    }

    /// Re-read until two consecutive reads agree.
    fn read_verified(&mut self, sector: Lsn) -> Result<PcmBlock, ReadError> {
        let mut have_previous = false;
        let mut failures = 0u32;
        for attempt in 1..=self.max_retries {
            match self.drive.read_raw(sector, &mut self.scratch) {
                Ok(()) => {
                    if have_previous && self.scratch == self.previous {
                        if attempt > 2 {
                            tracing::debug!(sector, attempts = attempt, "sector verified after re-reads");
                        }
                        return Ok(PcmBlock::from_le_bytes(&self.scratch));
                    }
                    self.previous.copy_from_slice(&self.scratch);
                    have_previous = true;
                }
                Err(code) => {
                    failures += 1;
                    have_previous = false;
                    tracing::debug!(sector, attempt, code, "sector read failed; retrying");
                }
            }
        }
        if failures == self.max_retries {
            Err(ReadError::Unreadable {
                sector,
                attempts: self.max_retries,
            })
        } else {
            Err(ReadError::Unverified {
                sector,
                attempts: self.max_retries,
            })
        }
    }
}

impl<R: RawSectorRead> SectorSource for CdSectorSource<R> {
    fn seek(&mut self, sector: Lsn) {
        self.cursor = sector;
    }

    fn read(&mut self) -> Result<PcmBlock, ReadError> {
        let sector = self.cursor;
        let block = match self.mode {
            CorrectionMode::Disabled => self.read_once(sector)?,
            CorrectionMode::Full => self.read_verified(sector)?,
            CorrectionMode::FullSkip => match self.read_verified(sector) {
                Ok(block) => {
                    self.consecutive_skips = 0;
                    block
                }
                Err(err) => {
                    self.consecutive_skips += 1;
                    if self.consecutive_skips > MAX_CONSECUTIVE_SKIPS {
                        return Err(ReadError::TooManySkips {
                            sector,
                            skipped: self.consecutive_skips - 1,
                        });
                    }
                    tracing::warn!(sector, error = %err, "skipping unrecoverable sector (silence)");
                    PcmBlock::silence()
                }
            },
        };
        self.cursor += 1;
        Ok(block)
    }

    fn cursor(&self) -> Lsn {
        self.cursor
    }
}
