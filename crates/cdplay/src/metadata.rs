//! Disc metadata for `cdplay info`.
//!
//! The table of contents comes from the drive. The CDDB disc id is derived from it and
//! used for an optional lookup against a CDDB HTTP endpoint (`cddb query` followed by
//! `cddb read` of the xmcd entry).

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use cdda_player::drive::Toc;
use cdda_player::sector::{Lsn, SECTORS_PER_SECOND};

/// CDDB frame offsets count the two-second lead-in.
const LEAD_IN_FRAMES: i64 = 150;
const PROTO_LEVEL: &str = "6";
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

fn cddb_frames(lsn: Lsn) -> i64 {
    i64::from(lsn) + LEAD_IN_FRAMES
}

fn cddb_seconds(lsn: Lsn) -> i64 {
    cddb_frames(lsn) / i64::from(SECTORS_PER_SECOND)
}

/// freedb disc id: digit-sum checksum of track start seconds, disc length, track count.
pub fn cddb_disc_id(toc: &Toc) -> u32 {
    fn digit_sum(mut n: i64) -> i64 {
        let mut sum = 0;
        while n > 0 {
            sum += n % 10;
            n /= 10;
        }
        sum
    }

    let checksum: i64 = toc
        .tracks
        .iter()
        .map(|t| digit_sum(cddb_seconds(t.start)))
        .sum();
    let first = toc.tracks.first().map(|t| cddb_seconds(t.start)).unwrap_or(0);
    let length = cddb_seconds(toc.leadout) - first;
    (((checksum % 0xff) as u32) << 24)
        | (((length as u32) & 0xffff) << 8)
        | ((toc.tracks.len() as u32) & 0xff)
}

/// `cddb query <discid> <ntrks> <offsets...> <nsecs>`
pub fn query_command(toc: &Toc) -> String {
    let mut cmd = format!("cddb query {:08x} {}", cddb_disc_id(toc), toc.tracks.len());
    for track in &toc.tracks {
        cmd.push_str(&format!(" {}", cddb_frames(track.start)));
    }
    cmd.push_str(&format!(" {}", cddb_seconds(toc.leadout)));
    cmd
}

/// One candidate from a `cddb query` response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CddbMatch {
    pub category: String,
    pub discid: String,
    pub title: String,
}

/// Parsed xmcd database entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmcdEntry {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub year: Option<u32>,
    pub genre: Option<String>,
    /// Keyed by the zero-based `TTITLEn` index.
    pub track_titles: BTreeMap<usize, String>,
}

fn split_status(line: &str) -> Result<(u16, &str)> {
    let (code, rest) = line.split_once(' ').unwrap_or((line, ""));
    let code = code
        .parse()
        .with_context(|| format!("malformed cddb status line: {line:?}"))?;
    Ok((code, rest.trim()))
}

fn parse_match_line(line: &str) -> Option<CddbMatch> {
    let mut parts = line.splitn(3, ' ');
    let category = parts.next().filter(|s| !s.is_empty())?;
    let discid = parts.next().filter(|s| !s.is_empty())?;
    Some(CddbMatch {
        category: category.to_string(),
        discid: discid.to_string(),
        title: parts.next().unwrap_or("").trim().to_string(),
    })
}

/// Returns the exact match, the first of several matches, or `None` for 202.
pub fn parse_query_response(body: &str) -> Result<Option<CddbMatch>> {
    let mut lines = body.lines().map(str::trim_end);
    let status = lines.next().unwrap_or("");
    let (code, rest) = split_status(status)?;
    match code {
        200 => parse_match_line(rest)
            .map(Some)
            .with_context(|| format!("malformed cddb match: {rest:?}")),
        210 | 211 => Ok(lines.take_while(|l| *l != ".").find_map(parse_match_line)),
        202 => Ok(None),
        _ => bail!("cddb query failed: {status}"),
    }
}

pub fn parse_read_response(body: &str) -> Result<XmcdEntry> {
    let mut lines = body.lines().map(str::trim_end);
    let status = lines.next().unwrap_or("");
    let (code, _) = split_status(status)?;
    if code != 210 {
        bail!("cddb read failed: {status}");
    }
    Ok(parse_xmcd(lines.take_while(|l| *l != ".")))
}

/// Parse `KEY=value` lines; repeated keys are concatenated.
pub fn parse_xmcd<'a>(lines: impl Iterator<Item = &'a str>) -> XmcdEntry {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for line in lines {
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            fields
                .entry(key.trim().to_string())
                .or_default()
                .push_str(&unescape(value));
        }
    }

    let mut entry = XmcdEntry::default();
    if let Some(dtitle) = fields.get("DTITLE").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match dtitle.split_once(" / ") {
            Some((artist, title)) => {
                entry.artist = Some(artist.trim().to_string());
                entry.title = Some(title.trim().to_string());
            }
            None => {
                entry.artist = Some(dtitle.to_string());
                entry.title = Some(dtitle.to_string());
            }
        }
    }
    entry.year = fields.get("DYEAR").and_then(|s| s.trim().parse().ok());
    entry.genre = fields
        .get("DGENRE")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    for (key, value) in &fields {
        let Some(index) = key.strip_prefix("TTITLE").and_then(|n| n.parse().ok()) else {
            continue;
        };
        let value = value.trim();
        if !value.is_empty() {
            entry.track_titles.insert(index, value.to_string());
        }
    }
    entry
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub number: u8,
    pub seconds: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// The document printed by `cdplay info`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DiscInfo {
    pub first_track: u8,
    pub track_count: usize,
    pub seconds: i64,
    pub discid: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub tracks: Vec<TrackInfo>,
}

impl DiscInfo {
    pub fn from_toc(toc: &Toc) -> Self {
        let tracks = toc
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let end = toc.tracks.get(i + 1).map(|n| n.start).unwrap_or(toc.leadout);
                TrackInfo {
                    number: t.number,
                    seconds: i64::from(end - t.start) / i64::from(SECTORS_PER_SECOND),
                    title: None,
                    artist: None,
                }
            })
            .collect();
        Self {
            first_track: toc.first_track,
            track_count: toc.tracks.len(),
            seconds: cddb_seconds(toc.leadout),
            discid: format!("{:08x}", cddb_disc_id(toc)),
            title: None,
            artist: None,
            genre: None,
            year: None,
            tracks,
        }
    }

    /// Fill titles from a database entry. `TTITLEn` values of the form
    /// `artist / title` override the disc artist for that track.
    pub fn apply(&mut self, entry: XmcdEntry) {
        for (i, track) in self.tracks.iter_mut().enumerate() {
            let Some(raw) = entry.track_titles.get(&i) else {
                track.artist = entry.artist.clone();
                continue;
            };
            match raw.split_once(" / ") {
                Some((artist, title)) => {
                    track.artist = Some(artist.trim().to_string());
                    track.title = Some(title.trim().to_string());
                }
                None => {
                    track.artist = entry.artist.clone();
                    track.title = Some(raw.clone());
                }
            }
        }
        self.title = entry.title;
        self.artist = entry.artist;
        self.genre = entry.genre;
        self.year = entry.year;
    }
}

/// Blocking CDDB-over-HTTP client.
pub struct CddbClient {
    url: String,
    hello: String,
    agent: ureq::Agent,
}

impl CddbClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(concat!("cdplay/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            url: url.to_string(),
            hello: hello_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Look the disc up; `Ok(None)` when the database has no entry.
    pub fn lookup(&self, toc: &Toc) -> Result<Option<XmcdEntry>> {
        let body = self.call(&query_command(toc))?;
        let Some(found) = parse_query_response(&body)? else {
            return Ok(None);
        };
        tracing::info!(
            category = %found.category,
            discid = %found.discid,
            title = %found.title,
            "cddb match"
        );

        let body = self.call(&format!("cddb read {} {}", found.category, found.discid))?;
        let mut entry = parse_read_response(&body)?;
        entry.genre.get_or_insert(found.category);
        Ok(Some(entry))
    }

    fn call(&self, cmd: &str) -> Result<String> {
        tracing::debug!(url = %self.url, cmd, "cddb request");
        let request = self
            .agent
            .get(&self.url)
            .query("cmd", cmd)
            .query("hello", &self.hello)
            .query("proto", PROTO_LEVEL);
        let resp = match request.config().http_status_as_error(false).build().call() {
            Ok(resp) => resp,
            Err(err) => bail!("cddb request failed (transport) url={}: {err}", self.url),
        };
        let code = resp.status();
        let body = resp
            .into_body()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()
            .context("cddb response read failed")?;
        if code.as_u16() >= 400 {
            let snippet: String = body.trim().chars().take(200).collect();
            bail!("cddb request failed (status {code}) url={}: {snippet}", self.url);
        }
        Ok(body)
    }
}

/// `hello=<user> <host> <client> <version>`; fields must not contain spaces.
fn hello_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string());
    let host = gethostname::gethostname().to_string_lossy().to_string();
    format!(
        "{} {} cdplay {}",
        hello_field(&user),
        hello_field(&host),
        env!("CARGO_PKG_VERSION")
    )
}

fn hello_field(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_graphic())
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
