//! Operator command channel.
//!
//! Commands arrive as short text lines on stdin. A reader thread pumps raw bytes
//! into a channel; [`StdinCommands::poll`] drains whatever has arrived into a
//! bounded [`LineBuffer`] and decodes at most one complete line, so the engine
//! never blocks on input.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, TryRecvError};

/// Default maximum line length in bytes (newline excluded).
pub const DEFAULT_MAX_LINE: usize = 31;

/// A decoded operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Stop,
    StatusQuery,
    /// Move by a signed number of sectors from the current position.
    SeekRelative(i32),
    /// Move to a signed sector offset from the start of the track.
    SeekAbsolute(i32),
    /// Anything that did not parse; carries the raw text.
    Unknown(String),
}

/// Decode one input line.
///
/// Literal, case-sensitive prefixes are matched in order: `pause`, `resume`, `stop`,
/// `status`, then `seek <int>` and `jump <int>`. Whitespace between the keyword and the
/// number is optional (`seek-5`, `seek\t5`).
pub fn parse_command(line: &str) -> Command {
    if line.starts_with("pause") {
        Command::Pause
    } else if line.starts_with("resume") {
        Command::Resume
    } else if line.starts_with("stop") {
        Command::Stop
    } else if line.starts_with("status") {
        Command::StatusQuery
    } else if let Some(n) = line.strip_prefix("seek").and_then(parse_leading_int) {
        Command::SeekRelative(n)
    } else if let Some(n) = line.strip_prefix("jump").and_then(parse_leading_int) {
        Command::SeekAbsolute(n)
    } else {
        Command::Unknown(line.to_string())
    }
}

/// Parse a leading signed decimal integer, ignoring leading whitespace and any
/// trailing text (`" -12abc"` → `-12`).
fn parse_leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let digits_start = usize::from(s.starts_with(['+', '-']));
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    s[..digits_start + digits_len].parse().ok()
}

/// Non-blocking source of operator commands.
pub trait CommandSource {
    /// Return the next command if a complete one is available, without waiting.
    fn poll(&mut self) -> Option<Command>;
}

/// Bounded line assembler.
///
/// Bytes are collected until `\n`. A line keeps at most `max_len` bytes; anything
/// beyond that is discarded up to the next newline, so an overlong line never spills
/// into the following one. `\r` before the newline is dropped.
#[derive(Debug)]
pub struct LineBuffer {
    max_len: usize,
    current: Vec<u8>,
    overflowed: bool,
    ready: VecDeque<String>,
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
            current: Vec::with_capacity(max_len),
            overflowed: false,
            ready: VecDeque::new(),
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                if self.current.last() == Some(&b'\r') {
                    self.current.pop();
                }
                if self.overflowed {
                    tracing::debug!(max_len = self.max_len, "input line truncated");
                }
                let line = String::from_utf8_lossy(&self.current).into_owned();
                self.ready.push_back(line);
                self.current.clear();
                self.overflowed = false;
            } else if self.current.len() < self.max_len {
                self.current.push(b);
            } else {
                self.overflowed = true;
            }
        }
    }

    /// Next complete line, if any.
    pub fn pop_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Bytes of the line still being assembled.
    pub fn pending_len(&self) -> usize {
        self.current.len()
    }
}

/// Commands read from the process's standard input.
pub struct StdinCommands {
    rx: Receiver<Vec<u8>>,
    lines: LineBuffer,
    interrupt: Option<Arc<AtomicBool>>,
    eof_logged: bool,
}

impl StdinCommands {
    /// Spawn the stdin reader thread.
    ///
    /// The thread is detached; it ends when stdin reaches EOF or the receiver is dropped.
    pub fn spawn(max_line: usize) -> Self {
        Self::from_reader(std::io::stdin(), max_line)
    }

    /// Same as [`StdinCommands::spawn`] over any byte stream.
    pub fn from_reader<R: Read + Send + 'static>(mut reader: R, max_line: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::warn!("command input read failed: {e}");
                        break;
                    }
                }
            }
        });
        Self {
            rx,
            lines: LineBuffer::new(max_line),
            interrupt: None,
            eof_logged: false,
        }
    }

    /// When `flag` becomes true, `poll` reports [`Command::Stop`].
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn drain_input(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(bytes) => self.lines.push_bytes(&bytes),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.eof_logged {
                        self.eof_logged = true;
                        tracing::info!(
                            discarded_bytes = self.lines.pending_len(),
                            "command input closed; playback continues"
                        );
                    }
                    break;
                }
            }
        }
    }
}

impl CommandSource for StdinCommands {
    fn poll(&mut self) -> Option<Command> {
        if let Some(flag) = &self.interrupt {
            if flag.swap(false, Ordering::Relaxed) {
                return Some(Command::Stop);
            }
        }
        self.drain_input();
        self.lines.pop_line().map(|line| parse_command(&line))
    }
}
