//! Playback engine: the single-threaded control loop.
//!
//! Each iteration:
//! 1. unless paused, reads the sector at the current position, writes it to the sink
//!    (one reset + retry on a failed write), waits for the sink to drain below the
//!    flow-control target, and advances the position;
//! 2. polls the command channel once and applies at most one command;
//! 3. finishes once the position has passed the last sector of the track.
//!
//! The engine owns its source and sink; both are dropped (released) when [`PlaybackEngine::run`]
//! returns, whichever way it returns.

use std::io::Write;
use std::thread;

use thiserror::Error;

use crate::command::{Command, CommandSource};
use crate::config::PlaybackConfig;
use crate::sector::{Lsn, PcmBlock, ReadError, SectorSource, TrackBounds};
use crate::sink::AudioSink;
use crate::status::{PlaybackState, StatusReporter};

/// How a playback session ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The last sector of the track was played.
    Finished,
    /// The operator sent `stop` (or interrupted the process).
    Stopped,
}

/// Fatal session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The sector source could not deliver a sector.
    #[error("read failed: {0}")]
    Read(#[from] ReadError),
    /// The sink rejected a sector twice in a row (or could not be reset).
    #[error("write to audio output failed at sector {sector}: {reason}")]
    Write { sector: Lsn, reason: String },
}

/// Result of the flow-control wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FlowWait {
    Drained,
    Stalled,
}

pub struct PlaybackEngine<S, K, C, W>
where
    S: SectorSource,
    K: AudioSink,
    C: CommandSource,
    W: Write,
{
    source: S,
    sink: K,
    commands: C,
    reporter: StatusReporter<W>,
    config: PlaybackConfig,
    track: u32,
    bounds: TrackBounds,
    position: Lsn,
    state: PlaybackState,
}

impl<S, K, C, W> PlaybackEngine<S, K, C, W>
where
    S: SectorSource,
    K: AudioSink,
    C: CommandSource,
    W: Write,
{
    pub fn new(
        source: S,
        sink: K,
        commands: C,
        reporter: StatusReporter<W>,
        track: u32,
        bounds: TrackBounds,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            source,
            sink,
            commands,
            reporter,
            config,
            track,
            bounds,
            position: bounds.first,
            state: PlaybackState::Stopped,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> Lsn {
        self.position
    }

    /// Play the track until it finishes, is stopped, or fails.
    ///
    /// Consumes the engine so the source and sink are released on every exit path.
    pub fn run(mut self) -> Result<PlaybackOutcome, EngineError> {
        self.start();
        loop {
            match self.step() {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) => {
                    self.state = PlaybackState::Stopped;
                    tracing::error!(
                        track = self.track,
                        sector = self.position,
                        error = %e,
                        "playback aborted"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn start(&mut self) {
        self.source.seek(self.bounds.first);
        self.position = self.bounds.first;
        self.transition(PlaybackState::Playing);
        tracing::info!(
            track = self.track,
            first = self.bounds.first,
            last = self.bounds.last,
            "playback started"
        );
    }

    /// Run one loop iteration. Returns the outcome once the session is over.
    fn step(&mut self) -> Result<Option<PlaybackOutcome>, EngineError> {
        if self.state != PlaybackState::Paused {
            self.play_one_sector()?;
        }

        match self.commands.poll() {
            Some(command) => {
                if let Some(outcome) = self.apply(command) {
                    return Ok(Some(outcome));
                }
            }
            None => {
                if self.state == PlaybackState::Paused {
                    thread::sleep(self.config.pause_poll_interval);
                }
            }
        }

        if self.position > self.bounds.last {
            self.transition(PlaybackState::Stopped);
            tracing::info!(track = self.track, "playback finished");
            return Ok(Some(PlaybackOutcome::Finished));
        }
        Ok(None)
    }

    fn play_one_sector(&mut self) -> Result<(), EngineError> {
        let block = self.source.read()?;
        self.write_block(&block)?;
        self.wait_for_output();
        self.position += 1;
        Ok(())
    }

    /// Write one block, resetting the sink and retrying once on failure.
    fn write_block(&mut self, block: &PcmBlock) -> Result<(), EngineError> {
        let expected = block.frames();
        match self.sink.write(block) {
            Ok(n) if n == expected => return Ok(()),
            Ok(n) => tracing::debug!(
                sector = self.position,
                written = n,
                expected,
                "short write; resetting output"
            ),
            Err(e) => tracing::debug!(sector = self.position, error = %e, "write failed; resetting output"),
        }

        let sector = self.position;
        self.sink.reset().map_err(|e| EngineError::Write {
            sector,
            reason: format!("reset failed: {e}"),
        })?;
        match self.sink.write(block) {
            Ok(n) if n == expected => {
                tracing::info!(sector, "output recovered after reset");
                Ok(())
            }
            Ok(n) => Err(EngineError::Write {
                sector,
                reason: format!("wrote {n} of {expected} frames after reset"),
            }),
            Err(e) => Err(EngineError::Write {
                sector,
                reason: e.to_string(),
            }),
        }
    }

    /// Poll the sink until its backlog is at or below the target, or stops shrinking.
    fn wait_for_output(&mut self) -> FlowWait {
        let target = self.config.max_buffered;
        let mut queued = self.sink.queued_duration();
        let mut stalled = 0u32;
        while queued > target {
            thread::sleep(self.config.poll_interval);
            let now = self.sink.queued_duration();
            if now < queued {
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= self.config.stall_polls {
                    tracing::warn!(
                        queued_ms = now.as_millis() as u64,
                        target_ms = target.as_millis() as u64,
                        polls = stalled,
                        "output not draining; continuing"
                    );
                    return FlowWait::Stalled;
                }
            }
            queued = now;
        }
        FlowWait::Drained
    }

    /// Apply one command. Returns an outcome when the command ends the session.
    fn apply(&mut self, command: Command) -> Option<PlaybackOutcome> {
        match command {
            Command::Pause => self.transition(PlaybackState::Paused),
            Command::Resume => self.transition(PlaybackState::Playing),
            Command::Stop => {
                self.transition(PlaybackState::Stopped);
                tracing::info!(track = self.track, sector = self.position, "playback stopped");
                return Some(PlaybackOutcome::Stopped);
            }
            Command::SeekRelative(offset) => {
                let target = self.bounds.clamp(i64::from(self.position) + i64::from(offset));
                tracing::info!(from = self.position, to = target, offset, "seek");
                self.reposition(target);
            }
            Command::SeekAbsolute(offset) => {
                let target = self.bounds.clamp(i64::from(self.bounds.first) + i64::from(offset));
                tracing::info!(from = self.position, to = target, offset, "jump");
                self.reposition(target);
            }
            Command::StatusQuery => self.report(),
            Command::Unknown(raw) => tracing::warn!(input = %raw, "unknown command ignored"),
        }
        None
    }

    fn reposition(&mut self, target: Lsn) {
        self.source.seek(target);
        self.position = target;
    }

    /// Change state, emitting a status line when it actually changes.
    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            self.state = next;
            self.report();
        }
    }

    fn report(&mut self) {
        let elapsed = i64::from(self.position) - i64::from(self.bounds.first);
        let total = i64::from(self.bounds.last) - i64::from(self.bounds.first);
        self.reporter.report(self.state, self.track, elapsed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use crate::status::StatusFormat;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct Probe {
        reads: Vec<Lsn>,
        seeks: Vec<Lsn>,
        writes: usize,
        resets: usize,
        source_drops: usize,
        sink_drops: usize,
    }

    type Shared = Rc<RefCell<Probe>>;

    struct MockSource {
        tally: Shared,
        cursor: Lsn,
        fail_at: Option<Lsn>,
    }

    impl SectorSource for MockSource {
        fn seek(&mut self, sector: Lsn) {
            self.tally.borrow_mut().seeks.push(sector);
            self.cursor = sector;
        }

        fn read(&mut self) -> Result<PcmBlock, ReadError> {
            if self.fail_at == Some(self.cursor) {
                return Err(ReadError::Unreadable {
                    sector: self.cursor,
                    attempts: 1,
                });
            }
            self.tally.borrow_mut().reads.push(self.cursor);
            self.cursor += 1;
            Ok(PcmBlock::silence())
        }

        fn cursor(&self) -> Lsn {
            self.cursor
        }
    }

    impl Drop for MockSource {
        fn drop(&mut self) {
            self.tally.borrow_mut().source_drops += 1;
        }
    }

    #[derive(Clone, Copy)]
    enum WriteResult {
        Short,
        Fail,
    }

    struct MockSink {
        tally: Shared,
        failures: VecDeque<WriteResult>,
        queued: RefCell<VecDeque<Duration>>,
    }

    impl AudioSink for MockSink {
        fn write(&mut self, block: &PcmBlock) -> Result<usize, SinkError> {
            self.tally.borrow_mut().writes += 1;
            match self.failures.pop_front() {
                None => Ok(block.frames()),
                Some(WriteResult::Short) => Ok(block.frames() / 2),
                Some(WriteResult::Fail) => Err(SinkError::Faulted),
            }
        }

        fn queued_duration(&self) -> Duration {
            self.queued.borrow_mut().pop_front().unwrap_or(Duration::ZERO)
        }

        fn reset(&mut self) -> Result<(), SinkError> {
            self.tally.borrow_mut().resets += 1;
            Ok(())
        }
    }

    impl Drop for MockSink {
        fn drop(&mut self) {
            self.tally.borrow_mut().sink_drops += 1;
        }
    }

    struct Script(VecDeque<Option<Command>>);

    impl CommandSource for Script {
        fn poll(&mut self) -> Option<Command> {
            self.0.pop_front().flatten()
        }
    }

    #[derive(Clone, Default)]
    struct SharedOut(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedOut {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedOut {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.borrow().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    type TestEngine = PlaybackEngine<MockSource, MockSink, Script, SharedOut>;

    struct Harness {
        tally: Shared,
        out: SharedOut,
        engine: TestEngine,
    }

    fn test_config() -> PlaybackConfig {
        PlaybackConfig {
            max_buffered: Duration::from_millis(250),
            poll_interval: Duration::ZERO,
            stall_polls: 3,
            pause_poll_interval: Duration::ZERO,
            queue_duration: Duration::from_secs(1),
            status_format: StatusFormat::Json,
        }
    }

    fn harness(bounds: TrackBounds, commands: Vec<Option<Command>>) -> Harness {
        harness_with(bounds, commands, Vec::new(), None)
    }

    fn harness_with(
        bounds: TrackBounds,
        commands: Vec<Option<Command>>,
        failures: Vec<WriteResult>,
        fail_at: Option<Lsn>,
    ) -> Harness {
        let tally = Shared::default();
        let out = SharedOut::default();
        let engine = PlaybackEngine::new(
            MockSource {
                tally: tally.clone(),
                cursor: 0,
                fail_at,
            },
            MockSink {
                tally: tally.clone(),
                failures: failures.into(),
                queued: RefCell::new(VecDeque::new()),
            },
            Script(commands.into()),
            StatusReporter::new(StatusFormat::Json, out.clone()),
            3,
            bounds,
            test_config(),
        );
        Harness { tally, out, engine }
    }

    fn idle(n: usize) -> Vec<Option<Command>> {
        vec![None; n]
    }

    #[test]
    fn plays_every_sector_then_finishes() {
        let h = harness(TrackBounds::new(100, 104), Vec::new());
        let outcome = h.engine.run().unwrap();
        assert_eq!(outcome, PlaybackOutcome::Finished);
        let tally = h.tally.borrow();
        assert_eq!(tally.reads, vec![100, 101, 102, 103, 104]);
        assert_eq!(tally.seeks, vec![100]);
        assert_eq!(tally.writes, 5);
        assert_eq!(tally.source_drops, 1);
        assert_eq!(tally.sink_drops, 1);
        assert_eq!(
            h.out.lines(),
            vec![
                r#"{"status": "playing", "track": 3, "sector": 0, "length": 4}"#,
                r#"{"status": "stopped", "track": 3, "sector": 5, "length": 4}"#,
            ]
        );
    }

    #[test]
    fn engine_starts_stopped_and_enters_playing_on_start() {
        let mut h = harness(TrackBounds::new(100, 200), Vec::new());
        assert_eq!(h.engine.state(), PlaybackState::Stopped);
        h.engine.start();
        assert_eq!(h.engine.state(), PlaybackState::Playing);
        assert_eq!(h.engine.position(), 100);
    }

    #[test]
    fn stop_ends_session_and_releases_once() {
        let mut commands = idle(3);
        commands.push(Some(Command::Stop));
        let h = harness(TrackBounds::new(0, 1000), commands);
        let outcome = h.engine.run().unwrap();
        assert_eq!(outcome, PlaybackOutcome::Stopped);
        let tally = h.tally.borrow();
        assert_eq!(tally.reads.len(), 4);
        assert_eq!(tally.source_drops, 1);
        assert_eq!(tally.sink_drops, 1);
        assert_eq!(
            h.out.lines().last().map(String::as_str),
            Some(r#"{"status": "stopped", "track": 3, "sector": 4, "length": 1000}"#)
        );
    }

    #[test]
    fn finished_and_stopped_are_distinct() {
        let finished = harness(TrackBounds::new(0, 1), Vec::new()).engine.run().unwrap();
        let stopped = harness(TrackBounds::new(0, 1), vec![Some(Command::Stop)])
            .engine
            .run()
            .unwrap();
        assert_ne!(finished, stopped);
    }

    #[test]
    fn seek_relative_clamps_to_first() {
        let first = 1000;
        let mut commands = idle(9);
        commands.push(Some(Command::SeekRelative(-50)));
        let mut h = harness(TrackBounds::new(first, 2000), commands);
        h.engine.start();
        for _ in 0..10 {
            assert_eq!(h.engine.step().unwrap(), None);
        }
        assert_eq!(h.engine.position(), first);
        assert_eq!(h.tally.borrow().seeks.last(), Some(&first));
    }

    #[test]
    fn seek_relative_clamps_to_last() {
        let mut h = harness(
            TrackBounds::new(1000, 2000),
            vec![Some(Command::SeekRelative(5000))],
        );
        h.engine.start();
        h.engine.step().unwrap();
        assert_eq!(h.engine.position(), 2000);
    }

    #[test]
    fn seek_relative_moves_from_current_position() {
        let mut commands = idle(4);
        commands.push(Some(Command::SeekRelative(20)));
        let mut h = harness(TrackBounds::new(1000, 2000), commands);
        h.engine.start();
        for _ in 0..5 {
            h.engine.step().unwrap();
        }
        assert_eq!(h.engine.position(), 1025);
        assert_eq!(h.engine.source.cursor(), 1025);
    }

    #[test]
    fn seek_absolute_is_relative_to_track_start() {
        let first = 1000;
        let mut commands = idle(499);
        commands.push(Some(Command::SeekAbsolute(10)));
        let mut h = harness(TrackBounds::new(first, 2000), commands);
        h.engine.start();
        for _ in 0..500 {
            h.engine.step().unwrap();
        }
        assert_eq!(h.engine.position(), first + 10);
        assert_eq!(h.tally.borrow().seeks.last(), Some(&(first + 10)));
    }

    #[test]
    fn seek_absolute_clamps_both_ways() {
        let mut h = harness(
            TrackBounds::new(1000, 2000),
            vec![
                Some(Command::SeekAbsolute(-5)),
                Some(Command::SeekAbsolute(99_999)),
            ],
        );
        h.engine.start();
        h.engine.step().unwrap();
        assert_eq!(h.engine.position(), 1000);
        h.engine.step().unwrap();
        assert_eq!(h.engine.position(), 2000);
    }

    fn expected_clamp(bounds: TrackBounds, target: i64) -> Lsn {
        target.clamp(i64::from(bounds.first), i64::from(bounds.last)) as Lsn
    }

    fn random_offset(rng: &mut StdRng, span: i32) -> i32 {
        match rng.gen_range(0..5) {
            0 => i32::MIN,
            1 => i32::MAX,
            2 => rng.r#gen::<i32>(),
            _ => rng.gen_range(-2 * span..=2 * span),
        }
    }

    #[test]
    fn random_seek_sequences_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(0x00cd_da5e);
        let mut tracks = vec![(0, 0), (0, 1), (150, 150), (449_849, 449_849)];
        for _ in 0..40 {
            let first = rng.gen_range(0..300_000);
            tracks.push((first, first + rng.gen_range(0..30_000)));
        }

        for (first, last) in tracks {
            let bounds = TrackBounds::new(first, last);
            let span = last - first + 1;
            let commands: Vec<Option<Command>> = (0..100)
                .map(|_| {
                    let offset = random_offset(&mut rng, span);
                    Some(if rng.gen_bool(0.5) {
                        Command::SeekRelative(offset)
                    } else {
                        Command::SeekAbsolute(offset)
                    })
                })
                .collect();

            let mut h = harness(bounds, commands.clone());
            h.engine.start();
            for command in commands.into_iter().flatten() {
                let played = i64::from(h.engine.position()) + 1;
                h.engine.step().unwrap();
                let expected = match command {
                    Command::SeekRelative(o) => expected_clamp(bounds, played + i64::from(o)),
                    Command::SeekAbsolute(o) => expected_clamp(bounds, i64::from(first) + i64::from(o)),
                    other => panic!("unexpected command {other:?}"),
                };
                let pos = h.engine.position();
                assert_eq!(pos, expected, "track ({first}, {last})");
                assert!(pos >= first && pos <= last, "position {pos} escaped ({first}, {last})");
                assert_eq!(h.engine.source.cursor(), pos);
            }
        }
    }

    #[test]
    fn pause_holds_position_and_resume_continues() {
        let mut commands = vec![None, Some(Command::Pause)];
        commands.extend(idle(20));
        commands.push(Some(Command::Resume));
        let mut h = harness(TrackBounds::new(500, 600), commands);
        h.engine.start();
        h.engine.step().unwrap();
        h.engine.step().unwrap();
        assert_eq!(h.engine.state(), PlaybackState::Paused);
        let held = h.engine.position();
        assert_eq!(held, 502);
        for _ in 0..20 {
            h.engine.step().unwrap();
            assert_eq!(h.engine.position(), held);
        }
        assert_eq!(h.tally.borrow().reads.len(), 2);

        h.engine.step().unwrap();
        assert_eq!(h.engine.state(), PlaybackState::Playing);
        h.engine.step().unwrap();
        assert_eq!(h.tally.borrow().reads.last(), Some(&held));
        assert_eq!(h.engine.position(), held + 1);
    }

    #[test]
    fn unknown_command_changes_nothing() {
        let mut h = harness(
            TrackBounds::new(10, 20),
            vec![
                Some(Command::Pause),
                Some(Command::Unknown("banana".to_string())),
            ],
        );
        h.engine.start();
        h.engine.step().unwrap();
        let position = h.engine.position();
        let lines_before = h.out.lines().len();

        assert_eq!(h.engine.step().unwrap(), None);
        assert_eq!(h.engine.position(), position);
        assert_eq!(h.engine.state(), PlaybackState::Paused);
        assert_eq!(h.out.lines().len(), lines_before);
    }

    #[test]
    fn status_query_reports_elapsed_and_length() {
        let mut commands = idle(99);
        commands.push(Some(Command::StatusQuery));
        let mut h = harness(TrackBounds::new(2000, 3000), commands);
        h.engine.start();
        for _ in 0..100 {
            h.engine.step().unwrap();
        }
        assert_eq!(h.engine.state(), PlaybackState::Playing);
        assert_eq!(
            h.out.lines().last().map(String::as_str),
            Some(r#"{"status": "playing", "track": 3, "sector": 100, "length": 1000}"#)
        );
    }

    #[test]
    fn single_write_failure_is_recovered() {
        let h = harness_with(
            TrackBounds::new(0, 4),
            Vec::new(),
            vec![WriteResult::Short],
            None,
        );
        let outcome = h.engine.run().unwrap();
        assert_eq!(outcome, PlaybackOutcome::Finished);
        let tally = h.tally.borrow();
        assert_eq!(tally.resets, 1);
        assert_eq!(tally.writes, 6);
        assert_eq!(tally.reads, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn recovered_write_keeps_position_in_step() {
        let mut h = harness_with(
            TrackBounds::new(0, 10),
            Vec::new(),
            vec![WriteResult::Fail],
            None,
        );
        h.engine.start();
        h.engine.step().unwrap();
        assert_eq!(h.engine.position(), 1);
        assert_eq!(h.tally.borrow().resets, 1);
    }

    #[test]
    fn two_consecutive_write_failures_are_fatal() {
        let h = harness_with(
            TrackBounds::new(0, 10),
            Vec::new(),
            vec![WriteResult::Fail, WriteResult::Short],
            None,
        );
        let err = h.engine.run().unwrap_err();
        assert!(matches!(err, EngineError::Write { sector: 0, .. }));
        let tally = h.tally.borrow();
        assert_eq!(tally.resets, 1);
        assert_eq!(tally.source_drops, 1);
        assert_eq!(tally.sink_drops, 1);
    }

    #[test]
    fn failed_write_does_not_advance_position() {
        let mut h = harness_with(
            TrackBounds::new(0, 10),
            Vec::new(),
            vec![WriteResult::Short, WriteResult::Short],
            None,
        );
        h.engine.start();
        assert!(h.engine.step().is_err());
        assert_eq!(h.engine.position(), 0);
    }

    #[test]
    fn read_failure_is_fatal_and_still_releases() {
        let h = harness_with(TrackBounds::new(0, 10), Vec::new(), Vec::new(), Some(3));
        let err = h.engine.run().unwrap_err();
        assert_eq!(
            err,
            EngineError::Read(ReadError::Unreadable {
                sector: 3,
                attempts: 1
            })
        );
        let tally = h.tally.borrow();
        assert_eq!(tally.reads, vec![0, 1, 2]);
        assert_eq!(tally.source_drops, 1);
        assert_eq!(tally.sink_drops, 1);
    }

    #[test]
    fn flow_control_waits_until_below_target() {
        let mut h = harness(TrackBounds::new(0, 10), Vec::new());
        *h.engine.sink.queued.borrow_mut() = [400, 300, 200]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(h.engine.wait_for_output(), FlowWait::Drained);
        assert!(h.engine.sink.queued.borrow().is_empty());
    }

    #[test]
    fn flow_control_gives_up_when_output_stalls() {
        let mut h = harness(TrackBounds::new(0, 10), Vec::new());
        *h.engine.sink.queued.borrow_mut() = [400, 390, 390, 395, 400, 100]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(h.engine.wait_for_output(), FlowWait::Stalled);
        assert_eq!(h.engine.sink.queued.borrow().len(), 1);
    }

    #[test]
    fn flow_control_skips_wait_when_under_target() {
        let mut h = harness(TrackBounds::new(0, 10), Vec::new());
        *h.engine.sink.queued.borrow_mut() = VecDeque::from([Duration::from_millis(100)]);
        assert_eq!(h.engine.wait_for_output(), FlowWait::Drained);
    }

    #[test]
    fn engine_error_display_names_the_sector() {
        let err = EngineError::Write {
            sector: 42,
            reason: "output stream faulted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "write to audio output failed at sector 42: output stream faulted"
        );
    }
}
