//! Process monitor: drives a running process to completion.
//!
//! Two reader threads drain stdout and stderr into channels while the
//! calling thread polls them, forwards output to a log sink, and every
//! check-in interval trims the retained output, consults the caller's
//! check-in callback and enforces the optional timeout.

pub mod buffer;
pub mod reader;
pub mod sink;

pub use buffer::OutputBuffer;
pub use reader::StreamKind;
pub use sink::{LogSink, MemorySink, StdoutSink, TracingSink};

use crate::launcher::ProcessHandle;
use buffer::has_content;
use reader::{spawn_reader, LineQueue};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

/// Terminal result of a monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// The process exited on its own. Only the last `output_buffer_length`
    /// characters of each stream are guaranteed to be present.
    Completed {
        stdout: String,
        stderr: String,
        /// `None` when the process was ended by a signal.
        exit_code: Option<i32>,
    },
    /// The process ran past its time budget and was killed.
    TimedOut { elapsed: Duration },
    /// The check-in callback rejected the process and it was killed.
    CheckInFailed,
}

impl MonitorOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, MonitorOutcome::Completed { .. })
    }

    /// Completed with exit code 0.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            MonitorOutcome::Completed {
                exit_code: Some(0),
                ..
            }
        )
    }
}

type CheckInFn<'a> = Box<dyn FnMut(&str, &str) -> bool + 'a>;
type CheckErrorFn<'a> = Box<dyn FnMut(&str) + 'a>;

/// Configured process monitor. Build with the chained setters, then call
/// [`Monitor::run`] once per process.
pub struct Monitor<'a> {
    check_in: Option<CheckInFn<'a>>,
    check_error: Option<CheckErrorFn<'a>>,
    sink: Box<dyn LogSink + 'a>,
    timeout: Option<Duration>,
    check_in_interval: Duration,
    output_buffer_length: usize,
    poll_interval: Duration,
    reader_grace: Duration,
}

impl Default for Monitor<'_> {
    fn default() -> Self {
        Self {
            check_in: None,
            check_error: None,
            sink: Box::new(StdoutSink),
            timeout: None,
            check_in_interval: Duration::from_secs(10),
            output_buffer_length: 10_000,
            poll_interval: Duration::from_millis(100),
            reader_grace: Duration::from_secs(1),
        }
    }
}

impl<'a> Monitor<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called every check-in with the output retained so far. Returning
    /// `false` kills the process.
    pub fn check_in<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &str) -> bool + 'a,
    {
        self.check_in = Some(Box::new(f));
        self
    }

    /// Receives new stderr text that is not just whitespace. When set, that
    /// text is no longer written to the log sink.
    pub fn check_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) + 'a,
    {
        self.check_error = Some(Box::new(f));
        self
    }

    pub fn sink<S>(mut self, sink: S) -> Self
    where
        S: LogSink + 'a,
    {
        self.sink = Box::new(sink);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_minutes(self, minutes: u64) -> Self {
        self.timeout(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn check_in_interval(mut self, interval: Duration) -> Self {
        self.check_in_interval = interval;
        self
    }

    /// Characters retained per stream after each check-in.
    pub fn output_buffer_length(mut self, chars: usize) -> Self {
        self.output_buffer_length = chars;
        self
    }

    /// Sleep between loop iterations.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How long the final drain waits for readers to hang up after exit.
    pub fn reader_grace(mut self, grace: Duration) -> Self {
        self.reader_grace = grace;
        self
    }

    /// Drive `process` until it exits, times out, or fails a check-in.
    ///
    /// Blocks the calling thread. Process-level failures (non-zero exit,
    /// closed pipes, kill errors) are reported through the outcome and the
    /// sink, never as a panic or error. Panics raised by callbacks propagate.
    pub fn run<P>(&mut self, process: &mut P) -> MonitorOutcome
    where
        P: ProcessHandle + ?Sized,
    {
        let pid = process.id();
        let mut session = Session::start(process);
        tracing::debug!(
            pid,
            started_at = %session.started_at,
            check_in_secs = self.check_in_interval.as_secs_f64(),
            timeout_secs = ?self.timeout.map(|t| t.as_secs_f64()),
            "monitoring process"
        );

        while process.is_running() {
            let backlogged = self.absorb(&mut session);

            if session.last_check_in.elapsed() >= self.check_in_interval {
                session.last_check_in = Instant::now();
                session.stdout.trim_to_tail(self.output_buffer_length);
                session.stderr.trim_to_tail(self.output_buffer_length);

                if let Some(check_in) = self.check_in.as_mut() {
                    if !check_in(session.stdout.as_str(), session.stderr.as_str()) {
                        tracing::warn!(pid, "check-in failed, killing process");
                        self.kill_once(process, &mut session);
                        return MonitorOutcome::CheckInFailed;
                    }
                }

                let elapsed = session.started.elapsed();
                if let Some(timeout) = self.timeout {
                    if elapsed > timeout {
                        let minutes = elapsed.as_secs_f64() / 60.0;
                        self.sink
                            .log(&format!("Process timed out after {minutes:.2} minutes"));
                        tracing::warn!(
                            pid,
                            elapsed_secs = elapsed.as_secs_f64(),
                            "process timed out, killing"
                        );
                        self.kill_once(process, &mut session);
                        return MonitorOutcome::TimedOut { elapsed };
                    }
                }
            }

            // A reader that is ahead gets drained again right away. Each pass
            // is bounded, so check-in and timeout are still reached.
            if !backlogged {
                thread::sleep(self.poll_interval);
            }
        }

        let exit_code = match process.wait() {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(pid, error = %e, "failed to reap process");
                None
            }
        };
        self.sink.flush();

        self.final_drain(&mut session);

        tracing::debug!(
            pid,
            exit_code = ?exit_code,
            duration_secs = session.started.elapsed().as_secs_f64(),
            "process finished"
        );

        MonitorOutcome::Completed {
            stdout: session.stdout.into_string(),
            stderr: session.stderr.into_string(),
            exit_code,
        }
    }

    /// One non-blocking pass over both queues, stdout first. Returns true
    /// when either queue still had lines left over.
    fn absorb(&mut self, session: &mut Session) -> bool {
        let out = session.stdout_queue.drain();
        if !out.is_empty() {
            session.stdout.push(&out);
            self.sink.log(&out);
        }

        let err = session.stderr_queue.drain();
        if !err.is_empty() {
            session.stderr.push(&err);
            self.route_stderr(&err);
        }

        session.stdout_queue.is_backlogged() || session.stderr_queue.is_backlogged()
    }

    /// Keep absorbing until both readers hang up or the grace period ends.
    fn final_drain(&mut self, session: &mut Session) {
        let deadline = Instant::now() + self.reader_grace;
        loop {
            let backlogged = self.absorb(session);
            if session.stdout_queue.is_closed() && session.stderr_queue.is_closed() {
                break;
            }
            if Instant::now() >= deadline {
                tracing::debug!("output readers still open after exit, not waiting further");
                break;
            }
            if !backlogged {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    fn route_stderr(&mut self, err: &str) {
        if !has_content(err) {
            return;
        }
        match self.check_error.as_mut() {
            Some(check_error) => check_error(err),
            None => self.sink.log(&sink::error_block(err)),
        }
    }

    fn kill_once<P>(&mut self, process: &mut P, session: &mut Session)
    where
        P: ProcessHandle + ?Sized,
    {
        if session.killed {
            return;
        }
        session.killed = true;

        let pid = process.id();
        match process.kill() {
            Ok(()) => {
                // Reap so the caller doesn't inherit a zombie.
                if let Err(e) = process.wait() {
                    tracing::debug!(pid, error = %e, "failed to reap killed process");
                }
            }
            Err(e) => {
                self.sink.log(&format!("Failed to kill process {pid}: {e}"));
                tracing::warn!(pid, error = %e, "failed to kill process");
            }
        }
    }
}

/// Per-run state owned by the monitoring loop.
struct Session {
    stdout_queue: LineQueue,
    stderr_queue: LineQueue,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    started: Instant,
    started_at: chrono::DateTime<chrono::Utc>,
    last_check_in: Instant,
    killed: bool,
}

impl Session {
    fn start<P>(process: &mut P) -> Self
    where
        P: ProcessHandle + ?Sized,
    {
        let stdout_queue = match process.take_stdout() {
            Some(stream) => spawn_reader(stream, StreamKind::Stdout),
            None => LineQueue::closed(StreamKind::Stdout),
        };
        let stderr_queue = match process.take_stderr() {
            Some(stream) => spawn_reader(stream, StreamKind::Stderr),
            None => LineQueue::closed(StreamKind::Stderr),
        };
        let now = Instant::now();
        Self {
            stdout_queue,
            stderr_queue,
            stdout: OutputBuffer::new(),
            stderr: OutputBuffer::new(),
            started: now,
            started_at: chrono::Utc::now(),
            last_check_in: now,
            killed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io::{self, Cursor, Read};

    /// Scripted process: "runs" for a fixed number of liveness checks.
    struct FakeProcess {
        stdout: Option<Cursor<Vec<u8>>>,
        stderr: Option<Cursor<Vec<u8>>>,
        polls_left: u32,
        kill_fails: bool,
        kills: u32,
        waits: u32,
        exit_code: Option<i32>,
    }

    impl FakeProcess {
        fn new(stdout: &str, stderr: &str, polls: u32) -> Self {
            Self {
                stdout: Some(Cursor::new(stdout.as_bytes().to_vec())),
                stderr: Some(Cursor::new(stderr.as_bytes().to_vec())),
                polls_left: polls,
                kill_fails: false,
                kills: 0,
                waits: 0,
                exit_code: Some(0),
            }
        }
    }

    impl ProcessHandle for FakeProcess {
        fn id(&self) -> u32 {
            4242
        }

        fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
            self.stdout.take().map(|c| Box::new(c) as Box<dyn Read + Send>)
        }

        fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
            self.stderr.take().map(|c| Box::new(c) as Box<dyn Read + Send>)
        }

        fn is_running(&mut self) -> bool {
            if self.polls_left == 0 {
                return false;
            }
            self.polls_left -= 1;
            true
        }

        fn kill(&mut self) -> io::Result<()> {
            self.kills += 1;
            if self.kill_fails {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.polls_left = 0;
            Ok(())
        }

        fn wait(&mut self) -> io::Result<Option<i32>> {
            self.waits += 1;
            Ok(self.exit_code)
        }
    }

    fn fast<'a>() -> Monitor<'a> {
        Monitor::new()
            .poll_interval(Duration::from_millis(1))
            .check_in_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_defaults() {
        let m = Monitor::new();
        assert_eq!(m.check_in_interval, Duration::from_secs(10));
        assert_eq!(m.output_buffer_length, 10_000);
        assert!(m.timeout.is_none());
        assert!(m.check_in.is_none());
        assert!(m.check_error.is_none());
    }

    #[test]
    fn test_completed_collects_output() {
        let mut sink = MemorySink::new();
        let mut proc = FakeProcess::new("rendering frame 1\nrendering frame 2\n", "", 3);
        let outcome = fast().sink(&mut sink).run(&mut proc);

        assert_eq!(
            outcome,
            MonitorOutcome::Completed {
                stdout: "rendering frame 1\nrendering frame 2\n".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }
        );
        assert!(outcome.is_success());
        assert_eq!(sink.joined(), "rendering frame 1\nrendering frame 2\n");
        assert_eq!(proc.waits, 1);
        assert_eq!(proc.kills, 0);
    }

    #[test]
    fn test_whitespace_stderr_is_not_routed() {
        let errors = RefCell::new(Vec::new());
        let mut sink = MemorySink::new();
        let mut proc = FakeProcess::new("", "\n  \n\t\n", 2);
        let outcome = fast()
            .sink(&mut sink)
            .check_error(|e| errors.borrow_mut().push(e.to_string()))
            .run(&mut proc);

        assert!(errors.borrow().is_empty());
        assert!(sink.entries.is_empty());
        match outcome {
            MonitorOutcome::Completed { stderr, .. } => assert_eq!(stderr, "\n  \n\t\n"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_stderr_goes_to_callback_not_sink() {
        let errors = RefCell::new(String::new());
        let mut sink = MemorySink::new();
        let mut proc = FakeProcess::new("", "license server unreachable\n", 2);
        fast()
            .sink(&mut sink)
            .check_error(|e| errors.borrow_mut().push_str(e))
            .run(&mut proc);

        assert_eq!(*errors.borrow(), "license server unreachable\n");
        assert!(!sink.joined().contains("license server"));
    }

    #[test]
    fn test_stderr_goes_to_sink_without_callback() {
        let mut sink = MemorySink::new();
        let mut proc = FakeProcess::new("", "license server unreachable\n", 2);
        fast().sink(&mut sink).run(&mut proc);

        let logged = sink.joined();
        assert!(logged.contains("Error:"));
        assert_eq!(logged.matches("license server unreachable").count(), 1);
    }

    #[test]
    fn test_check_in_rejection_kills_once() {
        let calls = Cell::new(0);
        let mut proc = FakeProcess::new("", "", u32::MAX);
        let outcome = fast()
            .sink(MemorySink::new())
            .check_in(|_, _| {
                calls.set(calls.get() + 1);
                false
            })
            .run(&mut proc);

        assert_eq!(outcome, MonitorOutcome::CheckInFailed);
        assert_eq!(calls.get(), 1);
        assert_eq!(proc.kills, 1);
    }

    #[test]
    fn test_kill_failure_is_logged_not_raised() {
        let mut sink = MemorySink::new();
        let mut proc = FakeProcess::new("", "", u32::MAX);
        proc.kill_fails = true;
        let outcome = fast()
            .sink(&mut sink)
            .check_in(|_, _| false)
            .run(&mut proc);

        assert_eq!(outcome, MonitorOutcome::CheckInFailed);
        assert_eq!(proc.kills, 1);
        assert_eq!(proc.waits, 0);
        assert!(sink.joined().contains("Failed to kill process 4242"));
    }

    #[test]
    fn test_check_in_sees_accumulated_output() {
        let seen = RefCell::new(Vec::new());
        let mut proc = FakeProcess::new("frame 1001\n", "warn\n", 50);
        fast()
            .sink(MemorySink::new())
            .check_error(|_| {})
            .check_in(|out, err| {
                seen.borrow_mut().push((out.to_string(), err.to_string()));
                true
            })
            .run(&mut proc);

        let seen = seen.borrow();
        assert!(!seen.is_empty());
        let (out, err) = seen.last().unwrap();
        assert_eq!(out, "frame 1001\n");
        assert_eq!(err, "warn\n");
    }

    #[test]
    fn test_timeout_kills_and_reports() {
        let mut sink = MemorySink::new();
        let mut proc = FakeProcess::new("", "", u32::MAX);
        let outcome = fast()
            .sink(&mut sink)
            .timeout(Duration::from_millis(30))
            .run(&mut proc);

        match outcome {
            MonitorOutcome::TimedOut { elapsed } => {
                assert!(elapsed > Duration::from_millis(30));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(proc.kills, 1);
        assert!(sink.joined().contains("timed out"));
    }

    #[test]
    fn test_check_in_runs_before_timeout() {
        let mut proc = FakeProcess::new("", "", u32::MAX);
        let outcome = fast()
            .sink(MemorySink::new())
            .timeout(Duration::from_millis(1))
            .check_in(|_, _| false)
            .run(&mut proc);
        assert_eq!(outcome, MonitorOutcome::CheckInFailed);
    }

    #[test]
    fn test_missing_streams_complete_empty() {
        let mut proc = FakeProcess::new("", "", 1);
        proc.stdout = None;
        proc.stderr = None;
        proc.exit_code = Some(3);
        let outcome = fast().sink(MemorySink::new()).run(&mut proc);
        assert_eq!(
            outcome,
            MonitorOutcome::Completed {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: Some(3),
            }
        );
        assert!(outcome.is_completed());
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_huge_timeout_minutes_saturate() {
        let m = Monitor::new().timeout_minutes(u64::MAX);
        assert_eq!(m.timeout, Some(Duration::from_secs(u64::MAX)));
        let m = Monitor::new().timeout_minutes(90);
        assert_eq!(m.timeout, Some(Duration::from_secs(5_400)));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(MonitorOutcome::CheckInFailed).unwrap();
        assert_eq!(json["outcome"], "check_in_failed");
    }

    /// Counts logged characters instead of keeping them.
    struct CountingSink<'c> {
        chars: &'c Cell<usize>,
    }

    impl LogSink for CountingSink<'_> {
        fn log(&mut self, text: &str) {
            self.chars.set(self.chars.get() + text.chars().count());
        }
    }

    #[cfg(unix)]
    mod real_process {
        use super::*;
        use crate::launcher::{spawn, LaunchOptions};

        fn sh(script: &str) -> LaunchOptions {
            LaunchOptions::new(["sh", "-c", script])
        }

        #[test]
        fn test_fixed_string_round_trips() {
            let mut proc = spawn(&sh("printf 'comp v012 written\\n'")).unwrap();
            let outcome = fast().sink(MemorySink::new()).run(&mut proc);
            match outcome {
                MonitorOutcome::Completed {
                    stdout, exit_code, ..
                } => {
                    assert_eq!(stdout, "comp v012 written\n");
                    assert_eq!(exit_code, Some(0));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        #[test]
        fn test_silent_process_completes_promptly() {
            let mut proc = spawn(&sh("exit 0")).unwrap();
            let start = Instant::now();
            let outcome = Monitor::new()
                .sink(MemorySink::new())
                .poll_interval(Duration::from_millis(10))
                .run(&mut proc);
            assert_eq!(
                outcome,
                MonitorOutcome::Completed {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: Some(0),
                }
            );
            // Well inside the default 10 s check-in interval.
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn test_nonzero_exit_is_data() {
            let mut proc = spawn(&sh("echo bad >&2; exit 7")).unwrap();
            let errors = RefCell::new(String::new());
            let outcome = fast()
                .sink(MemorySink::new())
                .check_error(|e| errors.borrow_mut().push_str(e))
                .run(&mut proc);
            match outcome {
                MonitorOutcome::Completed {
                    stderr, exit_code, ..
                } => {
                    assert_eq!(stderr, "bad\n");
                    assert_eq!(exit_code, Some(7));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
            assert_eq!(*errors.borrow(), "bad\n");
        }

        #[test]
        fn test_check_in_rejection_stops_real_process() {
            let mut proc = spawn(&sh("while true; do echo tick; sleep 0.05; done")).unwrap();
            let outcome = Monitor::new()
                .sink(MemorySink::new())
                .poll_interval(Duration::from_millis(10))
                .check_in_interval(Duration::from_millis(100))
                .check_in(|_, _| false)
                .run(&mut proc);
            assert_eq!(outcome, MonitorOutcome::CheckInFailed);
            assert!(!proc.is_running());
        }

        #[test]
        fn test_timeout_stops_real_process() {
            let mut proc = spawn(&sh("sleep 30")).unwrap();
            let start = Instant::now();
            let outcome = Monitor::new()
                .sink(MemorySink::new())
                .poll_interval(Duration::from_millis(10))
                .check_in_interval(Duration::from_millis(50))
                .timeout(Duration::from_millis(200))
                .run(&mut proc);
            assert!(matches!(outcome, MonitorOutcome::TimedOut { .. }));
            assert!(start.elapsed() >= Duration::from_millis(200));
            assert!(start.elapsed() < Duration::from_secs(10));
            assert!(!proc.is_running());
        }

        #[test]
        fn test_retention_is_bounded() {
            // ~40 KB written in bursts spanning several check-ins.
            let script = "i=0; while [ $i -lt 40 ]; do \
                          head -c 1000 /dev/zero | tr '\\0' 'x'; echo; \
                          sleep 0.01; i=$((i+1)); done";
            let mut proc = spawn(&sh(script)).unwrap();
            let mut max_seen = 0usize;
            // Characters logged since the most recent check-in.
            let since_check_in = Cell::new(0usize);
            let outcome = Monitor::new()
                .sink(CountingSink {
                    chars: &since_check_in,
                })
                .poll_interval(Duration::from_millis(5))
                .check_in_interval(Duration::from_millis(20))
                .output_buffer_length(2_000)
                .check_in(|out, _| {
                    max_seen = max_seen.max(out.chars().count());
                    since_check_in.set(0);
                    true
                })
                .run(&mut proc);
            match outcome {
                MonitorOutcome::Completed { stdout, .. } => {
                    // Retained tail plus whatever arrived after the last check-in.
                    assert!(stdout.chars().count() <= 2_000 + since_check_in.get());
                    assert!(stdout.chars().count() < 40 * 1001);
                    assert!(stdout.ends_with("x\n"));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
            assert!(max_seen <= 2_000);
        }

        fn flood() -> LaunchOptions {
            sh("yes 'frame 1001 rendered in 0.04s, writing /shots/sh010/comp/v012'")
        }

        #[test]
        fn test_check_ins_keep_pace_with_flooding_output() {
            let mut proc = spawn(&flood()).unwrap();
            let logged = Cell::new(0usize);
            let start = Instant::now();
            let mut stamps = Vec::new();
            let mut max_seen = 0usize;
            let outcome = Monitor::new()
                .sink(CountingSink { chars: &logged })
                .poll_interval(Duration::from_millis(5))
                .check_in_interval(Duration::from_millis(50))
                .output_buffer_length(1_000)
                .check_in(|out, _| {
                    stamps.push(start.elapsed());
                    max_seen = max_seen.max(out.chars().count());
                    stamps.len() < 10
                })
                .run(&mut proc);

            assert_eq!(outcome, MonitorOutcome::CheckInFailed);
            assert!(!proc.is_running());
            assert_eq!(stamps.len(), 10);
            assert!(logged.get() > 0);
            assert!(max_seen <= 1_000);
            let mut previous = Duration::ZERO;
            for stamp in &stamps {
                let gap = *stamp - previous;
                assert!(gap < Duration::from_millis(500), "check-in gap {gap:?}");
                previous = *stamp;
            }
        }

        #[test]
        fn test_timeout_fires_under_flooding_output() {
            let mut proc = spawn(&flood()).unwrap();
            let logged = Cell::new(0usize);
            let start = Instant::now();
            let outcome = Monitor::new()
                .sink(CountingSink { chars: &logged })
                .poll_interval(Duration::from_millis(5))
                .check_in_interval(Duration::from_millis(50))
                .output_buffer_length(1_000)
                .timeout(Duration::from_millis(300))
                .run(&mut proc);

            assert!(matches!(outcome, MonitorOutcome::TimedOut { .. }));
            assert!(start.elapsed() < Duration::from_millis(1_000));
            assert!(!proc.is_running());
        }
    }
}
