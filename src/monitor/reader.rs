//! Background stream readers.
//!
//! Each reader owns one pipe of the child and pushes complete lines onto its
//! own bounded channel. A full channel blocks the reader, which in turn
//! blocks the child on its pipe. Readers are never joined: they finish when
//! the pipe closes, which drops the sender and disconnects the channel.

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Lines a reader may queue ahead of the monitor.
const QUEUE_CAPACITY: usize = 1024;

/// Bytes taken from a queue in one drain pass.
pub const DRAIN_BUDGET_BYTES: usize = 64 * 1024;

/// Which pipe a reader drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn label(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Receiving end of a reader thread.
pub struct LineQueue {
    kind: StreamKind,
    receiver: Option<Receiver<String>>,
    backlogged: bool,
}

impl LineQueue {
    /// A queue with no reader behind it, already closed.
    pub fn closed(kind: StreamKind) -> Self {
        Self {
            kind,
            receiver: None,
            backlogged: false,
        }
    }

    /// Take queued lines without blocking, stopping once
    /// [`DRAIN_BUDGET_BYTES`] have been collected.
    pub fn drain(&mut self) -> String {
        let mut out = String::new();
        let mut hung_up = false;
        self.backlogged = false;
        if let Some(receiver) = &self.receiver {
            loop {
                if out.len() >= DRAIN_BUDGET_BYTES {
                    self.backlogged = true;
                    break;
                }
                match receiver.try_recv() {
                    Ok(line) => out.push_str(&line),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        hung_up = true;
                        break;
                    }
                }
            }
        }
        if hung_up {
            tracing::trace!(stream = self.kind.label(), "reader finished");
            self.receiver = None;
        }
        out
    }

    /// Whether the last drain stopped at its budget with lines still queued.
    pub fn is_backlogged(&self) -> bool {
        self.backlogged
    }

    /// True once the reader has hung up and everything it sent was drained.
    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Start a thread that drains `stream` line by line into a fresh queue.
///
/// Newlines are kept so the accumulated text matches what the child wrote.
/// Invalid UTF-8 is replaced rather than ending the read.
pub fn spawn_reader<R>(stream: R, kind: StreamKind) -> LineQueue
where
    R: Read + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(QUEUE_CAPACITY);
    let spawned = thread::Builder::new()
        .name(format!("cos-{}-reader", kind.label()))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&raw).into_owned();
                        // Receiver gone means the monitor already returned.
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(stream = kind.label(), error = %e, "stream read failed");
                        break;
                    }
                }
            }
        });

    match spawned {
        Ok(_) => LineQueue {
            kind,
            receiver: Some(receiver),
            backlogged: false,
        },
        Err(e) => {
            tracing::warn!(stream = kind.label(), error = %e, "failed to start reader thread");
            LineQueue::closed(kind)
        }
    }
}
