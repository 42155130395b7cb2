//! Append-only protocol event recording.
//!
//! The engines call [`EventRecorder::record`] after every send or receive of
//! interest.  Recording is best-effort: a recorder never returns an error and
//! never blocks protocol progress on anything slower than a line write.
//!
//! [`EventLog`] writes one human-readable line per event:
//!
//! ```text
//! [1718000000] SEND DATA - type: 1, seqNum: 3, ackNum: 0, len: 1000
//! ACK 3 dropped intentionally
//! ```

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::packet::Frame;

/// Named protocol events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    SendGreeting,
    RecvGreeting,
    SendOk,
    RecvOk,
    SendFilename,
    RecvFilename,
    SendFileSize,
    RecvFileSize,
    SendData,
    RecvData,
    SendAck,
    RecvAck,
    Timeout,
    Retransmit,
    /// A matching ACK the sender chose to ignore.
    AckDropped,
    /// A DATA frame whose ACK the receiver chose to suppress.
    AckSuppressed,
    SendEot,
    RecvEot,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SendGreeting => "SEND GREETING",
            Self::RecvGreeting => "RECV GREETING",
            Self::SendOk => "SEND OK",
            Self::RecvOk => "RECV OK",
            Self::SendFilename => "SEND FILENAME",
            Self::RecvFilename => "RECV FILENAME",
            Self::SendFileSize => "SEND FILE SIZE",
            Self::RecvFileSize => "RECV FILE SIZE",
            Self::SendData => "SEND DATA",
            Self::RecvData => "RECV DATA",
            Self::SendAck => "SEND ACK",
            Self::RecvAck => "RECV ACK",
            Self::Timeout => "TIMEOUT",
            Self::Retransmit => "RETRANSMIT",
            Self::AckDropped => "DROP ACK",
            Self::AckSuppressed => "SUPPRESS ACK",
            Self::SendEot => "SEND EOT",
            Self::RecvEot => "RECV EOT",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for protocol events.
pub trait EventRecorder {
    /// Record `event` together with a snapshot of `frame`.
    fn record(&mut self, event: Event, frame: &Frame);

    /// Record a free-form note that has no frame attached.
    fn note(&mut self, _message: &str) {}
}

impl<R: EventRecorder + ?Sized> EventRecorder for Box<R> {
    fn record(&mut self, event: Event, frame: &Frame) {
        (**self).record(event, frame);
    }

    fn note(&mut self, message: &str) {
        (**self).note(message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl EventRecorder for NoopRecorder {
    fn record(&mut self, _event: Event, _frame: &Frame) {}
}

/// Line-buffered, append-only event log file.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    /// `None` once a write has failed; later events are dropped.
    writer: Option<LineWriter<File>>,
}

impl EventLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Some(LineWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{line}") {
            log::warn!(
                "event log {} unwritable, disabling it: {e}",
                self.path.display()
            );
            self.writer = None;
        }
    }
}

impl EventRecorder for EventLog {
    fn record(&mut self, event: Event, frame: &Frame) {
        let line = format_event(unix_seconds(), event, frame);
        self.write_line(&line);
    }

    fn note(&mut self, message: &str) {
        self.write_line(message);
    }
}

/// Render one event line.
pub fn format_event(timestamp: u64, event: Event, frame: &Frame) -> String {
    format!(
        "[{timestamp}] {event} - type: {}, seqNum: {}, ackNum: {}, len: {}",
        frame.kind.code(),
        frame.seq_num,
        frame.ack_num,
        frame.length()
    )
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_matches_log_layout() {
        let frame = Frame::data(3, vec![0; 1000]).unwrap();
        assert_eq!(
            format_event(1_718_000_000, Event::SendData, &frame),
            "[1718000000] SEND DATA - type: 1, seqNum: 3, ackNum: 0, len: 1000"
        );
        assert_eq!(
            format_event(7, Event::RecvAck, &Frame::ack(4)),
            "[7] RECV ACK - type: 2, seqNum: 0, ackNum: 4, len: 0"
        );
    }

    #[test]
    fn event_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events");

        {
            let mut log = EventLog::open(&path).unwrap();
            log.record(Event::SendGreeting, &Frame::greeting());
            log.note("ACK 3 dropped intentionally");
        }
        {
            let mut log = EventLog::open(&path).unwrap();
            log.record(Event::SendEot, &Frame::eot(5));
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("SEND GREETING - type: 1, seqNum: 0, ackNum: 0, len: 8"));
        assert_eq!(lines[1], "ACK 3 dropped intentionally");
        assert!(lines[2].ends_with("SEND EOT - type: 3, seqNum: 5, ackNum: 0, len: 0"));
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EventLog::open(dir.path().join("no/such/dir/log")).is_err());
    }
}
