//! Per-transfer session context.
//!
//! A [`Session`] bundles what both engines need for every protocol step:
//! the datagram socket and the event recorder.  It is created when an engine
//! is built and dropped when the engine's `run` returns, so nothing about a
//! transfer lives in process-wide state.
//!
//! [`TransferError`] is the single error type both engines surface.  Any
//! variant returned from `run` aborts the transfer; transient conditions are
//! handled (logged) inside the engines and never reach it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;
use crate::events::{Event, EventRecorder, NoopRecorder};
use crate::packet::{Frame, FrameError, FrameKind};
use crate::socket::{Socket, SocketError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal transfer failures.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error("cannot build frame: {0}")]
    Frame(#[from] FrameError),

    #[error("cannot open source file {}: {source}", .path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create output file {}: {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file I/O error: {0}")]
    File(#[from] std::io::Error),

    /// The greeting was answered with something other than `ACK "OK"`.
    #[error("unexpected handshake response: {kind} with payload {payload:?}")]
    UnexpectedConfirmation { kind: FrameKind, payload: String },

    #[error("invalid greeting: {kind} with payload {payload:?}")]
    InvalidGreeting { kind: FrameKind, payload: String },

    #[error("malformed file-size frame: {kind} with length {length}")]
    InvalidFileSize { kind: FrameKind, length: i32 },

    #[error("unusable filename {0:?}")]
    BadFilename(String),

    #[error("no handshake response within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("frame {seq} unacknowledged after {attempts} retransmissions")]
    RetriesExhausted { seq: i32, attempts: u32 },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Socket plus event recorder for one transfer.
pub struct Session {
    socket: Socket,
    recorder: Box<dyn EventRecorder + Send + Sync>,
}

impl Session {
    /// A session that records nothing.
    pub fn new(socket: Socket) -> Self {
        Self {
            socket,
            recorder: Box::new(NoopRecorder),
        }
    }

    pub fn set_recorder(&mut self, recorder: Box<dyn EventRecorder + Send + Sync>) {
        self.recorder = recorder;
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Send `frame` to `dest`, then record `event`.
    ///
    /// A send failure is returned to the caller, which treats it as fatal.
    pub async fn send(
        &mut self,
        frame: &Frame,
        dest: SocketAddr,
        event: Event,
    ) -> Result<(), SocketError> {
        self.socket.send_to(frame, dest).await?;
        self.recorder.record(event, frame);
        Ok(())
    }

    /// Receive the next frame.  Nothing is recorded; the caller decides
    /// whether the frame is interesting.
    pub async fn recv(&self) -> Result<(Frame, SocketAddr), SocketError> {
        self.socket.recv_from().await
    }

    pub fn record(&mut self, event: Event, frame: &Frame) {
        self.recorder.record(event, frame);
    }

    pub fn note(&mut self, message: &str) {
        self.recorder.note(message);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("local_addr", &self.socket.local_addr)
            .finish_non_exhaustive()
    }
}

/// Printable form of a payload for diagnostics.
pub(crate) fn payload_text(frame: &Frame) -> String {
    String::from_utf8_lossy(frame.payload()).into_owned()
}
