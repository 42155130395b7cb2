//! Receiving role: accept the handshake, write in-order data, stop at EOT.
//!
//! [`FileReceiver`] owns one [`Session`] and drives it through the phases in
//! [`crate::state::Phase`]:
//!
//! 1. **Greeting** — the first frame must be `DATA "Greeting"`; its source
//!    address becomes the peer for the rest of the transfer.  Reply with
//!    `ACK "OK"`.
//! 2. **Metadata** — the next frame names the file, the one after that
//!    announces its size.  The output file is created under the configured
//!    directory with the configured prefix.
//! 3. **Transfer** — every DATA frame is logged; only the one carrying the
//!    expected sequence number is written.  Unless the loss model suppresses
//!    it, an ACK echoing the frame's own `seq_num` is sent back, whether or
//!    not the frame was written.  Receive errors are logged and skipped.
//! 4. **Closed** — on EOT the output is flushed and the summary returned.
//!    EOT is not answered.
//!
//! Handshake failures are fatal.  The receiver has no timers; it only ever
//! waits for the next datagram.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::{ConfigError, ReceiverConfig};
use crate::events::{Event, EventRecorder};
use crate::packet::{Frame, FrameKind, FIRST_DATA_SEQ, GREETING};
use crate::progress::{NoProgress, ProgressReporter};
use crate::receiver::Receiver;
use crate::session::{payload_text, Session, TransferError};
use crate::simulator::{LossModel, LossSimulator};
use crate::socket::{Socket, SocketError};
use crate::state::Phase;

/// Outcome of a completed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Where the file was written.
    pub path: PathBuf,
    /// Payload bytes accepted and written.
    pub bytes_received: u64,
    /// Size announced by the sender.
    pub expected_size: u64,
    /// Sequence number carried by the EOT frame.
    pub final_seq: i32,
}

/// The receiving engine for one transfer.
pub struct FileReceiver {
    session: Session,
    config: ReceiverConfig,
    state: Receiver,
    phase: Phase,
    loss: Box<dyn LossModel + Send + Sync>,
    progress: Box<dyn ProgressReporter + Send + Sync>,
}

impl FileReceiver {
    /// Build a receiver over an already-bound socket.
    pub fn new(socket: Socket, config: ReceiverConfig) -> Result<Self, TransferError> {
        config.validate()?;
        let loss = LossSimulator::new(config.data_loss).map_err(ConfigError::from)?;
        log::debug!("[receiver] ACK suppression probability {}", loss.probability());
        Ok(Self {
            session: Session::new(socket),
            config,
            state: Receiver::new(FIRST_DATA_SEQ),
            phase: Phase::Idle,
            loss: Box::new(loss),
            progress: Box::new(NoProgress),
        })
    }

    pub fn with_recorder(mut self, recorder: impl EventRecorder + Send + Sync + 'static) -> Self {
        self.session.set_recorder(Box::new(recorder));
        self
    }

    pub fn with_progress(
        mut self,
        progress: impl ProgressReporter + Send + Sync + 'static,
    ) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Replace the ACK-suppression model.
    pub fn with_loss_model(mut self, loss: impl LossModel + Send + Sync + 'static) -> Self {
        self.loss = Box::new(loss);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.session.local_addr()
    }

    /// Run the whole transfer, returning once EOT has been observed.
    pub async fn run(mut self) -> Result<ReceiveSummary, TransferError> {
        self.enter(Phase::Greeting);
        let peer = self.accept_greeting().await?;

        self.enter(Phase::Metadata);
        let name = self.recv_filename(peer).await?;
        let expected_size = self.recv_file_size(peer).await?;
        let path = output_path(&self.config, &name)?;
        let mut out = File::create(&path)
            .await
            .map_err(|source| TransferError::CreateOutput {
                path: path.clone(),
                source,
            })?;
        log::info!(
            "[receiver] writing {expected_size} bytes from {peer} to {}",
            path.display()
        );

        self.enter(Phase::Transfer);
        let final_seq = self.receive_data(peer, &mut out, expected_size).await?;
        out.flush().await?;

        self.enter(Phase::Closed);
        self.progress.finish();
        if self.state.bytes_received != expected_size {
            log::warn!(
                "[receiver] received {} bytes but {expected_size} were announced",
                self.state.bytes_received
            );
        }

        Ok(ReceiveSummary {
            path,
            bytes_received: self.state.bytes_received,
            expected_size,
            final_seq,
        })
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    async fn accept_greeting(&mut self) -> Result<SocketAddr, TransferError> {
        let (greeting, peer) = self.session.recv().await?;
        if greeting.kind != FrameKind::Data || greeting.payload() != GREETING {
            return Err(TransferError::InvalidGreeting {
                kind: greeting.kind,
                payload: payload_text(&greeting),
            });
        }
        self.session.record(Event::RecvGreeting, &greeting);
        log::debug!("[receiver] ← {greeting} from {peer}");

        let ok = Frame::confirmation();
        self.session.send(&ok, peer, Event::SendOk).await?;
        log::debug!("[receiver] → {ok}");
        Ok(peer)
    }

    async fn recv_filename(&mut self, peer: SocketAddr) -> Result<String, TransferError> {
        let frame = self.recv_from(peer).await?;
        self.session.record(Event::RecvFilename, &frame);
        log::debug!("[receiver] ← {frame}");

        if frame.kind != FrameKind::Data {
            return Err(TransferError::BadFilename(payload_text(&frame)));
        }
        String::from_utf8(frame.into_payload()).map_err(|e| {
            TransferError::BadFilename(String::from_utf8_lossy(e.as_bytes()).into_owned())
        })
    }

    async fn recv_file_size(&mut self, peer: SocketAddr) -> Result<u64, TransferError> {
        let frame = self.recv_from(peer).await?;
        let size = frame.as_file_size().ok_or(TransferError::InvalidFileSize {
            kind: frame.kind,
            length: frame.length(),
        })?;
        self.session.record(Event::RecvFileSize, &frame);
        log::debug!("[receiver] ← {frame} ({size} bytes)");
        Ok(size)
    }

    /// Next frame from `peer`; frames from elsewhere are skipped.
    async fn recv_from(&self, peer: SocketAddr) -> Result<Frame, SocketError> {
        loop {
            let (frame, addr) = self.session.recv().await?;
            if addr == peer {
                return Ok(frame);
            }
            log::debug!("[receiver] ignoring {frame} from stranger {addr}");
        }
    }

    // -----------------------------------------------------------------------
    // Data transfer
    // -----------------------------------------------------------------------

    /// Loop until EOT, returning its sequence number.
    async fn receive_data(
        &mut self,
        peer: SocketAddr,
        out: &mut File,
        expected_size: u64,
    ) -> Result<i32, TransferError> {
        loop {
            let (frame, addr) = match self.session.recv().await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("[receiver] receive error: {e}");
                    continue;
                }
            };
            if addr != peer {
                log::debug!("[receiver] ignoring {frame} from stranger {addr}");
                continue;
            }

            match frame.kind {
                FrameKind::Eot => {
                    self.session.record(Event::RecvEot, &frame);
                    log::debug!("[receiver] ← {frame}");
                    return Ok(frame.seq_num);
                }
                FrameKind::Data => self.on_data(frame, peer, out, expected_size).await?,
                FrameKind::Ack => log::trace!("[receiver] ignoring {frame}"),
            }
        }
    }

    async fn on_data(
        &mut self,
        frame: Frame,
        peer: SocketAddr,
        out: &mut File,
        expected_size: u64,
    ) -> Result<(), TransferError> {
        self.session.record(Event::RecvData, &frame);

        if self.state.on_data(frame.seq_num, frame.payload().len()) {
            out.write_all(frame.payload()).await?;
            self.progress.report(self.state.bytes_received, expected_size);
            log::debug!("[receiver] ← {frame} accepted");
        } else {
            log::debug!(
                "[receiver] ← {frame} discarded (expecting seq={})",
                self.state.expected_seq
            );
        }

        if self.loss.should_drop() {
            self.session.record(Event::AckSuppressed, &frame);
            self.session
                .note(&format!("Packet {} dropped intentionally", frame.seq_num));
            log::debug!("[receiver] ACK for seq={} suppressed (simulated loss)", frame.seq_num);
            return Ok(());
        }

        let ack = Frame::ack(frame.seq_num);
        match self.session.send(&ack, peer, Event::SendAck).await {
            Ok(()) => log::debug!("[receiver] → {ack}"),
            Err(e) => log::warn!("[receiver] failed to send ACK seq={}: {e}", frame.seq_num),
        }
        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        log::info!("[receiver] {} → {}", self.phase, phase);
        self.phase = phase;
    }
}

impl std::fmt::Debug for FileReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReceiver")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Where to store an announced file: its final path component, prefixed,
/// inside the output directory.
fn output_path(config: &ReceiverConfig, announced: &str) -> Result<PathBuf, TransferError> {
    let name = Path::new(announced)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| TransferError::BadFilename(announced.to_string()))?;
    Ok(config
        .output_dir
        .join(format!("{}{name}", config.output_prefix)))
}
