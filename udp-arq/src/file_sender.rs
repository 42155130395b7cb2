//! Sending role: handshake, stop-and-wait data transfer, EOT.
//!
//! [`FileSender`] owns one [`Session`] and drives it through the phases in
//! [`crate::state::Phase`]:
//!
//! 1. **Greeting** — send `DATA seq=0 "Greeting"`, wait for `ACK "OK"`.
//!    Anything else aborts the transfer.
//! 2. **Metadata** — open the source file, send its name (`seq=1`) and its
//!    size (`seq=2`).
//! 3. **Transfer** — one data frame at a time starting at `seq=3`.  Each
//!    frame is retransmitted unchanged every time the retransmission timer
//!    fires until an ACK with a matching `ack_num` is accepted.  The loop
//!    ends after the first frame shorter than [`MAX_PAYLOAD`], so a file
//!    whose size is a multiple of the payload size ends with an empty frame.
//! 4. **Closed** — send `EOT` carrying the last data sequence number.  EOT
//!    is not acknowledged.
//!
//! The wait for an ACK is a biased `tokio::select!` over the socket and the
//! [`RetransmitTimer`].  Both events are handled on this task only, and an
//! ACK that is already queued when the timer fires wins.

use std::net::SocketAddr;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::config::{ConfigError, SenderConfig};
use crate::events::{Event, EventRecorder};
use crate::packet::{Frame, FrameKind, CONFIRMATION, FILENAME_SEQ, FIRST_DATA_SEQ, MAX_PAYLOAD};
use crate::progress::{NoProgress, ProgressReporter};
use crate::sender::Sender;
use crate::session::{payload_text, Session, TransferError};
use crate::simulator::{LossModel, LossSimulator};
use crate::socket::{Socket, SocketError};
use crate::state::Phase;
use crate::timer::RetransmitTimer;

/// Outcome of a completed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSummary {
    /// Sequence number carried by the EOT frame.
    pub final_seq: i32,
    /// Data frames acknowledged.
    pub rounds: u32,
    /// Payload bytes acknowledged.
    pub bytes_sent: u64,
    /// Size announced during the handshake.
    pub file_size: u64,
    /// Timer-driven resends across the whole transfer.
    pub retransmissions: u32,
}

/// The sending engine for one transfer.
pub struct FileSender {
    session: Session,
    config: SenderConfig,
    state: Sender,
    phase: Phase,
    loss: Box<dyn LossModel + Send + Sync>,
    progress: Box<dyn ProgressReporter + Send + Sync>,
}

impl FileSender {
    /// Build a sender over an already-bound socket.
    ///
    /// ACK loss is simulated with `config.ack_loss`; no events are recorded
    /// and no progress is shown until the corresponding `with_*` builder is
    /// used.
    pub fn new(socket: Socket, config: SenderConfig) -> Result<Self, TransferError> {
        config.validate()?;
        let loss = LossSimulator::new(config.ack_loss).map_err(ConfigError::from)?;
        log::debug!("[sender] ACK loss probability {}", loss.probability());
        Ok(Self {
            session: Session::new(socket),
            config,
            state: Sender::new(FIRST_DATA_SEQ),
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

    /// Replace the ACK-loss model (e.g. with a seeded or scripted one).
    pub fn with_loss_model(mut self, loss: impl LossModel + Send + Sync + 'static) -> Self {
        self.loss = Box::new(loss);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.session.local_addr()
    }

    /// Run the whole transfer.
    ///
    /// Returns once EOT has been sent.  Any error is fatal; the socket and
    /// file are released when `self` is dropped.
    pub async fn run(mut self) -> Result<SendSummary, TransferError> {
        self.enter(Phase::Greeting);
        self.greet().await?;

        self.enter(Phase::Metadata);
        let (mut file, file_size) = self.open_source().await?;
        self.send_metadata(file_size).await?;

        self.enter(Phase::Transfer);
        self.transfer(&mut file, file_size).await?;

        self.enter(Phase::Closed);
        let eot = Frame::eot(self.state.last_acked_seq());
        self.session.send(&eot, self.config.peer, Event::SendEot).await?;
        log::debug!("[sender] → {eot}");
        self.progress.finish();

        Ok(SendSummary {
            final_seq: eot.seq_num,
            rounds: self.state.rounds,
            bytes_sent: self.state.bytes_acked,
            file_size,
            retransmissions: self.state.retransmissions,
        })
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    async fn greet(&mut self) -> Result<(), TransferError> {
        let greeting = Frame::greeting();
        self.session
            .send(&greeting, self.config.peer, Event::SendGreeting)
            .await?;
        log::debug!("[sender] → {greeting}");

        let reply = match self.config.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, self.recv_from_peer())
                .await
                .map_err(|_| TransferError::HandshakeTimeout(limit))??,
            None => self.recv_from_peer().await?,
        };

        if reply.kind != FrameKind::Ack || reply.payload() != CONFIRMATION {
            return Err(TransferError::UnexpectedConfirmation {
                kind: reply.kind,
                payload: payload_text(&reply),
            });
        }
        self.session.record(Event::RecvOk, &reply);
        log::debug!("[sender] ← {reply}");
        Ok(())
    }

    /// Next frame from the configured peer; frames from elsewhere are skipped.
    async fn recv_from_peer(&self) -> Result<Frame, SocketError> {
        loop {
            let (frame, addr) = self.session.recv().await?;
            if addr == self.config.peer {
                return Ok(frame);
            }
            log::debug!("[sender] ignoring {frame} from stranger {addr}");
        }
    }

    async fn open_source(&self) -> Result<(File, u64), TransferError> {
        let path = &self.config.source;
        let open_err = |source| TransferError::OpenSource {
            path: path.clone(),
            source,
        };
        let file = File::open(path).await.map_err(open_err)?;
        let size = file.metadata().await.map_err(open_err)?.len();
        log::info!("[sender] {} is {size} bytes", path.display());
        Ok((file, size))
    }

    async fn send_metadata(&mut self, file_size: u64) -> Result<(), TransferError> {
        let name = self
            .config
            .source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::BadFilename(self.config.source.display().to_string()))?;

        let name_frame = Frame::new(FrameKind::Data, FILENAME_SEQ, 0, name.as_bytes().to_vec())?;
        self.session
            .send(&name_frame, self.config.peer, Event::SendFilename)
            .await?;
        log::debug!("[sender] → {name_frame} ({name})");

        let size_frame = Frame::file_size(file_size);
        self.session
            .send(&size_frame, self.config.peer, Event::SendFileSize)
            .await?;
        log::debug!("[sender] → {size_frame} ({file_size} bytes)");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Data transfer
    // -----------------------------------------------------------------------

    async fn transfer(&mut self, file: &mut File, file_size: u64) -> Result<(), TransferError> {
        loop {
            let chunk = read_chunk(file).await?;
            let last = chunk.len() < MAX_PAYLOAD;

            let frame = self.state.build_data_frame(chunk)?;
            self.session
                .send(&frame, self.config.peer, Event::SendData)
                .await?;
            log::debug!("[sender] → {frame}");
            self.state.record_sent(frame);

            self.await_ack().await?;
            self.progress.report(self.state.bytes_acked, file_size);

            if last {
                return Ok(());
            }
        }
    }

    /// Block until the in-flight frame is acknowledged, retransmitting on
    /// every timer expiry.
    async fn await_ack(&mut self) -> Result<(), TransferError> {
        let mut timer = RetransmitTimer::new(self.config.timeout);
        timer.arm();

        loop {
            tokio::select! {
                biased;

                // A datagram arrived.  Polled first so an ACK already queued
                // when the deadline passes still counts.
                received = self.session.recv() => {
                    let (frame, addr) = match received {
                        Ok(v) => v,
                        Err(e) => {
                            log::warn!("[sender] receive error while awaiting ACK: {e}");
                            continue;
                        }
                    };
                    if addr != self.config.peer
                        || frame.kind != FrameKind::Ack
                        || !self.state.is_awaited(frame.ack_num)
                    {
                        log::trace!("[sender] ignoring {frame} from {addr}");
                        continue;
                    }

                    if self.loss.should_drop() {
                        self.session.record(Event::AckDropped, &frame);
                        self.session
                            .note(&format!("ACK {} dropped intentionally", frame.ack_num));
                        log::debug!("[sender] ← {frame} dropped (simulated loss)");
                        continue;
                    }

                    if self.state.on_ack(frame.ack_num) {
                        self.session.record(Event::RecvAck, &frame);
                        log::debug!("[sender] ← {frame}");
                        timer.disarm();
                        return Ok(());
                    }
                }

                // Retransmission deadline passed.
                () = timer.expired() => {
                    let Some(frame) = self.state.in_flight().cloned() else {
                        return Ok(());
                    };
                    let resends = self.state.resends_in_flight();
                    if self.config.max_retries.is_some_and(|max| resends >= max) {
                        return Err(TransferError::RetriesExhausted {
                            seq: frame.seq_num,
                            attempts: resends,
                        });
                    }

                    self.session.record(Event::Timeout, &frame);
                    self.session
                        .send(&frame, self.config.peer, Event::Retransmit)
                        .await?;
                    timer.arm();
                    self.state.on_retransmit();
                    log::debug!(
                        "[sender] no ACK within {:?}, retransmitted seq={} (resend {})",
                        timer.timeout(),
                        frame.seq_num,
                        self.state.resends_in_flight()
                    );
                }
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::info!("[sender] {} → {}", self.phase, phase);
        self.phase = phase;
    }
}

impl std::fmt::Debug for FileSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSender")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Read up to [`MAX_PAYLOAD`] bytes, short only at end of file.
async fn read_chunk(file: &mut File) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_PAYLOAD];
    let mut filled = 0;
    while filled < MAX_PAYLOAD {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn read_chunk_splits_at_payload_size() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![7u8; 2500]).unwrap();
        let mut file = File::open(tmp.path()).await.unwrap();

        let sizes = [
            read_chunk(&mut file).await.unwrap().len(),
            read_chunk(&mut file).await.unwrap().len(),
            read_chunk(&mut file).await.unwrap().len(),
            read_chunk(&mut file).await.unwrap().len(),
        ];
        assert_eq!(sizes, [1000, 1000, 500, 0]);
    }

    #[tokio::test]
    async fn new_rejects_invalid_config() {
        let socket = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let config = SenderConfig {
            peer: "127.0.0.1:9".parse().unwrap(),
            source: "x".into(),
            ack_loss: 2.0,
            ..SenderConfig::default()
        };
        assert!(matches!(
            FileSender::new(socket, config),
            Err(TransferError::Config(_))
        ));
    }

    #[tokio::test]
    async fn missing_source_is_fatal() {
        let receiver = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let socket = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let sender_addr = socket.local_addr;
        let config = SenderConfig {
            peer: receiver.local_addr,
            source: "/definitely/not/here.bin".into(),
            ..SenderConfig::default()
        };
        let sender = FileSender::new(socket, config).unwrap();

        let fake_receiver = async move {
            let (greeting, _) = receiver.recv_from().await.unwrap();
            assert_eq!(greeting, Frame::greeting());
            receiver
                .send_to(&Frame::confirmation(), sender_addr)
                .await
                .unwrap();
        };

        let (result, ()) = tokio::join!(sender.run(), fake_receiver);
        assert!(matches!(result, Err(TransferError::OpenSource { .. })));
    }
}
