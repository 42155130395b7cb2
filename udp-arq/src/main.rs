//! Entry point for `udp-arq`.
//!
//! Parses CLI arguments and dispatches into either **send** or **receive**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, socket binding, event log
//! and progress bar wiring).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use udp_arq::events::{EventLog, EventRecorder, NoopRecorder};
use udp_arq::progress::{NoProgress, ProgressBarReporter, ProgressReporter};
use udp_arq::simulator::validate_probability;
use udp_arq::socket::Socket;
use udp_arq::{FileReceiver, FileSender, ReceiverConfig, SenderConfig};

/// Stop-and-wait ARQ file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a listening receiver.
    Send {
        /// Local UDP port to bind (0 lets the OS choose).
        #[arg(short, long, default_value_t = 0)]
        port: u16,
        /// Receiver host name or IP address.
        #[arg(long)]
        peer_host: String,
        /// Receiver UDP port.
        #[arg(long)]
        peer_port: u16,
        /// Retransmission timeout in seconds.
        #[arg(short, long, default_value_t = 3)]
        timeout: u64,
        /// File to send.
        #[arg(short, long)]
        file: PathBuf,
        /// Probability of ignoring a matching ACK, in [0, 1].
        #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
        ack_loss: f64,
        /// Abort after this many retransmissions of one frame (default: never).
        #[arg(long)]
        max_retries: Option<u32>,
        /// Abort if the greeting is not confirmed within this many seconds.
        #[arg(long)]
        handshake_timeout: Option<u64>,
        /// Append-only event log.
        #[arg(long, default_value = "sender_udp_logs")]
        log_file: PathBuf,
        /// Do not draw a progress bar.
        #[arg(long)]
        no_progress: bool,
    },
    /// Wait for one file and store it.
    Receive {
        /// Local UDP port to listen on.
        #[arg(short, long)]
        port: u16,
        /// Probability of suppressing the ACK for a data frame, in [0, 1].
        #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
        data_loss: f64,
        /// Directory the received file is written into.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Append-only event log.
        #[arg(long, default_value = "receiver_udp_logs")]
        log_file: PathBuf,
        /// Do not draw a progress bar.
        #[arg(long)]
        no_progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            port,
            peer_host,
            peer_port,
            timeout,
            file,
            ack_loss,
            max_retries,
            handshake_timeout,
            log_file,
            no_progress,
        } => {
            let peer = resolve_peer(&peer_host, peer_port).await?;
            let config = SenderConfig {
                peer,
                source: file,
                timeout: Duration::from_secs(timeout),
                ack_loss,
                max_retries,
                handshake_timeout: handshake_timeout.map(Duration::from_secs),
            };
            let socket = bind(port).await?;
            log::info!("Sending {} to {peer} from {}", config.source.display(), socket.local_addr);

            let summary = FileSender::new(socket, config)?
                .with_recorder(open_event_log(&log_file))
                .with_progress(progress(no_progress, "sending"))
                .run()
                .await
                .context("transfer failed")?;

            println!();
            println!(
                "File transfer complete: {} bytes in {} frames ({} retransmissions).",
                summary.bytes_sent, summary.rounds, summary.retransmissions
            );
        }
        Mode::Receive {
            port,
            data_loss,
            output_dir,
            log_file,
            no_progress,
        } => {
            let config = ReceiverConfig {
                data_loss,
                output_dir,
                ..ReceiverConfig::default()
            };
            let socket = bind(port).await?;
            log::info!("Listening on {}", socket.local_addr);

            let summary = FileReceiver::new(socket, config)?
                .with_recorder(open_event_log(&log_file))
                .with_progress(progress(no_progress, "receiving"))
                .run()
                .await
                .context("transfer failed")?;

            println!();
            println!(
                "File transfer complete: {} bytes saved to {}.",
                summary.bytes_received,
                summary.path.display()
            );
        }
    }

    Ok(())
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{s:?} is not a number: {e}"))?;
    validate_probability(p).map_err(|e| e.to_string())?;
    Ok(p)
}

async fn bind(port: u16) -> Result<Socket> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    Socket::bind(addr)
        .await
        .with_context(|| format!("cannot bind UDP port {port}"))
}

/// Resolve `host:port`, preferring IPv4 to match the IPv4 local socket.
async fn resolve_peer(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("cannot resolve {host}"))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .with_context(|| format!("{host} has no addresses"))
}

/// The event log is best-effort: if it cannot be opened, run without it.
fn open_event_log(path: &Path) -> Box<dyn EventRecorder + Send + Sync> {
    match EventLog::open(path) {
        Ok(log) => {
            log::info!("Recording events to {}", log.path().display());
            Box::new(log)
        }
        Err(e) => {
            log::warn!(
                "cannot open event log {}: {e}; events will not be recorded",
                path.display()
            );
            Box::new(NoopRecorder)
        }
    }
}

fn progress(disabled: bool, label: &str) -> Box<dyn ProgressReporter + Send + Sync> {
    if disabled {
        Box::new(NoProgress)
    } else {
        Box::new(ProgressBarReporter::new(label))
    }
}
