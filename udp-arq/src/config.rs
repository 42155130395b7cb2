//! Engine configuration.
//!
//! The binary fills these from command-line flags; library users and tests
//! build them directly, usually starting from `Default`.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::simulator::{validate_probability, SimulatorError};

/// Default retransmission timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default prefix for files written by the receiver.
pub const DEFAULT_OUTPUT_PREFIX: &str = "recv_";

/// Parameters of one outbound transfer.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Receiver endpoint.
    pub peer: SocketAddr,
    /// File to transfer.
    pub source: PathBuf,
    /// Retransmission timeout for the in-flight data frame.
    pub timeout: Duration,
    /// Probability of ignoring a matching ACK.
    pub ack_loss: f64,
    /// Give up after this many retransmissions of one frame.
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    /// Give up if the greeting is not confirmed within this long.
    /// `None` waits forever.
    pub handshake_timeout: Option<Duration>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            peer: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            source: PathBuf::new(),
            timeout: DEFAULT_TIMEOUT,
            ack_loss: 0.0,
            max_retries: None,
            handshake_timeout: None,
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.handshake_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.peer.port() == 0 {
            return Err(ConfigError::NoPeerPort);
        }
        if self.source.as_os_str().is_empty() {
            return Err(ConfigError::NoSource);
        }
        validate_probability(self.ack_loss)?;
        Ok(())
    }
}

/// Parameters of one inbound transfer.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Probability of suppressing the ACK for a received data frame.
    pub data_loss: f64,
    /// Directory the received file is written into.
    pub output_dir: PathBuf,
    /// Prepended to the announced filename so the copy never collides with
    /// the source when both roles share a directory.
    pub output_prefix: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            data_loss: 0.0,
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_prefix.contains(std::path::is_separator) {
            return Err(ConfigError::BadPrefix(self.output_prefix.clone()));
        }
        validate_probability(self.data_loss)?;
        Ok(())
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("timeouts must be greater than zero")]
    ZeroTimeout,
    #[error("peer port must be non-zero")]
    NoPeerPort,
    #[error("no source file given")]
    NoSource,
    #[error("output prefix {0:?} must not contain a path separator")]
    BadPrefix(String),
    #[error(transparent)]
    Probability(#[from] SimulatorError),
}
