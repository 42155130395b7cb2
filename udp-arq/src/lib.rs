//! `udp-arq` — reliable whole-file delivery over UDP using stop-and-wait ARQ.
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────┐  DATA / EOT frames   ┌──────────────┐
//!  │ FileSender │─────────────────────▶│ FileReceiver │
//!  └─────┬──────┘                      └──────┬───────┘
//!        │             ACK frames             │
//!        │◀───────────────────────────────────┘
//!        │
//!  ┌─────▼────────────────────────────────────┐
//!  │                Session                   │
//!  │    (socket + event recorder, per run)    │
//!  └─────┬────────────────────────────────────┘
//!        │ fixed-size UDP datagrams
//!  ┌─────▼─────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]         — fixed-size wire frame (serialise / deserialise)
//! - [`simulator`]      — deliberate loss injection
//! - [`events`]         — append-only protocol event log
//! - [`progress`]       — terminal progress reporting
//! - [`socket`]         — async UDP socket abstraction
//! - [`timer`]          — retransmission deadline
//! - [`state`]          — transfer phase types
//! - [`sender`]         — stop-and-wait outbound state
//! - [`receiver`]       — in-order inbound state
//! - [`session`]        — per-transfer context and fatal error type
//! - [`file_sender`]    — sending engine
//! - [`file_receiver`]  — receiving engine
//! - [`config`]         — engine configuration

pub mod config;
pub mod events;
pub mod file_receiver;
pub mod file_sender;
pub mod packet;
pub mod progress;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod timer;

pub use config::{ReceiverConfig, SenderConfig};
pub use file_receiver::{FileReceiver, ReceiveSummary};
pub use file_sender::{FileSender, SendSummary};
pub use session::TransferError;
