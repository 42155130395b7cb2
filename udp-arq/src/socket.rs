//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`crate::packet::Frame`] instead of raw bytes.  All protocol logic lives
//! elsewhere; this module owns only datagram I/O.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::packet::{Frame, FrameError, FRAME_LEN};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from socket operations.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The received datagram could not be decoded as a valid frame.
    #[error("frame decode error: {0}")]
    Frame(#[from] FrameError),
}

// ---------------------------------------------------------------------------
// Socket
// ---------------------------------------------------------------------------

/// An async, frame-oriented UDP socket.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `frame` and send it as a single UDP datagram to `dest`.
    pub async fn send_to(&self, frame: &Frame, dest: SocketAddr) -> Result<(), SocketError> {
        let bytes = frame.encode();
        self.inner.send_to(&bytes, dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it into a [`Frame`].
    ///
    /// Returns `(frame, sender_address)`.  Datagrams that are not exactly one
    /// frame long are returned as `Err`; the caller decides whether to keep
    /// waiting.  Cancel-safe, so it can sit in a `tokio::select!` branch.
    pub async fn recv_from(&self) -> Result<(Frame, SocketAddr), SocketError> {
        // One spare byte so an oversized datagram is detected instead of
        // silently truncated to a valid-looking frame.
        let mut buf = vec![0u8; FRAME_LEN + 1];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        let frame = Frame::decode(&buf[..n])?;
        Ok((frame, addr))
    }

    /// Send raw bytes, bypassing frame encoding.
    ///
    /// Only useful for exercising a peer's handling of malformed datagrams.
    pub async fn send_raw(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::FrameKind;

    async fn loopback() -> Socket {
        Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn frame_survives_loopback() {
        let a = loopback().await;
        let b = loopback().await;

        let frame = Frame::data(3, b"payload".to_vec()).unwrap();
        a.send_to(&frame, b.local_addr).await.unwrap();

        let (got, from) = b.recv_from().await.unwrap();
        assert_eq!(got, frame);
        assert_eq!(from, a.local_addr);
    }

    #[tokio::test]
    async fn short_datagram_is_a_decode_error() {
        let a = loopback().await;
        let b = loopback().await;

        a.send_raw(b"Greeting", b.local_addr).await.unwrap();
        match b.recv_from().await {
            Err(SocketError::Frame(FrameError::WrongSize(8))) => {}
            other => panic!("expected WrongSize(8), got {other:?}"),
        }

        // The socket is still usable afterwards.
        a.send_to(&Frame::ack(4), b.local_addr).await.unwrap();
        let (got, _) = b.recv_from().await.unwrap();
        assert_eq!(got.kind, FrameKind::Ack);
        assert_eq!(got.ack_num, 4);
    }

    #[tokio::test]
    async fn oversized_datagram_is_a_decode_error() {
        let a = loopback().await;
        let b = loopback().await;

        a.send_raw(&vec![0u8; FRAME_LEN + 10], b.local_addr).await.unwrap();
        assert!(matches!(
            b.recv_from().await,
            Err(SocketError::Frame(FrameError::WrongSize(_)))
        ));
    }
}
