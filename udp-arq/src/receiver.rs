//! In-order receive-side state.
//!
//! [`Receiver`] implements the acceptance rule of the receiving role:
//!
//! - Only the frame whose sequence number equals `expected_seq` is accepted.
//! - Duplicates and out-of-order frames are **silently discarded**; nothing
//!   is buffered for later.
//!
//! The accept decision is keyed on the expected-next counter alone, so a
//! retransmitted copy of an already-accepted frame can never be written
//! twice.  All socket and file I/O is the caller's responsibility.

/// Stop-and-wait receive-side state for one transfer.
#[derive(Debug)]
pub struct Receiver {
    /// Next expected sequence number.
    ///
    /// Advances by one each time an in-order frame is accepted.
    pub expected_seq: i32,

    /// Payload bytes accepted so far.
    pub bytes_received: u64,
}

impl Receiver {
    pub fn new(expected_seq: i32) -> Self {
        Self {
            expected_seq,
            bytes_received: 0,
        }
    }

    /// Process an inbound data frame's sequence number and payload length.
    ///
    /// Returns `true` if the frame was **accepted** and its payload should be
    /// written; `false` for a duplicate or out-of-order frame.
    pub fn on_data(&mut self, seq: i32, len: usize) -> bool {
        if seq != self.expected_seq {
            return false;
        }
        self.bytes_received += len as u64;
        self.expected_seq = self.expected_seq.wrapping_add(1);
        true
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
