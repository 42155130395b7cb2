//! Outbound unit state for stop-and-wait reliability.
//!
//! [`Sender`] tracks sequence numbers and the single in-flight data frame.
//! It does **not** touch the socket; [`crate::file_sender::FileSender`] calls
//! these methods and owns the actual send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** frame is in flight at any moment (`unacked`).
//! - A new frame may only be sent once `unacked` is `None`.
//! - On an ACK whose number equals the in-flight sequence: advance
//!   `next_seq` by one; clear `unacked`.
//! - On timeout: increment `tx_count`; resend the same frame unchanged.

use crate::packet::{Frame, FrameError};

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/// A data frame that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// The frame on the wire.
    pub frame: Frame,
    /// How many times this frame has been transmitted (1 = first send).
    pub tx_count: u32,
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Stop-and-wait send-side state for one transfer.
#[derive(Debug)]
pub struct Sender {
    /// Sequence number of the **next** data frame to send.
    ///
    /// Advances by one each time the in-flight frame is acknowledged.
    pub next_seq: i32,

    /// The in-flight frame, or `None` when the sender is idle.
    pub unacked: Option<InFlight>,

    /// Payload bytes confirmed by the peer so far.
    pub bytes_acked: u64,

    /// Number of data rounds completed.
    pub rounds: u32,

    /// Timer-driven resends across every round.
    pub retransmissions: u32,
}

impl Sender {
    /// Create a sender whose first data frame carries `first_seq`.
    pub fn new(first_seq: i32) -> Self {
        Self {
            next_seq: first_seq,
            unacked: None,
            bytes_acked: 0,
            rounds: 0,
            retransmissions: 0,
        }
    }

    /// Build the next data frame.
    ///
    /// The caller must subsequently call [`record_sent`](Self::record_sent)
    /// to place the frame into the in-flight slot.
    pub fn build_data_frame(&self, payload: Vec<u8>) -> Result<Frame, FrameError> {
        Frame::data(self.next_seq, payload)
    }

    /// Move `frame` into the in-flight slot (first transmission).
    ///
    /// Panics in debug mode if a frame is already in flight.
    pub fn record_sent(&mut self, frame: Frame) {
        debug_assert!(
            self.unacked.is_none(),
            "record_sent called while a frame is already in flight"
        );
        self.unacked = Some(InFlight { frame, tx_count: 1 });
    }

    /// `true` when `ack_num` acknowledges the in-flight frame.
    pub fn is_awaited(&self, ack_num: i32) -> bool {
        self.unacked
            .as_ref()
            .is_some_and(|e| e.frame.seq_num == ack_num)
    }

    /// Process an inbound ACK number.
    ///
    /// Returns `true` if this ACK covers the in-flight frame.  Returns
    /// `false` for a stale or unexpected ACK, which leaves state untouched.
    pub fn on_ack(&mut self, ack_num: i32) -> bool {
        if !self.is_awaited(ack_num) {
            return false;
        }
        if let Some(entry) = self.unacked.take() {
            self.bytes_acked += entry.frame.payload().len() as u64;
            self.next_seq = self.next_seq.wrapping_add(1);
            self.rounds += 1;
        }
        true
    }

    /// Increment the transmit count for the in-flight frame.
    ///
    /// Called by the send loop on each retransmission.
    pub fn on_retransmit(&mut self) {
        if let Some(ref mut e) = self.unacked {
            e.tx_count += 1;
            self.retransmissions += 1;
        }
    }

    /// The frame to put back on the wire after a timeout.
    pub fn in_flight(&self) -> Option<&Frame> {
        self.unacked.as_ref().map(|e| &e.frame)
    }

    /// Resends of the in-flight frame so far (`tx_count - 1`), or `0` if
    /// the sender is idle.
    pub fn resends_in_flight(&self) -> u32 {
        self.unacked
            .as_ref()
            .map_or(0, |e| e.tx_count.saturating_sub(1))
    }

    /// Sequence number of the last acknowledged data frame, carried by EOT.
    pub fn last_acked_seq(&self) -> i32 {
        self.next_seq.wrapping_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{FrameKind, FIRST_DATA_SEQ};

    #[test]
    fn initial_state() {
        let s = Sender::new(FIRST_DATA_SEQ);
        assert_eq!(s.next_seq, 3);
        assert!(s.unacked.is_none());
        assert_eq!(s.resends_in_flight(), 0);
        assert_eq!(s.bytes_acked, 0);
    }

    #[test]
    fn build_uses_next_seq() {
        let s = Sender::new(7);
        let f = s.build_data_frame(b"abc".to_vec()).unwrap();
        assert_eq!(f.kind, FrameKind::Data);
        assert_eq!(f.seq_num, 7);
        assert_eq!(f.length(), 3);
    }

    #[test]
    fn matching_ack_advances() {
        let mut s = Sender::new(3);
        let f = s.build_data_frame(vec![0u8; 1000]).unwrap();
        s.record_sent(f);

        assert!(s.on_ack(3));
        assert_eq!(s.next_seq, 4);
        assert!(s.unacked.is_none());
        assert_eq!(s.bytes_acked, 1000);
        assert_eq!(s.rounds, 1);
        assert_eq!(s.last_acked_seq(), 3);
    }

    #[test]
    fn wrong_ack_ignored() {
        let mut s = Sender::new(3);
        let f = s.build_data_frame(b"x".to_vec()).unwrap();
        s.record_sent(f);

        assert!(!s.on_ack(2));
        assert!(!s.on_ack(4));
        assert!(s.unacked.is_some());
        assert_eq!(s.next_seq, 3);
        assert_eq!(s.bytes_acked, 0);
    }

    #[test]
    fn duplicate_ack_after_advance_ignored() {
        let mut s = Sender::new(3);
        let f = s.build_data_frame(b"x".to_vec()).unwrap();
        s.record_sent(f);
        assert!(s.on_ack(3));

        let f = s.build_data_frame(b"y".to_vec()).unwrap();
        s.record_sent(f);
        // Late duplicate ACK for the previous round.
        assert!(!s.on_ack(3));
        assert_eq!(s.bytes_acked, 1);
        assert!(s.is_awaited(4));
    }

    #[test]
    fn ack_while_idle_ignored() {
        let mut s = Sender::new(3);
        assert!(!s.on_ack(3));
        assert_eq!(s.next_seq, 3);
    }

    #[test]
    fn retransmit_keeps_frame_unchanged() {
        let mut s = Sender::new(3);
        let f = s.build_data_frame(b"same".to_vec()).unwrap();
        s.record_sent(f.clone());

        s.on_retransmit();
        s.on_retransmit();
        assert_eq!(s.unacked.as_ref().map(|e| e.tx_count), Some(3));
        assert_eq!(s.resends_in_flight(), 2);
        assert_eq!(s.in_flight(), Some(&f));
    }

    #[test]
    fn retransmissions_accumulate_across_rounds() {
        let mut s = Sender::new(3);
        s.record_sent(s.build_data_frame(b"a".to_vec()).unwrap());
        s.on_retransmit();
        assert!(s.on_ack(3));
        assert_eq!(s.resends_in_flight(), 0);

        s.record_sent(s.build_data_frame(b"b".to_vec()).unwrap());
        s.on_retransmit();
        s.on_retransmit();
        assert_eq!(s.resends_in_flight(), 2);
        assert_eq!(s.retransmissions, 3);
    }

    #[test]
    fn retransmit_while_idle_is_not_counted() {
        let mut s = Sender::new(3);
        s.on_retransmit();
        assert_eq!(s.retransmissions, 0);
    }
}
