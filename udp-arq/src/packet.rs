//! Wire-format definitions for protocol frames.
//!
//! Every datagram exchanged between the sender and the receiver is exactly
//! one [`Frame`].  This module is responsible for:
//! - Defining the fixed on-wire layout (kind, sequence, ack, length, data).
//! - Serialising a [`Frame`] into a buffer of exactly [`FRAME_LEN`] bytes.
//! - Deserialising a raw datagram back into a [`Frame`], returning errors
//!   for short, oversized, or otherwise malformed input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All integers are 32-bit signed and **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                  Kind (1 = DATA, 2 = ACK, 3 = EOT)            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Acknowledgment Number                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload Length                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              Data (MAX_PAYLOAD bytes, zero padded)            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total frame size: [`FRAME_LEN`] = 16 + [`MAX_PAYLOAD`] = 1016 bytes.

/// Largest number of payload bytes a single frame can carry.
pub const MAX_PAYLOAD: usize = 1000;

/// Byte length of the fixed header on the wire.
pub const HEADER_LEN: usize = 16;

/// Byte length of every frame on the wire.
pub const FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

/// Payload of the sender's opening frame.
pub const GREETING: &[u8] = b"Greeting";

/// Payload of the receiver's reply to the greeting.
pub const CONFIRMATION: &[u8] = b"OK";

/// Sequence number of the greeting frame.
pub const GREETING_SEQ: i32 = 0;
/// Sequence number of the filename frame.
pub const FILENAME_SEQ: i32 = 1;
/// Sequence number of the file-size frame.
pub const FILE_SIZE_SEQ: i32 = 2;
/// Sequence number of the first file-content frame.
pub const FIRST_DATA_SEQ: i32 = 3;

/// Width of the file-size payload (unsigned, big-endian).
pub const FILE_SIZE_LEN: usize = 8;

// Byte offsets of each field within the serialised frame.
const OFF_KIND: usize = 0;
const OFF_SEQ: usize = 4;
const OFF_ACK: usize = 8;
const OFF_LEN: usize = 12;

/// Frame kind carried in the first header word.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Data = 1,
    Ack = 2,
    /// End of transmission.
    Eot = 3,
}

impl FrameKind {
    /// Numeric wire value of this kind.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for FrameKind {
    type Error = FrameError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Data),
            2 => Ok(Self::Ack),
            3 => Ok(Self::Eot),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "DATA"),
            Self::Ack => write!(f, "ACK"),
            Self::Eot => write!(f, "EOT"),
        }
    }
}

/// One self-describing protocol message.
///
/// The payload never exceeds [`MAX_PAYLOAD`]; every constructor enforces
/// this, so `length()` is always a valid wire value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub seq_num: i32,
    pub ack_num: i32,
    payload: Vec<u8>,
}

impl Frame {
    /// Build a frame of any kind, rejecting oversized payloads.
    pub fn new(
        kind: FrameKind,
        seq_num: i32,
        ack_num: i32,
        payload: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }
        Ok(Self {
            kind,
            seq_num,
            ack_num,
            payload,
        })
    }

    /// A DATA frame carrying `payload` under sequence number `seq_num`.
    pub fn data(seq_num: i32, payload: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(FrameKind::Data, seq_num, 0, payload)
    }

    /// An empty ACK frame acknowledging `ack_num`.
    pub fn ack(ack_num: i32) -> Self {
        Self {
            kind: FrameKind::Ack,
            seq_num: 0,
            ack_num,
            payload: Vec::new(),
        }
    }

    /// An EOT frame echoing the final sequence number.
    pub fn eot(seq_num: i32) -> Self {
        Self {
            kind: FrameKind::Eot,
            seq_num,
            ack_num: 0,
            payload: Vec::new(),
        }
    }

    /// The sender's opening frame.
    pub fn greeting() -> Self {
        Self {
            kind: FrameKind::Data,
            seq_num: GREETING_SEQ,
            ack_num: 0,
            payload: GREETING.to_vec(),
        }
    }

    /// The receiver's reply to a valid greeting.
    pub fn confirmation() -> Self {
        Self {
            kind: FrameKind::Ack,
            seq_num: 0,
            ack_num: 0,
            payload: CONFIRMATION.to_vec(),
        }
    }

    /// The DATA frame announcing the total file size.
    pub fn file_size(size: u64) -> Self {
        Self {
            kind: FrameKind::Data,
            seq_num: FILE_SIZE_SEQ,
            ack_num: 0,
            payload: size.to_be_bytes().to_vec(),
        }
    }

    /// Interpret this frame as a file-size announcement.
    ///
    /// `None` unless it is a DATA frame carrying exactly
    /// [`FILE_SIZE_LEN`] bytes.
    pub fn as_file_size(&self) -> Option<u64> {
        if self.kind != FrameKind::Data {
            return None;
        }
        let bytes: [u8; FILE_SIZE_LEN] = self.payload.as_slice().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Number of valid payload bytes, as carried in the length field.
    pub fn length(&self) -> i32 {
        // Bounded by MAX_PAYLOAD, so the cast is lossless.
        self.payload.len() as i32
    }

    /// Serialise into exactly [`FRAME_LEN`] bytes.
    ///
    /// Data bytes past `length()` are zero.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_LEN];

        buf[OFF_KIND..OFF_KIND + 4].copy_from_slice(&self.kind.code().to_be_bytes());
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seq_num.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&self.ack_num.to_be_bytes());
        buf[OFF_LEN..OFF_LEN + 4].copy_from_slice(&self.length().to_be_bytes());
        buf[HEADER_LEN..HEADER_LEN + self.payload.len()].copy_from_slice(&self.payload);

        buf
    }

    /// Parse a [`Frame`] from one received datagram.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is not exactly [`FRAME_LEN`] bytes,
    /// - the kind field is not a known [`FrameKind`], or
    /// - the length field is outside `0..=MAX_PAYLOAD`.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() != FRAME_LEN {
            return Err(FrameError::WrongSize(buf.len()));
        }

        let kind = FrameKind::try_from(read_i32(buf, OFF_KIND))?;
        let seq_num = read_i32(buf, OFF_SEQ);
        let ack_num = read_i32(buf, OFF_ACK);
        let length = read_i32(buf, OFF_LEN);

        let len = usize::try_from(length)
            .ok()
            .filter(|&n| n <= MAX_PAYLOAD)
            .ok_or(FrameError::BadLength(length))?;

        Ok(Self {
            kind,
            seq_num,
            ack_num,
            payload: buf[HEADER_LEN..HEADER_LEN + len].to_vec(),
        })
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} seq={} ack={} len={}",
            self.kind,
            self.seq_num,
            self.ack_num,
            self.length()
        )
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_be_bytes(word)
}

/// Errors that can arise when building or parsing a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Datagram is not exactly one frame long.
    #[error("datagram is {0} bytes, expected exactly {max}", max = FRAME_LEN)]
    WrongSize(usize),
    /// Kind field holds an unknown value.
    #[error("unknown frame kind {0}")]
    UnknownKind(i32),
    /// Length field is negative or larger than the data area.
    #[error("length field {0} outside 0..={max}", max = MAX_PAYLOAD)]
    BadLength(i32),
    /// Caller tried to build a frame with too much payload.
    #[error("payload of {0} bytes exceeds the {max}-byte limit", max = MAX_PAYLOAD)]
    PayloadTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let frame = Frame::data(42, b"hello".to_vec()).unwrap();
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.length(), 5);
    }

    #[test]
    fn encoded_length_is_always_frame_len() {
        assert_eq!(Frame::ack(7).encode().len(), FRAME_LEN);
        let full = Frame::data(3, vec![0xAB; MAX_PAYLOAD]).unwrap();
        assert_eq!(full.encode().len(), FRAME_LEN);
    }

    #[test]
    fn header_len_constant_is_correct() {
        // kind(4) + seq(4) + ack(4) + length(4) = 16
        assert_eq!(HEADER_LEN, 16);
        assert_eq!(FRAME_LEN, 1016);
    }

    #[test]
    fn fields_big_endian_on_wire() {
        let mut frame = Frame::ack(0x0506_0708);
        frame.seq_num = 0x0102_0304;
        let bytes = frame.encode();
        assert_eq!(&bytes[OFF_KIND..OFF_KIND + 4], &[0, 0, 0, 2]);
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[OFF_ACK..OFF_ACK + 4], &[0x05, 0x06, 0x07, 0x08]);
        assert_eq!(&bytes[OFF_LEN..OFF_LEN + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn padding_after_payload_is_zero() {
        let bytes = Frame::data(3, vec![0xFF; 10]).unwrap().encode();
        assert!(bytes[HEADER_LEN + 10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn bytes_past_length_are_not_trusted() {
        let mut bytes = Frame::data(3, b"abc".to_vec()).unwrap().encode();
        bytes[HEADER_LEN + 3] = b'x';
        bytes[FRAME_LEN - 1] = b'y';
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded.payload(), b"abc");
    }

    #[test]
    fn decode_short_datagram_returns_error() {
        let bytes = Frame::greeting().encode();
        assert_eq!(
            Frame::decode(&bytes[..FRAME_LEN - 1]),
            Err(FrameError::WrongSize(FRAME_LEN - 1))
        );
        assert_eq!(Frame::decode(&[]), Err(FrameError::WrongSize(0)));
    }

    #[test]
    fn decode_oversized_datagram_returns_error() {
        let mut bytes = Frame::ack(1).encode();
        bytes.push(0);
        assert_eq!(Frame::decode(&bytes), Err(FrameError::WrongSize(FRAME_LEN + 1)));
    }

    #[test]
    fn decode_unknown_kind_returns_error() {
        let mut bytes = Frame::ack(1).encode();
        bytes[OFF_KIND..OFF_KIND + 4].copy_from_slice(&9i32.to_be_bytes());
        assert_eq!(Frame::decode(&bytes), Err(FrameError::UnknownKind(9)));
    }

    #[test]
    fn decode_bad_length_returns_error() {
        let mut bytes = Frame::ack(1).encode();
        bytes[OFF_LEN..OFF_LEN + 4].copy_from_slice(&(-1i32).to_be_bytes());
        assert_eq!(Frame::decode(&bytes), Err(FrameError::BadLength(-1)));

        let too_long = MAX_PAYLOAD as i32 + 1;
        bytes[OFF_LEN..OFF_LEN + 4].copy_from_slice(&too_long.to_be_bytes());
        assert_eq!(Frame::decode(&bytes), Err(FrameError::BadLength(too_long)));
    }

    #[test]
    fn oversized_payload_is_rejected_at_construction() {
        assert_eq!(
            Frame::data(3, vec![0; MAX_PAYLOAD + 1]),
            Err(FrameError::PayloadTooLarge(MAX_PAYLOAD + 1))
        );
    }

    #[test]
    fn handshake_frames_carry_literals() {
        let greet = Frame::greeting();
        assert_eq!(greet.kind, FrameKind::Data);
        assert_eq!(greet.seq_num, GREETING_SEQ);
        assert_eq!(greet.payload(), b"Greeting");
        assert_eq!(greet.length(), 8);

        let ok = Frame::confirmation();
        assert_eq!(ok.kind, FrameKind::Ack);
        assert_eq!(ok.payload(), b"OK");
    }

    #[test]
    fn file_size_frame_roundtrip() {
        let frame = Frame::decode(&Frame::file_size(2500).encode()).unwrap();
        assert_eq!(frame.seq_num, FILE_SIZE_SEQ);
        assert_eq!(frame.length(), FILE_SIZE_LEN as i32);
        assert_eq!(frame.as_file_size(), Some(2500));
    }

    #[test]
    fn malformed_file_size_frames_rejected() {
        assert_eq!(Frame::data(FILE_SIZE_SEQ, vec![0; 4]).unwrap().as_file_size(), None);
        let mut wrong_kind = Frame::file_size(10);
        wrong_kind.kind = FrameKind::Ack;
        assert_eq!(wrong_kind.as_file_size(), None);
    }

    #[test]
    fn eot_echoes_sequence() {
        let eot = Frame::decode(&Frame::eot(5).encode()).unwrap();
        assert_eq!(eot.kind, FrameKind::Eot);
        assert_eq!(eot.seq_num, 5);
        assert_eq!(eot.length(), 0);
    }
}
