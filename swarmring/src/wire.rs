//! Wire format serialization and deserialization.
//!
//! Every frame has the same fixed layout, so there are no varints or
//! optional fields: nine payload bytes followed by a big-endian integrity
//! code computed over the payload.
//!
//! ```text
//! kind (1) || id (1) || right_id (1) || left_id (1) || role (1)
//! || receiver (1) || sender (1) || color_id (1) || leader_id (1)
//! || integrity (2)
//! ```
//!
//! `kind` is one of `Null=0, Share=1, Join=2, Leave=3, Move=4, Elect=5`.
//! `role` is `0` (autonomous) or `1` (cooperative). `leader_id` doubles as
//! the election proposal in `Elect` frames.

use core::fmt;

use crate::traits::Integrity;
use crate::types::{
    MessageKind, NodeId, Role, FRAME_LEN, PAYLOAD_LEN, POS_COLOR_ID, POS_ID, POS_KIND,
    POS_LEADER_ID, POS_LEFT_ID, POS_RECEIVER, POS_RIGHT_ID, POS_ROLE, POS_SENDER,
};

/// Decoding error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Unexpected end of buffer.
    UnexpectedEof,
    /// Frame is not exactly `FRAME_LEN` bytes.
    InvalidLength,
    /// Kind byte outside the known range.
    UnknownKind(u8),
    /// Role byte is neither autonomous nor cooperative.
    InvalidRole(u8),
    /// Integrity code does not match the payload.
    IntegrityMismatch,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEof => write!(f, "unexpected end of frame"),
            DecodeError::InvalidLength => write!(f, "invalid frame length"),
            DecodeError::UnknownKind(k) => write!(f, "unknown frame kind {}", k),
            DecodeError::InvalidRole(r) => write!(f, "invalid role byte {}", r),
            DecodeError::IntegrityMismatch => write!(f, "integrity check failed"),
        }
    }
}

/// Zero-copy reader over a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the number of bytes remaining.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.pos >= self.buf.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    /// Read a fixed number of bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + len > self.buf.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a u16 in big-endian format.
    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

/// Trait for types that can be decoded from wire format.
pub trait Decode: Sized {
    /// Decode a value from the reader.
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError>;

    /// Decode from a byte slice (strict: rejects trailing bytes).
    fn decode_from_slice(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data);
        let result = Self::decode(&mut r)?;
        if !r.is_empty() {
            return Err(DecodeError::InvalidLength);
        }
        Ok(result)
    }
}

/// One broadcast frame.
///
/// Fields map one-to-one onto the payload bytes; `integrity` is the code the
/// sender attached, not one recomputed locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    /// Sender's own id.
    pub id: NodeId,
    /// Sender's right partner at send time.
    pub right_id: NodeId,
    /// Sender's left partner at send time.
    pub left_id: NodeId,
    pub role: Role,
    /// Intended recipient (the sender's right partner).
    pub receiver: NodeId,
    pub sender: NodeId,
    pub color_id: NodeId,
    /// Sender's leader belief; the proposal in `Elect` frames.
    pub leader_id: NodeId,
    pub integrity: u16,
}

impl Frame {
    /// The idle frame offered when nothing is queued.
    pub fn null(integrity: &impl Integrity) -> Self {
        let mut frame = Frame {
            kind: MessageKind::Null,
            id: 0,
            right_id: 0,
            left_id: 0,
            role: Role::Autonomous,
            receiver: 0,
            sender: 0,
            color_id: 0,
            leader_id: 0,
            integrity: 0,
        };
        frame.seal(integrity);
        frame
    }

    /// The 9-byte payload the integrity code covers.
    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut p = [0u8; PAYLOAD_LEN];
        p[POS_KIND] = self.kind.as_u8();
        p[POS_ID] = self.id;
        p[POS_RIGHT_ID] = self.right_id;
        p[POS_LEFT_ID] = self.left_id;
        p[POS_ROLE] = self.role.as_u8();
        p[POS_RECEIVER] = self.receiver;
        p[POS_SENDER] = self.sender;
        p[POS_COLOR_ID] = self.color_id;
        p[POS_LEADER_ID] = self.leader_id;
        p
    }

    /// Recompute and attach the integrity code.
    pub fn seal(&mut self, integrity: &impl Integrity) {
        self.integrity = integrity.code(&self.payload());
    }

    pub fn is_null(&self) -> bool {
        self.kind == MessageKind::Null
    }

    /// The 11 bytes put on the air.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[..PAYLOAD_LEN].copy_from_slice(&self.payload());
        out[PAYLOAD_LEN..].copy_from_slice(&self.integrity.to_be_bytes());
        out
    }

    /// Decode and reject frames whose code does not match their payload.
    pub fn decode_verified(data: &[u8], integrity: &impl Integrity) -> Result<Self, DecodeError> {
        if data.len() != FRAME_LEN {
            return Err(DecodeError::InvalidLength);
        }
        let frame = Self::decode_from_slice(data)?;
        if !integrity.verify(&frame.payload(), frame.integrity) {
            return Err(DecodeError::IntegrityMismatch);
        }
        Ok(frame)
    }
}

impl Decode for Frame {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let kind_byte = r.read_u8()?;
        let kind = MessageKind::from_u8(kind_byte).ok_or(DecodeError::UnknownKind(kind_byte))?;
        let id = r.read_u8()?;
        let right_id = r.read_u8()?;
        let left_id = r.read_u8()?;
        let role_byte = r.read_u8()?;
        let role = Role::from_u8(role_byte).ok_or(DecodeError::InvalidRole(role_byte))?;
        let receiver = r.read_u8()?;
        let sender = r.read_u8()?;
        let color_id = r.read_u8()?;
        let leader_id = r.read_u8()?;
        let integrity = r.read_u16_be()?;

        Ok(Frame {
            kind,
            id,
            right_id,
            left_id,
            role,
            receiver,
            sender,
            color_id,
            leader_id,
            integrity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_impls::XxIntegrity;

    fn sample() -> Frame {
        let mut frame = Frame {
            kind: MessageKind::Join,
            id: 12,
            right_id: 40,
            left_id: 33,
            role: Role::Cooperative,
            receiver: 40,
            sender: 12,
            color_id: 12,
            leader_id: 12,
            integrity: 0,
        };
        frame.seal(&XxIntegrity);
        frame
    }

    #[test]
    fn test_payload_layout() {
        let frame = sample();
        let p = frame.payload();
        assert_eq!(p, [2, 12, 40, 33, 1, 40, 12, 12, 12]);

        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), FRAME_LEN);
        assert_eq!(&bytes[..PAYLOAD_LEN], &p);
        assert_eq!(
            u16::from_be_bytes([bytes[9], bytes[10]]),
            XxIntegrity.code(&p)
        );
    }

    #[test]
    fn test_decode_verified_accepts_sealed_frame() {
        let frame = sample();
        let decoded = Frame::decode_verified(&frame.to_bytes(), &XxIntegrity).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_corrupted_byte_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[POS_LEADER_ID] ^= 0x40;
        assert_eq!(
            Frame::decode_verified(&bytes, &XxIntegrity),
            Err(DecodeError::IntegrityMismatch)
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let bytes = sample().to_bytes();
        assert_eq!(
            Frame::decode_verified(&bytes[..10], &XxIntegrity),
            Err(DecodeError::InvalidLength)
        );

        let mut long = bytes.to_vec();
        long.push(0);
        assert_eq!(Frame::decode_from_slice(&long), Err(DecodeError::InvalidLength));
        assert_eq!(
            Frame::decode_from_slice(&bytes[..4]),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn test_unknown_kind_and_role() {
        let mut bytes = sample().to_bytes();
        bytes[POS_KIND] = 9;
        assert_eq!(Frame::decode_from_slice(&bytes), Err(DecodeError::UnknownKind(9)));

        let mut bytes = sample().to_bytes();
        bytes[POS_ROLE] = 2;
        assert_eq!(Frame::decode_from_slice(&bytes), Err(DecodeError::InvalidRole(2)));
    }

    #[test]
    fn test_null_frame_is_sealed() {
        let null = Frame::null(&XxIntegrity);
        assert!(null.is_null());
        assert_eq!(null.payload(), [0u8; PAYLOAD_LEN]);
        assert!(Frame::decode_verified(&null.to_bytes(), &XxIntegrity).is_ok());
    }

    #[test]
    fn test_decode_error_display() {
        use alloc::string::ToString;
        assert_eq!(DecodeError::UnknownKind(7).to_string(), "unknown frame kind 7");
        assert_eq!(DecodeError::IntegrityMismatch.to_string(), "integrity check failed");
    }
}
