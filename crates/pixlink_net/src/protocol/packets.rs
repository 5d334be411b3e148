//! # Packet Definitions
//!
//! ```text
//! Inbound (11 bytes)
//! ┌─────┬────┬──────┬──────┬──────┬──────┬───────┐
//! │ cmd │ id │ x:16 │ y:16 │ vx:16│ vy:16│ frame │
//! └─────┴────┴──────┴──────┴──────┴──────┴───────┘
//!
//! Outbound (11 bytes)
//! ┌──────┬─────┬─────┬──────┬──────┬──────────┐
//! │ resp │ id1 │ id2 │ x:16 │ y:16 │ ts:32    │
//! └──────┴─────┴─────┴──────┴──────┴──────────┘
//! ```

use super::serialization::{PacketReader, PacketWriter};
use crate::error::PacketError;
use crate::{INBOUND_PACKET_SIZE, OUTBOUND_PACKET_SIZE};

/// Command bytes a peer may send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NetCommand {
    /// Reposition a sprite.
    Move = 0,
    /// Create or re-place a sprite.
    Draw = 1,
    /// Remove every sprite.
    Clear = 2,
    /// Spawn a bullet.
    Fire = 3,
}

impl NetCommand {
    /// Decodes a command byte.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Move),
            1 => Some(Self::Draw),
            2 => Some(Self::Clear),
            3 => Some(Self::Fire),
            _ => None,
        }
    }
}

/// Report kinds sent back to the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseKind {
    /// Two sprites overlap.
    CollisionDetected = 0,
    /// A sprite was swept for leaving the field.
    ObjectOutOfBounds = 1,
    /// A frame was presented.
    RenderComplete = 2,
    /// Periodic liveness signal.
    Heartbeat = 3,
    /// A command failed or was dropped.
    Error = 4,
}

impl ResponseKind {
    /// Decodes a response byte.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::CollisionDetected),
            1 => Some(Self::ObjectOutOfBounds),
            2 => Some(Self::RenderComplete),
            3 => Some(Self::Heartbeat),
            4 => Some(Self::Error),
            _ => None,
        }
    }
}

/// A command packet as received. The command byte is kept raw so unknown
/// values can be reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InboundPacket {
    /// Raw command byte.
    pub command: u8,
    /// Target sprite.
    pub object_id: u8,
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// X velocity.
    pub vx: i16,
    /// Y velocity.
    pub vy: i16,
    /// Frame or slot index.
    pub frame: u8,
}

impl InboundPacket {
    /// Wire size.
    pub const SIZE: usize = INBOUND_PACKET_SIZE;

    /// Parses the first [`Self::SIZE`] bytes. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// [`PacketError::Truncated`] if `bytes` is shorter than one packet.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let truncated = PacketError::Truncated { len: bytes.len(), need: Self::SIZE };
        if bytes.len() < Self::SIZE {
            return Err(truncated);
        }
        let mut reader = PacketReader::new(bytes);
        Ok(Self {
            command: reader.read_u8().ok_or(truncated)?,
            object_id: reader.read_u8().ok_or(truncated)?,
            x: reader.read_i16().ok_or(truncated)?,
            y: reader.read_i16().ok_or(truncated)?,
            vx: reader.read_i16().ok_or(truncated)?,
            vy: reader.read_i16().ok_or(truncated)?,
            frame: reader.read_u8().ok_or(truncated)?,
        })
    }

    /// Serializes into `writer` (after a reset).
    pub fn encode(&self, writer: &mut PacketWriter) -> bool {
        writer.reset();
        writer.write_u8(self.command)
            && writer.write_u8(self.object_id)
            && writer.write_i16(self.x)
            && writer.write_i16(self.y)
            && writer.write_i16(self.vx)
            && writer.write_i16(self.vy)
            && writer.write_u8(self.frame)
    }

    /// The decoded command, if known.
    #[inline]
    #[must_use]
    pub const fn net_command(&self) -> Option<NetCommand> {
        NetCommand::from_u8(self.command)
    }
}

/// A report packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutboundPacket {
    /// What happened.
    pub response: ResponseKind,
    /// First sprite involved.
    pub object1_id: u8,
    /// Second sprite involved (or a detail code).
    pub object2_id: u8,
    /// X coordinate (or a count).
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Milliseconds since the node started.
    pub timestamp: u32,
}

impl OutboundPacket {
    /// Wire size.
    pub const SIZE: usize = OUTBOUND_PACKET_SIZE;

    /// A report with no position.
    #[must_use]
    pub const fn new(response: ResponseKind, object1_id: u8, object2_id: u8, timestamp: u32) -> Self {
        Self { response, object1_id, object2_id, x: 0, y: 0, timestamp }
    }

    /// Sets the position fields.
    #[must_use]
    pub const fn at(mut self, x: i16, y: i16) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Serializes into `writer` (after a reset).
    pub fn encode(&self, writer: &mut PacketWriter) -> bool {
        writer.reset();
        writer.write_u8(self.response as u8)
            && writer.write_u8(self.object1_id)
            && writer.write_u8(self.object2_id)
            && writer.write_i16(self.x)
            && writer.write_i16(self.y)
            && writer.write_u32(self.timestamp)
    }

    /// Parses a report, as a peer would.
    ///
    /// # Errors
    ///
    /// [`PacketError::Truncated`] or [`PacketError::UnknownResponse`].
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let truncated = PacketError::Truncated { len: bytes.len(), need: Self::SIZE };
        let mut reader = PacketReader::new(bytes);
        let raw = reader.read_u8().ok_or(truncated)?;
        let response = ResponseKind::from_u8(raw).ok_or(PacketError::UnknownResponse(raw))?;
        Ok(Self {
            response,
            object1_id: reader.read_u8().ok_or(truncated)?,
            object2_id: reader.read_u8().ok_or(truncated)?,
            x: reader.read_i16().ok_or(truncated)?,
            y: reader.read_i16().ok_or(truncated)?,
            timestamp: reader.read_u32().ok_or(truncated)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_inbound_wire_layout() {
        let bytes = [1, 7, 0x10, 0x00, 0xF6, 0xFF, 2, 0, 0xFE, 0xFF, 3];
        let packet = InboundPacket::decode(&bytes).unwrap();
        assert_eq!(
            packet,
            InboundPacket { command: 1, object_id: 7, x: 16, y: -10, vx: 2, vy: -2, frame: 3 }
        );
        assert_eq!(packet.net_command(), Some(NetCommand::Draw));

        let mut writer = PacketWriter::new();
        assert!(packet.encode(&mut writer));
        assert_eq!(writer.as_slice(), &bytes);
    }

    #[test]
    fn test_inbound_length_rules() {
        assert_eq!(
            InboundPacket::decode(&[0; 10]),
            Err(PacketError::Truncated { len: 10, need: 11 })
        );
        let mut long = vec![0u8; 40];
        long[0] = 2;
        assert_eq!(InboundPacket::decode(&long).unwrap().net_command(), Some(NetCommand::Clear));
    }

    #[test]
    fn test_outbound_wire_layout() {
        let packet = OutboundPacket::new(ResponseKind::CollisionDetected, 3, 9, 0x0A0B_0C0D).at(-1, 256);
        let mut writer = PacketWriter::new();
        assert!(packet.encode(&mut writer));
        assert_eq!(writer.as_slice(), &[0, 3, 9, 0xFF, 0xFF, 0x00, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(writer.len(), OutboundPacket::SIZE);
        assert_eq!(OutboundPacket::decode(writer.as_slice()), Ok(packet));
    }

    #[test]
    fn test_outbound_rejects_unknown_kind() {
        assert_eq!(OutboundPacket::decode(&[9; 11]), Err(PacketError::UnknownResponse(9)));
    }

    #[test]
    fn test_random_datagrams_never_panic() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..2_000 {
            let len = rng.gen_range(0..32);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            match InboundPacket::decode(&bytes) {
                Ok(_) => assert!(len >= InboundPacket::SIZE),
                Err(PacketError::Truncated { len: got, .. }) => assert_eq!(got, len),
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
    }
}
