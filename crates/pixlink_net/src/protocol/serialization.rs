//! # Packet Serialization
//!
//! Fixed-buffer writer and borrowing reader. Every multi-byte field is
//! little-endian regardless of host order.

use crate::MAX_PACKET_SIZE;

/// Writes fields into a stack buffer. Reused across packets.
pub struct PacketWriter {
    buffer: [u8; MAX_PACKET_SIZE],
    position: usize,
}

impl PacketWriter {
    /// Empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: [0u8; MAX_PACKET_SIZE], position: 0 }
    }

    /// Rewinds for the next packet.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// True if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// The written bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> bool {
        let end = self.position + bytes.len();
        if end > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        true
    }

    /// Writes one byte. False if the buffer is full.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        self.put(&[value])
    }

    /// Writes an `i16`.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> bool {
        self.put(&value.to_le_bytes())
    }

    /// Writes a `u32`.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> bool {
        self.put(&value.to_le_bytes())
    }
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads fields from a received datagram.
pub struct PacketReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    /// Reader over `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Bytes left.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.buffer.get(self.position..self.position + N)?;
        self.position += N;
        bytes.try_into().ok()
    }

    /// Reads one byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    /// Reads an `i16`.
    #[inline]
    pub fn read_i16(&mut self) -> Option<i16> {
        self.take().map(i16::from_le_bytes)
    }

    /// Reads a `u32`.
    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut writer = PacketWriter::new();
        assert!(writer.write_u8(0xAB));
        assert!(writer.write_i16(-2));
        assert!(writer.write_u32(0x0102_0304));
        assert_eq!(writer.as_slice(), &[0xAB, 0xFE, 0xFF, 0x04, 0x03, 0x02, 0x01]);

        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_u8(), Some(0xAB));
        assert_eq!(reader.read_i16(), Some(-2));
        assert_eq!(reader.read_u32(), Some(0x0102_0304));
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn test_writer_bounds() {
        let mut writer = PacketWriter::new();
        for _ in 0..MAX_PACKET_SIZE {
            assert!(writer.write_u8(0));
        }
        assert!(!writer.write_u8(0));
        assert!(!writer.write_i16(0));
        assert_eq!(writer.len(), MAX_PACKET_SIZE);
        writer.reset();
        assert!(writer.is_empty());
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let mut reader = PacketReader::new(&[1, 2, 3]);
        assert_eq!(reader.read_u32(), None);
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.read_i16(), Some(0x0201));
    }
}
