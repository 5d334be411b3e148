//! # Wire Protocol
//!
//! Two fixed-size packet layouts, no header, no sequencing. Lost packets
//! stay lost.
//!
//! ## Design Philosophy
//!
//! - Fixed-size records decoded field by field, little-endian
//! - Unknown commands are rejected at translation, never queued
//! - Opcode dispatch is a plain `match`

mod packets;
mod serialization;
mod translate;

pub use packets::{InboundPacket, NetCommand, OutboundPacket, ResponseKind};
pub use serialization::{PacketReader, PacketWriter};
pub use translate::{opcode_for, translate};
