//! # Packet Translation
//!
//! Maps wire commands onto internal command records.
//!
//! | Wire    | Internal       |
//! |---------|----------------|
//! | `move`  | `MoveSprite`   |
//! | `draw`  | `LoadSprite`   |
//! | `clear` | `ClearScreen`  |
//! | `fire`  | `FireBullet`   |
//!
//! Velocity fields have no counterpart in a command record and are ignored.

use pixlink_core::{CommandRecord, Opcode};

use super::packets::{InboundPacket, NetCommand};
use crate::error::PacketError;

/// Internal opcode for a wire command.
#[inline]
#[must_use]
pub const fn opcode_for(command: NetCommand) -> Opcode {
    match command {
        NetCommand::Move => Opcode::MoveSprite,
        NetCommand::Draw => Opcode::LoadSprite,
        NetCommand::Clear => Opcode::ClearScreen,
        NetCommand::Fire => Opcode::FireBullet,
    }
}

/// Builds the command record for a decoded packet.
///
/// # Errors
///
/// [`PacketError::UnknownCommand`] for command bytes outside the known set.
pub fn translate(packet: &InboundPacket) -> Result<CommandRecord, PacketError> {
    let command = packet.net_command().ok_or(PacketError::UnknownCommand(packet.command))?;
    Ok(CommandRecord::new(opcode_for(command))
        .with_sprite(packet.object_id)
        .at(packet.x, packet.y)
        .with_frame(packet.frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table() {
        let cases = [
            (0, Opcode::MoveSprite),
            (1, Opcode::LoadSprite),
            (2, Opcode::ClearScreen),
            (3, Opcode::FireBullet),
        ];
        for (byte, opcode) in cases {
            let packet = InboundPacket { command: byte, object_id: 4, x: -3, y: 9, frame: 2, ..Default::default() };
            let record = translate(&packet).unwrap();
            assert_eq!(record, CommandRecord::new(opcode).with_sprite(4).at(-3, 9).with_frame(2));
        }
    }

    #[test]
    fn test_unknown_command() {
        let packet = InboundPacket { command: 0x7F, ..Default::default() };
        assert_eq!(translate(&packet), Err(PacketError::UnknownCommand(0x7F)));
    }
}
