//! # Command Records
//!
//! The unit of exchange on the command channel. One record per decoded
//! network command; the render side dispatches on [`Opcode`] with a match.

/// Operations the render side knows how to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Create (or re-place) a sprite and attach an animation.
    LoadSprite = 0,
    /// Set a sprite's position.
    MoveSprite = 1,
    /// Destroy every sprite.
    ClearScreen = 2,
    /// Spawn a bullet sprite.
    FireBullet = 3,
}

impl Opcode {
    /// Decodes a raw opcode byte.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::LoadSprite),
            1 => Some(Self::MoveSprite),
            2 => Some(Self::ClearScreen),
            3 => Some(Self::FireBullet),
            _ => None,
        }
    }
}

/// A single queued command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandRecord {
    /// What to do.
    pub opcode: Opcode,
    /// Target sprite.
    pub sprite_id: u8,
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Frame or animation index.
    pub frame: u8,
    /// Reserved flag bits.
    pub flags: u8,
}

impl CommandRecord {
    /// A record with only an opcode set.
    #[inline]
    #[must_use]
    pub const fn new(opcode: Opcode) -> Self {
        Self { opcode, sprite_id: 0, x: 0, y: 0, frame: 0, flags: 0 }
    }

    /// Sets the target sprite.
    #[inline]
    #[must_use]
    pub const fn with_sprite(mut self, sprite_id: u8) -> Self {
        self.sprite_id = sprite_id;
        self
    }

    /// Sets the coordinates.
    #[inline]
    #[must_use]
    pub const fn at(mut self, x: i16, y: i16) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Sets the frame index.
    #[inline]
    #[must_use]
    pub const fn with_frame(mut self, frame: u8) -> Self {
        self.frame = frame;
        self
    }
}
