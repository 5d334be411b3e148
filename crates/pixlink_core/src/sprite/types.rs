//! # Sprite Records
//!
//! Plain data for one row of the sprite table.

use serde::Deserialize;

use crate::collision::Aabb;
use crate::memory::SlotHandle;

/// What kind of object a sprite represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpriteKind {
    /// Fixed image.
    #[default]
    Static,
    /// Driven by an animation slot.
    Animated,
    /// Moved by its velocity every frame.
    Physics,
}

/// How a sprite is composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite.
    #[default]
    None,
    /// Mix by alpha.
    Alpha,
    /// Add channels.
    Additive,
    /// Multiply channels.
    Multiply,
}

/// Rule for removing a sprite automatically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// Never removed automatically.
    #[default]
    None,
    /// Removed once its box leaves the field by the near margin.
    OffScreen,
    /// Removed once its box leaves the field by the far margin.
    FarOffScreen,
    /// Removed once `now - created_at >= timeout_ms`.
    Timeout,
    /// Removed once its `active` flag is cleared.
    Inactive,
}

/// Per-sprite cleanup descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Which rule applies.
    pub mode: CleanupMode,
    /// Creation timestamp (ms).
    pub created_at: u32,
    /// Lifetime for [`CleanupMode::Timeout`].
    pub timeout_ms: u32,
    /// Per-sprite opt-out of the sweeps.
    pub auto: bool,
}

/// Animation playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Playback {
    /// Animation slot being played.
    pub animation: SlotHandle,
    /// Current step in the animation's frame sequence.
    pub step: u8,
    /// When the current step started (ms).
    pub step_started: u32,
    /// Advances only while true.
    pub playing: bool,
}

/// One sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sprite {
    /// Row index in the table.
    pub id: u8,
    /// Variant tag.
    pub kind: SpriteKind,
    /// Left edge.
    pub x: i16,
    /// Top edge.
    pub y: i16,
    /// Horizontal velocity per frame.
    pub vx: i16,
    /// Vertical velocity per frame.
    pub vy: i16,
    /// Texture slot, if any.
    pub texture: Option<SlotHandle>,
    /// Texture frame currently shown.
    pub frame: u8,
    /// Animation playback, if any.
    pub playback: Option<Playback>,
    /// Draw order (lower first).
    pub layer: u8,
    /// Compositing mode.
    pub blend: BlendMode,
    /// Opacity.
    pub alpha: u8,
    /// Drawn only when true.
    pub visible: bool,
    /// Takes part in the collision scan.
    pub collision_enabled: bool,
    /// Cleared sprites are frozen and become eligible for the inactive sweep.
    pub active: bool,
    /// Bounding box width.
    pub width: u8,
    /// Bounding box height.
    pub height: u8,
    /// Cleanup descriptor.
    pub cleanup: CleanupPolicy,
}

impl Sprite {
    /// Axis-aligned bounding box in world coordinates.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }
}

/// Parameters for creating a sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteSpec {
    /// Left edge.
    pub x: i16,
    /// Top edge.
    pub y: i16,
    /// Bounding box width.
    pub width: u8,
    /// Bounding box height.
    pub height: u8,
    /// Cleanup rule.
    pub cleanup: CleanupMode,
    /// Lifetime for [`CleanupMode::Timeout`].
    pub timeout_ms: u32,
}

impl SpriteSpec {
    /// A sprite that is never cleaned up automatically.
    #[must_use]
    pub const fn new(x: i16, y: i16, width: u8, height: u8) -> Self {
        Self { x, y, width, height, cleanup: CleanupMode::None, timeout_ms: 0 }
    }

    /// Sets the cleanup rule.
    #[must_use]
    pub const fn with_cleanup(mut self, cleanup: CleanupMode, timeout_ms: u32) -> Self {
        self.cleanup = cleanup;
        self.timeout_ms = timeout_ms;
        self
    }

    pub(crate) const fn build(&self, id: u8, now: u32) -> Sprite {
        Sprite {
            id,
            kind: SpriteKind::Static,
            x: self.x,
            y: self.y,
            vx: 0,
            vy: 0,
            texture: None,
            frame: 0,
            playback: None,
            layer: 0,
            blend: BlendMode::None,
            alpha: 255,
            visible: true,
            collision_enabled: false,
            active: true,
            width: self.width,
            height: self.height,
            cleanup: CleanupPolicy {
                mode: self.cleanup,
                created_at: now,
                timeout_ms: self.timeout_ms,
                auto: true,
            },
        }
    }
}

/// Why and where a sprite was swept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Removal {
    /// Removed sprite.
    pub id: u8,
    /// Last X.
    pub x: i16,
    /// Last Y.
    pub y: i16,
    /// Rule that removed it.
    pub reason: CleanupMode,
}
