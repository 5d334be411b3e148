//! # Sprites
//!
//! Sprite records, cleanup descriptors and the registry that owns them.

mod registry;
mod types;

pub use registry::{Camera, SpriteRegistry};
pub use types::{
    BlendMode, CleanupMode, CleanupPolicy, Playback, Removal, Sprite, SpriteKind, SpriteSpec,
};
