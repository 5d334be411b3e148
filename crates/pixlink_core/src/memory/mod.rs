//! # Memory Management
//!
//! Pre-sized pools and slot tables for textures and animations.
//!
//! ## Design Philosophy
//!
//! All memory is allocated once at startup. During a frame:
//! - No heap allocations for pixel or animation data
//! - Slots are addressed by `(index, generation)` handles
//! - Freeing a slot invalidates its handle but leaves the pool tail alone

mod arena;
mod resources;
mod slots;

pub use arena::{align_up, MemoryPool, PoolRegion};
pub use resources::{AnimationMeta, AnimationView, ResourceManager, TextureMeta};
pub use slots::{SlotEntry, SlotHandle, SlotTable};
