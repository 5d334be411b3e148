//! # PIXLINK Core
//!
//! Render-side state for a two-unit display pipeline:
//! - Pre-sized texture and animation pools with generation-tagged slots
//! - A fixed sprite table with automatic cleanup policies
//! - AABB collision detection into a bounded event buffer
//! - A fixed pool of particle emitters
//! - The spin-locked command ring shared with the ingress unit
//!
//! ## Architecture Rules
//!
//! 1. **All memory is sized at startup** - pools, tables and rings never grow
//! 2. **One owner** - only the render unit touches engine state
//! 3. **Nothing is fatal** - every failure is counted and the next frame runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use pixlink_core::{CommandChannel, CommandRecord, GraphicsEngine, Opcode, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let channel = CommandChannel::new(config.channel.command_capacity);
//! let mut engine = GraphicsEngine::new(&config);
//!
//! channel.try_push(CommandRecord::new(Opcode::LoadSprite).with_sprite(0).at(10, 10));
//! channel.drain(|cmd| { let _ = engine.execute(&cmd, now); });
//! engine.update(now);
//! engine.render(&mut raster);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod collision;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod particles;
pub mod raster;
pub mod sprite;
pub mod stats;
pub mod sync;

pub use collision::{Aabb, CollisionEngine, CollisionEvent};
pub use command::{CommandRecord, Opcode};
pub use config::{
    ChannelConfig, CollisionConfig, DisplayConfig, FrameConfig, MemoryConfig, NetworkConfig,
    ParticleConfig, PipelineConfig, SpriteConfig,
};
pub use engine::{FrameSummary, GraphicsEngine};
pub use error::{ConfigError, ParticleError, PoolError, RegistryError, ResourceError};
pub use memory::{MemoryPool, PoolRegion, ResourceManager, SlotHandle};
pub use particles::{Particle, ParticlePool, ParticleSystem};
pub use raster::{Blit, Color, DrawCall, NullRasterizer, Rasterizer, RecordingRasterizer};
pub use sprite::{
    BlendMode, Camera, CleanupMode, CleanupPolicy, Removal, Sprite, SpriteKind, SpriteRegistry,
    SpriteSpec,
};
pub use stats::{EngineStats, FrameTimer};
pub use sync::{ChannelStats, CommandChannel, SnapshotCell, SpinLock};
