//! # Core Error Types
//!
//! All errors that can occur while managing pools, slots, sprites and
//! particle systems.
//!
//! None of these are fatal. Callers count them and move on to the next frame.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the bump-allocated memory pool.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was shut down or never initialized.
    #[error("memory pool is not initialized")]
    NotInitialized,

    /// Zero-byte allocations are refused.
    #[error("zero-size allocation requested")]
    ZeroSize,

    /// Alignment must be a non-zero power of two.
    #[error("invalid alignment {0}")]
    BadAlignment(usize),

    /// Not enough room left in the pool.
    #[error("memory pool exhausted: requested {requested} bytes, available {available}")]
    Exhausted {
        /// Bytes requested.
        requested: usize,
        /// Bytes left after aligning the tail.
        available: usize,
    },
}

/// Errors raised by the texture and animation slot tables.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// Every slot in the table is allocated.
    #[error("slot table full: capacity {0}")]
    SlotTableFull(usize),

    /// The handle points at a freed or reused slot.
    #[error("stale or unknown handle: slot {index}, generation {generation}")]
    StaleHandle {
        /// Slot index.
        index: u16,
        /// Generation carried by the handle.
        generation: u32,
    },

    /// Requested animation or texture frame does not exist.
    #[error("frame {frame} out of range (frame count {count})")]
    FrameOutOfRange {
        /// Requested frame.
        frame: u8,
        /// Frames available.
        count: u8,
    },

    /// Pixel data length does not match `width * height * frames`.
    #[error("data length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch {
        /// Expected element count.
        expected: usize,
        /// Provided element count.
        actual: usize,
    },

    /// The backing pool refused the allocation.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors raised by the sprite registry.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// No free row in the sprite table.
    #[error("sprite table full: capacity {0}")]
    TableFull(usize),

    /// Sprite id out of range or not in use.
    #[error("unknown sprite {0}")]
    UnknownSprite(u8),

    /// `create_at` targeted a row that is already in use.
    #[error("sprite {0} already exists")]
    AlreadyExists(u8),
}

/// Errors raised by the particle system pool.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleError {
    /// Every system in the pool is in use.
    #[error("particle pool full: capacity {0}")]
    PoolFull(usize),

    /// System id out of range or not in use.
    #[error("unknown particle system {0}")]
    UnknownSystem(u8),
}

/// Errors raised while loading the pipeline configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Result type for slot table operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Result type for sprite registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for particle pool operations.
pub type ParticleResult<T> = Result<T, ParticleError>;
