//! # Cross-Unit Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Ingress Unit:  decodes packets  -> WRITES commands
//! Render Unit:   executes commands -> OWNS sprites, pools, collisions
//! ```
//!
//! ## The Solution
//!
//! - Commands cross through a spin-locked ring ([`CommandChannel`])
//! - Engine state never crosses at all; results go back as messages and
//!   stats as immutable snapshots ([`SnapshotCell`])

mod command_channel;
mod snapshot;
mod spin_lock;

pub use command_channel::{ChannelStats, CommandChannel};
pub use snapshot::SnapshotCell;
pub use spin_lock::{SpinLock, SpinLockGuard};
